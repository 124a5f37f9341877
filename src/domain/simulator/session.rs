use slotmap::{Key, KeyData, new_key_type};

use crate::domain::request::request_processing_context::RequestProcessingContext;
use crate::domain::resource::job::RequesterId;
use crate::domain::scenario::context_stack::ScenarioContextStack;
use crate::domain::simulator::clock::SimTime;
use crate::domain::utils::id::{ActionId, ResourceId, ScenarioId, UserId};

new_key_type! {
    pub struct SessionKey;
    pub struct RequestKey;
}

impl RequestKey {
    /// The identity this request uses towards the resources it waits on.
    pub fn requester(self) -> RequesterId {
        RequesterId(self.data().as_ffi())
    }

    pub fn from_requester(requester: RequesterId) -> Self {
        RequestKey::from(KeyData::from_ffi(requester.0))
    }
}

/// One simulated user walking through the behavior of its scenario.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserId,
    pub scenario: ScenarioId,
    pub contexts: ScenarioContextStack,

    /// Action to execute when the session progresses next. `None` once finished.
    pub current: Option<ActionId>,
    pub started_at: SimTime,
}

impl Session {
    pub fn new(user: UserId, scenario: ScenarioId, entry: ActionId, started_at: SimTime) -> Self {
        let mut contexts = ScenarioContextStack::new();
        let current = contexts.enter_root(entry);
        Self { user, scenario, contexts, current: Some(current), started_at }
    }
}

/// A system call in flight, from issuing until its last service step.
#[derive(Debug, Clone)]
pub struct ActiveRequest {
    pub session: SessionKey,
    pub context: RequestProcessingContext,
    pub issued_at: SimTime,

    /// Passive tokens granted to this request and not yet released.
    pub held: Vec<(ResourceId, u64)>,
}

impl ActiveRequest {
    pub fn new(session: SessionKey, context: RequestProcessingContext, issued_at: SimTime) -> Self {
        Self { session, context, issued_at, held: Vec::new() }
    }

    pub fn record_grant(&mut self, resource: &ResourceId, amount: u64) {
        match self.held.iter_mut().find(|(id, _)| id == resource) {
            Some((_, held)) => *held += amount,
            None => self.held.push((resource.clone(), amount)),
        }
    }

    pub fn record_release(&mut self, resource: &ResourceId, amount: u64) {
        if let Some((_, held)) = self.held.iter_mut().find(|(id, _)| id == resource) {
            *held = held.saturating_sub(amount);
        }
        self.held.retain(|(_, held)| *held > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_requester_round_trips_to_request_key() {
        let mut requests: SlotMap<RequestKey, u32> = SlotMap::with_key();
        let first = requests.insert(1);
        let second = requests.insert(2);

        assert_ne!(first.requester(), second.requester());
        assert_eq!(RequestKey::from_requester(second.requester()), second);

        requests.remove(first);
        let reused = requests.insert(3);
        assert!(requests.get(RequestKey::from_requester(first.requester())).is_none());
        assert_eq!(requests.get(RequestKey::from_requester(reused.requester())), Some(&3));
    }

    #[test]
    fn test_session_starts_at_root_entry() {
        let session = Session::new(UserId(1), ScenarioId::new("browse"), ActionId::new("start"), 0.0);
        assert_eq!(session.current, Some(ActionId::new("start")));
        assert_eq!(session.contexts.depth(), 1);
    }
}
