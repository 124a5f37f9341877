use crate::domain::request::request_processing_context::UserRequest;
use crate::domain::scenario::context_stack::Resume;
use crate::domain::scenario::usage_model::ScenarioAction;
use crate::domain::simulator::engine::SimulationEngine;
use crate::domain::simulator::event::SimulationEvent;
use crate::domain::simulator::session::SessionKey;
use crate::error::{ConfigurationError, Result};

impl SimulationEngine {
    /// Executes actions of a session until it has to wait for time to pass or for a
    /// system call, or until its root behavior is done.
    pub(super) fn progress_session(&mut self, key: SessionKey) -> Result<()> {
        loop {
            let Some(session) = self.sessions.get_mut(key) else {
                log::trace!("Progress of a session that no longer exists ignored ({:?}).", key);
                return Ok(());
            };
            let Some(action_id) = session.current.clone() else {
                return Ok(());
            };

            match self.usage.action(&action_id)?.clone() {
                ScenarioAction::Start { successor } => session.current = Some(successor),

                ScenarioAction::Stop => match session.contexts.finish_behavior() {
                    Resume::Repeat(next) | Resume::Continue(next) => session.current = Some(next),
                    Resume::Finished => {
                        session.current = None;
                        return self.finish_session(key);
                    }
                },

                ScenarioAction::Delay { duration, successor } => {
                    session.current = Some(successor);
                    let wake_up = self.clock.now() + duration;
                    self.schedule(wake_up, SimulationEvent::UserProgressed { session: key });
                    return Ok(());
                }

                ScenarioAction::SystemCall { component, signature, payload_bytes, successor } => {
                    session.current = Some(successor);
                    let request = UserRequest::new(session.user, session.scenario.clone(), component, signature, payload_bytes);
                    return self.issue_request(key, request);
                }

                ScenarioAction::Loop { body, iterations, successor } => {
                    if iterations == 0 {
                        log::trace!("Loop '{}' with zero iterations skipped.", action_id);
                        session.current = Some(successor);
                        continue;
                    }

                    let entry = self.usage.behavior(&body)?.entry.clone();
                    session.current = Some(session.contexts.enter_loop(entry, iterations, successor)?);
                }

                ScenarioAction::Branch { transitions, successor } => {
                    let body = self
                        .sampler
                        .choose_branch(&transitions)
                        .ok_or_else(|| ConfigurationError::InvalidUsageModel(format!("Branch '{}' has no transitions", action_id)))?;

                    let entry = self.usage.behavior(body)?.entry.clone();
                    session.current = Some(session.contexts.enter_branch(entry, successor));
                }
            }
        }
    }
}
