use std::collections::VecDeque;

use crate::domain::resource::job::RequesterId;
use crate::domain::resource::resource::{Capacity, Resource};
use crate::error::{ConfigurationError, Error, Result};

/// A pending acquisition waiting for tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireRequest {
    pub requester: RequesterId,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted,
    Queued,
}

/// Finite token pool (semaphore, connection pool, thread pool).
///
/// Grants are all-or-nothing. A request that fits is granted on arrival; the others
/// wait in a FIFO queue that is served strictly from its head.
#[derive(Debug)]
pub struct PassiveResourceInstance {
    resource: Resource,

    /// Tokens currently handed out.
    held: u64,

    waiting: VecDeque<AcquireRequest>,
}

impl PassiveResourceInstance {
    pub fn new(resource: Resource) -> Self {
        Self { resource, held: 0, waiting: VecDeque::new() }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Tokens available right now; `None` for an unbounded pool.
    pub fn currently_available(&self) -> Option<u64> {
        self.resource.capacity.units().map(|capacity| capacity.saturating_sub(self.held))
    }

    pub fn held(&self) -> u64 {
        self.held
    }

    pub fn waiting(&self) -> impl Iterator<Item = &AcquireRequest> {
        self.waiting.iter()
    }

    pub fn queue_length(&self) -> usize {
        self.waiting.len()
    }

    /// Takes `amount` tokens, or queues the request if they are not available.
    pub fn acquire(&mut self, requester: RequesterId, amount: u64) -> Result<AcquireOutcome> {
        let Capacity::Bounded(capacity) = self.resource.capacity else {
            self.held = self.held.saturating_add(amount);
            return Ok(AcquireOutcome::Granted);
        };

        if amount > capacity {
            return Err(ConfigurationError::AmountExceedsCapacity { resource: self.resource.id.to_string(), requested: amount, capacity }.into());
        }

        if amount <= capacity - self.held {
            self.held += amount;
            self.check_bounds()?;
            return Ok(AcquireOutcome::Granted);
        }

        log::debug!("{} queued for {} token(s) of passive resource '{}' ({} waiting)", requester, amount, self.resource.id, self.waiting.len());
        self.waiting.push_back(AcquireRequest { requester, amount });

        Ok(AcquireOutcome::Queued)
    }

    /// Returns `amount` tokens and grants waiting requests in FIFO order while they fit.
    ///
    /// # Returns
    /// The requests granted by this release, in the order they were granted.
    pub fn release(&mut self, amount: u64) -> Result<Vec<AcquireRequest>> {
        if self.resource.capacity.is_unbounded() {
            self.held = self.held.saturating_sub(amount);
            return Ok(Vec::new());
        }

        if amount > self.held {
            return Err(Error::consistency(format!(
                "Releasing {} token(s) of passive resource '{}' would exceed its capacity {} ({} held)",
                amount, self.resource.id, self.resource.capacity, self.held
            )));
        }

        self.held -= amount;
        self.grant_waiting()
    }

    /// Withdraws every queued request of `requester`, then grants whatever fits now.
    pub fn cancel_waiting(&mut self, requester: RequesterId) -> Result<Vec<AcquireRequest>> {
        let before = self.waiting.len();
        self.waiting.retain(|request| request.requester != requester);

        if before == self.waiting.len() {
            return Ok(Vec::new());
        }

        self.grant_waiting()
    }

    /// Discards all waiters and hands every token back to the pool.
    pub fn clear(&mut self) -> usize {
        let dropped = self.waiting.len();
        self.waiting.clear();
        self.held = 0;
        dropped
    }

    fn grant_waiting(&mut self) -> Result<Vec<AcquireRequest>> {
        let mut granted = Vec::new();

        while let Some(head) = self.waiting.front() {
            let available = self.currently_available().unwrap_or(u64::MAX);
            if head.amount > available {
                break;
            }

            if let Some(request) = self.waiting.pop_front() {
                self.held += request.amount;
                granted.push(request);
            }
        }

        self.check_bounds()?;
        Ok(granted)
    }

    fn check_bounds(&self) -> Result<()> {
        match self.resource.capacity {
            Capacity::Bounded(capacity) if self.held > capacity => Err(Error::consistency(format!(
                "Passive resource '{}' has {} token(s) handed out but only {} exist",
                self.resource.id, self.held, capacity
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::utils::id::ResourceId;

    fn pool(capacity: Capacity) -> PassiveResourceInstance {
        PassiveResourceInstance::new(Resource::new(ResourceId::new("pool"), "Connection Pool", capacity).unwrap())
    }

    #[test]
    fn test_acquire_within_capacity_is_granted() {
        let mut pool = pool(Capacity::Bounded(3));
        assert_eq!(pool.acquire(RequesterId(1), 2).unwrap(), AcquireOutcome::Granted);
        assert_eq!(pool.currently_available(), Some(1));
    }

    #[test]
    fn test_no_partial_grants_and_fifo_release() {
        let mut pool = pool(Capacity::Bounded(3));
        pool.acquire(RequesterId(1), 3).unwrap();

        assert_eq!(pool.acquire(RequesterId(2), 2).unwrap(), AcquireOutcome::Queued);
        assert_eq!(pool.acquire(RequesterId(3), 1).unwrap(), AcquireOutcome::Queued);

        // One token back is not enough for the head, and the second waiter must not overtake it.
        assert!(pool.release(1).unwrap().is_empty());
        assert_eq!(pool.currently_available(), Some(1));

        let granted = pool.release(2).unwrap();
        assert_eq!(granted.iter().map(|r| r.requester).collect::<Vec<_>>(), vec![RequesterId(2), RequesterId(3)]);
        assert_eq!(pool.currently_available(), Some(0));
    }

    #[test]
    fn test_fitting_request_is_granted_while_head_waits() {
        let mut pool = pool(Capacity::Bounded(3));
        pool.acquire(RequesterId(1), 2).unwrap();
        assert_eq!(pool.acquire(RequesterId(2), 2).unwrap(), AcquireOutcome::Queued);

        assert_eq!(pool.acquire(RequesterId(3), 1).unwrap(), AcquireOutcome::Granted);
        assert_eq!(pool.currently_available(), Some(0));
        assert_eq!(pool.queue_length(), 1);
    }

    #[test]
    fn test_over_release_is_consistency_violation() {
        let mut pool = pool(Capacity::Bounded(2));
        pool.acquire(RequesterId(1), 1).unwrap();
        assert!(pool.release(2).unwrap_err().is_consistency_violation());
    }

    #[test]
    fn test_amount_beyond_capacity_is_rejected() {
        let mut pool = pool(Capacity::Bounded(2));
        let result = pool.acquire(RequesterId(1), 3);
        assert!(matches!(result, Err(Error::Configuration(ConfigurationError::AmountExceedsCapacity { requested: 3, capacity: 2, .. }))));
    }

    #[test]
    fn test_unbounded_pool_never_blocks() {
        let mut pool = pool(Capacity::Unbounded);
        for i in 0..100 {
            assert_eq!(pool.acquire(RequesterId(i), 1_000).unwrap(), AcquireOutcome::Granted);
        }
        assert_eq!(pool.currently_available(), None);
        assert!(pool.release(5).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_waiting_lets_next_request_through() {
        let mut pool = pool(Capacity::Bounded(3));
        pool.acquire(RequesterId(1), 3).unwrap();
        pool.acquire(RequesterId(2), 3).unwrap();
        pool.acquire(RequesterId(3), 1).unwrap();

        // The freed token stays unused while the head cannot be served.
        assert!(pool.release(1).unwrap().is_empty());

        let granted = pool.cancel_waiting(RequesterId(2)).unwrap();
        assert_eq!(granted, vec![AcquireRequest { requester: RequesterId(3), amount: 1 }]);
    }

    #[test]
    fn test_clear_restores_full_capacity() {
        let mut pool = pool(Capacity::Bounded(2));
        pool.acquire(RequesterId(1), 2).unwrap();
        pool.acquire(RequesterId(2), 1).unwrap();

        assert_eq!(pool.clear(), 1);
        assert_eq!(pool.currently_available(), Some(2));
        assert_eq!(pool.clear(), 0);
    }
}
