use serde::Serialize;
use std::fmt;

use crate::domain::simulator::clock::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobId(pub u64);

/// Whoever submitted a job or an acquire request; used to route completions back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequesterId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "requester-{}", self.0)
    }
}

/// A unit of demand submitted to an active resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub requester: RequesterId,

    /// Service demand in time units.
    pub demand: f64,
    pub arrival: SimTime,

    /// Set once the job has left the resource.
    pub completion: Option<SimTime>,
}

impl Job {
    pub fn new(id: JobId, requester: RequesterId, demand: f64, arrival: SimTime) -> Self {
        Self { id, requester, demand, arrival, completion: None }
    }

    /// Time spent at the resource, available once completed.
    pub fn response_time(&self) -> Option<SimTime> {
        self.completion.map(|completion| completion - self.arrival)
    }
}
