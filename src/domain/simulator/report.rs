use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::simulator::clock::SimTime;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatistics {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_dropped: u64,
    pub requests_issued: u64,
    pub requests_finished: u64,
    pub requests_dropped: u64,
    pub remote_calls: u64,
    pub relaxed_link_matches: u64,
    pub dropped_jobs: u64,
    pub events_processed: u64,

    /// Sum of the response times of all finished requests.
    #[serde(skip)]
    pub total_response_time: SimTime,
}

/// Summary of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub finished_at: SimTime,
    #[serde(flatten)]
    pub statistics: RunStatistics,
    pub sessions_in_flight: usize,
    pub mean_response_time: Option<SimTime>,

    /// Completed jobs per active resource id.
    pub completed_jobs: BTreeMap<String, u64>,

    /// Ticks delivered per interval subject.
    pub interval_ticks: BTreeMap<String, u64>,
}
