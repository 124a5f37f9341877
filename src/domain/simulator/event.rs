use std::fmt;

use crate::domain::resource::resource::ActiveResourceKey;
use crate::domain::simulator::clock::SimTime;
use crate::domain::simulator::session::{RequestKey, SessionKey};
use crate::domain::utils::id::ScenarioId;

/// What an [`SimulationEvent::IntervalPassed`] tick belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntervalSubject {
    /// Evolution interval of an open workload.
    Workload(ScenarioId),

    /// Tick interval of a usage scenario.
    Scenario(ScenarioId),
}

impl fmt::Display for IntervalSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalSubject::Workload(scenario) => write!(f, "workload:{}", scenario),
            IntervalSubject::Scenario(scenario) => write!(f, "scenario:{}", scenario),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// A new user of `scenario` arrives, `delay` after the previous one.
    InterArrivalUserInitiated { scenario: ScenarioId, delay: SimTime },

    /// The session continues with its current action.
    UserProgressed { session: SessionKey },

    /// The system call of `session` has been fully served.
    UserRequestFinished { request: RequestKey, session: SessionKey },

    IntervalPassed { interval: SimTime, subject: IntervalSubject },

    /// Delivers completions of one active resource. Ignored when `epoch` is outdated.
    ResourceCheck { key: ActiveResourceKey, epoch: u64 },

    /// The request continues with its next service step.
    RequestProgressed { request: RequestKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    InterArrivalUserInitiated,
    UserProgressed,
    UserRequestFinished,
    IntervalPassed,
    ResourceCheck,
    RequestProgressed,
}

impl SimulationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimulationEvent::InterArrivalUserInitiated { .. } => EventKind::InterArrivalUserInitiated,
            SimulationEvent::UserProgressed { .. } => EventKind::UserProgressed,
            SimulationEvent::UserRequestFinished { .. } => EventKind::UserRequestFinished,
            SimulationEvent::IntervalPassed { .. } => EventKind::IntervalPassed,
            SimulationEvent::ResourceCheck { .. } => EventKind::ResourceCheck,
            SimulationEvent::RequestProgressed { .. } => EventKind::RequestProgressed,
        }
    }
}
