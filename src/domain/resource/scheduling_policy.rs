use serde::Serialize;
use std::fmt;

/// Scheduling discipline of an active resource.
///
/// `Default` is the fallback for identifiers this simulator does not know. It is
/// scheduled like `Delay`: every job completes after its own demand, without contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SchedulingPolicy {
    Fcfs,
    ProcessorSharing,
    Delay,
    Default,
}

impl SchedulingPolicy {
    /// Maps an external policy identifier. Unknown or empty identifiers map to `Default`.
    pub fn from_policy_id(policy_id: &str) -> Self {
        match policy_id.trim() {
            "FCFS" => SchedulingPolicy::Fcfs,
            "ProcessorSharing" | "PROCESSOR_SHARING" | "PS" => SchedulingPolicy::ProcessorSharing,
            "Delay" | "DELAY" => SchedulingPolicy::Delay,
            other => {
                log::warn!("Unknown scheduling policy id '{}', falling back to the default (delay) policy.", other);
                SchedulingPolicy::Default
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingPolicy::Fcfs => "FCFS",
            SchedulingPolicy::ProcessorSharing => "ProcessorSharing",
            SchedulingPolicy::Delay => "Delay",
            SchedulingPolicy::Default => "Default",
        }
    }
}

impl From<&str> for SchedulingPolicy {
    fn from(policy_id: &str) -> Self {
        SchedulingPolicy::from_policy_id(policy_id)
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_policy_ids() {
        assert_eq!(SchedulingPolicy::from("FCFS"), SchedulingPolicy::Fcfs);
        assert_eq!(SchedulingPolicy::from("ProcessorSharing"), SchedulingPolicy::ProcessorSharing);
        assert_eq!(SchedulingPolicy::from("Delay"), SchedulingPolicy::Delay);
    }

    #[test]
    fn test_unknown_and_empty_map_to_default() {
        assert_eq!(SchedulingPolicy::from(""), SchedulingPolicy::Default);
        assert_eq!(SchedulingPolicy::from("RoundRobin"), SchedulingPolicy::Default);
        assert_eq!(SchedulingPolicy::from("fcfs"), SchedulingPolicy::Default);
    }
}
