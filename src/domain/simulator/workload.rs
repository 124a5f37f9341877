use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::scenario::usage_model::{BranchTransition, InterArrival};
use crate::domain::simulator::clock::SimTime;
use crate::domain::utils::id::BehaviorId;

/// Source of every random decision of a run. Seeded runs are reproducible.
#[derive(Debug, Clone)]
pub struct WorkloadSampler {
    rng: StdRng,
}

impl WorkloadSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                log::info!("No seed configured, sampling from OS entropy. The run will not be reproducible.");
                StdRng::from_os_rng()
            }
        };

        Self { rng }
    }

    /// Time until the next user of an open workload arrives.
    pub fn inter_arrival(&mut self, distribution: &InterArrival) -> SimTime {
        match distribution {
            InterArrival::Fixed(delay) => *delay,
            InterArrival::Exponential { mean } => {
                let u: f64 = self.rng.random();
                -mean * (1.0 - u).ln()
            }
        }
    }

    /// Picks one transition according to its probability.
    ///
    /// Falls back to the last transition when rounding leaves the draw above the
    /// cumulative total.
    pub fn choose_branch<'a>(&mut self, transitions: &'a [BranchTransition]) -> Option<&'a BehaviorId> {
        let draw: f64 = self.rng.random();
        let mut cumulative = 0.0;

        for transition in transitions {
            cumulative += transition.probability;
            if draw < cumulative {
                return Some(&transition.body);
            }
        }

        transitions.last().map(|transition| &transition.body)
    }
}
