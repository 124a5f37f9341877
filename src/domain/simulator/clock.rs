use crate::error::{Error, Result};

/// Simulated time in abstract time units.
pub type SimTime = f64;

/// Two instants closer than this are considered equal.
pub const TIME_EPSILON: f64 = 1e-9;

/// The single logical clock of a simulation run. Only ever moves forward.
#[derive(Debug, Clone, Default)]
pub struct SimulationClock {
    now: SimTime,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Moves the clock to `time`.
    ///
    /// # Returns
    /// A consistency violation if `time` lies in the past or is not a finite number.
    pub fn advance_to(&mut self, time: SimTime) -> Result<()> {
        if !time.is_finite() || time + TIME_EPSILON < self.now {
            return Err(Error::consistency(format!("Simulation clock asked to go back from {} to {}", self.now, time)));
        }

        self.now = self.now.max(time);
        Ok(())
    }
}
