use std::cmp::Ordering;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::domain::simulator::clock::SimTime;
use crate::domain::simulator::event::SimulationEvent;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for events scheduled at the same time)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKey {
    pub time: OrderedFloat<SimTime>,
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub time: SimTime,
    pub sequence: u64,
    pub event: SimulationEvent,
}

/// Pending events of a simulation run in deterministic processing order.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, SimulationEvent>,
    sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` at `time`. Returns the key it was stored under.
    pub fn schedule(&mut self, time: SimTime, event: SimulationEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey { time: OrderedFloat(time), sequence: self.sequence };
        self.events.insert(key, event);
        key
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.first_key_value().map(|(key, _)| key.time.into_inner())
    }

    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.events.pop_first().map(|(key, event)| ScheduledEvent { time: key.time.into_inner(), sequence: key.sequence, event })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::simulator::event::IntervalSubject;
    use crate::domain::utils::id::ScenarioId;

    fn tick(interval: f64) -> SimulationEvent {
        SimulationEvent::IntervalPassed { interval, subject: IntervalSubject::Scenario(ScenarioId::new("s")) }
    }

    #[test]
    fn test_event_key_ordering() {
        let earlier = EventKey { time: OrderedFloat(1.0), sequence: 7 };
        let later = EventKey { time: OrderedFloat(2.0), sequence: 1 };
        assert!(earlier < later);

        let first = EventKey { time: OrderedFloat(1.0), sequence: 1 };
        assert!(first < earlier, "Lower sequence should process first at equal time");
    }

    #[test]
    fn test_pop_orders_by_time_then_fifo() {
        let mut queue = EventQueue::new();
        queue.schedule(3.0, tick(3.0));
        queue.schedule(1.0, tick(10.0));
        queue.schedule(1.0, tick(20.0));
        queue.schedule(0.5, tick(0.5));

        assert_eq!(queue.peek_time(), Some(0.5));

        let order: Vec<f64> = std::iter::from_fn(|| queue.pop())
            .map(|scheduled| match scheduled.event {
                SimulationEvent::IntervalPassed { interval, .. } => interval,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();

        assert_eq!(order, vec![0.5, 10.0, 20.0, 3.0]);
        assert!(queue.is_empty());
    }
}
