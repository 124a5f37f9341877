use crate::domain::scenario::usage_model::Workload;
use crate::domain::simulator::engine::SimulationEngine;
use crate::domain::simulator::event::SimulationEvent;
use crate::error::Result;

// Default reactions registered by `SimulationEngine::new`. Each handler ignores event
// kinds it was not registered for.

pub(super) fn on_user_arrival(engine: &mut SimulationEngine, event: &SimulationEvent) -> Result<()> {
    let SimulationEvent::InterArrivalUserInitiated { scenario, delay } = event else {
        return Ok(());
    };

    log::trace!("t={} user of '{}' arrived after {}.", engine.now(), scenario, delay);
    engine.spawn_session(scenario)?;

    // Open workloads keep generating users on their own.
    if let Workload::Open { inter_arrival, .. } = &engine.usage.scenario(scenario)?.workload {
        let next = engine.sampler.inter_arrival(inter_arrival);
        let at = engine.now() + next;
        engine.schedule(at, SimulationEvent::InterArrivalUserInitiated { scenario: scenario.clone(), delay: next });
    }

    Ok(())
}

pub(super) fn on_user_progressed(engine: &mut SimulationEngine, event: &SimulationEvent) -> Result<()> {
    let SimulationEvent::UserProgressed { session } = event else {
        return Ok(());
    };

    engine.progress_session(*session)
}

pub(super) fn on_user_request_finished(engine: &mut SimulationEngine, event: &SimulationEvent) -> Result<()> {
    let SimulationEvent::UserRequestFinished { request, session } = event else {
        return Ok(());
    };

    match engine.finish_request(*request)? {
        Some(owner) if owner == *session => engine.progress_session(owner),
        Some(owner) => {
            log::warn!("Request finished for {:?} but was issued by {:?}, resuming the issuer.", session, owner);
            engine.progress_session(owner)
        }
        None => Ok(()),
    }
}

pub(super) fn on_interval_passed(engine: &mut SimulationEngine, event: &SimulationEvent) -> Result<()> {
    let SimulationEvent::IntervalPassed { interval, subject } = event else {
        return Ok(());
    };

    let now = engine.now();
    let ticks = engine.interval_ticks.entry(subject.to_string()).or_default();
    *ticks += 1;
    log::debug!("t={} interval of {} passed for {} (tick {}).", now, interval, subject, ticks);

    let next = now + interval;
    if next <= engine.end_time() {
        engine.schedule(next, event.clone());
    }

    Ok(())
}

pub(super) fn on_resource_check(engine: &mut SimulationEngine, event: &SimulationEvent) -> Result<()> {
    let SimulationEvent::ResourceCheck { key, epoch } = event else {
        return Ok(());
    };

    engine.deliver_completions(key, *epoch)
}

pub(super) fn on_request_progressed(engine: &mut SimulationEngine, event: &SimulationEvent) -> Result<()> {
    let SimulationEvent::RequestProgressed { request } = event else {
        return Ok(());
    };

    engine.progress_request(*request)
}
