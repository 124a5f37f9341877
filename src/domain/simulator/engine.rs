use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use slotmap::SlotMap;

use crate::api::simulation_dto::simulation_dto::SimulationDto;
use crate::domain::architecture::architecture_model::ArchitectureModel;
use crate::domain::architecture::static_architecture::StaticArchitecture;
use crate::domain::request::request_processing_context::{InterpretationContext, RequestProcessingContext, ServiceFrame, UserRequest};
use crate::domain::resource::passive_resource::AcquireRequest;
use crate::domain::resource::resource_registry::ResourceRegistry;
use crate::domain::scenario::usage_model::{ScenarioAction, UsageModel, Workload};
use crate::domain::simulator::clock::{SimTime, SimulationClock, TIME_EPSILON};
use crate::domain::simulator::event::{EventKind, IntervalSubject, SimulationEvent};
use crate::domain::simulator::event_queue::EventQueue;
use crate::domain::simulator::report::{RunStatistics, SimulationReport};
use crate::domain::simulator::session::{ActiveRequest, RequestKey, Session, SessionKey};
use crate::domain::simulator::workload::WorkloadSampler;
use crate::domain::utils::id::{ContainerId, LocationId, ResourceId, ScenarioId, UserId};
use crate::error::{ConfigurationError, ConversionError, Error, Result};

mod behavior;
mod handlers;
mod interpreter;

/// Reaction to one kind of event. Handlers run in registration order.
pub type EventHandler = fn(&mut SimulationEngine, &SimulationEvent) -> Result<()>;

/// Events processed without the clock moving before the run is declared stalled.
const MAX_EVENTS_PER_INSTANT: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Finished,
}

/// Single-threaded discrete-event engine driving users through the architecture.
///
/// The engine is the only writer of the resource registry. Events with equal
/// timestamps are processed in the order they were scheduled.
#[derive(Debug)]
pub struct SimulationEngine {
    registry: ResourceRegistry,
    architecture: Arc<dyn ArchitectureModel>,
    usage: UsageModel,

    queue: EventQueue,
    clock: SimulationClock,
    sampler: WorkloadSampler,
    end_time: SimTime,
    state: RunState,

    sessions: SlotMap<SessionKey, Session>,
    requests: SlotMap<RequestKey, ActiveRequest>,

    handlers: HashMap<EventKind, Vec<EventHandler>>,

    /// Containers taken out of the topology by scale-in.
    removed_locations: BTreeSet<LocationId>,

    statistics: RunStatistics,
    interval_ticks: BTreeMap<String, u64>,
    next_user: u64,
    next_job: u64,
}

impl SimulationEngine {
    pub fn new(architecture: Arc<dyn ArchitectureModel>, usage: UsageModel, end_time: SimTime, seed: Option<u64>) -> Result<Self> {
        if !end_time.is_finite() || end_time < 0.0 {
            return Err(ConversionError::InvalidValue { field: "simulationEnd", value: end_time.to_string() }.into());
        }

        let registry = ResourceRegistry::from_architecture(architecture.as_ref())?;

        let mut engine = Self {
            registry,
            architecture,
            usage,
            queue: EventQueue::new(),
            clock: SimulationClock::new(),
            sampler: WorkloadSampler::new(seed),
            end_time,
            state: RunState::Idle,
            sessions: SlotMap::with_key(),
            requests: SlotMap::with_key(),
            handlers: HashMap::new(),
            removed_locations: BTreeSet::new(),
            statistics: RunStatistics::default(),
            interval_ticks: BTreeMap::new(),
            next_user: 0,
            next_job: 0,
        };

        engine.register_default_handlers();
        Ok(engine)
    }

    fn register_default_handlers(&mut self) {
        self.register_handler(EventKind::InterArrivalUserInitiated, handlers::on_user_arrival);
        self.register_handler(EventKind::UserProgressed, handlers::on_user_progressed);
        self.register_handler(EventKind::UserRequestFinished, handlers::on_user_request_finished);
        self.register_handler(EventKind::IntervalPassed, handlers::on_interval_passed);
        self.register_handler(EventKind::ResourceCheck, handlers::on_resource_check);
        self.register_handler(EventKind::RequestProgressed, handlers::on_request_progressed);
    }

    /// Adds a handler for `kind`, called after the ones already registered.
    pub fn register_handler(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    // --- Accessors ---

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn end_time(&self) -> SimTime {
        self.end_time
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn architecture(&self) -> &dyn ArchitectureModel {
        self.architecture.as_ref()
    }

    pub fn usage_model(&self) -> &UsageModel {
        &self.usage
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn interval_ticks(&self, subject: &IntervalSubject) -> u64 {
        self.interval_ticks.get(&subject.to_string()).copied().unwrap_or(0)
    }

    pub fn is_location_removed(&self, location: &LocationId) -> bool {
        self.removed_locations.contains(location)
    }

    // --- Run Loop ---

    /// Runs the simulation to its end time and tears it down.
    ///
    /// # Returns
    /// The run summary, or the first error raised by a handler. The registry is cleared
    /// in both cases.
    pub fn run(&mut self) -> Result<SimulationReport> {
        let outcome = self.run_until(self.end_time);
        self.teardown();
        outcome?;

        let report = self.report();
        log::info!(
            "Simulation finished at {}: {} session(s) completed, {} dropped, {} request(s) finished.",
            report.finished_at,
            report.statistics.sessions_completed,
            report.statistics.sessions_dropped,
            report.statistics.requests_finished
        );
        Ok(report)
    }

    /// Processes every event scheduled up to `until` (capped at the end time).
    ///
    /// Can be called repeatedly to interleave the run with scale-in operations.
    pub fn run_until(&mut self, until: SimTime) -> Result<()> {
        match self.state {
            RunState::Finished => return Err(Error::consistency("Simulation has already been torn down")),
            RunState::Idle => self.bootstrap(),
            RunState::Running => {}
        }

        let horizon = until.min(self.end_time);
        let mut instant = self.clock.now();
        let mut events_at_instant = 0_u64;

        while let Some(time) = self.queue.peek_time() {
            if time > horizon {
                break;
            }
            let Some(scheduled) = self.queue.pop() else {
                break;
            };

            self.clock.advance_to(scheduled.time)?;

            if self.clock.now() > instant + TIME_EPSILON {
                instant = self.clock.now();
                events_at_instant = 0;
            }
            events_at_instant += 1;
            if events_at_instant > MAX_EVENTS_PER_INSTANT {
                return Err(Error::consistency(format!("Simulation stalled at time {}: more than {} events without time advancing", instant, MAX_EVENTS_PER_INSTANT)));
            }

            self.statistics.events_processed += 1;
            self.dispatch(&scheduled.event)?;
        }

        if horizon > self.clock.now() {
            self.clock.advance_to(horizon)?;
        }

        Ok(())
    }

    fn bootstrap(&mut self) {
        self.state = RunState::Running;
        let scenarios = self.usage.scenarios().to_vec();

        for scenario in scenarios {
            match &scenario.workload {
                Workload::Closed { population, .. } => {
                    log::debug!("Scenario '{}' starts with a closed population of {}.", scenario.id, population);
                    for _ in 0..*population {
                        self.schedule(0.0, SimulationEvent::InterArrivalUserInitiated { scenario: scenario.id.clone(), delay: 0.0 });
                    }
                }
                Workload::Open { inter_arrival, evolution_interval } => {
                    let delay = self.sampler.inter_arrival(inter_arrival);
                    self.schedule(delay, SimulationEvent::InterArrivalUserInitiated { scenario: scenario.id.clone(), delay });

                    if let Some(interval) = evolution_interval {
                        self.schedule(*interval, SimulationEvent::IntervalPassed { interval: *interval, subject: IntervalSubject::Workload(scenario.id.clone()) });
                    }
                }
            }

            if let Some(interval) = scenario.tick_interval {
                self.schedule(interval, SimulationEvent::IntervalPassed { interval, subject: IntervalSubject::Scenario(scenario.id.clone()) });
            }
        }

        log::info!("Simulation bootstrapped with {} initial event(s), running until {}.", self.queue.len(), self.end_time);
    }

    fn dispatch(&mut self, event: &SimulationEvent) -> Result<()> {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get(&kind).cloned() else {
            log::trace!("No handler registered for {:?}, event dropped.", kind);
            return Ok(());
        };

        log::trace!("t={} dispatching {:?} to {} handler(s)", self.clock.now(), event, handlers.len());
        for handler in handlers {
            handler(self, event)?;
        }

        Ok(())
    }

    fn teardown(&mut self) {
        self.state = RunState::Finished;
        self.registry.clear_all_jobs();

        if !self.queue.is_empty() {
            log::debug!("Teardown discarded {} pending event(s).", self.queue.len());
            self.queue.clear();
        }
        if !self.sessions.is_empty() {
            log::info!("{} session(s) and {} request(s) still in flight at the end of the run.", self.sessions.len(), self.requests.len());
        }
    }

    pub fn report(&self) -> SimulationReport {
        let completed_jobs = self.registry.active_resources().map(|active| (active.resource().id.to_string(), active.completed_jobs())).collect();

        let mean_response_time =
            (self.statistics.requests_finished > 0).then(|| self.statistics.total_response_time / self.statistics.requests_finished as f64);

        SimulationReport {
            finished_at: self.clock.now(),
            statistics: self.statistics.clone(),
            sessions_in_flight: self.sessions.len(),
            mean_response_time,
            completed_jobs,
            interval_ticks: self.interval_ticks.clone(),
        }
    }

    pub(crate) fn schedule(&mut self, time: SimTime, event: SimulationEvent) {
        log::trace!("Scheduling {:?} at {}", event, time);
        self.queue.schedule(time, event);
    }

    // --- Sessions ---

    fn spawn_session(&mut self, scenario_id: &ScenarioId) -> Result<SessionKey> {
        let scenario = self.usage.scenario(scenario_id)?;
        let entry = self.usage.behavior(&scenario.root_behavior)?.entry.clone();

        self.next_user += 1;
        let user = UserId(self.next_user);
        let now = self.clock.now();
        let key = self.sessions.insert(Session::new(user, scenario_id.clone(), entry, now));

        self.statistics.sessions_started += 1;
        log::debug!("t={} {} started scenario '{}'.", now, user, scenario_id);

        self.schedule(now, SimulationEvent::UserProgressed { session: key });
        Ok(key)
    }

    fn finish_session(&mut self, key: SessionKey) -> Result<()> {
        let Some(session) = self.sessions.remove(key) else {
            return Ok(());
        };

        self.statistics.sessions_completed += 1;
        let now = self.clock.now();
        log::debug!("t={} {} finished scenario '{}' after {}.", now, session.user, session.scenario, now - session.started_at);

        // A closed population replaces the user once it has thought.
        if let Workload::Closed { think_time, .. } = self.usage.scenario(&session.scenario)?.workload {
            self.schedule(now + think_time, SimulationEvent::InterArrivalUserInitiated { scenario: session.scenario, delay: think_time });
        }

        Ok(())
    }

    fn drop_session(&mut self, key: SessionKey, reason: &str) {
        if let Some(session) = self.sessions.remove(key) {
            self.statistics.sessions_dropped += 1;
            log::warn!("t={} {} of scenario '{}' dropped: {}.", self.clock.now(), session.user, session.scenario, reason);
        }
    }

    // --- Requests ---

    fn issue_request(&mut self, session: SessionKey, request: UserRequest) -> Result<()> {
        let location = self
            .architecture
            .find_deployment_location(&request.component)
            .ok_or_else(|| ConfigurationError::UnallocatedComponent(request.component.to_string()))?;
        let role = self.architecture.provided_role(&request.component).cloned().ok_or_else(|| ConfigurationError::UnknownComponent(request.component.to_string()))?;

        let entry = ServiceFrame::new(request.component.clone(), request.signature.clone(), location.clone());
        let context = RequestProcessingContext::new(request, role, location, InterpretationContext::new(entry))?;

        let now = self.clock.now();
        let key = self.requests.insert(ActiveRequest::new(session, context, now));
        self.statistics.requests_issued += 1;

        self.schedule(now, SimulationEvent::RequestProgressed { request: key });
        Ok(())
    }

    fn finish_request(&mut self, key: RequestKey) -> Result<Option<SessionKey>> {
        let Some(request) = self.requests.remove(key) else {
            return Ok(None);
        };

        self.statistics.requests_finished += 1;
        self.statistics.total_response_time += self.clock.now() - request.issued_at;

        if !request.held.is_empty() {
            log::warn!("Request of {} finished while holding {:?}, returning the tokens.", request.context.user(), request.held);
            self.return_tokens(key, &request.held)?;
        }

        Ok(Some(request.session))
    }

    /// Removes a request mid-flight together with its session, handing back whatever it held.
    fn drop_request(&mut self, key: RequestKey, reason: &str) -> Result<()> {
        let Some(request) = self.requests.remove(key) else {
            return Ok(());
        };

        self.statistics.requests_dropped += 1;
        log::warn!("t={} request {} of {} dropped: {}.", self.clock.now(), request.context.request().signature, request.context.user(), reason);

        self.return_tokens(key, &request.held)?;
        self.drop_session(request.session, reason);
        Ok(())
    }

    fn return_tokens(&mut self, key: RequestKey, held: &[(ResourceId, u64)]) -> Result<()> {
        let mut granted = self.registry.cancel_waiting(key.requester())?;

        for (resource, amount) in held {
            if self.registry.lookup(resource).is_none() {
                continue;
            }
            granted.extend(self.registry.release(resource, *amount)?.into_iter().map(|grant| (resource.clone(), grant)));
        }

        self.resume_granted(granted)
    }

    /// Wakes up every request whose queued acquisition was granted.
    fn resume_granted(&mut self, granted: Vec<(ResourceId, AcquireRequest)>) -> Result<()> {
        let now = self.clock.now();
        let mut pending: VecDeque<(ResourceId, AcquireRequest)> = granted.into();

        while let Some((resource, grant)) = pending.pop_front() {
            let key = RequestKey::from_requester(grant.requester);

            match self.requests.get_mut(key) {
                Some(request) => {
                    request.record_grant(&resource, grant.amount);
                    self.schedule(now, SimulationEvent::RequestProgressed { request: key });
                }
                None => {
                    log::warn!("{} token(s) of '{}' granted to {} which no longer exists, releasing them.", grant.amount, resource, grant.requester);
                    let regranted = self.registry.release(&resource, grant.amount)?;
                    pending.extend(regranted.into_iter().map(|grant| (resource.clone(), grant)));
                }
            }
        }

        Ok(())
    }

    // --- Scale-in ---

    /// Takes a container out of the running simulation.
    ///
    /// Its active resources are removed with their in-flight jobs, the requests owning
    /// those jobs are dropped together with their sessions, and the location is detached
    /// from every link. Calls still heading for it fall back to the relaxed link match.
    ///
    /// # Returns
    /// The number of jobs that were dropped.
    pub fn remove_container(&mut self, container: &ContainerId) -> Result<usize> {
        let dropped = self.registry.remove_container(container);
        self.registry.remove_location(container);
        self.removed_locations.insert(container.clone());

        let count = dropped.len();
        self.statistics.dropped_jobs += count as u64;
        log::warn!("t={} container '{}' removed, {} in-flight job(s) dropped.", self.clock.now(), container, count);

        for job in dropped {
            let reason = format!("{} was dropped with container '{}'", job.id, container);
            self.drop_request(RequestKey::from_requester(job.requester), &reason)?;
        }

        Ok(count)
    }
}

/// Checks that every system call of the usage model targets an operation the architecture provides.
fn check_system_calls(architecture: &dyn ArchitectureModel, usage: &UsageModel) -> Result<()> {
    for (id, action) in usage.actions() {
        if let ScenarioAction::SystemCall { component, signature, .. } = action {
            if architecture.operation(component, signature).is_none() {
                log::error!("System call '{}' targets unknown operation {}::{}", id, component, signature);
                return Err(ConfigurationError::UnknownOperation { component: component.to_string(), signature: signature.to_string() }.into());
            }
        }
    }

    Ok(())
}

impl TryFrom<SimulationDto> for SimulationEngine {
    type Error = Error;

    fn try_from(dto: SimulationDto) -> Result<Self> {
        let architecture = StaticArchitecture::try_from(dto.architecture)?;
        let usage = UsageModel::try_from(dto.usage_scenarios)?;
        check_system_calls(&architecture, &usage)?;

        SimulationEngine::new(Arc::new(architecture), usage, dto.simulation_end, dto.seed)
    }
}
