use std::sync::Arc;

use crate::domain::architecture::architecture_model::ServiceStep;
use crate::domain::request::call_over_wire::CallOverWireRequest;
use crate::domain::request::request_processing_context::ServiceFrame;
use crate::domain::resource::job::{Job, JobId};
use crate::domain::resource::passive_resource::AcquireOutcome;
use crate::domain::resource::resource::ActiveResourceKey;
use crate::domain::simulator::clock::SimTime;
use crate::domain::simulator::engine::SimulationEngine;
use crate::domain::simulator::event::SimulationEvent;
use crate::domain::simulator::session::RequestKey;
use crate::error::{ConfigurationError, Error, Result};

impl SimulationEngine {
    /// Interprets the service steps of a request until it has to wait on a resource,
    /// on the network, or until its outermost service returned.
    pub(super) fn progress_request(&mut self, key: RequestKey) -> Result<()> {
        let architecture = Arc::clone(&self.architecture);

        loop {
            let Some(request) = self.requests.get_mut(key) else {
                log::trace!("Progress of a request that no longer exists ignored ({:?}).", key);
                return Ok(());
            };

            let session = request.session;
            let interpretation = request.context.interpretation_mut();

            let Some(frame) = interpretation.current_mut() else {
                let now = self.clock.now();
                self.schedule(now, SimulationEvent::UserRequestFinished { request: key, session });
                return Ok(());
            };

            let operation = architecture.operation(&frame.component, &frame.signature).ok_or_else(|| ConfigurationError::UnknownOperation {
                component: frame.component.to_string(),
                signature: frame.signature.to_string(),
            })?;

            let index = frame.step;
            let Some(step) = operation.steps.get(index) else {
                interpretation.return_from_call();
                continue;
            };

            frame.step += 1;
            let location = frame.location.clone();

            match step {
                ServiceStep::Demand { resource_type, amount } => {
                    let resource_key = ActiveResourceKey::new(location.clone(), resource_type.clone());
                    if self.registry.active_by_key(&resource_key).is_none() {
                        if self.removed_locations.contains(&location) {
                            return self.drop_request(key, &format!("its demand targets removed container '{}'", location));
                        }
                        return Err(ConfigurationError::UnknownActiveResource { container: location.to_string(), resource_type: resource_type.to_string() }.into());
                    }

                    self.next_job += 1;
                    let job = Job::new(JobId(self.next_job), key.requester(), *amount, self.clock.now());
                    self.registry.submit_job(&resource_key, job)?;
                    self.schedule_resource_check(&resource_key);
                    return Ok(());
                }

                ServiceStep::Acquire { passive, amount } => match self.registry.acquire(passive, key.requester(), *amount)? {
                    AcquireOutcome::Granted => {
                        if let Some(request) = self.requests.get_mut(key) {
                            request.record_grant(passive, *amount);
                        }
                    }
                    AcquireOutcome::Queued => return Ok(()),
                },

                ServiceStep::Release { passive, amount } => {
                    let granted = self.registry.release(passive, *amount)?;
                    if let Some(request) = self.requests.get_mut(key) {
                        request.record_release(passive, *amount);
                    }
                    self.resume_granted(granted.into_iter().map(|grant| (passive.clone(), grant)).collect())?;
                }

                ServiceStep::Call { component, signature, payload_bytes } => {
                    let target = architecture.find_deployment_location(component).ok_or_else(|| ConfigurationError::UnallocatedComponent(component.to_string()))?;
                    let callee = ServiceFrame::new(component.clone(), signature.clone(), target.clone());

                    if target == location {
                        self.enter_service(key, callee)?;
                        continue;
                    }

                    let Some((user, user_request)) = self.requests.get(key).map(|request| (request.context.user(), request.context.request().clone())) else {
                        return Ok(());
                    };

                    let call = CallOverWireRequest::new(location, Some(target), Some(signature.clone()), Some(user), user_request)?;
                    let Some(delay) = self.wire_delay(&call, *payload_bytes) else {
                        return self.drop_request(key, &format!("no link connects '{}' and '{}'", call.from(), call.to()));
                    };

                    log::trace!("Call {} from '{}' to '{}' for {} takes {} on the wire.", call.id(), call.from(), call.to(), call.user(), delay);
                    self.statistics.remote_calls += 1;
                    self.enter_service(key, callee)?;

                    let arrival = self.clock.now() + delay;
                    self.schedule(arrival, SimulationEvent::RequestProgressed { request: key });
                    return Ok(());
                }
            }
        }
    }

    fn enter_service(&mut self, key: RequestKey, frame: ServiceFrame) -> Result<()> {
        let request = self.requests.get_mut(key).ok_or_else(|| Error::consistency(format!("Request {:?} vanished while entering {}", key, frame.signature)))?;
        request.context.interpretation_mut().call(frame);
        Ok(())
    }

    /// Network delay of a call: latency plus transfer time on the first exactly matching
    /// link, else on the first link touching either endpoint.
    ///
    /// # Returns
    /// `None` when no link touches the call's endpoints at all.
    pub(super) fn wire_delay(&mut self, call: &CallOverWireRequest, payload_bytes: f64) -> Option<SimTime> {
        let exact = self.registry.find_exact(call.from(), call.to());
        if let Some(link) = exact.first() {
            return Some(link.properties().transfer_delay(payload_bytes));
        }

        let relaxed = self.registry.find_relaxed(call.from(), call.to());
        let link = relaxed.first()?;

        log::warn!(
            "No link connects both '{}' and '{}', charging call {} on '{}' instead.",
            call.from(),
            call.to(),
            call.id(),
            link.resource().id
        );
        let delay = link.properties().transfer_delay(payload_bytes);
        self.statistics.relaxed_link_matches += 1;
        Some(delay)
    }

    /// Schedules the next completion check of an active resource under its current epoch.
    pub(super) fn schedule_resource_check(&mut self, key: &ActiveResourceKey) {
        let Some(resource) = self.registry.active_by_key(key) else {
            return;
        };
        let Some(completion) = resource.next_completion() else {
            return;
        };

        let epoch = resource.epoch();
        let at = completion.max(self.clock.now());
        self.schedule(at, SimulationEvent::ResourceCheck { key: key.clone(), epoch });
    }

    /// Hands the jobs an active resource completed by now back to their requests.
    pub(super) fn deliver_completions(&mut self, key: &ActiveResourceKey, epoch: u64) -> Result<()> {
        match self.registry.active_by_key(key) {
            None => {
                log::trace!("Completion check for removed resource {} ignored.", key);
                return Ok(());
            }
            Some(resource) if resource.epoch() != epoch => {
                log::trace!("Stale completion check for {} (epoch {} != {}).", key, epoch, resource.epoch());
                return Ok(());
            }
            Some(_) => {}
        }

        let now = self.clock.now();
        for job in self.registry.advance_resource(key, now)? {
            let request = RequestKey::from_requester(job.requester);
            if self.requests.contains_key(request) {
                self.schedule(now, SimulationEvent::RequestProgressed { request });
            } else {
                log::debug!("{} completed for a request that was dropped.", job.id);
            }
        }

        self.schedule_resource_check(key);
        Ok(())
    }
}
