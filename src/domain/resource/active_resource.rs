use crate::domain::resource::job::{Job, JobId};
use crate::domain::resource::resource::{ActiveResourceKey, Resource};
use crate::domain::resource::scheduling_policy::SchedulingPolicy;
use crate::domain::simulator::clock::{SimTime, TIME_EPSILON};
use crate::error::{ConfigurationError, Error, Result};

/// Remaining work (relative to the job's demand) below which a shared job counts as done.
const WORK_EPSILON: f64 = 1e-9;

/// How jobs are actually served, after capacity and policy are taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discipline {
    Fcfs,
    Shared,
    Delay,
}

/// Job with a completion time that is fixed once it was submitted.
#[derive(Debug, Clone)]
struct ScheduledJob {
    job: Job,
    sequence: u64,
}

impl ScheduledJob {
    fn completion(&self) -> SimTime {
        self.job.completion.unwrap_or(f64::INFINITY)
    }
}

/// Job progressing under processor sharing; its completion moves whenever the active set changes.
#[derive(Debug, Clone)]
struct SharedJob {
    job: Job,
    remaining: f64,
    sequence: u64,
}

/// Live state of one active resource (CPU, disk, ...) and its in-flight jobs.
///
/// The instance keeps a local clock. Every submission and every call to [`advance`]
/// moves that clock forward; going backwards is a consistency violation.
///
/// * **FCFS**: `capacity` identical servers, each job takes the server that frees up
///   first, in arrival order. Completion times are fixed at submission.
/// * **ProcessorSharing**: all jobs progress at `capacity / n`. Completion times are
///   projections that change whenever a job arrives or leaves; [`epoch`] is bumped on
///   every such change so that stale completion events can be recognised.
/// * **Delay** and **Default**: completion is `arrival + demand`.
///
/// An unbounded resource never queues and is served like `Delay`. A job with zero
/// demand completes at its arrival time under every policy.
///
/// [`advance`]: ActiveResourceInstance::advance
/// [`epoch`]: ActiveResourceInstance::epoch
#[derive(Debug)]
pub struct ActiveResourceInstance {
    resource: Resource,
    key: ActiveResourceKey,
    policy: SchedulingPolicy,

    scheduled: Vec<ScheduledJob>,
    shared: Vec<SharedJob>,

    /// Time each busy FCFS server becomes free. Never longer than the capacity.
    server_free_at: Vec<SimTime>,

    clock: SimTime,
    next_sequence: u64,
    epoch: u64,
    completed_jobs: u64,
}

impl ActiveResourceInstance {
    pub fn new(resource: Resource, key: ActiveResourceKey, policy: SchedulingPolicy) -> Self {
        Self {
            resource,
            key,
            policy,
            scheduled: Vec::new(),
            shared: Vec::new(),
            server_free_at: Vec::new(),
            clock: 0.0,
            next_sequence: 0,
            epoch: 0,
            completed_jobs: 0,
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn key(&self) -> &ActiveResourceKey {
        &self.key
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Local time up to which the resource state has been computed.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Changes whenever the projected completions may have changed.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn completed_jobs(&self) -> u64 {
        self.completed_jobs
    }

    pub fn in_flight_jobs(&self) -> usize {
        self.scheduled.len() + self.shared.len()
    }

    /// Work still owed to processor-sharing jobs.
    pub fn outstanding_shared_work(&self) -> f64 {
        self.shared.iter().map(|job| job.remaining).sum()
    }

    fn discipline(&self) -> Discipline {
        if self.resource.capacity.is_unbounded() {
            return Discipline::Delay;
        }

        match self.policy {
            SchedulingPolicy::Fcfs => Discipline::Fcfs,
            SchedulingPolicy::ProcessorSharing => Discipline::Shared,
            SchedulingPolicy::Delay | SchedulingPolicy::Default => Discipline::Delay,
        }
    }

    /// Submits a job and returns its (projected) completion time.
    ///
    /// For processor sharing the returned time is valid only as long as no other job
    /// arrives or leaves; use [`projected_completion`](Self::projected_completion) afterwards.
    pub fn submit(&mut self, job: Job) -> Result<SimTime> {
        if !job.demand.is_finite() || job.demand < 0.0 {
            return Err(ConfigurationError::InvalidDemand {
                resource: self.resource.id.to_string(),
                demand: job.demand,
                policy: self.policy.to_string(),
            }
            .into());
        }

        if !job.arrival.is_finite() || job.arrival + TIME_EPSILON < self.clock {
            return Err(Error::consistency(format!(
                "{} arrived at {} on resource '{}' whose clock is already at {}",
                job.id, job.arrival, self.resource.id, self.clock
            )));
        }

        self.progress_shared(job.arrival);

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.epoch += 1;

        if job.demand == 0.0 {
            let completion = job.arrival;
            return Ok(self.schedule_fixed(job, completion, sequence));
        }

        match self.discipline() {
            Discipline::Delay => {
                let completion = job.arrival + job.demand;
                Ok(self.schedule_fixed(job, completion, sequence))
            }
            Discipline::Fcfs => {
                let completion = self.claim_server(job.arrival, job.demand);
                Ok(self.schedule_fixed(job, completion, sequence))
            }
            Discipline::Shared => {
                let job_id = job.id;
                let remaining = job.demand;
                self.shared.push(SharedJob { job, remaining, sequence });

                self.projected_completion(job_id)
                    .ok_or_else(|| Error::consistency(format!("{} vanished from resource '{}' right after submission", job_id, self.resource.id)))
            }
        }
    }

    /// Moves the resource clock to `now` and returns every job completed by then,
    /// ordered by completion time and, for ties, by submission order.
    pub fn advance(&mut self, now: SimTime) -> Result<Vec<Job>> {
        if now + TIME_EPSILON < self.clock {
            return Err(Error::consistency(format!("Resource '{}' asked to advance back to {} from {}", self.resource.id, now, self.clock)));
        }

        self.progress_shared(now);

        let horizon = now + TIME_EPSILON;
        let (mut due, pending): (Vec<ScheduledJob>, Vec<ScheduledJob>) = self.scheduled.drain(..).partition(|job| job.completion() <= horizon);
        self.scheduled = pending;

        due.sort_by(|a, b| a.completion().total_cmp(&b.completion()).then(a.sequence.cmp(&b.sequence)));

        if !due.is_empty() {
            self.epoch += 1;
            self.completed_jobs += due.len() as u64;
        }

        Ok(due.into_iter().map(|scheduled| scheduled.job).collect())
    }

    /// Earliest time at which some in-flight job completes, if any.
    pub fn next_completion(&self) -> Option<SimTime> {
        let fixed = self.scheduled.iter().map(ScheduledJob::completion).fold(None, |acc: Option<SimTime>, t| Some(acc.map_or(t, |a| a.min(t))));
        let shared = self.shared_projection().first().map(|(_, t)| *t);

        match (fixed, shared) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Projected completion of every in-flight job, earliest first.
    pub fn projected_completions(&self) -> Vec<(JobId, SimTime)> {
        let mut projection: Vec<(JobId, SimTime)> = self.scheduled.iter().map(|job| (job.job.id, job.completion())).collect();
        projection.extend(self.shared_projection());
        projection.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        projection
    }

    pub fn projected_completion(&self, job_id: JobId) -> Option<SimTime> {
        if let Some(job) = self.scheduled.iter().find(|job| job.job.id == job_id) {
            return Some(job.completion());
        }

        self.shared_projection().into_iter().find(|(id, _)| *id == job_id).map(|(_, t)| t)
    }

    /// Discards every in-flight job. Returns how many were dropped.
    pub fn clear_jobs(&mut self) -> usize {
        let dropped = self.in_flight_jobs();
        self.scheduled.clear();
        self.shared.clear();
        self.server_free_at.clear();
        self.epoch += 1;
        dropped
    }

    /// Removes and returns every in-flight job, uncompleted.
    pub fn drain_jobs(&mut self) -> Vec<Job> {
        let mut jobs: Vec<(u64, Job)> = self.scheduled.drain(..).map(|s| (s.sequence, s.job)).collect();
        jobs.extend(self.shared.drain(..).map(|s| (s.sequence, s.job)));
        jobs.sort_by_key(|(sequence, _)| *sequence);

        self.server_free_at.clear();
        self.epoch += 1;

        jobs.into_iter()
            .map(|(_, mut job)| {
                job.completion = None;
                job
            })
            .collect()
    }

    fn schedule_fixed(&mut self, mut job: Job, completion: SimTime, sequence: u64) -> SimTime {
        job.completion = Some(completion);
        self.scheduled.push(ScheduledJob { job, sequence });
        completion
    }

    /// Assigns the job to the FCFS server that becomes free first.
    fn claim_server(&mut self, arrival: SimTime, demand: f64) -> SimTime {
        let servers = self.resource.capacity.units().map(|units| usize::try_from(units).unwrap_or(usize::MAX)).unwrap_or(usize::MAX);

        let earliest = self.server_free_at.iter().copied().enumerate().min_by(|a, b| a.1.total_cmp(&b.1));

        match earliest {
            Some((index, free_at)) if free_at <= arrival || self.server_free_at.len() >= servers => {
                let completion = free_at.max(arrival) + demand;
                self.server_free_at[index] = completion;
                completion
            }
            _ => {
                let completion = arrival + demand;
                self.server_free_at.push(completion);
                completion
            }
        }
    }

    /// Delivers processor-sharing work up to `until`, retiring jobs as they finish.
    fn progress_shared(&mut self, until: SimTime) {
        if until <= self.clock {
            return;
        }

        let capacity = self.resource.capacity.as_f64();
        let mut now = self.clock;

        while !self.shared.is_empty() {
            let rate = capacity / self.shared.len() as f64;
            let min_remaining = self.shared.iter().map(|job| job.remaining).fold(f64::INFINITY, f64::min);
            let finish = now + min_remaining / rate;

            if finish > until + TIME_EPSILON {
                let work = (until - now) * rate;
                for job in &mut self.shared {
                    job.remaining -= work;
                }
                now = until;
                break;
            }

            for job in &mut self.shared {
                job.remaining -= min_remaining;
            }
            now = finish;
            self.retire_shared(finish);
        }

        self.clock = now.max(until);
    }

    fn retire_shared(&mut self, at: SimTime) {
        let (done, active): (Vec<SharedJob>, Vec<SharedJob>) =
            self.shared.drain(..).partition(|job| job.remaining <= WORK_EPSILON * job.job.demand.max(1.0));
        self.shared = active;

        for SharedJob { mut job, sequence, .. } in done {
            log::trace!("{} finished on shared resource '{}' at {}", job.id, self.resource.id, at);
            job.completion = Some(at);
            self.scheduled.push(ScheduledJob { job, sequence });
        }
    }

    /// Completion order under the current active set: least remaining work first.
    fn shared_projection(&self) -> Vec<(JobId, SimTime)> {
        let capacity = self.resource.capacity.as_f64();

        let mut order: Vec<&SharedJob> = self.shared.iter().collect();
        order.sort_by(|a, b| a.remaining.total_cmp(&b.remaining).then(a.sequence.cmp(&b.sequence)));

        let mut active = order.len();
        let mut now = self.clock;
        let mut delivered = 0.0_f64;
        let mut projection = Vec::with_capacity(active);

        for job in order {
            let delta = (job.remaining - delivered).max(0.0);
            now += delta * active as f64 / capacity;
            delivered = delivered.max(job.remaining);
            active -= 1;
            projection.push((job.job.id, now));
        }

        projection
    }
}
