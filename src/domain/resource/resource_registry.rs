use std::collections::HashMap;

use slotmap::{SlotMap, new_key_type};

use crate::domain::architecture::architecture_model::ArchitectureModel;
use crate::domain::resource::active_resource::ActiveResourceInstance;
use crate::domain::resource::job::{Job, RequesterId};
use crate::domain::resource::linking_resource::LinkingResourceInstance;
use crate::domain::resource::linking_resource_matcher::LinkingResourceMatcher;
use crate::domain::resource::passive_resource::{AcquireOutcome, AcquireRequest, PassiveResourceInstance};
use crate::domain::resource::resource::{ActiveResourceKey, ResourceInstance, ResourceKind, ResourceRef};
use crate::domain::simulator::clock::SimTime;
use crate::domain::utils::id::{ContainerId, LocationId, ResourceId, ResourceTypeId};
use crate::error::{ConfigurationError, Error, Result};

new_key_type! {
    pub struct ActiveSlot;
    pub struct PassiveSlot;
    pub struct LinkingSlot;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceSlot {
    Active(ActiveSlot),
    Passive(PassiveSlot),
    Linking(LinkingSlot),
}

/// What a removal took out of the simulation.
#[derive(Debug)]
pub enum RemovedResource {
    Active { instance: ActiveResourceInstance, dropped_jobs: Vec<Job> },
    Passive { instance: PassiveResourceInstance, dropped_waiters: Vec<AcquireRequest> },
    Linking(LinkingResourceInstance),
}

/// Owns the live state of every resource of one simulation run.
///
/// Resources are stored per kind and indexed by [`ResourceId`]; active resources are
/// additionally indexed by their [`ActiveResourceKey`]. The registry is the only writer
/// of job and queue state.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    active: SlotMap<ActiveSlot, ActiveResourceInstance>,
    passive: SlotMap<PassiveSlot, PassiveResourceInstance>,
    linking: SlotMap<LinkingSlot, LinkingResourceInstance>,

    /// Index lookup for every kind by resource id.
    id_index: HashMap<ResourceId, ResourceSlot>,

    /// Index lookup for active resources by (container, resource type).
    key_index: HashMap<ActiveResourceKey, ActiveSlot>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates one live resource per descriptor of the architecture.
    pub fn from_architecture(architecture: &dyn ArchitectureModel) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in architecture.resource_descriptors() {
            registry.register(descriptor.instantiate()?)?;
        }

        log::info!(
            "Resource registry built: {} active, {} passive, {} linking resource(s).",
            registry.active.len(),
            registry.passive.len(),
            registry.linking.len()
        );
        Ok(registry)
    }

    //-------------------------
    // --- Registration ---
    //-------------------------
    pub fn register(&mut self, instance: ResourceInstance) -> Result<()> {
        let id = instance.resource().id.clone();
        if self.id_index.contains_key(&id) {
            return Err(ConfigurationError::DuplicateResource(id.to_string()).into());
        }

        let slot = match instance {
            ResourceInstance::Active(active) => {
                let key = active.key().clone();
                if self.key_index.contains_key(&key) {
                    return Err(ConfigurationError::DuplicateResource(key.to_string()).into());
                }
                let slot = self.active.insert(active);
                self.key_index.insert(key, slot);
                ResourceSlot::Active(slot)
            }
            ResourceInstance::Passive(passive) => ResourceSlot::Passive(self.passive.insert(passive)),
            ResourceInstance::Linking(link) => ResourceSlot::Linking(self.linking.insert(link)),
        };

        log::debug!("Registered resource '{}' ({:?}).", id, slot);
        self.id_index.insert(id, slot);
        Ok(())
    }

    pub fn register_active(&mut self, instance: ActiveResourceInstance) -> Result<()> {
        self.register(ResourceInstance::Active(instance))
    }

    pub fn register_passive(&mut self, instance: PassiveResourceInstance) -> Result<()> {
        self.register(ResourceInstance::Passive(instance))
    }

    pub fn register_linking(&mut self, instance: LinkingResourceInstance) -> Result<()> {
        self.register(ResourceInstance::Linking(instance))
    }

    //-------------------------
    // --- Lookup ---
    //-------------------------
    pub fn lookup(&self, id: &ResourceId) -> Option<ResourceRef<'_>> {
        match *self.id_index.get(id)? {
            ResourceSlot::Active(slot) => self.active.get(slot).map(ResourceRef::Active),
            ResourceSlot::Passive(slot) => self.passive.get(slot).map(ResourceRef::Passive),
            ResourceSlot::Linking(slot) => self.linking.get(slot).map(ResourceRef::Linking),
        }
    }

    pub fn lookup_by_compound_key(&self, container_id: &ContainerId, resource_type_id: &ResourceTypeId) -> Option<&ActiveResourceInstance> {
        let key = ActiveResourceKey::new(container_id.clone(), resource_type_id.clone());
        self.active_by_key(&key)
    }

    pub fn active_by_key(&self, key: &ActiveResourceKey) -> Option<&ActiveResourceInstance> {
        self.key_index.get(key).and_then(|slot| self.active.get(*slot))
    }

    pub fn active_resources(&self) -> impl Iterator<Item = &ActiveResourceInstance> {
        self.active.values()
    }

    pub fn passive_resources(&self) -> impl Iterator<Item = &PassiveResourceInstance> {
        self.passive.values()
    }

    pub fn linking_resources(&self) -> impl Iterator<Item = &LinkingResourceInstance> {
        self.linking.values()
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    //-------------------------
    // --- Active Resources ---
    //-------------------------
    fn active_mut(&mut self, key: &ActiveResourceKey) -> Result<&mut ActiveResourceInstance> {
        let slot = self.key_index.get(key).copied().ok_or_else(|| ConfigurationError::UnknownActiveResource {
            container: key.container_id.to_string(),
            resource_type: key.resource_type_id.to_string(),
        })?;

        self.active
            .get_mut(slot)
            .ok_or_else(|| Error::consistency(format!("Active resource {} is indexed but no longer owned by the registry", key)))
    }

    /// Submits a job to the active resource identified by `key`.
    ///
    /// # Returns
    /// The completion time of the job as projected right now.
    pub fn submit_job(&mut self, key: &ActiveResourceKey, job: Job) -> Result<SimTime> {
        let resource = self.active_mut(key)?;
        let completion = resource.submit(job)?;
        log::trace!("Job submitted to {} ({}), projected completion {}", key, resource.policy(), completion);
        Ok(completion)
    }

    /// Advances one active resource to `now` and returns the jobs it completed.
    pub fn advance_resource(&mut self, key: &ActiveResourceKey, now: SimTime) -> Result<Vec<Job>> {
        self.active_mut(key)?.advance(now)
    }

    //-------------------------
    // --- Passive Resources ---
    //-------------------------
    fn passive_mut(&mut self, id: &ResourceId) -> Result<&mut PassiveResourceInstance> {
        match self.id_index.get(id).copied() {
            None => Err(ConfigurationError::UnknownResource(id.to_string()).into()),
            Some(ResourceSlot::Passive(slot)) => self
                .passive
                .get_mut(slot)
                .ok_or_else(|| Error::consistency(format!("Passive resource '{}' is indexed but no longer owned by the registry", id))),
            Some(other) => Err(Error::consistency(format!("Resource '{}' is not a passive resource ({:?})", id, other))),
        }
    }

    pub fn acquire(&mut self, id: &ResourceId, requester: RequesterId, amount: u64) -> Result<AcquireOutcome> {
        self.passive_mut(id)?.acquire(requester, amount)
    }

    pub fn release(&mut self, id: &ResourceId, amount: u64) -> Result<Vec<AcquireRequest>> {
        self.passive_mut(id)?.release(amount)
    }

    /// Withdraws `requester` from every passive queue. Returns requests granted as a result.
    pub fn cancel_waiting(&mut self, requester: RequesterId) -> Result<Vec<(ResourceId, AcquireRequest)>> {
        let mut granted = Vec::new();

        for passive in self.passive.values_mut() {
            let id = passive.resource().id.clone();
            granted.extend(passive.cancel_waiting(requester)?.into_iter().map(|request| (id.clone(), request)));
        }

        Ok(granted)
    }

    //-------------------------
    // --- Linking Resources ---
    //-------------------------
    pub fn linking_matcher(&self) -> LinkingResourceMatcher<'_> {
        LinkingResourceMatcher::new(self)
    }

    pub fn find_exact(&self, from: &LocationId, to: &LocationId) -> Vec<&LinkingResourceInstance> {
        self.linking_matcher().find_exact(from, to)
    }

    pub fn find_relaxed(&self, from: &LocationId, to: &LocationId) -> Vec<&LinkingResourceInstance> {
        self.linking_matcher().find_relaxed(from, to)
    }

    /// Detaches a deployment location from every link. Returns how many links were touched.
    pub fn remove_location(&mut self, location: &LocationId) -> usize {
        let touched = self.linking.values_mut().filter_map(|link| link.detach(location).then_some(())).count();
        log::info!("Location '{}' removed from topology, {} link(s) affected.", location, touched);
        touched
    }

    //-------------------------
    // --- Teardown & Removal ---
    //-------------------------

    /// Drops every in-flight job and every queued acquisition in all tables.
    ///
    /// Meant for simulation teardown only. Never fails and can be called repeatedly.
    pub fn clear_all_jobs(&mut self) {
        let dropped_jobs: usize = self.active.values_mut().map(ActiveResourceInstance::clear_jobs).sum();
        let dropped_waiters: usize = self.passive.values_mut().map(PassiveResourceInstance::clear).sum();

        if dropped_jobs + dropped_waiters > 0 {
            log::warn!("Teardown discarded {} in-flight job(s) and {} waiting acquisition(s).", dropped_jobs, dropped_waiters);
        }
    }

    /// Removes a resource mid-run, handing back whatever it still held.
    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<RemovedResource> {
        let removed = match self.id_index.remove(id)? {
            ResourceSlot::Active(slot) => {
                let mut instance = self.active.remove(slot)?;
                self.key_index.remove(instance.key());
                let dropped_jobs = instance.drain_jobs();
                RemovedResource::Active { instance, dropped_jobs }
            }
            ResourceSlot::Passive(slot) => {
                let mut instance = self.passive.remove(slot)?;
                let dropped_waiters = instance.waiting().cloned().collect();
                instance.clear();
                RemovedResource::Passive { instance, dropped_waiters }
            }
            ResourceSlot::Linking(slot) => RemovedResource::Linking(self.linking.remove(slot)?),
        };

        log::warn!("Resource '{}' removed from the registry.", id);
        Some(removed)
    }

    /// Removes every active resource hosted by `container`. Returns the jobs they dropped.
    pub fn remove_container(&mut self, container: &ContainerId) -> Vec<Job> {
        let ids: Vec<ResourceId> = self.active.values().filter(|active| &active.key().container_id == container).map(|active| active.resource().id.clone()).collect();

        let mut dropped = Vec::new();
        for id in ids {
            if let Some(RemovedResource::Active { dropped_jobs, .. }) = self.remove_resource(&id) {
                dropped.extend(dropped_jobs);
            }
        }

        dropped
    }

    pub fn kind_of(&self, id: &ResourceId) -> Option<ResourceKind> {
        self.lookup(id).map(|resource| resource.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::job::JobId;
    use crate::domain::resource::linking_resource::LinkProperties;
    use crate::domain::resource::resource::{Capacity, Resource};
    use crate::domain::resource::scheduling_policy::SchedulingPolicy;

    fn cpu(container: &str) -> ResourceInstance {
        let resource = Resource::new(ResourceId::new(format!("{}-cpu", container)), "CPU", Capacity::Bounded(1)).unwrap();
        let key = ActiveResourceKey::new(ContainerId::new(container), ResourceTypeId::new("CPU"));
        ResourceInstance::Active(ActiveResourceInstance::new(resource, key, SchedulingPolicy::Fcfs))
    }

    fn pool(id: &str, capacity: u64) -> ResourceInstance {
        let resource = Resource::new(ResourceId::new(id), id, Capacity::Bounded(capacity)).unwrap();
        ResourceInstance::Passive(PassiveResourceInstance::new(resource))
    }

    fn link(id: &str, locations: &[&str]) -> ResourceInstance {
        let resource = Resource::new(ResourceId::new(id), id, Capacity::Unbounded).unwrap();
        let properties = LinkProperties::new(&resource, 1.0, 10.0).unwrap();
        ResourceInstance::Linking(LinkingResourceInstance::new(resource, locations.iter().map(|l| LocationId::new(*l)), properties))
    }

    #[test]
    fn test_lookup_by_id_and_compound_key() {
        let mut registry = ResourceRegistry::new();
        registry.register(cpu("A")).unwrap();
        registry.register(pool("db-pool", 2)).unwrap();

        assert_eq!(registry.kind_of(&ResourceId::new("A-cpu")), Some(ResourceKind::Active));
        assert_eq!(registry.kind_of(&ResourceId::new("db-pool")), Some(ResourceKind::Passive));
        assert!(registry.lookup(&ResourceId::new("missing")).is_none());

        let found = registry.lookup_by_compound_key(&ContainerId::new("A"), &ResourceTypeId::new("CPU")).unwrap();
        assert_eq!(found.resource().id, ResourceId::new("A-cpu"));
        assert!(registry.lookup_by_compound_key(&ContainerId::new("B"), &ResourceTypeId::new("CPU")).is_none());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = ResourceRegistry::new();
        registry.register(cpu("A")).unwrap();

        let result = registry.register(cpu("A"));
        assert!(matches!(result, Err(Error::Configuration(ConfigurationError::DuplicateResource(_)))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_submit_to_unknown_resource_is_configuration_error() {
        let mut registry = ResourceRegistry::new();
        let key = ActiveResourceKey::new(ContainerId::new("X"), ResourceTypeId::new("CPU"));

        let result = registry.submit_job(&key, Job::new(JobId(1), RequesterId(1), 1.0, 0.0));
        assert!(matches!(result, Err(Error::Configuration(ConfigurationError::UnknownActiveResource { .. }))));
    }

    #[test]
    fn test_acquire_on_non_passive_resource_is_consistency_violation() {
        let mut registry = ResourceRegistry::new();
        registry.register(cpu("A")).unwrap();

        let result = registry.acquire(&ResourceId::new("A-cpu"), RequesterId(1), 1);
        assert!(result.unwrap_err().is_consistency_violation());

        let result = registry.acquire(&ResourceId::new("nope"), RequesterId(1), 1);
        assert!(matches!(result, Err(Error::Configuration(ConfigurationError::UnknownResource(_)))));
    }

    #[test]
    fn test_clear_all_jobs_is_idempotent() {
        let mut registry = ResourceRegistry::new();
        registry.register(cpu("A")).unwrap();
        registry.register(pool("db-pool", 1)).unwrap();

        let key = ActiveResourceKey::new(ContainerId::new("A"), ResourceTypeId::new("CPU"));
        registry.submit_job(&key, Job::new(JobId(1), RequesterId(1), 5.0, 0.0)).unwrap();
        registry.submit_job(&key, Job::new(JobId(2), RequesterId(2), 5.0, 1.0)).unwrap();
        registry.acquire(&ResourceId::new("db-pool"), RequesterId(1), 1).unwrap();
        registry.acquire(&ResourceId::new("db-pool"), RequesterId(2), 1).unwrap();

        registry.clear_all_jobs();
        assert!(registry.active_resources().all(|r| r.in_flight_jobs() == 0));
        assert!(registry.passive_resources().all(|p| p.queue_length() == 0 && p.currently_available() == Some(1)));

        registry.clear_all_jobs();
        assert!(registry.active_resources().all(|r| r.in_flight_jobs() == 0));
    }

    #[test]
    fn test_remove_container_drops_jobs() {
        let mut registry = ResourceRegistry::new();
        registry.register(cpu("A")).unwrap();
        registry.register(cpu("B")).unwrap();

        let key = ActiveResourceKey::new(ContainerId::new("A"), ResourceTypeId::new("CPU"));
        registry.submit_job(&key, Job::new(JobId(7), RequesterId(3), 5.0, 0.0)).unwrap();

        let dropped = registry.remove_container(&ContainerId::new("A"));
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, JobId(7));
        assert!(registry.lookup(&ResourceId::new("A-cpu")).is_none());
        assert!(registry.active_by_key(&key).is_none());
        assert!(registry.lookup(&ResourceId::new("B-cpu")).is_some());
    }

    #[test]
    fn test_remove_location_detaches_links() {
        let mut registry = ResourceRegistry::new();
        registry.register(link("ab", &["A", "B"])).unwrap();
        registry.register(link("bc", &["B", "C"])).unwrap();
        registry.register(link("cd", &["C", "D"])).unwrap();

        assert_eq!(registry.remove_location(&LocationId::new("B")), 2);
        assert!(registry.linking_resources().all(|l| !l.connects(&LocationId::new("B"))));
    }
}
