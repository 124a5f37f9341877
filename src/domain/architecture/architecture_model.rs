use crate::domain::resource::active_resource::ActiveResourceInstance;
use crate::domain::resource::linking_resource::{LinkProperties, LinkingResourceInstance};
use crate::domain::resource::passive_resource::PassiveResourceInstance;
use crate::domain::resource::resource::{ActiveResourceKey, Capacity, Resource, ResourceInstance};
use crate::domain::resource::scheduling_policy::SchedulingPolicy;
use crate::domain::utils::id::{ComponentId, ContainerId, LocationId, ResourceId, ResourceTypeId, RoleId, SignatureId};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptorKind {
    Active { container: ContainerId, resource_type: ResourceTypeId, policy: SchedulingPolicy },
    Passive { container: ContainerId },
    Linking { locations: Vec<LocationId>, latency: f64, throughput: f64 },
}

/// Static description of a resource as found in the architecture model.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub name: String,
    pub capacity: Option<u64>,
    pub kind: ResourceDescriptorKind,
}

impl ResourceDescriptor {
    /// Creates the live, empty resource instance described by this descriptor.
    pub fn instantiate(&self) -> Result<ResourceInstance, ConfigurationError> {
        let capacity = Capacity::from_units(&self.id, self.capacity)?;
        let resource = Resource::new(self.id.clone(), self.name.clone(), capacity)?;

        let instance = match &self.kind {
            ResourceDescriptorKind::Active { container, resource_type, policy } => {
                let key = ActiveResourceKey::new(container.clone(), resource_type.clone());
                ResourceInstance::Active(ActiveResourceInstance::new(resource, key, *policy))
            }
            ResourceDescriptorKind::Passive { .. } => ResourceInstance::Passive(PassiveResourceInstance::new(resource)),
            ResourceDescriptorKind::Linking { locations, latency, throughput } => {
                let properties = LinkProperties::new(&resource, *latency, *throughput)?;
                ResourceInstance::Linking(LinkingResourceInstance::new(resource, locations.iter().cloned(), properties))
            }
        };

        Ok(instance)
    }
}

/// One step of a provided operation's behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceStep {
    /// Work for the active resource of this type in the hosting container.
    Demand { resource_type: ResourceTypeId, amount: f64 },
    Acquire { passive: ResourceId, amount: u64 },
    Release { passive: ResourceId, amount: u64 },
    /// Synchronous call to another component.
    Call { component: ComponentId, signature: SignatureId, payload_bytes: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationBehavior {
    pub signature: SignatureId,
    pub steps: Vec<ServiceStep>,
}

/// Read-only access to the deployed architecture.
pub trait ArchitectureModel: std::fmt::Debug {
    fn describe_resource(&self, id: &ResourceId) -> Option<&ResourceDescriptor>;

    /// All resource descriptors, ordered by id.
    fn resource_descriptors(&self) -> Vec<&ResourceDescriptor>;

    /// The resource container hosting `component`.
    fn find_deployment_location(&self, component: &ComponentId) -> Option<LocationId>;

    fn provided_role(&self, component: &ComponentId) -> Option<&RoleId>;

    fn operation(&self, component: &ComponentId, signature: &SignatureId) -> Option<&OperationBehavior>;
}
