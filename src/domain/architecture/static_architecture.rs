use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::api::simulation_dto::architecture_dto::{ArchitectureDto, ComponentDto, ServiceStepDto};
use crate::domain::architecture::architecture_model::{ArchitectureModel, OperationBehavior, ResourceDescriptor, ResourceDescriptorKind, ServiceStep};
use crate::domain::resource::scheduling_policy::SchedulingPolicy;
use crate::domain::utils::id::{ComponentId, ContainerId, LocationId, ResourceId, ResourceTypeId, RoleId, SignatureId};
use crate::error::{ConfigurationError, ConversionError, Error};

#[derive(Debug, Clone)]
pub struct Component {
    pub id: ComponentId,
    pub provided_role: RoleId,
    pub operations: HashMap<SignatureId, OperationBehavior>,
}

/// Architecture model held entirely in memory, built from the simulation description.
#[derive(Debug, Clone, Default)]
pub struct StaticArchitecture {
    containers: BTreeSet<ContainerId>,
    descriptors: BTreeMap<ResourceId, ResourceDescriptor>,
    components: HashMap<ComponentId, Component>,
    allocation: HashMap<ComponentId, LocationId>,
}

impl StaticArchitecture {
    pub fn containers(&self) -> &BTreeSet<ContainerId> {
        &self.containers
    }

    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    fn add_descriptor(&mut self, descriptor: ResourceDescriptor) -> Result<(), Error> {
        if descriptor.id.is_empty() {
            return Err(ConversionError::EmptyIdentifier("resource id").into());
        }
        if self.descriptors.contains_key(&descriptor.id) {
            return Err(ConfigurationError::DuplicateResource(descriptor.id.to_string()).into());
        }

        self.descriptors.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    fn has_active_resource(&self, container: &ContainerId, resource_type: &ResourceTypeId) -> bool {
        self.descriptors.values().any(|descriptor| {
            matches!(&descriptor.kind, ResourceDescriptorKind::Active { container: c, resource_type: t, .. } if c == container && t == resource_type)
        })
    }

    fn is_passive(&self, id: &ResourceId) -> bool {
        matches!(self.descriptors.get(id).map(|d| &d.kind), Some(ResourceDescriptorKind::Passive { .. }))
    }

    /// Checks that every step of every allocated component can be served.
    fn validate(&self) -> Result<(), ConfigurationError> {
        for component in self.components.values() {
            let location = self.allocation.get(&component.id).ok_or_else(|| ConfigurationError::UnallocatedComponent(component.id.to_string()))?;

            for operation in component.operations.values() {
                for step in &operation.steps {
                    match step {
                        ServiceStep::Demand { resource_type, amount } => {
                            if !amount.is_finite() || *amount < 0.0 {
                                return Err(ConfigurationError::InvalidDemand {
                                    resource: resource_type.to_string(),
                                    demand: *amount,
                                    policy: format!("{}::{}", component.id, operation.signature),
                                });
                            }
                            if !self.has_active_resource(location, resource_type) {
                                return Err(ConfigurationError::UnknownActiveResource {
                                    container: location.to_string(),
                                    resource_type: resource_type.to_string(),
                                });
                            }
                        }
                        ServiceStep::Acquire { passive, .. } | ServiceStep::Release { passive, .. } => {
                            if !self.is_passive(passive) {
                                return Err(ConfigurationError::UnknownResource(passive.to_string()));
                            }
                        }
                        ServiceStep::Call { component: callee, signature, .. } => {
                            if self.operation(callee, signature).is_none() {
                                return Err(ConfigurationError::UnknownOperation { component: callee.to_string(), signature: signature.to_string() });
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl ArchitectureModel for StaticArchitecture {
    fn describe_resource(&self, id: &ResourceId) -> Option<&ResourceDescriptor> {
        self.descriptors.get(id)
    }

    fn resource_descriptors(&self) -> Vec<&ResourceDescriptor> {
        self.descriptors.values().collect()
    }

    fn find_deployment_location(&self, component: &ComponentId) -> Option<LocationId> {
        self.allocation.get(component).cloned()
    }

    fn provided_role(&self, component: &ComponentId) -> Option<&RoleId> {
        self.components.get(component).map(|component| &component.provided_role)
    }

    fn operation(&self, component: &ComponentId, signature: &SignatureId) -> Option<&OperationBehavior> {
        self.components.get(component).and_then(|component| component.operations.get(signature))
    }
}

fn convert_step(dto: ServiceStepDto) -> ServiceStep {
    match dto {
        ServiceStepDto::Demand { resource_type, amount } => ServiceStep::Demand { resource_type: ResourceTypeId::new(resource_type), amount },
        ServiceStepDto::Acquire { passive_resource, amount } => ServiceStep::Acquire { passive: ResourceId::new(passive_resource), amount },
        ServiceStepDto::Release { passive_resource, amount } => ServiceStep::Release { passive: ResourceId::new(passive_resource), amount },
        ServiceStepDto::Call { component, signature, payload_bytes } => ServiceStep::Call {
            component: ComponentId::new(component),
            signature: SignatureId::new(signature),
            payload_bytes: payload_bytes.unwrap_or(0.0),
        },
    }
}

fn convert_component(dto: ComponentDto) -> Result<Component, Error> {
    if dto.id.trim().is_empty() {
        return Err(ConversionError::EmptyIdentifier("component id").into());
    }

    let mut operations = HashMap::new();
    for operation in dto.operations {
        let signature = SignatureId::new(operation.signature);
        if operations.contains_key(&signature) {
            return Err(ConversionError::DuplicateIdentifier(format!("{}::{}", dto.id, signature)).into());
        }

        let steps = operation.steps.into_iter().map(convert_step).collect();
        operations.insert(signature.clone(), OperationBehavior { signature, steps });
    }

    Ok(Component { id: ComponentId::new(dto.id), provided_role: RoleId::new(dto.provided_role), operations })
}

impl TryFrom<ArchitectureDto> for StaticArchitecture {
    type Error = Error;

    fn try_from(dto: ArchitectureDto) -> Result<Self, Self::Error> {
        let mut architecture = StaticArchitecture::default();

        // 1. Containers and the resources they host.
        for container in dto.resource_containers {
            if container.id.trim().is_empty() {
                return Err(ConversionError::EmptyIdentifier("container id").into());
            }

            let container_id = ContainerId::new(container.id);
            if !architecture.containers.insert(container_id.clone()) {
                return Err(ConversionError::DuplicateIdentifier(container_id.to_string()).into());
            }

            for active in container.active_resources {
                architecture.add_descriptor(ResourceDescriptor {
                    name: active.name.unwrap_or_else(|| active.id.clone()),
                    id: ResourceId::new(active.id),
                    capacity: active.capacity,
                    kind: ResourceDescriptorKind::Active {
                        container: container_id.clone(),
                        resource_type: ResourceTypeId::new(active.resource_type),
                        policy: SchedulingPolicy::from_policy_id(&active.scheduling_policy),
                    },
                })?;
            }

            for passive in container.passive_resources {
                architecture.add_descriptor(ResourceDescriptor {
                    name: passive.name.unwrap_or_else(|| passive.id.clone()),
                    id: ResourceId::new(passive.id),
                    capacity: passive.capacity,
                    kind: ResourceDescriptorKind::Passive { container: container_id.clone() },
                })?;
            }
        }

        // 2. Network links between containers.
        for link in dto.linking_resources {
            let locations: Vec<LocationId> = link.connects.into_iter().map(LocationId::new).collect();
            if let Some(unknown) = locations.iter().find(|location| !architecture.containers.contains(*location)) {
                return Err(ConversionError::InvalidValue { field: "connects", value: unknown.to_string() }.into());
            }

            architecture.add_descriptor(ResourceDescriptor {
                name: link.name.unwrap_or_else(|| link.id.clone()),
                id: ResourceId::new(link.id),
                capacity: None,
                kind: ResourceDescriptorKind::Linking { locations, latency: link.latency, throughput: link.throughput.unwrap_or(f64::INFINITY) },
            })?;
        }

        // 3. Components and their allocation.
        for component in dto.components {
            let component = convert_component(component)?;
            if architecture.components.contains_key(&component.id) {
                return Err(ConversionError::DuplicateIdentifier(component.id.to_string()).into());
            }
            architecture.components.insert(component.id.clone(), component);
        }

        for allocation in dto.allocation {
            let component = ComponentId::new(allocation.component);
            let container = ContainerId::new(allocation.container);

            if !architecture.components.contains_key(&component) {
                return Err(ConfigurationError::UnknownComponent(component.to_string()).into());
            }
            if !architecture.containers.contains(&container) {
                return Err(ConversionError::InvalidValue { field: "allocation.container", value: container.to_string() }.into());
            }
            architecture.allocation.insert(component, container);
        }

        architecture.validate()?;

        log::info!(
            "Architecture with {} container(s), {} resource(s) and {} component(s) loaded.",
            architecture.containers.len(),
            architecture.descriptors.len(),
            architecture.components.len()
        );

        Ok(architecture)
    }
}
