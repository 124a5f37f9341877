use serde::Serialize;
use std::fmt;

use crate::domain::resource::active_resource::ActiveResourceInstance;
use crate::domain::resource::linking_resource::LinkingResourceInstance;
use crate::domain::resource::passive_resource::PassiveResourceInstance;
use crate::domain::utils::id::{ContainerId, ResourceId, ResourceTypeId};
use crate::error::ConfigurationError;

/// Number of units a resource offers at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Capacity {
    Bounded(u64),
    Unbounded,
}

impl Capacity {
    /// Builds a bounded capacity; zero is rejected, `None` means unbounded.
    pub fn from_units(resource: &ResourceId, units: Option<u64>) -> Result<Self, ConfigurationError> {
        match units {
            None => Ok(Capacity::Unbounded),
            Some(0) => Err(ConfigurationError::InvalidCapacity { resource: resource.to_string(), capacity: 0 }),
            Some(value) => Ok(Capacity::Bounded(value)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Capacity::Unbounded)
    }

    /// Returns the bounded value, or `None` for the unbounded sentinel.
    pub fn units(&self) -> Option<u64> {
        match self {
            Capacity::Bounded(value) => Some(*value),
            Capacity::Unbounded => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Capacity::Bounded(value) => *value as f64,
            Capacity::Unbounded => f64::INFINITY,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Bounded(value) => write!(f, "{}", value),
            Capacity::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Immutable description shared by every resource kind. Only `id` is identity.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub capacity: Capacity,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>, capacity: Capacity) -> Result<Self, ConfigurationError> {
        if id.is_empty() {
            return Err(ConfigurationError::UnknownResource(String::from("<empty id>")));
        }

        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyResourceName(id.to_string()));
        }

        Ok(Self { id, name, capacity })
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

/// Identity of an active resource: the container it lives in plus its resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActiveResourceKey {
    pub container_id: ContainerId,
    pub resource_type_id: ResourceTypeId,
}

impl ActiveResourceKey {
    pub fn new(container_id: ContainerId, resource_type_id: ResourceTypeId) -> Self {
        Self { container_id, resource_type_id }
    }
}

impl fmt::Display for ActiveResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container_id, self.resource_type_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Active,
    Passive,
    Linking,
}

/// Owned resource handed to the registry on registration.
#[derive(Debug)]
pub enum ResourceInstance {
    Active(ActiveResourceInstance),
    Passive(PassiveResourceInstance),
    Linking(LinkingResourceInstance),
}

impl ResourceInstance {
    pub fn resource(&self) -> &Resource {
        match self {
            ResourceInstance::Active(active) => active.resource(),
            ResourceInstance::Passive(passive) => passive.resource(),
            ResourceInstance::Linking(link) => link.resource(),
        }
    }
}

/// Borrowed view of a registered resource, tagged by kind.
#[derive(Debug, Clone, Copy)]
pub enum ResourceRef<'a> {
    Active(&'a ActiveResourceInstance),
    Passive(&'a PassiveResourceInstance),
    Linking(&'a LinkingResourceInstance),
}

impl<'a> ResourceRef<'a> {
    pub fn resource(&self) -> &'a Resource {
        match self {
            ResourceRef::Active(active) => active.resource(),
            ResourceRef::Passive(passive) => passive.resource(),
            ResourceRef::Linking(link) => link.resource(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::Active(_) => ResourceKind::Active,
            ResourceRef::Passive(_) => ResourceKind::Passive,
            ResourceRef::Linking(_) => ResourceKind::Linking,
        }
    }
}
