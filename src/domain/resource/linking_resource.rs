use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::resource::resource::Resource;
use crate::domain::simulator::clock::SimTime;
use crate::domain::utils::id::LocationId;
use crate::error::ConfigurationError;

/// Delay characteristics of a network link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkProperties {
    /// Fixed delay per transfer in time units.
    pub latency: f64,

    /// Bytes per time unit. `f64::INFINITY` models a link whose only cost is latency.
    pub throughput: f64,
}

impl LinkProperties {
    pub fn new(resource: &Resource, latency: f64, throughput: f64) -> Result<Self, ConfigurationError> {
        if !latency.is_finite() || latency < 0.0 || throughput.is_nan() || throughput <= 0.0 {
            return Err(ConfigurationError::InvalidLinkProperties { resource: resource.id.to_string(), latency, throughput });
        }

        Ok(Self { latency, throughput })
    }

    /// Time needed to move `payload_bytes` across the link.
    pub fn transfer_delay(&self, payload_bytes: f64) -> SimTime {
        self.latency + payload_bytes.max(0.0) / self.throughput
    }
}

/// A network link connecting a set of deployment locations (usually two).
#[derive(Debug, Clone)]
pub struct LinkingResourceInstance {
    resource: Resource,
    connected: BTreeSet<LocationId>,
    properties: LinkProperties,
}

impl LinkingResourceInstance {
    pub fn new(resource: Resource, connected: impl IntoIterator<Item = LocationId>, properties: LinkProperties) -> Self {
        Self { resource, connected: connected.into_iter().collect(), properties }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn properties(&self) -> &LinkProperties {
        &self.properties
    }

    pub fn connected_locations(&self) -> &BTreeSet<LocationId> {
        &self.connected
    }

    pub fn connects(&self, location: &LocationId) -> bool {
        self.connected.contains(location)
    }

    /// Detaches a location that left the topology. Returns true if it was connected.
    pub fn detach(&mut self, location: &LocationId) -> bool {
        self.connected.remove(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::resource::Capacity;
    use crate::domain::utils::id::ResourceId;

    fn link_resource() -> Resource {
        Resource::new(ResourceId::new("lan"), "LAN", Capacity::Unbounded).unwrap()
    }

    #[test]
    fn test_transfer_delay() {
        let properties = LinkProperties::new(&link_resource(), 0.5, 100.0).unwrap();
        assert!((properties.transfer_delay(200.0) - 2.5).abs() < 1e-12);
        assert!((properties.transfer_delay(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_properties_are_rejected() {
        assert!(LinkProperties::new(&link_resource(), -1.0, 10.0).is_err());
        assert!(LinkProperties::new(&link_resource(), 1.0, 0.0).is_err());
        assert!(LinkProperties::new(&link_resource(), 1.0, f64::INFINITY).is_ok());
    }

    #[test]
    fn test_detach_location() {
        let properties = LinkProperties::new(&link_resource(), 0.0, 1.0).unwrap();
        let mut link = LinkingResourceInstance::new(link_resource(), [LocationId::new("A"), LocationId::new("B")], properties);

        assert!(link.detach(&LocationId::new("B")));
        assert!(!link.detach(&LocationId::new("B")));
        assert!(link.connects(&LocationId::new("A")));
    }
}
