use perf_sim_core::domain::request::call_over_wire::CallOverWireRequest;
use perf_sim_core::domain::request::request_processing_context::UserRequest;
use perf_sim_core::domain::resource::linking_resource::{LinkProperties, LinkingResourceInstance};
use perf_sim_core::domain::resource::resource::{Capacity, Resource, ResourceInstance};
use perf_sim_core::domain::resource::resource_registry::ResourceRegistry;
use perf_sim_core::domain::utils::id::{ComponentId, LocationId, ResourceId, ScenarioId, SignatureId, UserId};
use perf_sim_core::error::{ConfigurationError, Error};

fn link(id: &str, locations: &[&str], latency: f64, throughput: f64) -> LinkingResourceInstance {
    let resource = Resource::new(ResourceId::new(id), id, Capacity::Unbounded).unwrap();
    let properties = LinkProperties::new(&resource, latency, throughput).unwrap();
    LinkingResourceInstance::new(resource, locations.iter().map(|location| LocationId::new(*location)), properties)
}

/// A - B - C chain with a second, faster link between A and B.
fn chain() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry.register_linking(link("link-bc", &["B", "C"], 2.0, 100.0)).unwrap();
    registry.register_linking(link("link-ab", &["A", "B"], 1.0, 100.0)).unwrap();
    registry.register(ResourceInstance::Linking(link("fiber-ab", &["A", "B"], 0.1, 1000.0))).unwrap();
    registry
}

fn ids(links: Vec<&LinkingResourceInstance>) -> Vec<String> {
    links.iter().map(|link| link.resource().id.to_string()).collect()
}

fn loc(id: &str) -> LocationId {
    LocationId::new(id)
}

#[test]
fn test_exact_match_requires_both_endpoints() {
    let registry = chain();

    assert_eq!(ids(registry.find_exact(&loc("A"), &loc("B"))), vec!["fiber-ab", "link-ab"]);
    assert_eq!(ids(registry.find_exact(&loc("B"), &loc("A"))), vec!["fiber-ab", "link-ab"]);
    assert!(registry.find_exact(&loc("A"), &loc("C")).is_empty());
}

#[test]
fn test_relaxed_match_accepts_either_endpoint() {
    let registry = chain();

    assert_eq!(ids(registry.find_relaxed(&loc("A"), &loc("C"))), vec!["fiber-ab", "link-ab", "link-bc"]);
    assert_eq!(ids(registry.find_relaxed(&loc("C"), &loc("Z"))), vec!["link-bc"]);
    assert!(registry.find_relaxed(&loc("Y"), &loc("Z")).is_empty());
}

#[test]
fn test_removed_location_only_matches_relaxed() {
    let mut registry = chain();

    assert_eq!(registry.remove_location(&loc("B")), 3);
    assert!(registry.linking_resources().all(|link| !link.connected_locations().contains(&loc("B"))));
    assert_eq!(registry.linking_resources().filter(|link| link.connected_locations().len() == 1).count(), 3);
    assert!(registry.find_exact(&loc("A"), &loc("B")).is_empty());
    assert!(registry.find_exact(&loc("B"), &loc("C")).is_empty());

    assert_eq!(ids(registry.find_relaxed(&loc("A"), &loc("B"))), vec!["fiber-ab", "link-ab"]);
    assert_eq!(ids(registry.find_relaxed(&loc("B"), &loc("C"))), vec!["link-bc"]);

    // Removing it twice touches nothing.
    assert_eq!(registry.remove_location(&loc("B")), 0);
}

#[test]
fn test_first_exact_link_determines_the_transfer_delay() {
    let registry = chain();

    let links = registry.find_exact(&loc("A"), &loc("B"));
    let delay = links[0].properties().transfer_delay(500.0);
    assert!((delay - 0.6).abs() < 1e-9);
}

#[test]
fn test_invalid_link_properties_are_rejected() {
    let resource = Resource::new(ResourceId::new("broken"), "broken", Capacity::Unbounded).unwrap();

    assert!(matches!(LinkProperties::new(&resource, -1.0, 10.0), Err(ConfigurationError::InvalidLinkProperties { .. })));
    assert!(matches!(LinkProperties::new(&resource, 0.0, 0.0), Err(ConfigurationError::InvalidLinkProperties { .. })));
}

#[test]
fn test_duplicate_link_id_is_rejected() {
    let mut registry = chain();

    let result = registry.register_linking(link("link-ab", &["A", "C"], 1.0, 1.0));
    assert!(matches!(result, Err(Error::Configuration(ConfigurationError::DuplicateResource(_)))));
}

#[test]
fn test_call_over_wire_is_routed_by_its_endpoints() {
    let registry = chain();
    let request = UserRequest::new(UserId(7), ScenarioId::new("browse"), ComponentId::new("frontend"), SignatureId::new("render"), 500.0);
    let call = CallOverWireRequest::new(loc("A"), Some(loc("C")), Some(SignatureId::new("query")), Some(UserId(7)), request).unwrap();

    assert!(registry.find_exact(call.from(), call.to()).is_empty());
    let fallback = registry.find_relaxed(call.from(), call.to());
    assert_eq!(fallback[0].resource().id, ResourceId::new("fiber-ab"));
    assert_eq!(call.request().payload_bytes, 500.0);
}
