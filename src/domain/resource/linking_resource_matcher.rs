use crate::domain::resource::linking_resource::LinkingResourceInstance;
use crate::domain::resource::resource_registry::ResourceRegistry;
use crate::domain::utils::id::LocationId;

/// Read-only queries for the links between two deployment locations.
///
/// Results are sorted by resource id so that picking "the first link" is reproducible.
/// No match is a valid answer and yields an empty list.
#[derive(Debug, Clone, Copy)]
pub struct LinkingResourceMatcher<'a> {
    registry: &'a ResourceRegistry,
}

impl<'a> LinkingResourceMatcher<'a> {
    pub fn new(registry: &'a ResourceRegistry) -> Self {
        Self { registry }
    }

    /// Links connecting both `from` and `to`.
    pub fn find_exact(&self, from: &LocationId, to: &LocationId) -> Vec<&'a LinkingResourceInstance> {
        self.collect(|link| link.connects(from) && link.connects(to))
    }

    /// Links connecting at least one of `from` and `to`.
    ///
    /// Used when one endpoint may already have left the topology (scale-in), so that a
    /// call still in flight can be charged a plausible link cost.
    pub fn find_relaxed(&self, from: &LocationId, to: &LocationId) -> Vec<&'a LinkingResourceInstance> {
        self.collect(|link| link.connects(from) || link.connects(to))
    }

    fn collect(&self, predicate: impl Fn(&LinkingResourceInstance) -> bool) -> Vec<&'a LinkingResourceInstance> {
        let mut links: Vec<&'a LinkingResourceInstance> = self.registry.linking_resources().filter(|link| predicate(link)).collect();
        links.sort_by(|a, b| a.resource().id.cmp(&b.resource().id));
        links
    }
}
