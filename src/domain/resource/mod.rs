pub mod active_resource;
pub mod job;
pub mod linking_resource;
pub mod linking_resource_matcher;
pub mod passive_resource;
pub mod resource;
pub mod resource_registry;
pub mod scheduling_policy;
