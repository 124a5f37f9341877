use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// String identifier tagged with the kind of entity it names.
///
/// Two ids are equal iff their strings are equal and they carry the same tag, so a
/// `ResourceId` can never be compared against a `ContainerId` by accident.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize)]
#[serde(transparent)]
pub struct Id<T> {
    pub id: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Id { id: id.into(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.id.trim().is_empty()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Id::new(value)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {:?}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ResourceTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ContainerTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ResourceTypeTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ComponentTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct SignatureTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct RoleTag;

// Usage Model Tags
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ScenarioTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct BehaviorTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ActionTag;

pub type ResourceId = Id<ResourceTag>;
pub type ContainerId = Id<ContainerTag>;
pub type ResourceTypeId = Id<ResourceTypeTag>;
pub type ComponentId = Id<ComponentTag>;
pub type SignatureId = Id<SignatureTag>;
pub type RoleId = Id<RoleTag>;

/// A deployment location is the resource container hosting a component.
pub type LocationId = ContainerId;

// Usage Model Aliases
pub type ScenarioId = Id<ScenarioTag>;
pub type BehaviorId = Id<BehaviorTag>;
pub type ActionId = Id<ActionTag>;

/// Identity of a simulated user (one session of a usage scenario).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_compare_by_value() {
        let a = ResourceId::new("cpu-1");
        let b = ResourceId::new(String::from("cpu-1"));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_debug_uses_tag_name() {
        let id = ContainerId::new("Server-A");
        assert_eq!(format!("{:?}", id), "ContainerId: \"Server-A\"");
        assert_eq!(id.to_string(), "Server-A");
    }

    #[test]
    fn test_blank_id_is_empty() {
        assert!(SignatureId::new("  ").is_empty());
        assert!(!SignatureId::new("login").is_empty());
    }
}
