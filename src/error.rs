use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse simulation JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Invalid simulation configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to convert simulation model: {0}")]
    Conversion(#[from] ConversionError),

    /// Internal bookkeeping broke. The run must be aborted, the schedule can no longer be trusted.
    #[error("Internal consistency violation: {0}")]
    ConsistencyViolation(String),
}

/// Malformed model or request, detected when it is constructed or submitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Loop bounds are invalid: maximal loop count {maximal_loop_count}, initial progression {initial_progression}")]
    InvalidLoopBounds { maximal_loop_count: i64, initial_progression: i64 },

    #[error("Loop context entering '{entry}' has no action to resume after it completes")]
    MissingNextAction { entry: String },

    #[error("Call over wire request is missing its {0}")]
    MissingCallField(&'static str),

    #[error("Request processing context is missing its {0}")]
    MissingContextField(&'static str),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("No active resource of type '{resource_type}' in container '{container}'")]
    UnknownActiveResource { container: String, resource_type: String },

    #[error("Resource '{0}' is registered more than once")]
    DuplicateResource(String),

    #[error("Resource '{resource}' has invalid capacity {capacity}")]
    InvalidCapacity { resource: String, capacity: i64 },

    #[error("Resource name for '{0}' must not be empty")]
    EmptyResourceName(String),

    #[error("Invalid demand {demand} submitted to resource '{resource}' ({policy})")]
    InvalidDemand { resource: String, demand: f64, policy: String },

    #[error("Requested amount {requested} exceeds total capacity {capacity} of passive resource '{resource}'")]
    AmountExceedsCapacity { resource: String, requested: u64, capacity: u64 },

    #[error("Invalid link properties for '{resource}': latency {latency}, throughput {throughput}")]
    InvalidLinkProperties { resource: String, latency: f64, throughput: f64 },

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Component '{0}' is not allocated to any resource container")]
    UnallocatedComponent(String),

    #[error("Component '{component}' does not provide operation '{signature}'")]
    UnknownOperation { component: String, signature: String },

    #[error("Unknown scenario behavior: {0}")]
    UnknownBehavior(String),

    #[error("Unknown scenario action: {0}")]
    UnknownAction(String),

    #[error("Unknown usage scenario: {0}")]
    UnknownScenario(String),

    #[error("Invalid usage model: {0}")]
    InvalidUsageModel(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Identifier must not be empty ({0})")]
    EmptyIdentifier(&'static str),

    #[error("Duplicate identifier '{0}'")]
    DuplicateIdentifier(String),

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Error {
    pub fn consistency(message: impl Into<String>) -> Self {
        Error::ConsistencyViolation(message.into())
    }

    /// Returns true if the error stems from a broken internal invariant rather than bad input.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, Error::ConsistencyViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
