pub mod behavior_context;
pub mod context_stack;
pub mod usage_model;
