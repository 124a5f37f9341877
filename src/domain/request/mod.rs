pub mod call_over_wire;
pub mod request_processing_context;
