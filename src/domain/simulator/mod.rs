pub mod clock;
pub mod engine;
pub mod event;
pub mod event_queue;
pub mod report;
pub mod session;
pub mod workload;
