//! Application layer - Generic services that use ports.

pub mod orchestrator;
pub mod worker;


pub use orchestrator::PipelineService;
pub use worker::{JobPlan, WorkerService, WorkerSettings};
