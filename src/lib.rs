//! Shortsmith - Captioned short video pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (jobs, captions, background selection, device)
//! - ports/: Trait definitions for the external tools
//! - adapters/: Command-line tool implementations
//! - application/: Generic services (per-job worker, run orchestrator)
//! - config: Environment configuration
//!
//! # Features
//! - `native-probe`: probe media durations in-process through libav instead of `ffprobe`

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::PipelineService;
pub use config::PipelineConfig;
pub use domain::captions;
pub use error::{ConfigurationError, PipelineError};
