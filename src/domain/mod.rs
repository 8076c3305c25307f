//! Domain layer - Pure business logic.

pub mod background;
pub mod captions;
pub mod device;
pub mod jobs;
pub mod media;
pub mod speech;
