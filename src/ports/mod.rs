//! Ports - Trait definitions for the external collaborators.

pub mod background;
pub mod composer;
pub mod device;
pub mod synthesis;
pub mod transcription;
