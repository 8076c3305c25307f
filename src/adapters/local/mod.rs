//! Local adapters that shell out to command-line tools.

pub mod cmd;
pub mod device;
pub mod edge_tts;
pub mod ffmpeg;
pub mod fs;
pub mod probe;
pub mod tools;
pub mod whisper;

pub use cmd::{RealToolRunner, ToolRunner};
pub use device::NvidiaSmiProbe;
pub use edge_tts::EdgeTtsAdapter;
pub use ffmpeg::{EncodeSettings, FfmpegComposer};
pub use fs::FsBackgroundLibrary;
pub use whisper::WhisperCliAdapter;
