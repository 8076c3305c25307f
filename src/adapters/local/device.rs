use super::cmd::{status_text, RealToolRunner, ToolRunner};
use crate::ports::device::DeviceProbe;
use async_trait::async_trait;
use std::error::Error;
use std::path::Path;

/// Counts CUDA devices with `nvidia-smi -L`.
pub struct NvidiaSmiProbe<R: ToolRunner = RealToolRunner> {
    runner: R,
}

impl NvidiaSmiProbe<RealToolRunner> {
    pub fn new() -> Self {
        Self::with_runner(RealToolRunner)
    }
}

impl Default for NvidiaSmiProbe<RealToolRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ToolRunner> NvidiaSmiProbe<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: ToolRunner> DeviceProbe for NvidiaSmiProbe<R> {
    async fn cuda_devices(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
        let output = self
            .runner
            .run("nvidia-smi", &["-L".to_string()], Path::new("."))
            .await?;
        if !output.status.success() {
            return Err(format!("nvidia-smi {}", status_text(&output)).into());
        }
        // One "GPU n: <name> (UUID: ...)" line per device
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| l.trim_start().starts_with("GPU "))
            .count())
    }
}
