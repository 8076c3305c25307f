use async_trait::async_trait;
use std::error::Error;

#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Number of usable CUDA devices (0 when none)
    async fn cuda_devices(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;
}
