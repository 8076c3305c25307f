//! Compute device resolution.
//!
//! Resolved once per process and handed to every job; it only ever changes
//! which code path later stages take, it never fails a run.

use crate::ports::device::DeviceProbe;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceProfile {
    /// Hardware acceleration with `devices` usable GPUs
    Cuda { devices: usize },
    /// Software fallback
    Cpu,
}

impl DeviceProfile {
    /// Probe for acceleration, falling back to the CPU on any error.
    pub async fn resolve(probe: &dyn DeviceProbe) -> Self {
        match probe.cuda_devices().await {
            Ok(count) if count > 0 => {
                tracing::info!(devices = count, "GPU acceleration available");
                DeviceProfile::Cuda { devices: count }
            }
            Ok(_) => {
                tracing::warn!("No GPU found, using CPU instead");
                DeviceProfile::Cpu
            }
            Err(e) => {
                tracing::warn!(error = %e, "GPU probe failed, using CPU instead");
                DeviceProfile::Cpu
            }
        }
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self, DeviceProfile::Cuda { .. })
    }

    /// Number of jobs that can use the device at once.
    pub fn slots(&self) -> usize {
        match self {
            DeviceProfile::Cuda { devices } => (*devices).max(1),
            DeviceProfile::Cpu => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// Device name as understood by the transcription tool.
    pub fn torch_device(&self) -> &'static str {
        match self {
            DeviceProfile::Cuda { .. } => "cuda",
            DeviceProfile::Cpu => "cpu",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Cuda { devices } => write!(f, "cuda ({} device(s))", devices),
            DeviceProfile::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProbe(Result<usize, String>);

    #[async_trait]
    impl DeviceProbe for FixedProbe {
        async fn cuda_devices(&self) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
            self.0.clone().map_err(|e| e.into())
        }
    }

    #[tokio::test]
    async fn test_resolve_with_gpu() {
        let profile = DeviceProfile::resolve(&FixedProbe(Ok(2))).await;
        assert_eq!(profile, DeviceProfile::Cuda { devices: 2 });
        assert_eq!(profile.slots(), 2);
        assert_eq!(profile.torch_device(), "cuda");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_cpu() {
        assert_eq!(
            DeviceProfile::resolve(&FixedProbe(Ok(0))).await,
            DeviceProfile::Cpu
        );
        let profile = DeviceProfile::resolve(&FixedProbe(Err("nvidia-smi missing".into()))).await;
        assert_eq!(profile, DeviceProfile::Cpu);
        assert!(!profile.is_accelerated());
        assert!(profile.slots() >= 1);
    }
}
