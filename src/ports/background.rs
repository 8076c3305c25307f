use crate::domain::media::BackgroundAsset;
use crate::error::ConfigurationError;
use async_trait::async_trait;

#[async_trait]
pub trait BackgroundLibrary: Send + Sync {
    /// List every usable background clip with its duration.
    /// An empty pool is not an error here; selection reports it.
    async fn discover(&self) -> Result<Vec<BackgroundAsset>, ConfigurationError>;
}
