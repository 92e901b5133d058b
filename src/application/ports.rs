use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    detection::DetectionResult, errors::DomainResult, model::ModelId, record::RankingRecord,
};

/// Vehicle detector. Inference is blocking, so this port is synchronous.
pub trait DetectorPort: Send {
    /// Vehicles in `frame`, already filtered to vehicle classes with score >= 0.5.
    /// Must be deterministic for a fixed frame and threshold.
    fn detect(&mut self, frame: &RgbImage, nms_threshold: f32) -> DomainResult<DetectionResult>;
}

/// Supplies the frames of one lane set.
pub trait FrameSourcePort: Send + Sync {
    /// Lane sources in stable capture order.
    fn discover(&self) -> DomainResult<Vec<PathBuf>>;
    fn load(&self, source: &Path) -> DomainResult<RgbImage>;
}

pub trait DisplayPort: Send + Sync {
    fn show(&self, window: &str, mosaic: &RgbImage) -> DomainResult<()>;
}

/// Link to the signal controller. Each publish owns its connection.
#[async_trait]
pub trait ControllerLinkPort: Send + Sync {
    async fn publish(&self, record: &RankingRecord) -> DomainResult<()>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
