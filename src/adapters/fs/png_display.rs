use std::path::PathBuf;

use image::RgbImage;
use tracing::info;

use crate::application::ports::DisplayPort;
use crate::domain::errors::{DomainError, DomainResult};

/// Writes each mosaic to `<output_dir>/<window>.png`.
pub struct PngDisplay {
    output_dir: PathBuf,
}

impl PngDisplay {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn target(&self, window: &str) -> PathBuf {
        let stem: String = window
            .trim_matches('_')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let stem = if stem.is_empty() { "mosaic".to_string() } else { stem };
        self.output_dir.join(format!("{stem}.png"))
    }
}

impl DisplayPort for PngDisplay {
    fn show(&self, window: &str, mosaic: &RgbImage) -> DomainResult<()> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| DomainError::OperationFailed(format!("{}: {e}", self.output_dir.display())))?;
        let target = self.target(window);
        mosaic
            .save(&target)
            .map_err(|e| DomainError::OperationFailed(format!("{}: {e}", target.display())))?;
        info!(window, path = %target.display(), "mosaic written");
        Ok(())
    }
}
