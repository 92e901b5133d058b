use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbImage};

use super::capture::{grab_frame, CaptureConfig};
use crate::application::ports::FrameSourcePort;
use crate::domain::camera::{CameraId, FrameSize};
use crate::domain::errors::{DomainError, DomainResult};

const WARMUP_FRAMES: usize = 3;
/// Lane cameras are asked for MJPG; YUYV is still decoded if the driver falls back to it.
const CAPTURE_FOURCC: &str = "MJPG";

/// One V4L2 camera per lane; every load takes a fresh snapshot.
pub struct CameraFrameSource {
    cameras: Vec<CameraId>,
    frame: FrameSize,
}

impl CameraFrameSource {
    pub fn new(devices: &[String], frame: FrameSize) -> Self {
        Self {
            cameras: devices.iter().map(|p| CameraId { path: p.clone() }).collect(),
            frame,
        }
    }
}

impl FrameSourcePort for CameraFrameSource {
    fn discover(&self) -> DomainResult<Vec<PathBuf>> {
        self.cameras
            .iter()
            .map(|cam| {
                let path = PathBuf::from(&cam.path);
                if path.exists() {
                    Ok(path)
                } else {
                    Err(DomainError::NotFound(format!("camera {}", cam.path)))
                }
            })
            .collect()
    }

    fn load(&self, source: &Path) -> DomainResult<RgbImage> {
        let cfg = CaptureConfig {
            camera_path: source.display().to_string(),
            fourcc: CAPTURE_FOURCC.to_string(),
            width: self.frame.width,
            height: self.frame.height,
        };
        let rgb = grab_frame(&cfg, WARMUP_FRAMES)
            .map_err(|e| DomainError::FrameSource(format!("{}: {e:#}", source.display())))?;

        if rgb.dimensions() == (self.frame.width, self.frame.height) {
            return Ok(rgb);
        }
        Ok(image::imageops::resize(&rgb, self.frame.width, self.frame.height, FilterType::Triangle))
    }
}
