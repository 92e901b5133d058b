use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbImage};
use tracing::debug;

use crate::application::ports::FrameSourcePort;
use crate::domain::camera::FrameSize;
use crate::domain::errors::{DomainError, DomainResult};

/// A folder holding one JPEG per lane.
///
/// Capture order follows the number formed by the digits in each file name, so `lane_2.jpg`
/// comes before `lane_10.jpg`. Every frame is scaled to a common size on load.
pub struct FolderFrameSource {
    folder: PathBuf,
    frame: FrameSize,
}

impl FolderFrameSource {
    pub fn new(folder: impl Into<PathBuf>, frame: FrameSize) -> Self {
        Self { folder: folder.into(), frame }
    }
}

impl FrameSourcePort for FolderFrameSource {
    fn discover(&self) -> DomainResult<Vec<PathBuf>> {
        if !self.folder.is_dir() {
            return Err(DomainError::NotFound(format!(
                "lane folder {} does not exist",
                self.folder.display()
            )));
        }

        let entries = std::fs::read_dir(&self.folder)
            .map_err(|e| DomainError::FrameSource(format!("{}: {e}", self.folder.display())))?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_jpeg(path))
            .collect();

        frames.sort_by(|a, b| capture_key(a).cmp(&capture_key(b)));
        debug!(folder = %self.folder.display(), count = frames.len(), "folder scanned");
        Ok(frames)
    }

    fn load(&self, source: &Path) -> DomainResult<RgbImage> {
        let rgb = image::open(source)
            .map_err(|e| DomainError::FrameSource(format!("{}: {e}", source.display())))?
            .to_rgb8();
        Ok(image::imageops::resize(&rgb, self.frame.width, self.frame.height, FilterType::Triangle))
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// Digits of the file name read as one number, then the name itself for ties.
fn capture_key(path: &Path) -> (Option<u128>, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    (digits.parse().ok(), name)
}
