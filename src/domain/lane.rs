use std::path::{Path, PathBuf};

use image::RgbImage;

use super::detection::DetectionResult;
use super::errors::{DomainError, DomainResult};

/// Identifies the scan cycle a lane image was captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) u64);

/// Display name and source path of a lane frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneIdentity {
    name: String,
    path: PathBuf,
}

impl LaneIdentity {
    /// The display name is the file name of `path`, or the whole path when it has none.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A frame that has been detected but not yet appended to its group.
///
/// Only [`LaneGroup::prepare`](super::group::LaneGroup::prepare) creates one, which ties it to
/// that group for good.
#[derive(Debug)]
pub struct LaneCapture {
    pub(crate) group: GroupId,
    pub(crate) identity: LaneIdentity,
    pub(crate) frame: RgbImage,
    pub(crate) detection: DetectionResult,
}

impl LaneCapture {
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn identity(&self) -> &LaneIdentity {
        &self.identity
    }
}

/// One lane's frame inside a [`LaneGroup`](super::group::LaneGroup).
///
/// `frame` keeps the pixels as captured. Overlays go onto `canvas`, a copy taken at append
/// time, so rescans and similarity checks never see annotations.
#[derive(Debug, Clone)]
pub struct LaneImage {
    identity: LaneIdentity,
    frame: RgbImage,
    canvas: RgbImage,
    detection: DetectionResult,
    group: GroupId,
    index: usize,
    position: Option<usize>,
    rendered: bool,
}

impl LaneImage {
    pub(crate) fn from_capture(capture: LaneCapture, index: usize) -> Self {
        let canvas = capture.frame.clone();
        Self {
            identity: capture.identity,
            frame: capture.frame,
            canvas,
            detection: capture.detection,
            group: capture.group,
            index,
            position: None,
            rendered: false,
        }
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn path(&self) -> &Path {
        self.identity.path()
    }

    pub fn identity(&self) -> &LaneIdentity {
        &self.identity
    }

    /// Accepts only the current value; anything else is an immutability violation.
    pub fn set_name(&mut self, value: &str) -> DomainResult<()> {
        if value != self.identity.name {
            return Err(DomainError::ImmutableField { field: "name" });
        }
        Ok(())
    }

    /// Accepts only the current value; anything else is an immutability violation.
    pub fn set_path(&mut self, value: &Path) -> DomainResult<()> {
        if value != self.identity.path {
            return Err(DomainError::ImmutableField { field: "path" });
        }
        Ok(())
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Append position in the owning group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rank after the group's last sort.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = Some(position);
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut RgbImage {
        &mut self.canvas
    }

    pub fn detection(&self) -> &DetectionResult {
        &self.detection
    }

    pub fn vehicle_count(&self) -> usize {
        self.detection.count()
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.rendered = true;
    }

    /// Runs detection again on the captured frame and replaces the stored result.
    pub fn rescan<F>(&mut self, detect: F) -> DomainResult<()>
    where
        F: FnOnce(&RgbImage) -> DomainResult<DetectionResult>,
    {
        self.detection = detect(&self.frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::group::LaneGroup;

    fn lane() -> LaneImage {
        let mut group = LaneGroup::new("north");
        let index = group
            .ingest(
                LaneIdentity::from_path("lanes/north/lane_1.jpg"),
                RgbImage::new(4, 4),
                DetectionResult::default(),
            )
            .unwrap();
        group.get(index).unwrap().clone()
    }

    #[test]
    fn name_is_derived_from_file_name() {
        let lane = lane();
        assert_eq!(lane.name(), "lane_1.jpg");
        assert_eq!(lane.path(), Path::new("lanes/north/lane_1.jpg"));
    }

    #[test]
    fn identity_cannot_be_changed() {
        let mut lane = lane();
        assert!(lane.set_name("lane_1.jpg").is_ok());
        assert!(matches!(
            lane.set_name("lane_9.jpg"),
            Err(DomainError::ImmutableField { field: "name" })
        ));
        assert!(matches!(
            lane.set_path(Path::new("elsewhere.jpg")),
            Err(DomainError::ImmutableField { field: "path" })
        ));
        assert_eq!(lane.name(), "lane_1.jpg");
    }

    #[test]
    fn rescan_uses_raw_frame() {
        let mut lane = lane();
        lane.canvas_mut().put_pixel(0, 0, image::Rgb([255, 0, 0]));
        lane.rescan(|frame| {
            assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 0]);
            Ok(DetectionResult::new(vec![crate::domain::detection::BoundingBox::from_corners(
                0.0, 0.0, 2.0, 2.0, 0.9, 2,
            )]))
        })
        .unwrap();
        assert_eq!(lane.vehicle_count(), 1);
    }
}
