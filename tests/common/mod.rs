#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use lane_priority::application::ports::{ControllerLinkPort, DetectorPort, FrameSourcePort};
use lane_priority::domain::detection::{BoundingBox, DetectionResult};
use lane_priority::domain::errors::{DomainError, DomainResult};
use lane_priority::domain::record::RankingRecord;

/// Reports a fixed vehicle count per frame, keyed by the frame's first red byte.
pub struct ScriptedDetector {
    counts: HashMap<u8, usize>,
    pub calls: usize,
}

impl ScriptedDetector {
    pub fn new(counts: &[(u8, usize)]) -> Self {
        Self { counts: counts.iter().copied().collect(), calls: 0 }
    }
}

impl DetectorPort for ScriptedDetector {
    fn detect(&mut self, frame: &RgbImage, _nms_threshold: f32) -> DomainResult<DetectionResult> {
        self.calls += 1;
        let tag = frame.get_pixel(0, 0).0[0];
        let count = *self
            .counts
            .get(&tag)
            .ok_or_else(|| DomainError::OperationFailed(format!("no script for frame {tag}")))?;
        Ok(DetectionResult::new(
            (0..count)
                .map(|i| {
                    let x = 10.0 + i as f32 * 12.0;
                    BoundingBox::from_corners(x, 10.0, x + 8.0, 18.0, 0.9, 2)
                })
                .collect(),
        ))
    }
}

/// Frames held in memory; a `None` frame fails to load.
pub struct MemorySource {
    frames: Vec<(PathBuf, Option<RgbImage>)>,
}

impl MemorySource {
    pub fn new(frames: Vec<(&str, Option<RgbImage>)>) -> Self {
        Self {
            frames: frames.into_iter().map(|(p, f)| (PathBuf::from(p), f)).collect(),
        }
    }

    /// One 60x30 frame per tag, named `lanes/lane_{n}.jpg`.
    pub fn tagged(tags: &[u8]) -> Self {
        Self {
            frames: tags
                .iter()
                .enumerate()
                .map(|(i, &tag)| (PathBuf::from(format!("lanes/lane_{}.jpg", i + 1)), Some(tagged_frame(tag))))
                .collect(),
        }
    }
}

impl FrameSourcePort for MemorySource {
    fn discover(&self) -> DomainResult<Vec<PathBuf>> {
        Ok(self.frames.iter().map(|(p, _)| p.clone()).collect())
    }

    fn load(&self, source: &Path) -> DomainResult<RgbImage> {
        self.frames
            .iter()
            .find(|(p, _)| p == source)
            .and_then(|(_, f)| f.clone())
            .ok_or_else(|| DomainError::FrameSource(format!("unreadable {}", source.display())))
    }
}

pub fn tagged_frame(tag: u8) -> RgbImage {
    RgbImage::from_pixel(60, 30, Rgb([tag, 40, 40]))
}

/// Remembers every record it was asked to publish.
#[derive(Default)]
pub struct RecordingLink {
    pub published: Mutex<Vec<RankingRecord>>,
}

#[async_trait]
impl ControllerLinkPort for RecordingLink {
    async fn publish(&self, record: &RankingRecord) -> DomainResult<()> {
        self.published.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct BrokenLink;

#[async_trait]
impl ControllerLinkPort for BrokenLink {
    async fn publish(&self, _record: &RankingRecord) -> DomainResult<()> {
        Err(DomainError::Link("port went away".into()))
    }
}

/// Hands out vehicle counts in call order, whatever the frame.
pub struct QueuedDetector {
    counts: std::collections::VecDeque<usize>,
}

impl QueuedDetector {
    pub fn new(counts: &[usize]) -> Self {
        Self { counts: counts.iter().copied().collect() }
    }
}

impl DetectorPort for QueuedDetector {
    fn detect(&mut self, _frame: &RgbImage, _nms_threshold: f32) -> DomainResult<DetectionResult> {
        let count = self
            .counts
            .pop_front()
            .ok_or_else(|| DomainError::OperationFailed("detector called too often".into()))?;
        Ok(DetectionResult::new(
            (0..count)
                .map(|_| BoundingBox::from_corners(4.0, 4.0, 12.0, 12.0, 0.9, 2))
                .collect(),
        ))
    }
}
