use image::RgbImage;

use crate::application::compositor::LayoutOrder;
use crate::config::{LaneSetConfig, Settings};
use crate::domain::{group::LaneGroup, model::YoloParams, record::RankingRecord};

/// Per-cycle knobs for [`ScanService::run_cycle`](super::services::ScanService::run_cycle).
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub layout: LayoutOrder,
    /// Rank busiest lane first.
    pub reverse: bool,
    /// Draw raw detector boxes on each lane as it is ingested.
    pub render_boxes: bool,
    /// Skip frames that fail to load or detect instead of aborting the cycle.
    pub skip_unreadable: bool,
    pub nms_threshold: f32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOrder::Capture,
            reverse: true,
            render_boxes: true,
            skip_unreadable: false,
            nms_threshold: YoloParams::default().nms_threshold,
        }
    }
}

impl ScanOptions {
    pub fn from_config(lanes: &LaneSetConfig, settings: &Settings, params: &YoloParams) -> Self {
        Self {
            layout: if lanes.sort { LayoutOrder::Ranked } else { LayoutOrder::Capture },
            reverse: lanes.reverse,
            render_boxes: lanes.render_boxes,
            skip_unreadable: settings.skip_unreadable,
            nms_threshold: params.nms_threshold,
        }
    }
}

/// Everything one scan cycle produced.
pub struct ScanOutcome {
    pub group: LaneGroup,
    /// Index of the priority lane.
    pub winner: usize,
    /// Number of frames in the mosaic's top row.
    pub split: usize,
    pub mosaic: RgbImage,
    pub record: RankingRecord,
}

impl ScanOutcome {
    pub fn winner_name(&self) -> &str {
        self.group.get(self.winner).map(|l| l.name()).unwrap_or_default()
    }
}
