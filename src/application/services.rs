use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn};

use crate::{
    application::{
        compositor::Compositor,
        dto::{ScanOptions, ScanOutcome},
        ports::{ControllerLinkPort, DetectorPort, FrameSourcePort},
    },
    domain::{
        errors::{DomainError, DomainResult},
        group::{LaneGroup, SortOrder},
        lane::{LaneIdentity, LaneImage},
        record::RankingRecord,
        selector::{midpoint, select_winner},
    },
};

/// Runs scan cycles: detection, ranking, selection and composition for one lane set at a time.
pub struct ScanService {
    detector: Box<dyn DetectorPort>,
    compositor: Compositor,
}

impl ScanService {
    pub fn new(detector: Box<dyn DetectorPort>, compositor: Compositor) -> Self {
        Self { detector, compositor }
    }

    /// Processes every frame of `source` in capture order and decides the priority lane.
    pub fn run_cycle(
        &mut self,
        name: &str,
        source: &dyn FrameSourcePort,
        options: &ScanOptions,
    ) -> DomainResult<ScanOutcome> {
        let span = info_span!("scan_cycle", group = name);
        let _guard = span.enter();
        let started = Instant::now();

        // 1. Discover lanes
        let sources = source.discover()?;
        info!(count = sources.len(), "lane frames discovered");

        // 2. Detect and ingest, one frame at a time
        let mut group = LaneGroup::new(name);
        for path in &sources {
            match self.ingest(&mut group, source, path, options) {
                Ok(index) => {
                    if let Some(lane) = group.get(index) {
                        info!(lane = lane.name(), index, vehicles = lane.vehicle_count(), "lane ingested");
                    }
                }
                Err(e) if options.skip_unreadable => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable lane");
                }
                Err(e) => return Err(e),
            }
        }

        // 3. Rank and pick the priority lane
        let order = SortOrder::from_reverse(options.reverse);
        let winner = {
            let view = group.rank(order)?;
            select_winner(&view.ranked)?.index()
        };
        let split = midpoint(group.len())?;
        debug!(winner, split, ?order, "ranking complete");

        // 4. Annotate and compose
        let t_compose = Instant::now();
        let mosaic = self.compositor.render(&mut group, winner, options.layout)?;
        debug!(ms = t_compose.elapsed().as_secs_f32() * 1000.0, "mosaic composed");

        // 5. Controller payload
        let record = group.serialize()?;
        info!(
            ranking = %record.summarize(),
            ms = started.elapsed().as_secs_f32() * 1000.0,
            "scan cycle complete"
        );

        Ok(ScanOutcome { group, winner, split, mosaic, record })
    }

    fn ingest(
        &mut self,
        group: &mut LaneGroup,
        source: &dyn FrameSourcePort,
        path: &Path,
        options: &ScanOptions,
    ) -> DomainResult<usize> {
        let frame = source.load(path)?;

        let t_detect = Instant::now();
        let detection = self
            .detector
            .detect(&frame, options.nms_threshold)
            .map_err(|e| DomainError::Detection {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(
            path = %path.display(),
            ms = t_detect.elapsed().as_secs_f32() * 1000.0,
            "detection finished"
        );

        let index = group.ingest(LaneIdentity::from_path(path), frame, detection)?;
        if options.render_boxes {
            if let Some(lane) = group.get_mut(index) {
                let detection = lane.detection().clone();
                self.compositor.overlay().detections(lane.canvas_mut(), &detection);
            }
        }
        Ok(index)
    }

    /// Re-runs detection on a lane's captured frame.
    pub fn rescan(&mut self, lane: &mut LaneImage, nms_threshold: f32) -> DomainResult<()> {
        let detector = &mut self.detector;
        lane.rescan(|frame| detector.detect(frame, nms_threshold))
    }
}

/// Publishes rankings to the controller on a background task so a slow link never holds up
/// the next scan cycle.
#[derive(Clone)]
pub struct ControllerHandoff {
    link: Arc<dyn ControllerLinkPort>,
}

impl ControllerHandoff {
    pub fn new(link: Arc<dyn ControllerLinkPort>) -> Self {
        Self { link }
    }

    /// Spawns the publish. Link errors are logged by the task and never reach the caller.
    pub fn dispatch(&self, group: &str, record: RankingRecord) -> JoinHandle<()> {
        let link = self.link.clone();
        let group = group.to_string();
        tokio::spawn(async move {
            match link.publish(&record).await {
                Ok(()) => info!(group = %group, lanes = record.count, "ranking delivered to controller"),
                Err(e) => error!(group = %group, error = %e, "controller hand-off failed"),
            }
        })
    }
}
