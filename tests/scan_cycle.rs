mod common;

use std::sync::Arc;

use common::{tagged_frame, BrokenLink, MemorySource, RecordingLink, ScriptedDetector};
use lane_priority::application::compositor::{Compositor, LayoutOrder};
use lane_priority::application::dto::ScanOptions;
use lane_priority::application::overlay::{self, Overlay};
use lane_priority::application::services::{ControllerHandoff, ScanService};
use lane_priority::domain::camera::FrameSize;
use lane_priority::domain::errors::DomainError;

const MOSAIC: FrameSize = FrameSize { width: 120, height: 60 };

fn scanner(counts: &[(u8, usize)]) -> ScanService {
    ScanService::new(
        Box::new(ScriptedDetector::new(counts)),
        Compositor::new(Overlay::without_text(), MOSAIC),
    )
}

#[test]
fn busiest_lane_wins_and_record_is_ordered() {
    let mut scanner = scanner(&[(1, 2), (2, 7), (3, 4)]);
    let source = MemorySource::tagged(&[1, 2, 3]);

    let outcome = scanner.run_cycle("junction", &source, &ScanOptions::default()).unwrap();

    assert_eq!(outcome.winner, 1);
    assert_eq!(outcome.winner_name(), "lane_2.jpg");
    assert_eq!(outcome.split, 1);
    assert_eq!(outcome.mosaic.dimensions(), (MOSAIC.width, MOSAIC.height));

    assert_eq!(outcome.record.count, 3);
    let rows: Vec<(usize, usize)> = outcome
        .record
        .data
        .iter()
        .map(|r| (r.vehicle_count, r.index))
        .collect();
    assert_eq!(rows, vec![(7, 1), (4, 2), (2, 0)]);
    let positions: Vec<usize> = outcome.record.data.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(
        outcome.record.to_json().unwrap(),
        r#"{"DATA":[{"PATH":"lane_2.jpg","VEHICLE_COUNT":7,"INDEX":1,"POSITION":0},{"PATH":"lane_3.jpg","VEHICLE_COUNT":4,"INDEX":2,"POSITION":1},{"PATH":"lane_1.jpg","VEHICLE_COUNT":2,"INDEX":0,"POSITION":2}],"COUNT":3}"#
    );
}

#[test]
fn capture_layout_keeps_lane_one_on_top() {
    let mut scanner = scanner(&[(1, 2), (2, 7), (3, 4)]);
    let source = MemorySource::tagged(&[1, 2, 3]);
    let options = ScanOptions { render_boxes: false, ..ScanOptions::default() };

    let outcome = scanner.run_cycle("junction", &source, &options).unwrap();

    // lane 1 is waiting and alone on the top row; lane 2 (the winner) starts the bottom row
    assert_eq!(*outcome.mosaic.get_pixel(0, 0), overlay::WAITING);
    assert_eq!(*outcome.mosaic.get_pixel(0, 59), overlay::ACTIVE);
    assert_eq!(*outcome.mosaic.get_pixel(119, 59), overlay::WAITING);
}

#[test]
fn ranked_layout_puts_winner_first() {
    let mut scanner = scanner(&[(1, 2), (2, 7), (3, 4), (4, 0)]);
    let source = MemorySource::tagged(&[1, 2, 3, 4]);
    let options = ScanOptions {
        layout: LayoutOrder::Ranked,
        render_boxes: false,
        ..ScanOptions::default()
    };

    let outcome = scanner.run_cycle("junction", &source, &options).unwrap();

    assert_eq!(outcome.split, 2);
    assert_eq!(*outcome.mosaic.get_pixel(0, 0), overlay::ACTIVE);
    assert!(outcome.group.members().iter().all(|l| l.is_rendered()));
}

#[test]
fn tie_goes_to_first_lane() {
    let mut scanner = scanner(&[(1, 5), (2, 5), (3, 3)]);
    let outcome = scanner
        .run_cycle("tie", &MemorySource::tagged(&[1, 2, 3]), &ScanOptions::default())
        .unwrap();
    assert_eq!(outcome.winner, 0);
    assert_eq!(outcome.record.data[0].index, 0);
    assert_eq!(outcome.record.data[1].index, 1);
}

#[test]
fn single_lane_fills_the_mosaic() {
    let mut scanner = scanner(&[(9, 1)]);
    let outcome = scanner
        .run_cycle("solo", &MemorySource::tagged(&[9]), &ScanOptions::default())
        .unwrap();
    assert_eq!(outcome.winner, 0);
    assert_eq!(outcome.split, 0);
    assert_eq!(outcome.mosaic.dimensions(), (120, 60));
}

#[test]
fn identical_lane_is_not_marked_waiting() {
    let mut scanner = scanner(&[(1, 4), (2, 1)]);
    let source = MemorySource::new(vec![
        ("a/lane_1.jpg", Some(tagged_frame(1))),
        ("a/lane_2.jpg", Some(tagged_frame(2))),
        ("b/lane_1.jpg", Some(tagged_frame(1))),
    ]);
    let options = ScanOptions { render_boxes: false, ..ScanOptions::default() };
    let outcome = scanner.run_cycle("mirror", &source, &options).unwrap();

    assert_eq!(outcome.winner, 0);
    let untouched = tagged_frame(1);
    assert_eq!(outcome.group.get(2).unwrap().frame(), &untouched);
    assert_eq!(outcome.group.get(2).unwrap().canvas().get_pixel(0, 0).0, [1, 40, 40]);
    assert_eq!(*outcome.group.get(1).unwrap().canvas().get_pixel(0, 0), overlay::WAITING);
}

#[test]
fn unreadable_frame_aborts_or_is_skipped() {
    let frames = || {
        MemorySource::new(vec![
            ("lane_1.jpg", Some(tagged_frame(1))),
            ("lane_2.jpg", None),
            ("lane_3.jpg", Some(tagged_frame(3))),
        ])
    };

    let mut strict = scanner(&[(1, 1), (3, 2)]);
    let err = strict
        .run_cycle("strict", &frames(), &ScanOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, DomainError::FrameSource(_)));

    let mut lenient = scanner(&[(1, 1), (3, 2)]);
    let options = ScanOptions { skip_unreadable: true, ..ScanOptions::default() };
    let outcome = lenient.run_cycle("lenient", &frames(), &options).unwrap();
    assert_eq!(outcome.group.len(), 2);
    assert_eq!(outcome.winner_name(), "lane_3.jpg");
    assert_eq!(outcome.group.get(1).unwrap().index(), 1);
}

#[test]
fn detector_failure_names_the_frame() {
    let mut scanner = scanner(&[(1, 1)]);
    let err = scanner
        .run_cycle("bad", &MemorySource::tagged(&[1, 2]), &ScanOptions::default())
        .err()
        .unwrap();
    match err {
        DomainError::Detection { path, .. } => assert_eq!(path, "lanes/lane_2.jpg"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn empty_lane_set_produces_no_mosaic() {
    let mut scanner = scanner(&[]);
    let err = scanner
        .run_cycle("empty", &MemorySource::new(vec![]), &ScanOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, DomainError::EmptyGroup));
}

#[test]
fn debug_boxes_go_on_canvas_only() {
    let source = MemorySource::tagged(&[1, 2]);
    let plain = ScanOptions { render_boxes: false, ..ScanOptions::default() };
    let without = scanner(&[(1, 1), (2, 0)]).run_cycle("plain", &source, &plain).unwrap();
    let with = scanner(&[(1, 1), (2, 0)])
        .run_cycle("boxes", &source, &ScanOptions::default())
        .unwrap();

    let (boxed, bare) = (with.group.get(0).unwrap(), without.group.get(0).unwrap());
    assert_eq!(boxed.frame(), &tagged_frame(1));
    assert_ne!(boxed.canvas(), bare.canvas());
    // no vehicles on lane 2, so nothing extra was drawn
    assert_eq!(with.group.get(1).unwrap().canvas(), without.group.get(1).unwrap().canvas());
}

#[test]
fn rescan_refreshes_detection() {
    let mut first = scanner(&[(1, 2), (2, 6)]);
    let mut outcome = first
        .run_cycle("rescan", &MemorySource::tagged(&[1, 2]), &ScanOptions::default())
        .unwrap();

    let mut recount = scanner(&[(1, 9)]);
    let lane = outcome.group.get_mut(0).unwrap();
    recount.rescan(lane, 0.3).unwrap();
    assert_eq!(lane.vehicle_count(), 9);

    let lane = outcome.group.get_mut(1).unwrap();
    assert!(recount.rescan(lane, 0.3).is_err());
    assert_eq!(lane.vehicle_count(), 6);
}

#[tokio::test]
async fn handoff_delivers_record_in_background() {
    let mut scanner = scanner(&[(1, 2), (2, 7), (3, 4)]);
    let outcome = scanner
        .run_cycle("junction", &MemorySource::tagged(&[1, 2, 3]), &ScanOptions::default())
        .unwrap();

    let link = Arc::new(RecordingLink::default());
    let handoff = ControllerHandoff::new(link.clone());
    handoff.dispatch("junction", outcome.record.clone()).await.unwrap();

    let published = link.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0], outcome.record);
}

#[tokio::test]
async fn link_failure_stays_in_the_worker() {
    let handoff = ControllerHandoff::new(Arc::new(BrokenLink));
    let record = lane_priority::domain::record::RankingRecord { data: vec![], count: 0 };
    assert!(handoff.dispatch("junction", record).await.is_ok());
}
