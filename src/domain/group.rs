use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbImage;

use super::detection::DetectionResult;
use super::errors::{DomainError, DomainResult};
use super::lane::{GroupId, LaneCapture, LaneIdentity, LaneImage};
use super::record::{LaneRecord, RankingRecord};

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

/// Both views produced by a ranking pass.
#[derive(Debug)]
pub struct RankedLanes<'a> {
    /// Members in rank order.
    pub ranked: Vec<&'a LaneImage>,
    /// Members in append order.
    pub members: &'a [LaneImage],
}

/// The lanes of one scan cycle.
///
/// Members are stored in append order and a member's `index` is its slot in that order, so
/// indices are unique and never reused.
#[derive(Debug)]
pub struct LaneGroup {
    id: GroupId,
    name: String,
    members: Vec<LaneImage>,
    ranked: Vec<usize>,
}

impl LaneGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            members: Vec::new(),
            ranked: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[LaneImage] {
        &self.members
    }

    pub fn get(&self, index: usize) -> Option<&LaneImage> {
        self.members.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut LaneImage> {
        self.members.get_mut(index)
    }

    /// Binds a detected frame to this group. The capture can only be appended here.
    pub fn prepare(
        &self,
        identity: LaneIdentity,
        frame: RgbImage,
        detection: DetectionResult,
    ) -> LaneCapture {
        LaneCapture {
            group: self.id,
            identity,
            frame,
            detection,
        }
    }

    /// Appends the capture and returns its index.
    pub fn append(&mut self, capture: LaneCapture) -> DomainResult<usize> {
        if capture.group != self.id {
            return Err(DomainError::ForeignGroup);
        }
        let index = self.members.len();
        self.members.push(LaneImage::from_capture(capture, index));
        Ok(index)
    }

    pub fn ingest(
        &mut self,
        identity: LaneIdentity,
        frame: RgbImage,
        detection: DetectionResult,
    ) -> DomainResult<usize> {
        let capture = self.prepare(identity, frame, detection);
        self.append(capture)
    }

    /// Ranks by vehicle count.
    pub fn rank(&mut self, order: SortOrder) -> DomainResult<RankedLanes<'_>> {
        self.rank_by(LaneImage::vehicle_count, order)
    }

    /// Stable sort of all members by `key`. Equal keys keep append order in either direction.
    /// Every member's `position` is set to its slot in the result.
    pub fn rank_by<K, F>(&mut self, mut key: F, order: SortOrder) -> DomainResult<RankedLanes<'_>>
    where
        K: Ord,
        F: FnMut(&LaneImage) -> K,
    {
        if self.members.is_empty() {
            return Err(DomainError::EmptyGroup);
        }

        let keys: Vec<K> = self.members.iter().map(&mut key).collect();
        let mut ranked: Vec<usize> = (0..self.members.len()).collect();
        match order {
            SortOrder::Ascending => ranked.sort_by(|&a, &b| keys[a].cmp(&keys[b])),
            SortOrder::Descending => ranked.sort_by(|&a, &b| keys[b].cmp(&keys[a])),
        }

        for (position, &index) in ranked.iter().enumerate() {
            self.members[index].set_position(position);
        }
        self.ranked = ranked;

        Ok(RankedLanes {
            ranked: self.ranked(),
            members: &self.members,
        })
    }

    /// Result of the last ranking pass; empty before the first one.
    pub fn ranked(&self) -> Vec<&LaneImage> {
        self.ranked.iter().map(|&i| &self.members[i]).collect()
    }

    pub fn ranked_indices(&self) -> &[usize] {
        &self.ranked
    }

    /// Ranks by vehicle count, highest first, and builds the controller payload.
    pub fn serialize(&mut self) -> DomainResult<RankingRecord> {
        let view = self.rank(SortOrder::Descending)?;
        let data: Vec<LaneRecord> = view
            .ranked
            .iter()
            .map(|lane| LaneRecord {
                path: lane.name().to_string(),
                vehicle_count: lane.vehicle_count(),
                index: lane.index(),
                position: lane.position().unwrap_or_default(),
            })
            .collect();
        Ok(RankingRecord {
            count: data.len(),
            data,
        })
    }
}
