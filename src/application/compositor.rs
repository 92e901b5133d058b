//! Winner/waiting annotation and mosaic layout.

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::overlay::{self, Overlay};
use crate::domain::camera::FrameSize;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::group::LaneGroup;
use crate::domain::selector::midpoint;

/// Order in which lanes are laid out and numbered in the mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutOrder {
    /// Append order, so each physical lane keeps its place on screen.
    #[default]
    Capture,
    /// Order of the group's last ranking pass.
    Ranked,
}

pub struct Compositor {
    overlay: Overlay,
    output: FrameSize,
}

impl Compositor {
    pub fn new(overlay: Overlay, output: FrameSize) -> Self {
        Self { overlay, output }
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Annotates the group in place, fits every canvas to its mosaic tile and composes.
    ///
    /// Canvases are stretched to their tile, so aspect ratio is not kept: a lane alone on the top
    /// row of a three-lane mosaic is drawn twice as wide as it was captured. Size mismatches are
    /// absorbed here and only direct [`compose`](Self::compose) calls report `DimensionMismatch`.
    pub fn render(
        &self,
        group: &mut LaneGroup,
        winner: usize,
        order: LayoutOrder,
    ) -> DomainResult<RgbImage> {
        let sequence = layout_sequence(group, order)?;
        self.annotate(group, winner, &sequence)?;
        self.fit_to_tiles(group, &sequence)?;
        self.compose(group, &sequence)
    }

    /// Stretches each canvas of `sequence` to its tile so rows line up without padding.
    /// Raw frames are not touched.
    pub fn fit_to_tiles(&self, group: &mut LaneGroup, sequence: &[usize]) -> DomainResult<()> {
        let tiles = tile_sizes(sequence.len(), self.output)?;
        for (&index, tile) in sequence.iter().zip(tiles) {
            let lane = group
                .get_mut(index)
                .ok_or_else(|| DomainError::NotFound(format!("lane {index}")))?;
            if lane.canvas().dimensions() == (tile.width, tile.height) {
                continue;
            }
            let fitted = imageops::resize(lane.canvas(), tile.width, tile.height, FilterType::Triangle);
            *lane.canvas_mut() = fitted;
        }
        Ok(())
    }

    /// Marks the winner as active and every lane that looks different from it as waiting.
    /// Each lane is also labelled with its 1-based slot in `sequence`. Lanes annotated by an
    /// earlier call are left alone.
    pub fn annotate(&self, group: &mut LaneGroup, winner: usize, sequence: &[usize]) -> DomainResult<()> {
        let winner_frame = group
            .get(winner)
            .ok_or_else(|| DomainError::NotFound(format!("winner lane {winner}")))?
            .frame()
            .clone();

        for (slot, &index) in sequence.iter().enumerate() {
            let lane = group
                .get_mut(index)
                .ok_or_else(|| DomainError::NotFound(format!("lane {index}")))?;
            if lane.is_rendered() {
                continue;
            }

            let is_winner = index == winner;
            let looks_same = is_similar(lane.frame(), &winner_frame);
            let canvas = lane.canvas_mut();
            let (w, h) = canvas.dimensions();
            let mid = (h / 2) as i32;

            if is_winner {
                self.overlay.border(canvas, overlay::ACTIVE);
                self.overlay.text(canvas, 20, mid, "Status: Go!", overlay::GO_TEXT);
            } else if !looks_same {
                self.overlay.border(canvas, overlay::WAITING);
                self.overlay.text(canvas, 20, mid, "STATUS: Waiting...", overlay::WAITING);
            }
            let label = format!("Lane: {}", slot + 1);
            self.overlay
                .text(canvas, w.saturating_sub(230) as i32, 20, &label, overlay::LANE_LABEL);

            lane.mark_rendered();
        }
        Ok(())
    }

    /// Lays out the canvases of `sequence` and scales the result to the output size.
    pub fn compose(&self, group: &LaneGroup, sequence: &[usize]) -> DomainResult<RgbImage> {
        let frames = sequence
            .iter()
            .map(|&i| {
                group
                    .get(i)
                    .map(|lane| lane.canvas())
                    .ok_or_else(|| DomainError::NotFound(format!("lane {i}")))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let mosaic = compose_layout(&frames)?;
        let FrameSize { width, height } = self.output;
        if mosaic.dimensions() == (width, height) {
            return Ok(mosaic);
        }
        debug!(from = ?mosaic.dimensions(), to = ?(width, height), "resizing mosaic");
        Ok(imageops::resize(&mosaic, width, height, FilterType::Triangle))
    }
}

/// Lane indices in the requested layout order.
pub fn layout_sequence(group: &LaneGroup, order: LayoutOrder) -> DomainResult<Vec<usize>> {
    if group.is_empty() {
        return Err(DomainError::EmptyGroup);
    }
    match order {
        LayoutOrder::Capture => Ok((0..group.len()).collect()),
        LayoutOrder::Ranked if group.ranked_indices().is_empty() => Err(DomainError::InvalidInput(
            format!("group `{}` has not been ranked", group.name()),
        )),
        LayoutOrder::Ranked => Ok(group.ranked_indices().to_vec()),
    }
}

/// Tile sizes, in layout order, that make `n` frames fill `output` exactly.
pub fn tile_sizes(n: usize, output: FrameSize) -> DomainResult<Vec<FrameSize>> {
    let split = midpoint(n)?;
    let FrameSize { width, height } = output;
    let top = height / 2;
    let tiles = match n {
        1 => vec![output],
        2 => vec![
            FrameSize { width, height: top },
            FrameSize { width, height: height - top },
        ],
        _ => {
            let mut tiles = tile_row(split, width, top)?;
            tiles.extend(tile_row(n - split, width, height - top)?);
            tiles
        }
    };
    if tiles.iter().any(|t| t.width == 0 || t.height == 0) {
        return Err(DomainError::InvalidInput(format!(
            "{width}x{height} mosaic is too small for {n} lanes"
        )));
    }
    Ok(tiles)
}

/// `count` tiles sharing `width`; the last one takes the remainder.
fn tile_row(count: usize, width: u32, height: u32) -> DomainResult<Vec<FrameSize>> {
    let count_u32 = u32::try_from(count)
        .map_err(|_| DomainError::InvalidInput(format!("{count} lanes in one row")))?;
    let base = width / count_u32;
    Ok((0..count_u32)
        .map(|i| FrameSize {
            width: if i + 1 == count_u32 { width - base * (count_u32 - 1) } else { base },
            height,
        })
        .collect())
}

/// Exact comparison: same dimensions and identical bytes.
pub fn is_similar(a: &RgbImage, b: &RgbImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

/// One frame as is, two stacked, more split at `midpoint(n)` into a top and bottom row.
pub fn compose_layout(frames: &[&RgbImage]) -> DomainResult<RgbImage> {
    match frames {
        [] => Err(DomainError::EmptyGroup),
        [only] => Ok((*only).clone()),
        [top, bottom] => stack(top, bottom),
        _ => {
            let split = midpoint(frames.len())?;
            let top = concat_row(&frames[..split])?;
            let bottom = concat_row(&frames[split..])?;
            stack(&top, &bottom)
        }
    }
}

fn concat_row(frames: &[&RgbImage]) -> DomainResult<RgbImage> {
    let height = frames[0].height();
    if let Some(odd) = frames.iter().find(|f| f.height() != height) {
        return Err(DomainError::DimensionMismatch(format!(
            "row height {height} vs frame height {}",
            odd.height()
        )));
    }

    let width: u32 = frames.iter().map(|f| f.width()).sum();
    let mut row = RgbImage::new(width, height);
    let mut x = 0i64;
    for frame in frames {
        imageops::replace(&mut row, *frame, x, 0);
        x += frame.width() as i64;
    }
    Ok(row)
}

fn stack(top: &RgbImage, bottom: &RgbImage) -> DomainResult<RgbImage> {
    if top.width() != bottom.width() {
        return Err(DomainError::DimensionMismatch(format!(
            "top width {} vs bottom width {}",
            top.width(),
            bottom.width()
        )));
    }
    let mut out = RgbImage::new(top.width(), top.height() + bottom.height());
    imageops::replace(&mut out, top, 0, 0);
    imageops::replace(&mut out, bottom, 0, top.height() as i64);
    Ok(out)
}
