//! Winner selection and mosaic split point.

use super::errors::{DomainError, DomainResult};
use super::lane::LaneImage;

/// Picks the lane with the most vehicles.
///
/// Ties go to the lane appended first (lowest `index`). The rule is applied explicitly, so the
/// result does not depend on the order of `ranked`.
pub fn select_winner<'a>(ranked: &[&'a LaneImage]) -> DomainResult<&'a LaneImage> {
    ranked
        .iter()
        .copied()
        .max_by(|a, b| {
            a.vehicle_count()
                .cmp(&b.vehicle_count())
                .then_with(|| b.index().cmp(&a.index()))
        })
        .ok_or(DomainError::EmptyGroup)
}

/// Row split for the mosaic: the top row takes the first `n / 2` frames.
pub fn midpoint(n: usize) -> DomainResult<usize> {
    if n == 0 {
        return Err(DomainError::EmptyGroup);
    }
    Ok(n / 2)
}
