//! Edge snapping for dragged packages.
//!
//! X and Y are adjusted independently; Z is never touched, a dragged package
//! stays on the plane it started on.

use crate::model::Package;
use crate::types::Vec3;

/// Distance in millimeters below which edges are pulled flush.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 50.0;

/// Aligns `target` with nearby edges of the other active packages.
///
/// For every neighbor and axis the closer of the two edge pairings is
/// considered (our end edge against its start edge, our start edge against its
/// end edge). When that distance is below `threshold`, the axis is moved so the
/// pair becomes exactly flush. Neighbors are visited in store order and a later
/// match overwrites an earlier one, even if the earlier one was closer.
///
/// An axis with no edge inside the threshold is returned unchanged.
///
/// # Parameters
/// * `package` - The dragged package (current footprint)
/// * `target` - Candidate position before snapping
/// * `packages` - The whole package store
/// * `threshold` - Snap distance
pub fn snap(package: &Package, target: Vec3, packages: &[Package], threshold: f64) -> Vec3 {
    let mut snapped = target;

    for other in packages
        .iter()
        .filter(|other| other.is_active() && other.id != package.id)
    {
        if let Some(x) = snap_axis(
            target.x,
            package.length,
            other.position.x,
            other.length,
            threshold,
        ) {
            snapped.x = x;
        }
        if let Some(y) = snap_axis(
            target.y,
            package.width,
            other.position.y,
            other.width,
            threshold,
        ) {
            snapped.y = y;
        }
    }

    snapped
}

/// Snaps one axis against one neighbor, returning the flush coordinate if in range.
fn snap_axis(start: f64, extent: f64, other_start: f64, other_extent: f64, threshold: f64) -> Option<f64> {
    let other_end = other_start + other_extent;
    let end_to_other_start = (start + extent - other_start).abs();
    let start_to_other_end = (start - other_end).abs();

    let (distance, flush) = if end_to_other_start <= start_to_other_end {
        (end_to_other_start, other_start - extent)
    } else {
        (start_to_other_end, other_end)
    };

    (distance < threshold).then_some(flush)
}
