//! Weight distribution along the container length.
//!
//! Packages straddling the cutoff contribute proportionally to the share of
//! their length on each side, so `front + back == total` for every cutoff.
//! Used for axle-load estimation.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::Package;

/// Weight on both sides of a longitudinal cutoff.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct WeightSplit {
    pub cutoff: f64,
    /// Weight in `[0, cutoff)`.
    pub front: f64,
    /// Weight in `[cutoff, length]`.
    pub back: f64,
    /// Total weight of all active packages.
    pub total: f64,
}

/// Weight of active packages in front of `cutoff_depth`.
///
/// # Examples
/// ```
/// use load_planner::model::Package;
/// use load_planner::types::Vec3;
/// use load_planner::weight::front_section_weight;
///
/// let straddling = Package::new(1, Vec3::new(1000.0, 0.0, 0.0), (1000.0, 800.0, 1000.0), 400.0).unwrap();
/// assert_eq!(front_section_weight(&[straddling], 1250.0), 100.0);
/// ```
pub fn front_section_weight(packages: &[Package], cutoff_depth: f64) -> f64 {
    active(packages)
        .map(|package| package.weight * front_fraction(package, cutoff_depth))
        .sum()
}

/// Weight of active packages behind `cutoff_depth`; the complement of `front_section_weight`.
pub fn back_section_weight(packages: &[Package], cutoff_depth: f64) -> f64 {
    active(packages)
        .map(|package| package.weight * (1.0 - front_fraction(package, cutoff_depth)))
        .sum()
}

/// Sum of all active package weights.
pub fn total_active_weight(packages: &[Package]) -> f64 {
    active(packages).map(|package| package.weight).sum()
}

/// Front, back and total weight for one cutoff.
pub fn weight_split(packages: &[Package], cutoff_depth: f64) -> WeightSplit {
    WeightSplit {
        cutoff: cutoff_depth,
        front: front_section_weight(packages, cutoff_depth),
        back: back_section_weight(packages, cutoff_depth),
        total: total_active_weight(packages),
    }
}

fn active(packages: &[Package]) -> impl Iterator<Item = &Package> {
    packages.iter().filter(|package| package.is_active())
}

/// Share of the package length lying before the cutoff, in `[0, 1]`.
fn front_fraction(package: &Package, cutoff_depth: f64) -> f64 {
    let start = package.position.x;
    let end = start + package.length;
    if end <= cutoff_depth {
        1.0
    } else if start >= cutoff_depth {
        0.0
    } else {
        (cutoff_depth - start) / package.length
    }
}
