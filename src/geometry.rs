//! Collision detection for packages on the container floor.
//!
//! Every check uses the package's current (post-rotation) footprint and strict
//! inequalities, so packages that touch flush are never reported as colliding.
//! Removed packages are invisible to every function in this module.

use crate::model::{Container, Package, PackageId};
use crate::types::{EPSILON_GENERAL, Vec3};

/// Checks whether package `a`, placed at `pos_a`, overlaps package `b` at its own position.
///
/// Uses Axis-Aligned Bounding Box (AABB) overlap on all three axes.
///
/// # Parameters
/// * `a` - Package being tested (its footprint is used, not its position)
/// * `pos_a` - Candidate position for `a`
/// * `b` - Stationary package
///
/// # Examples
/// ```
/// use load_planner::geometry::collides;
/// use load_planner::model::Package;
/// use load_planner::types::Vec3;
///
/// let a = Package::new(1, Vec3::zero(), (1200.0, 800.0, 1000.0), 10.0).unwrap();
/// let b = Package::new(2, Vec3::new(1200.0, 0.0, 0.0), (1200.0, 800.0, 1000.0), 10.0).unwrap();
/// assert!(!collides(&a, a.position, &b));
/// assert!(collides(&a, Vec3::new(100.0, 0.0, 0.0), &b));
/// ```
#[inline]
pub fn collides(a: &Package, pos_a: Vec3, b: &Package) -> bool {
    a.bounding_box_at(pos_a).intersects(&b.bounding_box())
}

/// Checks whether `package` at `position` lies inside the container, touching allowed.
#[inline]
pub fn within_container(package: &Package, position: Vec3, container: &Container) -> bool {
    package
        .bounding_box_at(position)
        .is_within(&container.bounding_box(), EPSILON_GENERAL)
}

/// Returns the first active package (other than `package` itself) hit at `position`.
///
/// Iterates `packages` in order, so the result is deterministic for a given store.
pub fn first_collision(package: &Package, position: Vec3, packages: &[Package]) -> Option<PackageId> {
    packages
        .iter()
        .filter(|other| other.is_active() && other.id != package.id)
        .find(|other| collides(package, position, other))
        .map(|other| other.id)
}

/// Validation outcome for a candidate position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionCheck {
    Free,
    OutOfBounds,
    Collision(PackageId),
}

impl PositionCheck {
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, PositionCheck::Free)
    }
}

/// Full validation of one candidate: container bounds first, then the active set.
pub fn check_position(
    package: &Package,
    position: Vec3,
    container: &Container,
    packages: &[Package],
) -> PositionCheck {
    if !within_container(package, position, container) {
        return PositionCheck::OutOfBounds;
    }
    match first_collision(package, position, packages) {
        Some(other) => PositionCheck::Collision(other),
        None => PositionCheck::Free,
    }
}

/// Re-validates the whole active set against the container.
///
/// Returns the ids of all active packages that are out of bounds or overlap
/// another active package, in store order and without duplicates.
pub fn find_violations(container: &Container, packages: &[Package]) -> Vec<PackageId> {
    packages
        .iter()
        .filter(|package| package.is_active())
        .filter(|package| !check_position(package, package.position, container, packages).is_free())
        .map(|package| package.id)
        .collect()
}
