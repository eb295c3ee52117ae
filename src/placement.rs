//! Deterministic floor placement search.
//!
//! Finds a non-colliding floor position for a package that is (re)entering the
//! layout. The order of attempts is part of the observable behaviour:
//! 1. the package's last known position, dropped to the floor
//! 2. a raster scan, x outer and y inner, both ascending by the grid stride
//! 3. the same raster scan with length and width swapped
//!
//! The worst case is `O((length / stride) * (width / stride) * n)` collision
//! tests, so very small strides on very long containers get expensive.

use tracing::debug;

use crate::geometry::check_position;
use crate::model::{Container, Package};
use crate::types::{EPSILON_GENERAL, Vec3};

/// Configuration for the placement search.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacementConfig {
    /// Raster stride in millimeters.
    pub grid_stride: f64,
    /// Whether the quarter-turned footprint is tried when the normal one finds no space.
    pub allow_rotation: bool,
}

impl PlacementConfig {
    pub const DEFAULT_GRID_STRIDE: f64 = 100.0;
    pub const DEFAULT_ALLOW_ROTATION: bool = true;

    /// Creates a builder for custom configuration.
    pub fn builder() -> PlacementConfigBuilder {
        PlacementConfigBuilder::default()
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            grid_stride: Self::DEFAULT_GRID_STRIDE,
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
        }
    }
}

/// Builder for `PlacementConfig`.
#[derive(Clone, Debug, Default)]
pub struct PlacementConfigBuilder {
    config: PlacementConfig,
}

impl PlacementConfigBuilder {
    /// Sets the raster stride.
    pub fn grid_stride(mut self, stride: f64) -> Self {
        self.config.grid_stride = stride;
        self
    }

    /// Enables or disables the rotated fallback scan.
    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.config.allow_rotation = allow;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PlacementConfig {
        self.config
    }
}

/// A successful search result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Floor position (z is always 0).
    pub position: Vec3,
    /// `true` when the position is only valid with length and width swapped.
    pub rotated: bool,
}

/// Finds a valid floor position for `package` among the active packages.
///
/// `packages` may contain `package` itself and removed packages; both are ignored.
/// Returns `None` when neither orientation fits anywhere on the raster.
///
/// # Parameters
/// * `package` - The package to place, with its current footprint
/// * `container` - The container
/// * `packages` - The whole package store
/// * `config` - Search configuration
pub fn find_valid_position(
    package: &Package,
    container: &Container,
    packages: &[Package],
    config: &PlacementConfig,
) -> Option<Placement> {
    let last_known = package.position.on_floor();
    if check_position(package, last_known, container, packages).is_free() {
        return Some(Placement {
            position: last_known,
            rotated: false,
        });
    }

    if let Some(position) = scan_floor(package, container, packages, config.grid_stride) {
        return Some(Placement {
            position,
            rotated: false,
        });
    }

    if config.allow_rotation {
        let mut turned = package.clone();
        turned.turn_quarter();
        if let Some(position) = scan_floor(&turned, container, packages, config.grid_stride) {
            return Some(Placement {
                position,
                rotated: true,
            });
        }
    }

    debug!(id = package.id, "no floor position found in either orientation");
    None
}

/// Raster-scans the floor with the package's current footprint.
fn scan_floor(
    package: &Package,
    container: &Container,
    packages: &[Package],
    stride: f64,
) -> Option<Vec3> {
    let xs = axis_positions(container.length, package.length, stride);
    let ys = axis_positions(container.width, package.width, stride);

    for &x in &xs {
        for &y in &ys {
            let candidate = Vec3::new(x, y, 0.0);
            if check_position(package, candidate, container, packages).is_free() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Generates raster positions `0, stride, 2 * stride, ...` up to `container_len - object_len`.
///
/// Positions are computed by multiplication so long scans do not accumulate drift.
/// Returns an empty list when the object is longer than the container.
fn axis_positions(container_len: f64, object_len: f64, stride: f64) -> Vec<f64> {
    let max_pos = container_len - object_len;
    let mut positions = Vec::new();
    if max_pos < -EPSILON_GENERAL || stride <= 0.0 {
        return positions;
    }

    let mut step = 0u32;
    loop {
        let pos = f64::from(step) * stride;
        if pos > max_pos + EPSILON_GENERAL {
            break;
        }
        positions.push(pos);
        step += 1;
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageId;

    fn truck() -> Container {
        Container::new(13200.0, 2200.0, 2900.0).unwrap()
    }

    fn package_at(id: PackageId, x: f64, y: f64, dims: (f64, f64, f64)) -> Package {
        Package::new(id, Vec3::new(x, y, 0.0), dims, 100.0).unwrap()
    }

    #[test]
    fn keeps_last_known_position_when_free() {
        let container = truck();
        let package = package_at(1, 3000.0, 500.0, (1200.0, 800.0, 1000.0));
        let packages = vec![package.clone()];

        let placement =
            find_valid_position(&package, &container, &packages, &PlacementConfig::default())
                .unwrap();
        assert_eq!(placement.position, Vec3::new(3000.0, 500.0, 0.0));
        assert!(!placement.rotated);
    }

    #[test]
    fn last_known_position_is_dropped_to_the_floor() {
        let container = truck();
        let mut package = package_at(1, 3000.0, 500.0, (1200.0, 800.0, 1000.0));
        package.position.z = 400.0;

        let placement =
            find_valid_position(&package, &container, &[], &PlacementConfig::default()).unwrap();
        assert_eq!(placement.position, Vec3::new(3000.0, 500.0, 0.0));
    }

    #[test]
    fn scans_y_inner_before_advancing_x() {
        let container = truck();
        let blocker = package_at(1, 0.0, 0.0, (1200.0, 800.0, 1000.0));
        let package = package_at(2, 500.0, 0.0, (1200.0, 800.0, 1000.0));
        let packages = vec![blocker, package.clone()];

        let placement =
            find_valid_position(&package, &container, &packages, &PlacementConfig::default())
                .unwrap();
        assert_eq!(placement.position, Vec3::new(0.0, 800.0, 0.0));
        assert!(!placement.rotated);
    }

    #[test]
    fn search_is_deterministic() {
        let container = truck();
        let packages = vec![
            package_at(1, 0.0, 0.0, (1200.0, 2200.0, 1000.0)),
            package_at(2, 1200.0, 0.0, (1000.0, 1000.0, 1000.0)),
            package_at(3, 1250.0, 500.0, (900.0, 700.0, 1000.0)),
        ];
        let config = PlacementConfig::default();

        let first = find_valid_position(&packages[2], &container, &packages, &config);
        for _ in 0..5 {
            assert_eq!(
                find_valid_position(&packages[2], &container, &packages, &config),
                first
            );
        }
        assert_eq!(first.unwrap().position, Vec3::new(1200.0, 1000.0, 0.0));
    }

    #[test]
    fn falls_back_to_rotated_footprint() {
        // A 1000 x 2000 corridor only admits the package turned.
        let container = Container::new(1000.0, 2000.0, 2900.0).unwrap();
        let package = package_at(1, 0.0, 0.0, (2000.0, 1000.0, 1000.0));

        let placement =
            find_valid_position(&package, &container, &[], &PlacementConfig::default()).unwrap();
        assert!(placement.rotated);
        assert_eq!(placement.position, Vec3::zero());

        let no_rotation = PlacementConfig::builder().allow_rotation(false).build();
        assert_eq!(
            find_valid_position(&package, &container, &[], &no_rotation),
            None
        );
    }

    #[test]
    fn prefers_normal_orientation_when_both_fit() {
        let container = truck();
        let blocker = package_at(1, 0.0, 0.0, (1200.0, 800.0, 1000.0));
        let package = package_at(2, 0.0, 0.0, (1000.0, 600.0, 1000.0));
        let packages = vec![blocker, package.clone()];

        let placement =
            find_valid_position(&package, &container, &packages, &PlacementConfig::default())
                .unwrap();
        assert!(!placement.rotated);
    }

    #[test]
    fn reports_none_when_floor_is_full() {
        let container = Container::new(2400.0, 800.0, 2900.0).unwrap();
        let packages = vec![
            package_at(1, 0.0, 0.0, (1200.0, 800.0, 1000.0)),
            package_at(2, 1200.0, 0.0, (1200.0, 800.0, 1000.0)),
            package_at(3, 0.0, 0.0, (600.0, 400.0, 1000.0)).removed(),
        ];

        assert_eq!(
            find_valid_position(&packages[2], &container, &packages, &PlacementConfig::default()),
            None
        );
    }

    #[test]
    fn axis_positions_follow_stride() {
        assert_eq!(axis_positions(1000.0, 700.0, 100.0), vec![0.0, 100.0, 200.0, 300.0]);
        assert_eq!(axis_positions(1000.0, 1000.0, 100.0), vec![0.0]);
        assert!(axis_positions(1000.0, 1200.0, 100.0).is_empty());
        assert_eq!(axis_positions(1000.0, 750.0, 100.0), vec![0.0, 100.0, 200.0]);
    }
}
