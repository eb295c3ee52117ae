//! Common value types for container-local geometry.
//!
//! All coordinates are millimeters in the container frame: x runs along the
//! container length, y along its width and z upwards from the floor.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for weight sums and bounds checks, never for the strict overlap test.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in the container frame.
///
/// # Examples
/// ```
/// use load_planner::types::Vec3;
///
/// let origin = Vec3::new(1200.0, 0.0, 0.0);
/// let footprint = Vec3::new(1200.0, 800.0, 1000.0);
/// let far_corner = origin + footprint;
/// assert_eq!(far_corner.x, 2400.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (length axis)
    /// * `y` - Y component (width axis)
    /// * `z` - Z component (height axis)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (container origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format for wire compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Same point moved onto the floor plane.
    #[inline]
    pub const fn on_floor(&self) -> Self {
        Self::new(self.x, self.y, 0.0)
    }

    /// Linear interpolation towards `target` by factor `t`.
    ///
    /// `t = 0` returns `self`, `t = 1` returns `target`.
    #[inline]
    pub fn lerp(&self, target: Self, t: f64) -> Self {
        *self + (target - *self) * t
    }

    /// Checks if all components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + extent)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from position and extent.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks if two bounding boxes overlap with positive volume.
    ///
    /// Uses strict inequalities on every axis: boxes that only share a face,
    /// edge or corner do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Checks whether this box lies inside `outer`, touching allowed.
    #[inline]
    pub fn is_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.min.x >= outer.min.x - tolerance
            && self.min.y >= outer.min.y - tolerance
            && self.min.z >= outer.min.z - tolerance
            && self.max.x <= outer.max.x + tolerance
            && self.max.y <= outer.max.y + tolerance
            && self.max.z <= outer.max.z + tolerance
    }
}
