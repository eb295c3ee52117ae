//! Data models for the interactive loading session.
//!
//! This module defines the plain value records the engine operates on:
//! - `Container`: the fixed-size truck bed
//! - `Package`: a cargo item with its current footprint and membership
//! - `PackageRecord`: the 8-field tuple exchanged with upstream planning and persistence
//!
//! None of these types carry behaviour beyond validation and simple accessors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{BoundingBox, Vec3};

/// Caller-assigned, stable package identifier.
pub type PackageId = usize;

/// Validation error for container and package data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive and finite, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "Weight must be non-negative and finite, got: {}",
            value
        )));
    }
    Ok(())
}

/// The truck bed packages are placed in.
///
/// # Fields
/// * `length` - Extent along x (driving direction)
/// * `width` - Extent along y
/// * `height` - Extent along z
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Container {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Container {
    /// Creates a container after validating all three dimensions.
    ///
    /// # Examples
    /// ```
    /// use load_planner::model::Container;
    ///
    /// assert!(Container::new(13200.0, 2200.0, 2900.0).is_ok());
    /// assert!(Container::new(0.0, 2200.0, 2900.0).is_err());
    /// ```
    pub fn new(length: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        validate_dimension(length, "Container length")?;
        validate_dimension(width, "Container width")?;
        validate_dimension(height, "Container height")?;
        Ok(Self {
            length,
            width,
            height,
        })
    }

    /// Builds a container from the `[length, width, height]` configuration triple.
    pub fn from_array(dims: [f64; 3]) -> Result<Self, ValidationError> {
        Self::new(dims[0], dims[1], dims[2])
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(
            Vec3::zero(),
            Vec3::new(self.length, self.width, self.height),
        )
    }
}

/// Whether a package currently takes part in the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Active,
    Removed,
}

/// A cargo package.
///
/// `length` and `width` are the current effective footprint and swap on every
/// quarter turn; `original_length` and `original_width` are captured once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Package {
    #[schema(value_type = usize)]
    pub id: PackageId,
    pub position: Vec3,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub original_length: f64,
    pub original_width: f64,
    pub rotation_degrees: u16,
    pub weight: f64,
    pub membership: Membership,
}

impl Package {
    /// Creates an active, unrotated package with validation.
    pub fn new(
        id: PackageId,
        position: Vec3,
        dims: (f64, f64, f64),
        weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dimension(dims.0, "Length")?;
        validate_dimension(dims.1, "Width")?;
        validate_dimension(dims.2, "Height")?;
        validate_weight_value(weight)?;
        if !position.is_finite() {
            return Err(ValidationError::InvalidDimension(
                "Position must be finite".to_string(),
            ));
        }

        Ok(Self {
            id,
            position,
            length: dims.0,
            width: dims.1,
            height: dims.2,
            original_length: dims.0,
            original_width: dims.1,
            rotation_degrees: 0,
            weight,
            membership: Membership::Active,
        })
    }

    /// Same package marked as removed.
    pub fn removed(mut self) -> Self {
        self.membership = Membership::Removed;
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.membership == Membership::Active
    }

    /// Current extent as a vector (length, width, height).
    #[inline]
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }

    /// Bounding box at the package's own position.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box_at(self.position)
    }

    /// Bounding box the package would occupy at `position`.
    #[inline]
    pub fn bounding_box_at(&self, position: Vec3) -> BoundingBox {
        BoundingBox::from_position_and_dims(position, self.extent())
    }

    /// Whether the current footprint is the quarter-turned original.
    #[inline]
    pub fn is_quarter_turned(&self) -> bool {
        self.rotation_degrees % 180 == 90
    }

    /// Swaps length and width and advances the rotation by 90°.
    pub fn turn_quarter(&mut self) {
        std::mem::swap(&mut self.length, &mut self.width);
        self.rotation_degrees = (self.rotation_degrees + 90) % 360;
    }

    /// Reverts a previous `turn_quarter`.
    pub fn unturn_quarter(&mut self) {
        std::mem::swap(&mut self.length, &mut self.width);
        self.rotation_degrees = (self.rotation_degrees + 270) % 360;
    }

    /// Checks the rotation/footprint bookkeeping.
    pub fn footprint_matches_rotation(&self) -> bool {
        if self.is_quarter_turned() {
            self.length == self.original_width && self.width == self.original_length
        } else {
            self.length == self.original_length && self.width == self.original_width
        }
    }
}

/// Marker coordinate for packages that are not placed.
pub const UNPLACED_COORDINATE: f64 = -1.0;

/// Ids at or above this value do not fit a `PackageId`.
const MAX_RECORD_ID: f64 = usize::MAX as f64;

/// Fixed-shape tuple `[x, y, z, length, width, height, id, weight]`.
///
/// Used both for the upstream placement data and for the export handed to
/// the persistence side.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 8]", into = "[f64; 8]")]
pub struct PackageRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub id: f64,
    pub weight: f64,
}

impl PackageRecord {
    /// Whether the record encodes an unplaced (removed) package.
    pub fn is_unplaced(&self) -> bool {
        self.x == UNPLACED_COORDINATE
            && self.y == UNPLACED_COORDINATE
            && self.z == UNPLACED_COORDINATE
    }

    /// Converts the record into a package, routing unplaced records to `Removed`.
    pub fn into_package(self) -> Result<Package, ValidationError> {
        let fields = [
            self.x,
            self.y,
            self.z,
            self.length,
            self.width,
            self.height,
            self.id,
            self.weight,
        ];
        if fields.iter().any(|value| !value.is_finite()) {
            return Err(ValidationError::InvalidDimension(
                "Record contains non-finite values".to_string(),
            ));
        }
        if self.id < 0.0 || self.id.fract() != 0.0 || self.id >= MAX_RECORD_ID {
            return Err(ValidationError::InvalidId(format!(
                "Package id must be a non-negative integer, got: {}",
                self.id
            )));
        }

        let unplaced = self.is_unplaced();
        let position = if unplaced {
            Vec3::zero()
        } else {
            Vec3::new(self.x, self.y, self.z)
        };
        let package = Package::new(
            self.id as PackageId,
            position,
            (self.length, self.width, self.height),
            self.weight,
        )?;

        Ok(if unplaced { package.removed() } else { package })
    }

    /// Exports a package in the current state; removed packages get the unplaced marker.
    pub fn from_package(package: &Package) -> Self {
        let (x, y, z) = if package.is_active() {
            package.position.as_tuple()
        } else {
            (UNPLACED_COORDINATE, UNPLACED_COORDINATE, UNPLACED_COORDINATE)
        };
        Self {
            x,
            y,
            z,
            length: package.length,
            width: package.width,
            height: package.height,
            id: package.id as f64,
            weight: package.weight,
        }
    }
}

impl From<[f64; 8]> for PackageRecord {
    fn from(raw: [f64; 8]) -> Self {
        Self {
            x: raw[0],
            y: raw[1],
            z: raw[2],
            length: raw[3],
            width: raw[4],
            height: raw[5],
            id: raw[6],
            weight: raw[7],
        }
    }
}

impl From<PackageRecord> for [f64; 8] {
    fn from(record: PackageRecord) -> Self {
        [
            record.x,
            record.y,
            record.z,
            record.length,
            record.width,
            record.height,
            record.id,
            record.weight,
        ]
    }
}
