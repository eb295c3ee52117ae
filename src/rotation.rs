//! Validated quarter turns.

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::{PositionCheck, check_position};
use crate::model::{Container, Package, PackageId};

/// Why a rotation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RotationRejection {
    /// The turned footprint would overlap this active package.
    Collision {
        #[schema(value_type = usize)]
        with: PackageId,
    },
    /// The turned footprint would stick out of the container.
    OutOfBounds,
}

/// Result of a rotation attempt. Rejection is an expected outcome, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationOutcome {
    Rotated { rotation_degrees: u16 },
    Rejected(RotationRejection),
}

/// Turns `package` by 90° in place if the swapped footprint fits at its current position.
///
/// `packages` is the store the package belongs to; the entry with the same id
/// is skipped. On rejection the footprint and `rotation_degrees` are left
/// exactly as they were.
pub fn rotate(package: &mut Package, container: &Container, packages: &[Package]) -> RotationOutcome {
    package.turn_quarter();

    let rejection = match check_position(package, package.position, container, packages) {
        PositionCheck::Free => None,
        PositionCheck::OutOfBounds => Some(RotationRejection::OutOfBounds),
        PositionCheck::Collision(with) => Some(RotationRejection::Collision { with }),
    };

    match rejection {
        None => RotationOutcome::Rotated {
            rotation_degrees: package.rotation_degrees,
        },
        Some(rejection) => {
            package.unturn_quarter();
            RotationOutcome::Rejected(rejection)
        }
    }
}
