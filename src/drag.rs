//! Pointer-driven drag sessions.
//!
//! A `DragController` turns drag-plane intersection points into validated
//! position commits. It is either idle or owns exactly one `DragSession`;
//! all per-drag state (pointer offset, smoothing origin, start position) lives
//! in that session and disappears with it.
//!
//! Per update tick:
//! 1. `raw = point + offset`, smoothed towards it from the last committed position
//! 2. clamped so the footprint stays inside the container
//! 3. snapped to nearby edges; committed if valid
//! 4. otherwise the un-snapped position is tried and committed if valid
//! 5. otherwise the tick is rejected and the collision warning is raised

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::EngineError;
use crate::geometry::check_position;
use crate::model::{Container, Package, PackageId};
use crate::snap::{DEFAULT_SNAP_THRESHOLD, snap};
use crate::types::Vec3;

/// Tuning for drag interaction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragConfig {
    /// Maximum edge distance that snaps flush.
    pub snap_threshold: f64,
    /// Blend factor towards the raw pointer position (1.0 = no smoothing).
    pub smoothing: f64,
    /// Minimum time between two processed updates.
    pub tick_interval: Duration,
    /// How long a collision warning stays visible after being raised.
    pub warning_duration: Duration,
}

impl DragConfig {
    pub const DEFAULT_SMOOTHING: f64 = 0.9;
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);
    pub const DEFAULT_WARNING_DURATION: Duration = Duration::from_millis(1500);
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            smoothing: Self::DEFAULT_SMOOTHING,
            tick_interval: Self::DEFAULT_TICK_INTERVAL,
            warning_duration: Self::DEFAULT_WARNING_DURATION,
        }
    }
}

/// Outcome of a single update tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DragTick {
    /// The snapped position was valid and committed.
    Committed { position: Vec3 },
    /// Snapping was blocked; the un-snapped position was committed instead.
    CommittedUnsnapped { position: Vec3 },
    /// Neither position was valid; the package did not move.
    Rejected,
    /// Arrived within the same tick as the previous update and was ignored.
    Throttled,
}

/// What happened to a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct DragSummary {
    #[schema(value_type = usize)]
    pub package_id: PackageId,
    /// Final position of the package.
    pub position: Vec3,
    /// `true` if the package ends somewhere other than where the drag started.
    pub changed: bool,
}

/// State of one in-progress drag.
#[derive(Clone, Debug)]
pub struct DragSession {
    package_id: PackageId,
    offset: Vec3,
    start_position: Vec3,
    last_committed: Vec3,
    committed_any: bool,
    last_update: Option<Instant>,
    last_tick: Option<DragTick>,
}

impl DragSession {
    pub fn package_id(&self) -> PackageId {
        self.package_id
    }

    /// Outcome of the most recent processed tick, if any.
    pub fn last_tick(&self) -> Option<DragTick> {
        self.last_tick
    }
}

/// Transient collision advisory that expires on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollisionWarning {
    raised_at: Option<Instant>,
}

impl CollisionWarning {
    pub fn raise(&mut self, now: Instant) {
        self.raised_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.raised_at = None;
    }

    /// Whether the warning is still showing at `now`.
    pub fn is_active(&self, now: Instant, duration: Duration) -> bool {
        self.raised_at
            .is_some_and(|raised| now.saturating_duration_since(raised) < duration)
    }
}

/// Drag state machine: `Idle` while `session` is `None`, `Dragging` otherwise.
#[derive(Debug)]
pub struct DragController {
    config: DragConfig,
    session: Option<DragSession>,
    warning: CollisionWarning,
}

impl DragController {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            session: None,
            warning: CollisionWarning::default(),
        }
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Raises the shared collision warning (also used for rejected rotations).
    pub fn raise_warning(&mut self, now: Instant) {
        self.warning.raise(now);
    }

    pub fn warning_active(&self, now: Instant) -> bool {
        self.warning.is_active(now, self.config.warning_duration)
    }

    /// Begins dragging `package` from the pointer hit `point`.
    pub fn start(&mut self, package: &Package, point: Vec3) -> Result<(), EngineError> {
        if let Some(session) = &self.session {
            return Err(EngineError::DragInProgress(session.package_id));
        }
        if !package.is_active() {
            return Err(EngineError::NotActive(package.id));
        }

        self.session = Some(DragSession {
            package_id: package.id,
            offset: package.position - point,
            start_position: package.position,
            last_committed: package.position,
            committed_any: false,
            last_update: None,
            last_tick: None,
        });
        debug!(id = package.id, "drag started");
        Ok(())
    }

    /// Processes one pointer update and commits the resulting position if valid.
    ///
    /// `packages` is the whole store; only the dragged entry is modified.
    pub fn update(
        &mut self,
        point: Vec3,
        now: Instant,
        container: &Container,
        packages: &mut [Package],
    ) -> Result<DragTick, EngineError> {
        let config = self.config;
        let session = self.session.as_mut().ok_or(EngineError::NoActiveDrag)?;

        if let Some(last) = session.last_update {
            if now.saturating_duration_since(last) < config.tick_interval {
                return Ok(DragTick::Throttled);
            }
        }
        session.last_update = Some(now);

        let index = packages
            .iter()
            .position(|p| p.id == session.package_id)
            .ok_or(EngineError::UnknownPackage(session.package_id))?;

        let tick = {
            let store: &[Package] = packages;
            let package = &store[index];

            let raw = point + session.offset;
            let mut smoothed = session.last_committed.lerp(raw, config.smoothing);
            smoothed.x = clamp_axis(smoothed.x, container.length - package.length);
            smoothed.y = clamp_axis(smoothed.y, container.width - package.width);
            smoothed.z = session.last_committed.z;

            let snapped = snap(package, smoothed, store, config.snap_threshold);
            if check_position(package, snapped, container, store).is_free() {
                DragTick::Committed { position: snapped }
            } else if snapped != smoothed
                && check_position(package, smoothed, container, store).is_free()
            {
                DragTick::CommittedUnsnapped { position: smoothed }
            } else {
                DragTick::Rejected
            }
        };

        match tick {
            DragTick::Committed { position } | DragTick::CommittedUnsnapped { position } => {
                packages[index].position = position;
                session.last_committed = position;
                session.committed_any = true;
                self.warning.clear();
            }
            _ => {
                debug!(id = session.package_id, "drag tick rejected");
                self.warning.raise(now);
            }
        }
        session.last_tick = Some(tick);
        Ok(tick)
    }

    /// Releases the pointer and finalizes the session.
    pub fn end(&mut self) -> Result<DragSummary, EngineError> {
        let session = self.session.take().ok_or(EngineError::NoActiveDrag)?;
        Ok(DragSummary {
            package_id: session.package_id,
            position: session.last_committed,
            changed: session.committed_any && session.last_committed != session.start_position,
        })
    }

    /// Aborts the session and moves the package back to where the drag started.
    pub fn cancel(&mut self, packages: &mut [Package]) -> Result<DragSummary, EngineError> {
        let session = self.session.take().ok_or(EngineError::NoActiveDrag)?;
        if let Some(package) = packages.iter_mut().find(|p| p.id == session.package_id) {
            package.position = session.start_position;
        }
        debug!(id = session.package_id, "drag cancelled");
        Ok(DragSummary {
            package_id: session.package_id,
            position: session.start_position,
            changed: false,
        })
    }
}

/// Clamps a coordinate into `[0, max]`; a negative `max` is returned as is.
fn clamp_axis(value: f64, max: f64) -> f64 {
    if max < 0.0 { max } else { value.clamp(0.0, max) }
}
