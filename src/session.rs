//! One interactive loading session.
//!
//! `LoadSession` owns the container, the package store and every piece of
//! per-session state (colors, drag, selection, pending notifications) and
//! exposes the operations a front end drives. It is single-threaded by
//! construction: every mutating method takes `&mut self`, so a host running
//! it next to a multi-threaded renderer has to serialize calls onto one owner.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::drag::{DragConfig, DragController, DragSummary, DragTick};
use crate::error::{EngineError, Result};
use crate::geometry::find_violations;
use crate::ingest::parse_batch;
use crate::model::{Container, Membership, Package, PackageId, PackageRecord};
use crate::notify::{ChangeKind, ChangeNotice, ChangeNotifier, DEFAULT_DEBOUNCE};
use crate::palette::ColorAllocator;
use crate::placement::{PlacementConfig, find_valid_position};
use crate::rotation::{RotationOutcome, rotate};
use crate::types::Vec3;
use crate::weight::{WeightSplit, weight_split};

/// Engine tuning shared by all sessions of a process.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub placement: PlacementConfig,
    pub drag: DragConfig,
    pub debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            drag: DragConfig::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Id-indexed package arena. Iteration follows insertion order.
#[derive(Clone, Debug, Default)]
pub struct PackageStore {
    packages: Vec<Package>,
    index: HashMap<PackageId, usize>,
}

impl PackageStore {
    /// Builds a store; ids must be unique.
    pub fn from_packages(packages: Vec<Package>) -> Self {
        let index = packages
            .iter()
            .enumerate()
            .map(|(slot, package)| (package.id, slot))
            .collect();
        Self { packages, index }
    }

    pub fn get(&self, id: PackageId) -> Option<&Package> {
        self.index.get(&id).map(|&slot| &self.packages[slot])
    }

    pub fn get_mut(&mut self, id: PackageId) -> Option<&mut Package> {
        self.index.get(&id).map(|&slot| &mut self.packages[slot])
    }

    pub fn as_slice(&self) -> &[Package] {
        &self.packages
    }

    pub fn as_mut_slice(&mut self) -> &mut [Package] {
        &mut self.packages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn ids_with(&self, membership: Membership) -> Vec<PackageId> {
        self.packages
            .iter()
            .filter(|package| package.membership == membership)
            .map(|package| package.id)
            .collect()
    }
}

/// Per-package appearance tag for the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisualState {
    Normal,
    Selected,
    Dragging,
    CanDrop,
    CannotDrop,
    PartialDrop,
}

impl VisualState {
    fn from_tick(tick: Option<DragTick>) -> Self {
        match tick {
            Some(DragTick::Committed { .. }) => VisualState::CanDrop,
            Some(DragTick::CommittedUnsnapped { .. }) => VisualState::PartialDrop,
            Some(DragTick::Rejected) => VisualState::CannotDrop,
            Some(DragTick::Throttled) | None => VisualState::Dragging,
        }
    }
}

/// Render-facing view of one package.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackageView {
    #[schema(value_type = usize)]
    pub id: PackageId,
    pub position: Vec3,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub rotation_degrees: u16,
    pub weight: f64,
    pub membership: Membership,
    pub color: Option<String>,
    pub visual_state: VisualState,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct FrameState {
    pub container: Container,
    pub packages: Vec<PackageView>,
    pub collision_warning: bool,
    #[schema(value_type = Option<usize>)]
    pub dragging: Option<PackageId>,
    #[schema(value_type = Option<usize>)]
    pub selected: Option<PackageId>,
}

/// Summary of an ingest.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct IngestReport {
    pub active: usize,
    pub removed: usize,
    pub malformed: usize,
    /// Active packages that arrived overlapping or out of bounds.
    #[schema(value_type = Vec<usize>)]
    pub violations: Vec<PackageId>,
}

/// Result of restoring one package.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    Restored { position: Vec3, rotated: bool },
    NoSpace,
}

/// Result of restoring every removed package.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct RestoreAllReport {
    #[schema(value_type = Vec<usize>)]
    pub restored: Vec<PackageId>,
    #[schema(value_type = Vec<usize>)]
    pub no_space: Vec<PackageId>,
}

/// An interactive loading session for one container.
#[derive(Debug)]
pub struct LoadSession {
    container: Container,
    store: PackageStore,
    colors: ColorAllocator,
    drag: DragController,
    notifier: ChangeNotifier,
    placement: PlacementConfig,
    selected: Option<PackageId>,
}

impl LoadSession {
    pub fn new(container: Container, config: EngineConfig) -> Self {
        Self {
            container,
            store: PackageStore::default(),
            colors: ColorAllocator::default(),
            drag: DragController::new(config.drag),
            notifier: ChangeNotifier::new(config.debounce),
            placement: config.placement,
            selected: None,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn packages(&self) -> &[Package] {
        self.store.as_slice()
    }

    pub fn package(&self, id: PackageId) -> Result<&Package> {
        self.store.get(id).ok_or(EngineError::UnknownPackage(id))
    }

    /// Replaces the package set with upstream placement records.
    ///
    /// Malformed records are skipped and counted. Active records that violate
    /// the layout invariants are kept as given and listed in the report.
    pub fn ingest(&mut self, raw_records: &[Value]) -> IngestReport {
        let batch = parse_batch(raw_records);
        // The store is replaced below, so a drag in progress is dropped as is.
        if let Ok(summary) = self.drag.end() {
            warn!(id = summary.package_id, "ingest discarded drag in progress");
        }

        self.store = PackageStore::from_packages(batch.packages);
        self.colors.release_all();
        self.selected = None;
        for id in self.store.ids_with(Membership::Active) {
            self.colors.acquire(id);
        }

        let violations = self.validate();
        let report = IngestReport {
            active: self.store.iter().filter(|p| p.is_active()).count(),
            removed: self.store.iter().filter(|p| !p.is_active()).count(),
            malformed: batch.malformed,
            violations,
        };
        info!(
            active = report.active,
            removed = report.removed,
            malformed = report.malformed,
            "📥 ingested placement data"
        );
        self.notifier
            .structural(ChangeKind::Ingested, self.store.iter().map(|p| p.id).collect());
        report
    }

    /// Current state in the ingest tuple format, in store order.
    pub fn export(&self) -> Vec<PackageRecord> {
        self.store.iter().map(PackageRecord::from_package).collect()
    }

    /// Lists active packages that are out of bounds or overlap another one.
    pub fn validate(&self) -> Vec<PackageId> {
        let violations = find_violations(&self.container, self.store.as_slice());
        if !violations.is_empty() {
            warn!(?violations, "layout violates placement invariants");
        }
        violations
    }

    /// Changes the container dimensions and re-validates without moving anything.
    pub fn set_container(&mut self, dims: [f64; 3]) -> Result<Vec<PackageId>> {
        let container = Container::from_array(dims)?;
        self.finish_drag();
        self.container = container;
        let violations = self.validate();
        info!(
            length = container.length,
            width = container.width,
            height = container.height,
            invalid = violations.len(),
            "container changed"
        );
        self.notifier
            .structural(ChangeKind::ContainerChanged, violations.clone());
        Ok(violations)
    }

    /// Selects a package, or clears the selection with `None`.
    pub fn select(&mut self, id: Option<PackageId>) -> Result<()> {
        if let Some(id) = id {
            self.package(id)?;
        }
        self.selected = id;
        Ok(())
    }

    /// Turns an active package by 90°; a rejection raises the collision warning.
    pub fn rotate(&mut self, id: PackageId, now: Instant) -> Result<RotationOutcome> {
        self.finish_drag();
        let mut package = self.active_package(id)?.clone();

        let outcome = rotate(&mut package, &self.container, self.store.as_slice());
        match outcome {
            RotationOutcome::Rotated { rotation_degrees } => {
                if let Some(slot) = self.store.get_mut(id) {
                    *slot = package;
                }
                info!(id, rotation_degrees, "🔄 package rotated");
                self.notifier.structural(ChangeKind::Rotated, vec![id]);
            }
            RotationOutcome::Rejected(reason) => {
                info!(id, ?reason, "rotation rejected");
                self.drag.raise_warning(now);
            }
        }
        Ok(outcome)
    }

    /// Moves an active package to the removed set, keeping its geometry.
    pub fn delete(&mut self, id: PackageId) -> Result<()> {
        self.finish_drag();
        self.active_package(id)?;
        if let Some(package) = self.store.get_mut(id) {
            package.membership = Membership::Removed;
        }
        self.colors.release(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        info!(id, "🗑️ package deleted");
        self.notifier.structural(ChangeKind::Deleted, vec![id]);
        Ok(())
    }

    /// Brings a removed package back if the placement search finds room.
    pub fn restore(&mut self, id: PackageId) -> Result<RestoreOutcome> {
        self.finish_drag();
        let outcome = self.place_removed(id)?;
        match outcome {
            RestoreOutcome::Restored { .. } => {
                self.notifier.structural(ChangeKind::Restored, vec![id]);
            }
            RestoreOutcome::NoSpace => info!(id, "no space available for restore"),
        }
        Ok(outcome)
    }

    /// Moves every active package to the removed set.
    pub fn remove_all(&mut self) -> Vec<PackageId> {
        self.finish_drag();
        let ids = self.store.ids_with(Membership::Active);
        for package in self.store.as_mut_slice() {
            package.membership = Membership::Removed;
        }
        self.colors.release_all();
        self.selected = None;
        info!(count = ids.len(), "all packages removed");
        self.notifier.structural(ChangeKind::RemovedAll, ids.clone());
        ids
    }

    /// Restores removed packages one by one in store order.
    pub fn restore_all(&mut self) -> RestoreAllReport {
        self.finish_drag();
        let mut report = RestoreAllReport::default();
        for id in self.store.ids_with(Membership::Removed) {
            match self.place_removed(id) {
                Ok(RestoreOutcome::Restored { .. }) => report.restored.push(id),
                Ok(RestoreOutcome::NoSpace) | Err(_) => report.no_space.push(id),
            }
        }
        info!(
            restored = report.restored.len(),
            no_space = report.no_space.len(),
            "restore all finished"
        );
        if !report.restored.is_empty() {
            self.notifier
                .structural(ChangeKind::Restored, report.restored.clone());
        }
        report
    }

    /// Starts dragging the hit-tested package from `point` on its drag plane.
    pub fn start_drag(&mut self, id: PackageId, point: Vec3) -> Result<()> {
        let package = self.store.get(id).ok_or(EngineError::UnknownPackage(id))?;
        self.drag.start(package, point)?;
        self.selected = Some(id);
        Ok(())
    }

    /// Feeds one pointer update into the drag in progress.
    pub fn update_drag(&mut self, point: Vec3, now: Instant) -> Result<DragTick> {
        self.drag
            .update(point, now, &self.container, self.store.as_mut_slice())
    }

    /// Releases the pointer; a moved package is announced after the debounce.
    pub fn end_drag(&mut self, now: Instant) -> Result<DragSummary> {
        let summary = self.drag.end()?;
        if summary.changed {
            self.notifier.record_move(summary.package_id, now);
        }
        Ok(summary)
    }

    /// Aborts the drag and puts the package back where it started.
    pub fn cancel_drag(&mut self) -> Result<DragSummary> {
        self.drag.cancel(self.store.as_mut_slice())
    }

    /// Weight in front of and behind a longitudinal cutoff.
    pub fn weight_split(&self, cutoff_depth: f64) -> WeightSplit {
        weight_split(self.store.as_slice(), cutoff_depth)
    }

    /// Builds the render view for `now`.
    pub fn frame(&self, now: Instant) -> FrameState {
        let dragging = self.drag.session().map(|session| session.package_id());
        let dragging_state =
            VisualState::from_tick(self.drag.session().and_then(|s| s.last_tick()));

        let packages = self
            .store
            .iter()
            .map(|package| {
                let visual_state = if dragging == Some(package.id) {
                    dragging_state
                } else if self.selected == Some(package.id) {
                    VisualState::Selected
                } else {
                    VisualState::Normal
                };
                PackageView {
                    id: package.id,
                    position: package.position,
                    length: package.length,
                    width: package.width,
                    height: package.height,
                    rotation_degrees: package.rotation_degrees,
                    weight: package.weight,
                    membership: package.membership,
                    color: self.colors.color_of(package.id).map(str::to_string),
                    visual_state,
                }
            })
            .collect();

        FrameState {
            container: self.container,
            packages,
            collision_warning: self.drag.warning_active(now),
            dragging,
            selected: self.selected,
        }
    }

    /// Notices ready to be delivered at `now`.
    pub fn drain_notices(&mut self, now: Instant) -> Vec<ChangeNotice> {
        self.notifier.drain(now)
    }

    pub fn next_notice_due(&self) -> Option<Instant> {
        self.notifier.next_due()
    }

    fn active_package(&self, id: PackageId) -> Result<&Package> {
        let package = self.package(id)?;
        if !package.is_active() {
            return Err(EngineError::NotActive(id));
        }
        Ok(package)
    }

    /// Runs the placement search for a removed package and activates it on success.
    fn place_removed(&mut self, id: PackageId) -> Result<RestoreOutcome> {
        let package = self.package(id)?;
        if package.is_active() {
            return Err(EngineError::NotRemoved(id));
        }

        let Some(placement) =
            find_valid_position(package, &self.container, self.store.as_slice(), &self.placement)
        else {
            return Ok(RestoreOutcome::NoSpace);
        };

        if let Some(package) = self.store.get_mut(id) {
            package.position = placement.position;
            if placement.rotated {
                package.turn_quarter();
            }
            package.membership = Membership::Active;
        }
        self.colors.acquire(id);
        info!(
            id,
            x = placement.position.x,
            y = placement.position.y,
            rotated = placement.rotated,
            "♻️ package restored"
        );
        Ok(RestoreOutcome::Restored {
            position: placement.position,
            rotated: placement.rotated,
        })
    }

    /// Finalizes a drag in progress as if the pointer had been released.
    fn finish_drag(&mut self) {
        if self.drag.is_dragging() {
            if let Ok(summary) = self.end_drag(Instant::now()) {
                info!(id = summary.package_id, "drag finalized by structural action");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::collides;
    use crate::rotation::RotationRejection;
    use serde_json::json;

    fn truck_session() -> LoadSession {
        LoadSession::new(
            Container::new(13200.0, 2200.0, 2900.0).unwrap(),
            EngineConfig::default(),
        )
    }

    fn assert_layout_valid(session: &LoadSession) {
        assert!(session.validate().is_empty());
        let active: Vec<_> = session.packages().iter().filter(|p| p.is_active()).collect();
        for a in &active {
            assert!(a.footprint_matches_rotation());
            for b in &active {
                if a.id != b.id {
                    assert!(!collides(a, a.position, b), "{} overlaps {}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn ingest_reports_counts_and_assigns_colors() {
        let mut session = truck_session();
        let report = session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([1200, 0, 0, 1200, 800, 1000, 2, 300]),
            json!([-1, -1, -1, 1200, 800, 1000, 3, 300]),
            json!([0, 0, 0, 1200, 800]),
        ]);

        assert_eq!(report.active, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.malformed, 1);
        assert!(report.violations.is_empty());

        let frame = session.frame(Instant::now());
        assert!(frame.packages[0].color.is_some());
        assert!(frame.packages[2].color.is_none());

        let notices = session.drain_notices(Instant::now());
        assert_eq!(notices[0].kind, ChangeKind::Ingested);
    }

    #[test]
    fn ingest_flags_overlapping_records_without_moving_them() {
        let mut session = truck_session();
        let report = session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([1100, 0, 0, 1200, 800, 1000, 2, 300]),
        ]);

        assert_eq!(report.violations, vec![1, 2]);
        assert_eq!(session.package(2).unwrap().position.x, 1100.0);
    }

    #[test]
    fn rotate_rejection_leaves_package_and_raises_warning() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([0, 900, 0, 1200, 800, 1000, 2, 300]),
        ]);
        session.drain_notices(Instant::now());
        let now = Instant::now();

        let outcome = session.rotate(1, now).unwrap();
        assert_eq!(
            outcome,
            RotationOutcome::Rejected(RotationRejection::Collision { with: 2 })
        );
        let package = session.package(1).unwrap();
        assert_eq!((package.length, package.width), (1200.0, 800.0));
        assert!(session.frame(now).collision_warning);
        assert!(session.drain_notices(now).is_empty());
    }

    #[test]
    fn rotate_success_notifies_immediately() {
        let mut session = truck_session();
        session.ingest(&[json!([0, 0, 0, 1200, 800, 1000, 1, 300])]);
        session.drain_notices(Instant::now());

        let outcome = session.rotate(1, Instant::now()).unwrap();
        assert_eq!(outcome, RotationOutcome::Rotated { rotation_degrees: 90 });
        let notices = session.drain_notices(Instant::now());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, ChangeKind::Rotated);
    }

    #[test]
    fn delete_and_restore_round_trip_color_and_membership() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([1200, 0, 0, 1200, 800, 1000, 2, 300]),
        ]);

        session.delete(1).unwrap();
        assert_eq!(session.package(1).unwrap().membership, Membership::Removed);
        assert_eq!(session.frame(Instant::now()).packages[0].color, None);
        assert!(matches!(session.delete(1), Err(EngineError::NotActive(1))));

        let outcome = session.restore(1).unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                position: Vec3::zero(),
                rotated: false
            }
        );
        assert!(session.frame(Instant::now()).packages[0].color.is_some());
        assert!(matches!(session.restore(1), Err(EngineError::NotRemoved(1))));
        assert_layout_valid(&session);
    }

    #[test]
    fn restore_without_space_keeps_package_removed() {
        let mut session = LoadSession::new(
            Container::new(2400.0, 800.0, 2900.0).unwrap(),
            EngineConfig::default(),
        );
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([1200, 0, 0, 1200, 800, 1000, 3, 300]),
            json!([-1, -1, -1, 1200, 800, 1000, 2, 300]),
        ]);

        assert_eq!(session.restore(2).unwrap(), RestoreOutcome::NoSpace);
        assert_eq!(session.package(2).unwrap().membership, Membership::Removed);
        assert_layout_valid(&session);
    }

    #[test]
    fn restore_uses_rotated_footprint_when_needed() {
        let mut session = LoadSession::new(
            Container::new(2000.0, 2000.0, 2900.0).unwrap(),
            EngineConfig::default(),
        );
        session.ingest(&[
            json!([0, 0, 0, 2000, 1000, 1000, 1, 300]),
            json!([-1, -1, -1, 2000, 1000, 1000, 2, 300]),
            json!([0, 1000, 0, 1000, 1000, 1000, 3, 300]),
        ]);

        let outcome = session.restore(2).unwrap();
        assert_eq!(outcome, RestoreOutcome::NoSpace);

        session.delete(3).unwrap();
        let outcome = session.restore(2).unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                position: Vec3::new(0.0, 1000.0, 0.0),
                rotated: false
            }
        );

        let mut session = LoadSession::new(
            Container::new(2000.0, 2000.0, 2900.0).unwrap(),
            EngineConfig::default(),
        );
        session.ingest(&[
            json!([0, 0, 0, 1000, 2000, 1000, 1, 300]),
            json!([-1, -1, -1, 2000, 1000, 1000, 2, 300]),
        ]);
        let outcome = session.restore(2).unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                position: Vec3::new(1000.0, 0.0, 0.0),
                rotated: true
            }
        );
        let package = session.package(2).unwrap();
        assert_eq!((package.length, package.width), (1000.0, 2000.0));
        assert_eq!(package.rotation_degrees, 90);
        assert_layout_valid(&session);
    }

    #[test]
    fn remove_all_and_restore_all() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([1200, 0, 0, 1200, 800, 1000, 2, 300]),
            json!([-1, -1, -1, 1200, 800, 1000, 3, 300]),
        ]);
        session.drain_notices(Instant::now());

        assert_eq!(session.remove_all(), vec![1, 2]);
        assert!(session.packages().iter().all(|p| !p.is_active()));
        assert_eq!(session.weight_split(5000.0).total, 0.0);

        let report = session.restore_all();
        assert_eq!(report.restored, vec![1, 2, 3]);
        assert!(report.no_space.is_empty());
        assert_layout_valid(&session);

        let kinds: Vec<_> = session
            .drain_notices(Instant::now())
            .iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, vec![ChangeKind::RemovedAll, ChangeKind::Restored]);
    }

    #[test]
    fn drag_session_drives_visual_state_and_debounced_notice() {
        let mut session = LoadSession::new(
            Container::new(13200.0, 2200.0, 2900.0).unwrap(),
            EngineConfig {
                drag: DragConfig {
                    smoothing: 1.0,
                    ..DragConfig::default()
                },
                ..EngineConfig::default()
            },
        );
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([3000, 0, 0, 1200, 800, 1000, 2, 300]),
        ]);
        let t0 = Instant::now();
        session.drain_notices(t0);

        session.start_drag(2, Vec3::new(3000.0, 0.0, 0.0)).unwrap();
        assert_eq!(
            session.frame(t0).packages[1].visual_state,
            VisualState::Dragging
        );

        session.update_drag(Vec3::new(600.0, 0.0, 0.0), t0).unwrap();
        let frame = session.frame(t0);
        assert_eq!(frame.packages[1].visual_state, VisualState::CannotDrop);
        assert!(frame.collision_warning);

        let t1 = t0 + Duration::from_millis(20);
        session.update_drag(Vec3::new(1230.0, 0.0, 0.0), t1).unwrap();
        assert_eq!(
            session.frame(t1).packages[1].visual_state,
            VisualState::CanDrop
        );
        assert_eq!(session.package(2).unwrap().position.x, 1200.0);

        let summary = session.end_drag(t1).unwrap();
        assert!(summary.changed);
        assert_eq!(
            session.frame(t1).packages[1].visual_state,
            VisualState::Selected
        );
        assert!(session.drain_notices(t1).is_empty());

        let notices = session.drain_notices(t1 + Duration::from_millis(150));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, ChangeKind::Moved);
        assert_eq!(notices[0].package_ids, vec![2]);
        assert_layout_valid(&session);
    }

    #[test]
    fn structural_action_finalizes_drag() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([3000, 0, 0, 1200, 800, 1000, 2, 300]),
        ]);
        session.drain_notices(Instant::now());

        session.start_drag(2, Vec3::new(3000.0, 0.0, 0.0)).unwrap();
        session
            .update_drag(Vec3::new(5000.0, 0.0, 0.0), Instant::now())
            .unwrap();
        session.delete(1).unwrap();

        assert!(session.frame(Instant::now()).dragging.is_none());
        let kinds: Vec<_> = session
            .drain_notices(Instant::now())
            .iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, vec![ChangeKind::Moved, ChangeKind::Deleted]);
    }

    #[test]
    fn drag_contract_violations_are_errors() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([-1, -1, -1, 1200, 800, 1000, 2, 300]),
        ]);

        assert!(matches!(
            session.start_drag(9, Vec3::zero()),
            Err(EngineError::UnknownPackage(9))
        ));
        assert!(matches!(
            session.start_drag(2, Vec3::zero()),
            Err(EngineError::NotActive(2))
        ));
        assert!(matches!(
            session.update_drag(Vec3::zero(), Instant::now()),
            Err(EngineError::NoActiveDrag)
        ));
        assert!(matches!(session.cancel_drag(), Err(EngineError::NoActiveDrag)));
    }

    #[test]
    fn shrinking_container_reports_packages_now_outside() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([7000, 0, 0, 1200, 800, 1000, 2, 300]),
        ]);

        let violations = session.set_container([6000.0, 2200.0, 2900.0]).unwrap();
        assert_eq!(violations, vec![2]);
        assert_eq!(session.package(2).unwrap().position.x, 7000.0);

        assert!(matches!(
            session.set_container([0.0, 2200.0, 2900.0]),
            Err(EngineError::InvalidContainer(_))
        ));
        assert_eq!(session.container().length, 6000.0);
    }

    #[test]
    fn export_regenerates_records() {
        let mut session = truck_session();
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([3000, 0, 0, 1200, 800, 1000, 2, 300]),
        ]);
        session.rotate(2, Instant::now()).unwrap();
        session.delete(1).unwrap();

        let records = session.export();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_unplaced());
        assert_eq!(records[1].x, 3000.0);
        assert_eq!((records[1].length, records[1].width), (800.0, 1200.0));
    }

    #[test]
    fn non_overlap_survives_mixed_operation_sequence() {
        let mut session = LoadSession::new(
            Container::new(4800.0, 2400.0, 2900.0).unwrap(),
            EngineConfig {
                drag: DragConfig {
                    smoothing: 1.0,
                    ..DragConfig::default()
                },
                ..EngineConfig::default()
            },
        );
        session.ingest(&[
            json!([0, 0, 0, 1200, 800, 1000, 1, 300]),
            json!([1200, 0, 0, 1200, 800, 1000, 2, 300]),
            json!([2400, 0, 0, 1200, 800, 1000, 3, 300]),
            json!([0, 800, 0, 1000, 1000, 1000, 4, 300]),
            json!([-1, -1, -1, 1600, 1200, 1000, 5, 300]),
        ]);

        let mut now = Instant::now();
        let step = Duration::from_millis(20);
        for id in [1, 2, 3, 4] {
            session.rotate(id, now).unwrap();
            assert_layout_valid(&session);
        }
        session.restore(5).unwrap();
        assert_layout_valid(&session);

        session.start_drag(4, Vec3::new(500.0, 1300.0, 0.0)).unwrap();
        for (x, y) in [(900.0, 1300.0), (2600.0, 400.0), (4000.0, 2000.0), (100.0, 100.0)] {
            now += step;
            session.update_drag(Vec3::new(x, y, 0.0), now).unwrap();
            assert_layout_valid(&session);
        }
        session.end_drag(now).unwrap();

        session.delete(2).unwrap();
        if session.package(5).unwrap().is_active() {
            session.rotate(5, now).unwrap();
        }
        session.restore(2).unwrap();
        assert_layout_valid(&session);
    }
}
