//! Change notifications for persistence and re-render collaborators.
//!
//! Structural actions (rotate, delete, restore, remove-all, container change,
//! ingest) are queued immediately. Finished drags are coalesced: every drag end
//! pushes the deadline out by the debounce interval, and all packages moved in
//! the meantime go out as one `Moved` notice.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::PackageId;

/// Default debounce for drag notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// What changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Ingested,
    Moved,
    Rotated,
    Deleted,
    Restored,
    RemovedAll,
    ContainerChanged,
}

impl ChangeKind {
    pub fn is_structural(&self) -> bool {
        !matches!(self, ChangeKind::Moved)
    }
}

/// One notification handed to collaborators.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ChangeNotice {
    /// Monotonic counter, starting at 1 per session.
    pub sequence: u64,
    pub kind: ChangeKind,
    #[schema(value_type = Vec<usize>)]
    pub package_ids: Vec<PackageId>,
}

/// Queue of outgoing notices with drag debouncing.
#[derive(Debug)]
pub struct ChangeNotifier {
    debounce: Duration,
    pending_moves: Vec<PackageId>,
    due: Option<Instant>,
    outbox: VecDeque<ChangeNotice>,
    sequence: u64,
}

impl ChangeNotifier {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending_moves: Vec::new(),
            due: None,
            outbox: VecDeque::new(),
            sequence: 0,
        }
    }

    /// Queues a structural notice. Pending moves are flushed first to keep ordering.
    pub fn structural(&mut self, kind: ChangeKind, package_ids: Vec<PackageId>) {
        self.flush_moves();
        self.push(kind, package_ids);
    }

    /// Records a committed drag; goes out once `debounce` passes without another one.
    pub fn record_move(&mut self, id: PackageId, now: Instant) {
        if !self.pending_moves.contains(&id) {
            self.pending_moves.push(id);
        }
        self.due = Some(now + self.debounce);
    }

    /// When the pending move notice becomes due, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.due
    }

    /// Takes every notice ready at `now`.
    pub fn drain(&mut self, now: Instant) -> Vec<ChangeNotice> {
        if self.due.is_some_and(|due| now >= due) {
            self.flush_moves();
        }
        self.outbox.drain(..).collect()
    }

    fn flush_moves(&mut self) {
        self.due = None;
        if self.pending_moves.is_empty() {
            return;
        }
        let moved = std::mem::take(&mut self.pending_moves);
        self.push(ChangeKind::Moved, moved);
    }

    fn push(&mut self, kind: ChangeKind, package_ids: Vec<PackageId>) {
        self.sequence += 1;
        self.outbox.push_back(ChangeNotice {
            sequence: self.sequence,
            kind,
            package_ids,
        });
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
