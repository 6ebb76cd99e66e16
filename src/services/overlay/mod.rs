// Pending change overlay service
// Ordered set of staged, not-yet-saved edits, at most one per cell

use crate::models::pending_change::{ChangeOp, PendingChange};
use crate::models::period::CellKey;
use crate::models::preference::{EntityKind, PreferenceRecord, PreferenceType};
use uuid::Uuid;

/// What a `stage` call did, so callers can render feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// A change was staged (or an existing staged change replaced).
    Staged(ChangeOp),
    /// A staged-but-unpersisted edit was dropped, returning the cell to its
    /// persisted state.
    Unstaged,
    /// Nothing to do (e.g. clearing an already-empty cell).
    Noop,
}

/// Insertion-ordered mapping from cell to staged change. Restaging a cell
/// replaces its entry in place; the overlay never holds two entries for one
/// cell and never accumulates history.
#[derive(Debug, Clone, Default)]
pub struct PendingChangeOverlay {
    entries: Vec<PendingChange>,
}

impl PendingChangeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages the effect of clicking `cell` with `requested` selected.
    ///
    /// The decision is made against the *displayed* type — the persisted
    /// active type overlaid by any existing staged change — so that clicking
    /// the currently shown preference again clears it (the toggle rule), and
    /// a staged-but-unpersisted cell collapses back to empty rather than
    /// staging a delete against a record that does not exist.
    pub fn stage(
        &mut self,
        cell: CellKey,
        existing: Option<&PreferenceRecord>,
        kind: EntityKind,
        entity_uuid: Uuid,
        requested: Option<PreferenceType>,
    ) -> StageOutcome {
        let persisted = existing.and_then(|record| record.active_type(kind));
        let displayed = match self.get(cell) {
            Some(pending) => pending.display_effect(),
            None => persisted,
        };

        match requested {
            Some(target) if displayed == Some(target) => {
                // Toggle rule: second click on the shown type clears the cell.
                match (existing, persisted) {
                    (Some(record), Some(_)) => {
                        self.put(PendingChange::delete(cell, entity_uuid, record.id))
                    }
                    _ => self.drop_entry(cell),
                }
            }
            Some(target) => match (existing, persisted) {
                (Some(record), Some(_)) => {
                    self.put(PendingChange::update(cell, entity_uuid, record.id, target))
                }
                _ => self.put(PendingChange::create(cell, entity_uuid, target)),
            },
            None => match (existing, persisted) {
                (Some(record), Some(_)) => {
                    self.put(PendingChange::delete(cell, entity_uuid, record.id))
                }
                _ => self.drop_entry(cell),
            },
        }
    }

    /// The staged change for `cell`, if any.
    pub fn get(&self, cell: CellKey) -> Option<&PendingChange> {
        self.entries.iter().find(|entry| entry.cell == cell)
    }

    /// Removes one entry, used when reconciliation settles that cell.
    pub fn remove(&mut self, cell: CellKey) -> Option<PendingChange> {
        let index = self.entries.iter().position(|entry| entry.cell == cell)?;
        Some(self.entries.remove(index))
    }

    /// Drops every staged entry. Discard and post-save reset both land here.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[PendingChange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits the overlay into (creates, updates, deletes), preserving
    /// insertion order within each category.
    pub fn partitioned(&self) -> (Vec<PendingChange>, Vec<PendingChange>, Vec<PendingChange>) {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        for entry in &self.entries {
            match entry.op {
                ChangeOp::Create => creates.push(entry.clone()),
                ChangeOp::Update => updates.push(entry.clone()),
                ChangeOp::Delete => deletes.push(entry.clone()),
            }
        }
        (creates, updates, deletes)
    }

    fn put(&mut self, change: PendingChange) -> StageOutcome {
        let op = change.op;
        match self.entries.iter_mut().find(|entry| entry.cell == change.cell) {
            Some(slot) => *slot = change,
            None => self.entries.push(change),
        }
        StageOutcome::Staged(op)
    }

    fn drop_entry(&mut self, cell: CellKey) -> StageOutcome {
        match self.remove(cell) {
            Some(_) => StageOutcome::Unstaged,
            None => StageOutcome::Noop,
        }
    }
}
