// Cell view resolver service
// Combines store, overlay, and in-flight bookkeeping into a render value

use std::collections::HashSet;

use crate::models::period::CellKey;
use crate::models::preference::{EntityKind, PreferenceType};
use crate::services::overlay::PendingChangeOverlay;
use crate::services::store::PreferenceStore;

/// Everything a UI needs to paint one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    /// The server-persisted active type, ignoring staged edits.
    pub persisted: Option<PreferenceType>,
    /// What the cell should show: the persisted type overlaid by any staged
    /// change (create/update show the target, delete shows empty).
    pub display: Option<PreferenceType>,
    pub has_pending: bool,
    /// True while reconciliation has an outstanding request for this cell.
    pub in_flight: bool,
}

/// Read-only resolver over the session's state. Side-effect free and cheap
/// enough to call on every render tick; performs no I/O.
pub struct CellViewResolver<'a> {
    store: &'a PreferenceStore,
    overlay: &'a PendingChangeOverlay,
    in_flight: &'a HashSet<CellKey>,
    kind: EntityKind,
}

impl<'a> CellViewResolver<'a> {
    pub fn new(
        store: &'a PreferenceStore,
        overlay: &'a PendingChangeOverlay,
        in_flight: &'a HashSet<CellKey>,
        kind: EntityKind,
    ) -> Self {
        Self {
            store,
            overlay,
            in_flight,
            kind,
        }
    }

    pub fn view(&self, cell: CellKey) -> CellView {
        let persisted = self
            .store
            .record(cell)
            .and_then(|record| record.active_type(self.kind));

        let pending = self.overlay.get(cell);
        let display = match pending {
            Some(change) => change.display_effect(),
            None => persisted,
        };

        CellView {
            persisted,
            display,
            has_pending: pending.is_some(),
            in_flight: self.in_flight.contains(&cell),
        }
    }
}
