// Preference store service
// Last-fetched, server-authoritative records for the bound entity

use std::collections::HashMap;

use crate::models::period::CellKey;
use crate::models::preference::PreferenceRecord;

/// Holds the server's view of the grid, keyed by cell. Only the engine's own
/// operations (load, post-save refresh, context switch) replace its contents.
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    records: HashMap<CellKey, PreferenceRecord>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole store with a fresh fetch. The server enforces one
    /// record per cell; if that assumption is ever violated the later record
    /// wins and the collision is logged.
    pub fn replace_all(&mut self, records: Vec<PreferenceRecord>) {
        self.records.clear();
        for record in records {
            if let Some(previous) = self.records.insert(record.cell, record) {
                log::warn!(
                    "Duplicate preference records for cell {}; keeping the later one (displaced record id {})",
                    previous.cell,
                    previous.id
                );
            }
        }
    }

    pub fn record(&self, cell: CellKey) -> Option<&PreferenceRecord> {
        self.records.get(&cell)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
