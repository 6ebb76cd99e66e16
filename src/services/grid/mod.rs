// Grid index service
// Computed, read-only view of which (period, day) cells exist

use crate::models::period::{CellKey, Period, PeriodId};

/// The addressable shape of the grid, derived from the period list. Rebuilt
/// wholesale whenever the period list changes; building is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridIndex {
    periods: Vec<Period>,
    days: Vec<u8>,
    cell_keys: Vec<CellKey>,
}

impl GridIndex {
    /// Builds the index from a period list. An empty period list, or one
    /// whose periods reference no valid days, yields an empty grid — a valid
    /// state, not an error.
    pub fn build(periods: &[Period]) -> Self {
        let mut days: Vec<u8> = periods
            .iter()
            .flat_map(|period| period.effective_days())
            .collect();
        days.sort_unstable();
        days.dedup();

        let cell_keys = periods
            .iter()
            .flat_map(|period| {
                period
                    .effective_days()
                    .into_iter()
                    .map(|day| CellKey::new(period.id, day))
            })
            .collect();

        Self {
            periods: periods.to_vec(),
            days,
            cell_keys,
        }
    }

    /// Distinct day numbers in use, ascending.
    pub fn days(&self) -> &[u8] {
        &self.days
    }

    /// Periods in their supplied display order.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Every addressable cell, period-major.
    pub fn cell_keys(&self) -> &[CellKey] {
        &self.cell_keys
    }

    pub fn contains(&self, cell: CellKey) -> bool {
        self.cell_keys.contains(&cell)
    }

    pub fn period(&self, id: PeriodId) -> Option<&Period> {
        self.periods.iter().find(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.cell_keys.is_empty()
    }
}
