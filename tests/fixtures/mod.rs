// Test fixtures - reusable builders and a scriptable persistence fake
// Provides consistent test data across all test files

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;
use uuid::Uuid;

use preference_grid::models::period::{CellKey, Period};
use preference_grid::models::preference::{
    FlagSet, PreferenceRecord, PreferenceType, RecordId,
};
use preference_grid::services::persistence::PreferencePersistence;

/// A single period on days 1 and 2 — the smallest interesting grid.
pub fn single_period() -> Vec<Period> {
    vec![Period::with_days(1, "Period 1", vec![1, 2])]
}

pub fn record(
    id: RecordId,
    entity: Uuid,
    cell: CellKey,
    preference: PreferenceType,
) -> PreferenceRecord {
    PreferenceRecord::new(id, entity, cell, FlagSet::from_type(preference))
}

/// One recorded call against the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(Uuid),
    Create(Uuid, CellKey, PreferenceType),
    Update(RecordId, CellKey, PreferenceType),
    Delete(RecordId),
}

#[derive(Default)]
struct ServerState {
    /// Records returned by fetch, per entity.
    records: HashMap<Uuid, Vec<PreferenceRecord>>,
    calls: Vec<Call>,
    /// Cells whose mutations are scripted to fail.
    fail_cells: Vec<CellKey>,
}

/// In-memory preference server: mutations are applied to the per-entity
/// record list so the post-save refetch sees them, calls are logged, and
/// individual cells can be scripted to fail. An optional gate lets a test
/// hold every mutation open to observe in-flight state or force a context
/// switch mid-batch.
#[derive(Default)]
pub struct FakeServer {
    state: Mutex<ServerState>,
    next_id: AtomicI64,
    gate: Option<Arc<Semaphore>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    /// Mutations block until permits are added to the returned gate
    /// (`gate.add_permits(n)` releases n held calls).
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let server = Self {
            next_id: AtomicI64::new(100),
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (server, gate)
    }

    pub fn seed(&self, entity: Uuid, records: Vec<PreferenceRecord>) {
        self.state.lock().unwrap().records.insert(entity, records);
    }

    pub fn fail_cell(&self, cell: CellKey) {
        self.state.lock().unwrap().fail_cells.push(cell);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn check_cell(&self, cell: CellKey) -> Result<()> {
        if self.state.lock().unwrap().fail_cells.contains(&cell) {
            bail!("simulated failure for cell {cell}");
        }
        Ok(())
    }
}

#[async_trait]
impl PreferencePersistence for FakeServer {
    async fn fetch_preferences(
        &self,
        entity: Uuid,
        _scope: Option<Uuid>,
    ) -> Result<Vec<PreferenceRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Fetch(entity));
        Ok(state.records.get(&entity).cloned().unwrap_or_default())
    }

    async fn create_preference(
        &self,
        entity: Uuid,
        cell: CellKey,
        preference: PreferenceType,
    ) -> Result<PreferenceRecord> {
        self.wait_for_gate().await;
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Create(entity, cell, preference));
        self.check_cell(cell)?;

        let created = record(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            entity,
            cell,
            preference,
        );
        self.state
            .lock()
            .unwrap()
            .records
            .entry(entity)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_preference(
        &self,
        record_id: RecordId,
        cell: CellKey,
        preference: PreferenceType,
    ) -> Result<PreferenceRecord> {
        self.wait_for_gate().await;
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Update(record_id, cell, preference));
        self.check_cell(cell)?;

        let mut state = self.state.lock().unwrap();
        for records in state.records.values_mut() {
            if let Some(existing) = records.iter_mut().find(|r| r.id == record_id) {
                existing.flags = FlagSet::from_type(preference);
                return Ok(existing.clone());
            }
        }
        bail!("record {record_id} not found");
    }

    async fn delete_preference(&self, record_id: RecordId) -> Result<()> {
        self.wait_for_gate().await;
        self.state.lock().unwrap().calls.push(Call::Delete(record_id));

        let mut state = self.state.lock().unwrap();
        for records in state.records.values_mut() {
            if let Some(index) = records.iter().position(|r| r.id == record_id) {
                records.remove(index);
                return Ok(());
            }
        }
        bail!("record {record_id} not found");
    }
}
