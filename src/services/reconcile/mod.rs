// Reconciliation service
// Drains staged changes against the remote store, one outcome per entry

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use uuid::Uuid;

use crate::models::pending_change::{ChangeOp, PendingChange};
use crate::models::period::CellKey;
use crate::services::persistence::PreferencePersistence;

/// One staged entry's failure: data, not an exception, so a bad cell can
/// never abort the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    pub cell: CellKey,
    pub op: ChangeOp,
    pub message: String,
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} failed: {}", self.op, self.cell, self.message)
    }
}

/// Aggregate outcome of one save batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub errors: Vec<EntryError>,
}

impl BatchResult {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs one batch of staged changes against the remote store.
///
/// Categories are processed in the fixed order creates, then updates, then
/// deletes; within a category every call is dispatched concurrently (the
/// overlay guarantees no two entries share a cell, so this is race-free).
/// Each entry's cell is marked in `in_flight` before its call goes out and
/// cleared when the call settles, success or failure.
pub async fn run_batch(
    client: Arc<dyn PreferencePersistence>,
    entity: Uuid,
    changes: Vec<PendingChange>,
    in_flight: Arc<Mutex<HashSet<CellKey>>>,
) -> BatchResult {
    let mut result = BatchResult {
        total: changes.len(),
        ..BatchResult::default()
    };

    let mut creates = Vec::new();
    let mut updates = Vec::new();
    let mut deletes = Vec::new();
    for change in changes {
        match change.op {
            ChangeOp::Create => creates.push(change),
            ChangeOp::Update => updates.push(change),
            ChangeOp::Delete => deletes.push(change),
        }
    }

    for group in [creates, updates, deletes] {
        run_category(&client, entity, group, &in_flight, &mut result).await;
    }

    if result.is_clean() {
        log::debug!("Preference batch settled cleanly: {} entries", result.total);
    } else {
        log::warn!(
            "Preference batch settled with errors: {} of {} entries failed",
            result.failed(),
            result.total
        );
    }

    result
}

async fn run_category(
    client: &Arc<dyn PreferencePersistence>,
    entity: Uuid,
    group: Vec<PendingChange>,
    in_flight: &Arc<Mutex<HashSet<CellKey>>>,
    result: &mut BatchResult,
) {
    let mut tasks = Vec::with_capacity(group.len());
    for change in group {
        let cell = change.cell;
        let op = change.op;
        lock_flags(in_flight).insert(cell);

        let client = Arc::clone(client);
        let in_flight = Arc::clone(in_flight);
        let handle = tokio::spawn(async move {
            let outcome = dispatch(client.as_ref(), entity, &change).await;
            lock_flags(&in_flight).remove(&change.cell);
            outcome
        });
        tasks.push((cell, op, handle));
    }

    for (cell, op, handle) in tasks {
        match handle.await {
            Ok(Ok(())) => result.succeeded += 1,
            Ok(Err(err)) => {
                log::warn!("Preference {} for cell {} failed: {:#}", op, cell, err);
                result.errors.push(EntryError {
                    cell,
                    op,
                    message: format!("{err:#}"),
                });
            }
            Err(join_err) => {
                // The task never reached its own cleanup.
                lock_flags(in_flight).remove(&cell);
                result.errors.push(EntryError {
                    cell,
                    op,
                    message: format!("dispatch task failed: {join_err}"),
                });
            }
        }
    }
}

fn lock_flags(flags: &Mutex<HashSet<CellKey>>) -> std::sync::MutexGuard<'_, HashSet<CellKey>> {
    flags.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn dispatch(
    client: &dyn PreferencePersistence,
    entity: Uuid,
    change: &PendingChange,
) -> anyhow::Result<()> {
    match change.op {
        ChangeOp::Create => {
            let target = change
                .target
                .ok_or_else(|| anyhow!("staged create for {} has no target type", change.cell))?;
            client.create_preference(entity, change.cell, target).await?;
        }
        ChangeOp::Update => {
            let record_id = change
                .record_id
                .ok_or_else(|| anyhow!("staged update for {} has no record id", change.cell))?;
            let target = change
                .target
                .ok_or_else(|| anyhow!("staged update for {} has no target type", change.cell))?;
            client.update_preference(record_id, change.cell, target).await?;
        }
        ChangeOp::Delete => {
            let record_id = change
                .record_id
                .ok_or_else(|| anyhow!("staged delete for {} has no record id", change.cell))?;
            client.delete_preference(record_id).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::preference::{FlagSet, PreferenceRecord, PreferenceType, RecordId};
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    /// Minimal scripted collaborator: records the order calls arrive in and
    /// fails any cell listed in `fail_cells`.
    #[derive(Default)]
    struct ScriptedClient {
        calls: Mutex<Vec<(ChangeOp, CellKey)>>,
        fail_cells: Vec<CellKey>,
    }

    impl ScriptedClient {
        fn check(&self, op: ChangeOp, cell: CellKey) -> Result<()> {
            self.calls.lock().unwrap().push((op, cell));
            if self.fail_cells.contains(&cell) {
                bail!("simulated transport failure");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PreferencePersistence for ScriptedClient {
        async fn fetch_preferences(
            &self,
            _entity: Uuid,
            _scope: Option<Uuid>,
        ) -> Result<Vec<PreferenceRecord>> {
            Ok(Vec::new())
        }

        async fn create_preference(
            &self,
            entity: Uuid,
            cell: CellKey,
            preference: PreferenceType,
        ) -> Result<PreferenceRecord> {
            self.check(ChangeOp::Create, cell)?;
            Ok(PreferenceRecord::new(1, entity, cell, FlagSet::from_type(preference)))
        }

        async fn update_preference(
            &self,
            record_id: RecordId,
            cell: CellKey,
            preference: PreferenceType,
        ) -> Result<PreferenceRecord> {
            self.check(ChangeOp::Update, cell)?;
            Ok(PreferenceRecord::new(
                record_id,
                Uuid::nil(),
                cell,
                FlagSet::from_type(preference),
            ))
        }

        async fn delete_preference(&self, record_id: RecordId) -> Result<()> {
            self.check(ChangeOp::Delete, CellKey::new(record_id, 1))
        }
    }

    fn in_flight() -> Arc<Mutex<HashSet<CellKey>>> {
        Arc::new(Mutex::new(HashSet::new()))
    }

    #[tokio::test]
    async fn test_categories_run_in_create_update_delete_order() {
        let client = Arc::new(ScriptedClient::default());
        let entity = Uuid::nil();
        let changes = vec![
            PendingChange::delete(CellKey::new(9, 1), entity, 9),
            PendingChange::create(CellKey::new(1, 1), entity, PreferenceType::MustTeach),
            PendingChange::update(CellKey::new(2, 1), entity, 2, PreferenceType::CannotTeach),
            PendingChange::create(CellKey::new(1, 2), entity, PreferenceType::MustTeach),
        ];

        let result = run_batch(client.clone(), entity, changes, in_flight()).await;
        assert_eq!(result.total, 4);
        assert_eq!(result.succeeded, 4);
        assert!(result.is_clean());

        let calls = client.calls.lock().unwrap();
        let ops: Vec<ChangeOp> = calls.iter().map(|(op, _)| *op).collect();
        // Creates settle before any update is dispatched, updates before deletes.
        assert_eq!(&ops[..2], &[ChangeOp::Create, ChangeOp::Create]);
        assert_eq!(ops[2], ChangeOp::Update);
        assert_eq!(ops[3], ChangeOp::Delete);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_rest() {
        let failing = CellKey::new(1, 2);
        let client = Arc::new(ScriptedClient {
            fail_cells: vec![failing],
            ..ScriptedClient::default()
        });
        let entity = Uuid::nil();
        let changes = vec![
            PendingChange::create(CellKey::new(1, 1), entity, PreferenceType::MustTeach),
            PendingChange::create(failing, entity, PreferenceType::MustTeach),
            PendingChange::create(CellKey::new(1, 3), entity, PreferenceType::MustTeach),
        ];

        let result = run_batch(client.clone(), entity, changes, in_flight()).await;
        assert_eq!(result.total, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.errors[0].cell, failing);
        assert!(result.errors[0].message.contains("simulated transport failure"));
        // All three calls were attempted.
        assert_eq!(client.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_captured_without_a_network_call() {
        let client = Arc::new(ScriptedClient::default());
        let entity = Uuid::nil();
        // An update with no record id cannot be dispatched.
        let malformed = PendingChange {
            cell: CellKey::new(3, 3),
            op: ChangeOp::Update,
            record_id: None,
            target: Some(PreferenceType::MustTeach),
            entity_uuid: entity,
        };

        let result = run_batch(client.clone(), entity, vec![malformed], in_flight()).await;
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed(), 1);
        assert!(result.errors[0].message.contains("no record id"));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_flags_are_cleared_after_settlement() {
        let flags = in_flight();
        let client = Arc::new(ScriptedClient {
            fail_cells: vec![CellKey::new(1, 2)],
            ..ScriptedClient::default()
        });
        let entity = Uuid::nil();
        let changes = vec![
            PendingChange::create(CellKey::new(1, 1), entity, PreferenceType::MustTeach),
            PendingChange::create(CellKey::new(1, 2), entity, PreferenceType::MustTeach),
        ];

        run_batch(client, entity, changes, Arc::clone(&flags)).await;
        assert!(flags.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_trivially_clean() {
        let client = Arc::new(ScriptedClient::default());
        let result = run_batch(client, Uuid::nil(), Vec::new(), in_flight()).await;
        assert_eq!(result.total, 0);
        assert!(result.is_clean());
    }
}
