// Grid session service
// Caller-facing facade: one editing session over one entity's grid

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::EngineError;
use crate::models::entity_context::EntityContext;
use crate::models::period::{CellKey, Period};
use crate::models::preference::{EntityKind, PreferenceType};
use crate::services::grid::GridIndex;
use crate::services::overlay::{PendingChangeOverlay, StageOutcome};
use crate::services::persistence::PreferencePersistence;
use crate::services::reconcile::{self, BatchResult};
use crate::services::store::PreferenceStore;
use crate::services::view::{CellView, CellViewResolver};

struct SessionState {
    context: Option<EntityContext>,
    /// Bumped on every context switch; a settled batch whose epoch no longer
    /// matches is discarded instead of overwriting the new context's state.
    epoch: u64,
    grid: GridIndex,
    store: PreferenceStore,
    overlay: PendingChangeOverlay,
    brush: Option<PreferenceType>,
    /// Cells with an outstanding network call. Replaced wholesale on context
    /// switch so a stale batch can only ever clear flags in its own, now
    /// orphaned, set.
    in_flight: Arc<Mutex<HashSet<CellKey>>>,
}

/// One UI session editing one entity's preference grid.
///
/// All reads are non-blocking snapshots safe to take on every render tick;
/// the store and overlay are mutated only through this type's own
/// operations. Locks are never held across an await.
pub struct GridSession {
    client: Arc<dyn PreferencePersistence>,
    state: Arc<Mutex<SessionState>>,
}

impl GridSession {
    pub fn new(client: Arc<dyn PreferencePersistence>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(SessionState {
                context: None,
                epoch: 0,
                grid: GridIndex::default(),
                store: PreferenceStore::new(),
                overlay: PendingChangeOverlay::new(),
                brush: None,
                in_flight: Arc::new(Mutex::new(HashSet::new())),
            })),
        }
    }

    /// Binds the session to an entity and loads its preferences. Any state
    /// belonging to a previously bound context is dropped first, so a load
    /// failure leaves an empty (but valid) grid behind; calling again
    /// retries.
    pub async fn bind_context(
        &self,
        context: EntityContext,
        periods: &[Period],
    ) -> Result<(), EngineError> {
        let (entity, scope, epoch) = {
            let mut state = self.lock_state();
            state.epoch += 1;
            state.grid = GridIndex::build(periods);
            state.store.clear();
            state.overlay.clear();
            state.brush = None;
            state.in_flight = Arc::new(Mutex::new(HashSet::new()));
            state.context = Some(context.clone());
            (context.entity_uuid, context.scope, state.epoch)
        };

        let fetched = self.client.fetch_preferences(entity, scope).await;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            log::debug!("Discarding stale preference load for entity {}", entity);
            return Ok(());
        }
        match fetched {
            Ok(records) => {
                state.store.replace_all(records);
                Ok(())
            }
            Err(err) => Err(EngineError::Load(err)),
        }
    }

    /// Refetches the bound context's preferences, keeping staged edits.
    /// On failure the store keeps its last-known-good contents.
    pub async fn reload(&self) -> Result<(), EngineError> {
        let (entity, scope, epoch) = {
            let state = self.lock_state();
            let context = state.context.as_ref().ok_or(EngineError::NoContext)?;
            (context.entity_uuid, context.scope, state.epoch)
        };

        let fetched = self.client.fetch_preferences(entity, scope).await;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            log::debug!("Discarding stale preference reload for entity {}", entity);
            return Ok(());
        }
        match fetched {
            Ok(records) => {
                state.store.replace_all(records);
                Ok(())
            }
            Err(err) => Err(EngineError::Load(err)),
        }
    }

    /// Sets the brush applied by subsequent cell clicks. `None` selects the
    /// "clear" brush. The type must belong to the bound kind's vocabulary.
    pub fn select_preference_type(
        &self,
        preference: Option<PreferenceType>,
    ) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        let context = state.context.as_ref().ok_or(EngineError::NoContext)?;
        if let Some(p) = preference {
            if !context.kind.allows(p) {
                return Err(EngineError::InvalidTypeForKind {
                    preference: p,
                    kind: context.kind,
                });
            }
        }
        state.brush = preference;
        Ok(())
    }

    pub fn brush(&self) -> Option<PreferenceType> {
        self.lock_state().brush
    }

    /// Stages the effect of clicking `cell` with the current brush. Purely
    /// local: nothing is sent until `save_changes`.
    pub fn click_cell(&self, cell: CellKey) -> Result<StageOutcome, EngineError> {
        let mut state = self.lock_state();
        let context = state.context.clone().ok_or(EngineError::NoContext)?;
        let brush = state.brush;
        let existing = state.store.record(cell).cloned();
        Ok(state.overlay.stage(
            cell,
            existing.as_ref(),
            context.kind,
            context.entity_uuid,
            brush,
        ))
    }

    /// Snapshot of one cell's render state. With no context bound every
    /// field is empty.
    pub fn cell_view(&self, cell: CellKey) -> CellView {
        let state = self.lock_state();
        let Some(context) = state.context.as_ref() else {
            return CellView {
                persisted: None,
                display: None,
                has_pending: false,
                in_flight: false,
            };
        };
        let flags = state
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        CellViewResolver::new(&state.store, &state.overlay, &flags, context.kind).view(cell)
    }

    /// The current grid shape, for layout.
    pub fn grid(&self) -> GridIndex {
        self.lock_state().grid.clone()
    }

    pub fn context(&self) -> Option<EntityContext> {
        self.lock_state().context.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_state().overlay.len()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.lock_state().overlay.is_empty()
    }

    /// Drops every staged edit. Issues no network calls.
    pub fn discard_changes(&self) {
        self.lock_state().overlay.clear();
    }

    /// Drains the overlay against the remote store and refreshes the
    /// persisted records.
    ///
    /// The batch is terminal: successes and failures both leave the overlay,
    /// failures are reported in the returned `BatchResult` rather than
    /// retried. If the context was switched while the batch was in flight,
    /// the settled result is returned but no session state is touched.
    pub async fn save_changes(&self) -> Result<BatchResult, EngineError> {
        let (entity, scope, epoch, changes, in_flight) = {
            let state = self.lock_state();
            let context = state.context.as_ref().ok_or(EngineError::NoContext)?;
            if state.overlay.is_empty() {
                return Err(EngineError::NothingToSave);
            }
            (
                context.entity_uuid,
                context.scope,
                state.epoch,
                state.overlay.entries().to_vec(),
                Arc::clone(&state.in_flight),
            )
        };

        let result =
            reconcile::run_batch(Arc::clone(&self.client), entity, changes.clone(), in_flight)
                .await;

        // Server truth may have drifted from our bookkeeping; refetch
        // unconditionally once the batch settles.
        let refreshed = self.client.fetch_preferences(entity, scope).await;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            log::debug!(
                "Discarding settled batch for entity {}: context has changed",
                entity
            );
            return Ok(result);
        }

        for change in &changes {
            state.overlay.remove(change.cell);
        }

        match refreshed {
            Ok(records) => {
                state.store.replace_all(records);
                Ok(result)
            }
            Err(err) => Err(EngineError::Load(err)),
        }
    }

    /// Convenience bind for callers that only have a raw entity id and kind.
    pub async fn bind_entity(
        &self,
        entity_uuid: Uuid,
        kind: EntityKind,
        periods: &[Period],
    ) -> Result<(), EngineError> {
        self.bind_context(EntityContext::new(entity_uuid, kind), periods)
            .await
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
