use crate::models::preference::{EntityKind, PreferenceType};

/// Errors surfaced by the grid engine itself.
///
/// Per-entry reconciliation failures are deliberately *not* represented here:
/// they are data, collected into `BatchResult::errors`, so that one failed
/// cell can never abort the rest of a batch.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Fetching preferences for the bound entity failed. The store keeps its
    /// last-known-good contents (or stays empty on a first load); callers may
    /// simply retry.
    #[error("Failed to load preferences: {0}")]
    Load(#[source] anyhow::Error),

    /// An operation that needs a bound entity was called before
    /// `bind_context`.
    #[error("No entity context is bound")]
    NoContext,

    /// `save_changes` was called with nothing staged.
    #[error("No staged changes to save")]
    NothingToSave,

    /// The selected preference type does not belong to the bound entity
    /// kind's vocabulary.
    #[error("Preference type {preference:?} is not valid for {kind:?} grids")]
    InvalidTypeForKind {
        preference: PreferenceType,
        kind: EntityKind,
    },
}
