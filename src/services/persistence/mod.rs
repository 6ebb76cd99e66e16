// Persistence collaborator
// Abstract CRUD surface of the remote preference store

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::period::CellKey;
use crate::models::preference::{PreferenceRecord, PreferenceType, RecordId};

/// The remote preference store, one implementation per entity kind.
///
/// Transport, auth, and wire format are the implementor's concern; the
/// engine only needs these four calls and treats any failure identically
/// (message captured, counted as one batch error). Arguments are owned so
/// implementations and test mocks stay simple.
#[async_trait]
pub trait PreferencePersistence: Send + Sync {
    /// All preference records for `entity`, optionally narrowed to one
    /// plan-settings scope.
    async fn fetch_preferences(
        &self,
        entity: Uuid,
        scope: Option<Uuid>,
    ) -> Result<Vec<PreferenceRecord>>;

    /// Creates a record for one cell; the server assigns the id.
    async fn create_preference(
        &self,
        entity: Uuid,
        cell: CellKey,
        preference: PreferenceType,
    ) -> Result<PreferenceRecord>;

    /// Replaces an existing record's flag set.
    async fn update_preference(
        &self,
        record_id: RecordId,
        cell: CellKey,
        preference: PreferenceType,
    ) -> Result<PreferenceRecord>;

    /// Removes a record.
    async fn delete_preference(&self, record_id: RecordId) -> Result<()>;
}
