// PendingChange module
// A staged, not-yet-persisted edit to one grid cell

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::CellKey;
use super::preference::{PreferenceType, RecordId};

/// The operation a staged change will perform against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOp::Create => write!(f, "create"),
            ChangeOp::Update => write!(f, "update"),
            ChangeOp::Delete => write!(f, "delete"),
        }
    }
}

/// One staged edit. Lives only in the overlay: created by a cell click,
/// destroyed by discard or by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub cell: CellKey,
    pub op: ChangeOp,
    /// Referenced server record; present for Update and Delete.
    pub record_id: Option<RecordId>,
    /// Target preference type; present for Create and Update.
    pub target: Option<PreferenceType>,
    pub entity_uuid: Uuid,
}

impl PendingChange {
    pub fn create(cell: CellKey, entity_uuid: Uuid, target: PreferenceType) -> Self {
        Self {
            cell,
            op: ChangeOp::Create,
            record_id: None,
            target: Some(target),
            entity_uuid,
        }
    }

    pub fn update(
        cell: CellKey,
        entity_uuid: Uuid,
        record_id: RecordId,
        target: PreferenceType,
    ) -> Self {
        Self {
            cell,
            op: ChangeOp::Update,
            record_id: Some(record_id),
            target: Some(target),
            entity_uuid,
        }
    }

    pub fn delete(cell: CellKey, entity_uuid: Uuid, record_id: RecordId) -> Self {
        Self {
            cell,
            op: ChangeOp::Delete,
            record_id: Some(record_id),
            target: None,
            entity_uuid,
        }
    }

    /// The type this change makes the cell display while staged: the target
    /// for Create/Update, nothing for Delete.
    pub fn display_effect(&self) -> Option<PreferenceType> {
        match self.op {
            ChangeOp::Create | ChangeOp::Update => self.target,
            ChangeOp::Delete => None,
        }
    }
}
