// EntityContext module
// The entity a grid session is currently bound to

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::preference::EntityKind;

/// The (entity, kind, optional plan-settings scope) a grid is bound to.
/// Switching context invalidates the previous context's store and overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityContext {
    pub entity_uuid: Uuid,
    pub kind: EntityKind,
    /// Plan-settings scope, when preferences are scoped to one timetable
    /// plan rather than the entity globally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Uuid>,
}

impl EntityContext {
    pub fn new(entity_uuid: Uuid, kind: EntityKind) -> Self {
        Self {
            entity_uuid,
            kind,
            scope: None,
        }
    }

    pub fn with_scope(entity_uuid: Uuid, kind: EntityKind, scope: Uuid) -> Self {
        Self {
            entity_uuid,
            kind,
            scope: Some(scope),
        }
    }
}
