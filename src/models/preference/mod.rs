// Preference module
// Preference records, flag sets, and the active-type resolver

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::CellKey;

/// Server-assigned preference record identifier.
pub type RecordId = i64;

/// The category of thing a preference grid applies to. Each kind carries its
/// own flag vocabulary and precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Teacher,
    Class,
    ClassBand,
    Rule,
}

/// A single scheduling preference, represented as a proper sum type rather
/// than the legacy wire shape of independent nullable booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceType {
    // Teacher / class vocabulary
    MustTeach,
    CannotTeach,
    PrefersToTeach,
    DontPreferToTeach,
    // Class-band vocabulary
    MustSchedule,
    MustNotSchedule,
    PrefersToSchedule,
    PrefersNotToSchedule,
    // Rule vocabulary
    Applies,
}

impl EntityKind {
    /// The flag vocabulary for this kind, in resolution precedence order.
    /// Hard constraints outrank soft preferences; when legacy data has more
    /// than one flag raised, the first match here wins.
    pub fn precedence(&self) -> &'static [PreferenceType] {
        match self {
            EntityKind::Teacher | EntityKind::Class => &[
                PreferenceType::MustTeach,
                PreferenceType::CannotTeach,
                PreferenceType::PrefersToTeach,
                PreferenceType::DontPreferToTeach,
            ],
            EntityKind::ClassBand => &[
                PreferenceType::MustSchedule,
                PreferenceType::MustNotSchedule,
                PreferenceType::PrefersToSchedule,
                PreferenceType::PrefersNotToSchedule,
            ],
            EntityKind::Rule => &[PreferenceType::Applies],
        }
    }

    /// Whether `preference` belongs to this kind's vocabulary.
    pub fn allows(&self, preference: PreferenceType) -> bool {
        self.precedence().contains(&preference)
    }
}

/// The wire shape of a preference record's flags: a fixed collection of
/// nullable booleans, at most one of which should be true. Field names match
/// the legacy server contract so a transport layer can map JSON straight
/// onto this struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlagSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_teach: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cannot_teach: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefers_to_teach: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dont_prefer_to_teach: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_schedule_class: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_not_schedule_class: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefers_to_schedule_class: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefers_not_to_schedule_class: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applies: Option<bool>,
}

impl FlagSet {
    /// A canonical flag set with exactly `preference` raised. Used to build
    /// outgoing create/update payloads.
    pub fn from_type(preference: PreferenceType) -> Self {
        let mut flags = Self::default();
        *flags.slot_mut(preference) = Some(true);
        flags
    }

    /// Whether the flag for `preference` is raised.
    pub fn is_set(&self, preference: PreferenceType) -> bool {
        self.slot(preference) == Some(true)
    }

    /// The first raised flag in `precedence` order, or `None` when every
    /// flag is unset or false. Total: conflicting or empty legacy flag sets
    /// resolve without error.
    pub fn resolve(&self, precedence: &[PreferenceType]) -> Option<PreferenceType> {
        precedence.iter().copied().find(|p| self.is_set(*p))
    }

    fn slot(&self, preference: PreferenceType) -> Option<bool> {
        match preference {
            PreferenceType::MustTeach => self.must_teach,
            PreferenceType::CannotTeach => self.cannot_teach,
            PreferenceType::PrefersToTeach => self.prefers_to_teach,
            PreferenceType::DontPreferToTeach => self.dont_prefer_to_teach,
            PreferenceType::MustSchedule => self.must_schedule_class,
            PreferenceType::MustNotSchedule => self.must_not_schedule_class,
            PreferenceType::PrefersToSchedule => self.prefers_to_schedule_class,
            PreferenceType::PrefersNotToSchedule => self.prefers_not_to_schedule_class,
            PreferenceType::Applies => self.applies,
        }
    }

    fn slot_mut(&mut self, preference: PreferenceType) -> &mut Option<bool> {
        match preference {
            PreferenceType::MustTeach => &mut self.must_teach,
            PreferenceType::CannotTeach => &mut self.cannot_teach,
            PreferenceType::PrefersToTeach => &mut self.prefers_to_teach,
            PreferenceType::DontPreferToTeach => &mut self.dont_prefer_to_teach,
            PreferenceType::MustSchedule => &mut self.must_schedule_class,
            PreferenceType::MustNotSchedule => &mut self.must_not_schedule_class,
            PreferenceType::PrefersToSchedule => &mut self.prefers_to_schedule_class,
            PreferenceType::PrefersNotToSchedule => &mut self.prefers_not_to_schedule_class,
            PreferenceType::Applies => &mut self.applies,
        }
    }
}

/// A server-authoritative preference record for one grid cell. Mutated only
/// through the reconciliation engine, never in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    pub id: RecordId,
    pub entity_uuid: Uuid,
    pub cell: CellKey,
    pub flags: FlagSet,
    /// Soft-delete marker; a deleted record resolves to no active type.
    #[serde(default)]
    pub deleted: bool,
}

impl PreferenceRecord {
    pub fn new(id: RecordId, entity_uuid: Uuid, cell: CellKey, flags: FlagSet) -> Self {
        Self {
            id,
            entity_uuid,
            cell,
            flags,
            deleted: false,
        }
    }

    /// The single preference type in effect for this record under `kind`'s
    /// precedence order, or `None` when soft-deleted or no flag is raised.
    pub fn active_type(&self, kind: EntityKind) -> Option<PreferenceType> {
        if self.deleted {
            return None;
        }
        self.flags.resolve(kind.precedence())
    }

    /// Whether the record currently carries an active preference.
    pub fn is_active(&self, kind: EntityKind) -> bool {
        self.active_type(kind).is_some()
    }
}
