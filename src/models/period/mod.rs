// Period module
// Time-period and grid-cell addressing for the preference grid

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Server-assigned period identifier.
pub type PeriodId = i64;

/// Lowest valid day number (Monday of week A).
pub const MIN_DAY: u8 = 1;

/// Highest valid day number (Sunday of week B in a two-week rotation).
pub const MAX_DAY: u8 = 14;

/// Which week of a two-week rotation a day number falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekRotation {
    A,
    B,
}

/// One (period, day) coordinate — the fundamental addressable unit of the
/// grid. Days 1-7 are week A, 8-14 week B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    pub period_id: PeriodId,
    pub day: u8,
}

impl CellKey {
    pub fn new(period_id: PeriodId, day: u8) -> Self {
        Self { period_id, day }
    }

    /// Whether the day number lies in the supported 1..=14 range.
    pub fn is_valid_day(&self) -> bool {
        (MIN_DAY..=MAX_DAY).contains(&self.day)
    }

    /// The rotation week this cell belongs to, if the day number is valid.
    pub fn rotation(&self) -> Option<WeekRotation> {
        match self.day {
            1..=7 => Some(WeekRotation::A),
            8..=14 => Some(WeekRotation::B),
            _ => None,
        }
    }

    /// The calendar weekday this cell falls on, if the day number is valid.
    /// Day 1 and day 8 are both Monday.
    pub fn weekday(&self) -> Option<Weekday> {
        if !self.is_valid_day() {
            return None;
        }
        Some(match (self.day - 1) % 7 {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            _ => Weekday::Sun,
        })
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(period {}, day {})", self.period_id, self.day)
    }
}

/// A concrete occurrence of a period on one day of the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSchedule {
    pub day: u8,
}

/// A teaching period as supplied by the timetable service. Immutable once
/// loaded; the grid only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub name: String,
    /// Explicit list of rotation days this period occurs on. When absent the
    /// days are derived from `schedules`.
    pub days: Option<Vec<u8>>,
    #[serde(default)]
    pub schedules: Vec<PeriodSchedule>,
}

impl Period {
    pub fn new(id: PeriodId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            days: None,
            schedules: Vec::new(),
        }
    }

    pub fn with_days(id: PeriodId, name: impl Into<String>, days: Vec<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            days: Some(days),
            schedules: Vec::new(),
        }
    }

    /// The distinct, ascending rotation days this period occurs on: the
    /// explicit `days` list when present, otherwise the days of its
    /// schedules. Day numbers outside 1..=14 are dropped.
    pub fn effective_days(&self) -> Vec<u8> {
        let mut days: Vec<u8> = match &self.days {
            Some(explicit) => explicit.clone(),
            None => self.schedules.iter().map(|s| s.day).collect(),
        };
        days.retain(|day| (MIN_DAY..=MAX_DAY).contains(day));
        days.sort_unstable();
        days.dedup();
        days
    }
}
