//! Schedule model: the types a persisted `AppState` is built from.
//!
//! Data shapes follow `original_source/backend/models.py` field-for-field
//! (renamed to idiomatic Rust `snake_case` where `serde` doesn't need to
//! preserve the wire `camelCase`/`dateISO` spelling).

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::SHIFT_ROW_SEPARATOR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
}

/// A recurring time window within a class row's weekly template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubShift {
    pub id: String,
    pub name: String,
    /// Position within the parent row; exactly one of 1, 2, 3.
    pub order: u8,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "endDayOffset", default)]
    pub end_day_offset: u8,
    /// Legacy field: duration in hours, used only when `endTime` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
}

impl SubShift {
    pub fn start_minutes(&self) -> Option<i64> {
        parse_time_to_minutes(&self.start_time)
    }

    pub fn end_minutes(&self) -> Option<i64> {
        parse_time_to_minutes(&self.end_time)
    }
}

/// Parses an `HH:MM` string into minutes-past-midnight, as
/// `original_source`'s `_parse_time_to_minutes` does.
pub fn parse_time_to_minutes(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    let (h, m) = trimmed.split_once(':')?;
    if h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hours: i64 = h.parse().ok()?;
    let minutes: i64 = m.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn format_minutes(total_minutes: i64) -> String {
    let clamped = total_minutes.rem_euclid(24 * 60);
    format!("{:02}:{:02}", clamped / 60, clamped % 60)
}

/// A workplace row, either a qualifiable *section* or an administrative *pool*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkplaceRow {
    #[serde(rename = "class")]
    Section {
        id: String,
        name: String,
        #[serde(rename = "locationId", default, skip_serializing_if = "Option::is_none")]
        location_id: Option<String>,
        #[serde(rename = "subShifts", default)]
        sub_shifts: Vec<SubShift>,
    },
    Pool {
        id: String,
        name: String,
    },
}

impl WorkplaceRow {
    pub fn id(&self) -> &str {
        match self {
            WorkplaceRow::Section { id, .. } => id,
            WorkplaceRow::Pool { id, .. } => id,
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, WorkplaceRow::Section { .. })
    }

    pub fn sub_shifts(&self) -> &[SubShift] {
        match self {
            WorkplaceRow::Section { sub_shifts, .. } => sub_shifts,
            WorkplaceRow::Pool { .. } => &[],
        }
    }

    pub fn sub_shifts_mut(&mut self) -> Option<&mut Vec<SubShift>> {
        match self {
            WorkplaceRow::Section { sub_shifts, .. } => Some(sub_shifts),
            WorkplaceRow::Pool { .. } => None,
        }
    }

    pub fn location_id(&self) -> Option<&str> {
        match self {
            WorkplaceRow::Section { location_id, .. } => location_id.as_deref(),
            WorkplaceRow::Pool { .. } => None,
        }
    }

    pub fn set_location_id(&mut self, id: Option<String>) {
        if let WorkplaceRow::Section { location_id, .. } = self {
            *location_id = id;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationRange {
    #[serde(rename = "startISO")]
    pub start: NaiveDate,
    #[serde(rename = "endISO")]
    pub end: NaiveDate,
}

impl VacationRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    pub id: String,
    pub name: String,
    #[serde(rename = "qualifiedClassIds", default)]
    pub qualified_class_ids: Vec<String>,
    /// Ordered most- to least-preferred; the rank index drives `preference_weight`.
    #[serde(rename = "preferredClassIds", default)]
    pub preferred_class_ids: Vec<String>,
    #[serde(default)]
    pub vacations: Vec<VacationRange>,
    #[serde(rename = "workingHoursPerWeek", default)]
    pub working_hours_per_week: Option<f64>,
}

impl Clinician {
    pub fn is_qualified(&self, class_id: &str) -> bool {
        self.qualified_class_ids.iter().any(|c| c == class_id)
    }

    pub fn is_on_vacation(&self, date: NaiveDate) -> bool {
        self.vacations.iter().any(|v| v.contains(date))
    }

    /// `max(1, |prefs| - rank)` for a preferred class, `0` otherwise.
    pub fn preference_weight(&self, class_id: &str) -> i64 {
        match self.preferred_class_ids.iter().position(|c| c == class_id) {
            Some(rank) => std::cmp::max(1, self.preferred_class_ids.len() as i64 - rank as i64),
            None => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentSource {
    Manual,
    Solver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    #[serde(rename = "rowId")]
    pub row_id: String,
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    #[serde(rename = "clinicianId")]
    pub clinician_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<AssignmentSource>,
}

impl Assignment {
    /// An assignment present in state at solve time is treated as fixed,
    /// whether or not it carries an explicit `source`.
    pub fn is_manual(&self) -> bool {
        !matches!(self.source, Some(AssignmentSource::Solver))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinSlots {
    pub weekday: i64,
    pub weekend: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleEnforcement {
    Hard,
    Soft { weight: i64 },
}

impl Default for RuleEnforcement {
    fn default() -> Self {
        RuleEnforcement::Hard
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(rename = "enforceSameLocationPerDay", default)]
    pub enforce_same_location_per_day: bool,
    #[serde(rename = "preferContinuousShifts", default)]
    pub prefer_continuous_shifts: bool,
    #[serde(rename = "onCallRestEnabled", default)]
    pub on_call_rest_enabled: bool,
    #[serde(rename = "onCallRestClassId", default)]
    pub on_call_rest_class_id: Option<String>,
    #[serde(rename = "onCallRestDaysBefore", default)]
    pub on_call_rest_days_before: i64,
    #[serde(rename = "onCallRestDaysAfter", default)]
    pub on_call_rest_days_after: i64,
    #[serde(rename = "workingHoursToleranceHours", default)]
    pub working_hours_tolerance_hours: f64,
    /// Whether `SolverRule`s are enforced as hard constraints or as a
    /// penalised soft term (spec Open Question, resolved as a knob).
    #[serde(default)]
    pub solver_rule_enforcement: RuleEnforcement,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            enforce_same_location_per_day: false,
            prefer_continuous_shifts: false,
            on_call_rest_enabled: false,
            on_call_rest_class_id: None,
            on_call_rest_days_before: 1,
            on_call_rest_days_after: 1,
            working_hours_tolerance_hours: 0.0,
            solver_rule_enforcement: RuleEnforcement::Hard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThenType {
    ShiftRow,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverRule {
    pub id: String,
    #[serde(rename = "ifShiftRowId")]
    pub if_shift_row_id: String,
    /// -1 or +1.
    #[serde(rename = "dayDelta")]
    pub day_delta: i64,
    #[serde(rename = "thenType")]
    pub then_type: ThenType,
    #[serde(rename = "thenShiftRowId", default)]
    pub then_shift_row_id: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// The full persisted state blob (spec §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(rename = "locationsEnabled", default = "default_true")]
    pub locations_enabled: bool,
    pub rows: Vec<WorkplaceRow>,
    pub clinicians: Vec<Clinician>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(rename = "minSlotsByRowId", default)]
    pub min_slots_by_row_id: HashMap<String, MinSlots>,
    #[serde(rename = "slotOverridesByKey", default)]
    pub slot_overrides_by_key: HashMap<String, i64>,
    #[serde(rename = "holidayCountry", default)]
    pub holiday_country: Option<String>,
    #[serde(rename = "holidayYear", default)]
    pub holiday_year: Option<i32>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(rename = "publishedWeekStartISOs", default)]
    pub published_week_starts: Vec<NaiveDate>,
    #[serde(rename = "solverSettings", default)]
    pub solver_settings: SolverSettings,
    #[serde(rename = "solverRules", default)]
    pub solver_rules: Vec<SolverRule>,
}

impl AppState {
    pub fn row_by_id(&self, id: &str) -> Option<&WorkplaceRow> {
        self.rows.iter().find(|r| r.id() == id)
    }

    pub fn section_rows(&self) -> impl Iterator<Item = &WorkplaceRow> {
        self.rows.iter().filter(|r| r.is_section())
    }

    pub fn clinician_by_id(&self, id: &str) -> Option<&Clinician> {
        self.clinicians.iter().find(|c| c.id == id)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.iter().any(|h| h.date == date)
    }
}

/// Composite slot id: `classId::subShiftId`.
pub fn build_shift_row_id(class_id: &str, sub_shift_id: &str) -> String {
    format!("{class_id}{SHIFT_ROW_SEPARATOR}{sub_shift_id}")
}

/// Splits a composite slot id back into its class and sub-shift parts.
pub fn parse_shift_row_id(row_id: &str) -> (&str, Option<&str>) {
    match row_id.split_once(SHIFT_ROW_SEPARATOR) {
        Some((class_id, sub_shift_id)) if !sub_shift_id.is_empty() => {
            (class_id, Some(sub_shift_id))
        }
        Some((class_id, _)) => (class_id, None),
        None => (row_id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_parsing_round_trips() {
        assert_eq!(parse_time_to_minutes("08:00"), Some(480));
        assert_eq!(parse_time_to_minutes("23:59"), Some(1439));
        assert_eq!(parse_time_to_minutes("24:00"), None);
        assert_eq!(parse_time_to_minutes("8:5"), None);
        assert_eq!(format_minutes(480), "08:00");
        assert_eq!(format_minutes(1440), "00:00");
        assert_eq!(format_minutes(-60), "23:00");
    }

    #[test]
    fn shift_row_id_round_trips() {
        let id = build_shift_row_id("mri", "s1");
        assert_eq!(id, "mri::s1");
        assert_eq!(parse_shift_row_id(&id), ("mri", Some("s1")));
        assert_eq!(parse_shift_row_id("mri"), ("mri", None));
    }

    #[test]
    fn preference_weight_decreases_with_rank() {
        let clinician = Clinician {
            id: "c1".into(),
            name: "C".into(),
            qualified_class_ids: vec![],
            preferred_class_ids: vec!["a".into(), "b".into(), "c".into()],
            vacations: vec![],
            working_hours_per_week: None,
        };
        assert_eq!(clinician.preference_weight("a"), 3);
        assert_eq!(clinician.preference_weight("b"), 2);
        assert_eq!(clinician.preference_weight("c"), 1);
        assert_eq!(clinician.preference_weight("z"), 0);
    }
}
