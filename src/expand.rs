//! Slot Expander (spec §4.2).
//!
//! Projects the weekly template carried by an `AppState` onto a concrete
//! date range, producing one `SlotInstance` per `(slotId, date)` pair with
//! an absolute minute-of-range interval.

use chrono::{Datelike, Duration, NaiveDate};

use crate::constants::MINUTES_PER_DAY;
use crate::domain::{build_shift_row_id, AppState, MinSlots};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayType {
    Weekday,
    Weekend,
    Holiday,
}

impl DayType {
    /// Weekend iff ISO weekday index >= 5 (Sat=5, Sun=6) or the date is a
    /// configured holiday; holiday takes priority for `MinSlots` lookup.
    pub fn classify(date: NaiveDate, state: &AppState) -> DayType {
        if state.is_holiday(date) {
            return DayType::Holiday;
        }
        if date.weekday().num_days_from_monday() >= 5 {
            DayType::Weekend
        } else {
            DayType::Weekday
        }
    }

    /// Holidays and weekends share the `weekend` bucket of `MinSlots`.
    fn min_slots_bucket(self, slots: &MinSlots) -> i64 {
        match self {
            DayType::Weekday => slots.weekday,
            DayType::Weekend | DayType::Holiday => slots.weekend,
        }
    }
}

/// A single occurrence of a template sub-shift on one concrete date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInstance {
    pub row_id: String,
    pub class_id: String,
    pub sub_shift_id: String,
    pub date: NaiveDate,
    pub abs_start: i64,
    pub abs_end: i64,
    pub location_id: Option<String>,
    pub day_type: DayType,
    /// `max(0, base + override)`, before subtracting already-manual counts.
    pub required_slots: i64,
}

impl SlotInstance {
    pub fn overlaps(&self, other: &SlotInstance) -> bool {
        self.abs_end > other.abs_start && other.abs_end > self.abs_start
    }
}

/// The result of expanding a template: the context range's instances plus
/// the subset of dates the caller actually wants covered.
pub struct ExpandedRange {
    pub context_start: NaiveDate,
    pub context_end: NaiveDate,
    pub target_start: NaiveDate,
    pub target_end: NaiveDate,
    pub instances: Vec<SlotInstance>,
}

impl ExpandedRange {
    pub fn is_target_date(&self, date: NaiveDate) -> bool {
        self.target_start <= date && date <= self.target_end
    }

    pub fn target_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut d = self.target_start;
        std::iter::from_fn(move || {
            if d > self.target_end {
                None
            } else {
                let current = d;
                d += Duration::days(1);
                Some(current)
            }
        })
    }

    pub fn context_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut d = self.context_start;
        std::iter::from_fn(move || {
            if d > self.context_end {
                None
            } else {
                let current = d;
                d += Duration::days(1);
                Some(current)
            }
        })
    }

    /// `day_index` relative to the context range's first date, so absolute
    /// minutes are always non-negative.
    pub fn day_index(&self, date: NaiveDate) -> i64 {
        (date - self.context_start).num_days()
    }

    pub fn instances_for(&self, date: NaiveDate) -> impl Iterator<Item = &SlotInstance> {
        self.instances.iter().filter(move |i| i.date == date)
    }
}

/// Expands `state`'s template over `[target_start, target_end]`, including a
/// one-day lookback/lookforward context range for on-call rest evaluation.
pub fn expand(state: &AppState, target_start: NaiveDate, target_end: NaiveDate) -> ExpandedRange {
    let context_start = target_start - Duration::days(1);
    let context_end = target_end + Duration::days(1);

    let mut instances = Vec::new();
    let mut date = context_start;
    while date <= context_end {
        let day_index = (date - context_start).num_days();
        let day_type = DayType::classify(date, state);

        for row in state.section_rows() {
            let class_id = row.id();
            let location_id = row.location_id().map(|s| s.to_string());
            for sub_shift in row.sub_shifts() {
                let row_id = build_shift_row_id(class_id, &sub_shift.id);
                let Some(start_minutes) = sub_shift.start_minutes() else {
                    continue;
                };
                let end_minutes = sub_shift.end_minutes().unwrap_or(start_minutes);
                let abs_start = day_index * MINUTES_PER_DAY + start_minutes;
                let span = if end_minutes <= start_minutes && sub_shift.end_day_offset == 0 {
                    0
                } else {
                    (end_minutes - start_minutes) + (sub_shift.end_day_offset as i64) * MINUTES_PER_DAY
                };
                let abs_end = abs_start + span;

                let base = state
                    .min_slots_by_row_id
                    .get(&row_id)
                    .copied()
                    .unwrap_or_default();
                let override_key = format!("{row_id}__{}", date.format("%Y-%m-%d"));
                let override_value = state
                    .slot_overrides_by_key
                    .get(&override_key)
                    .copied()
                    .unwrap_or(0);
                let required_slots =
                    (day_type.min_slots_bucket(&base) + override_value).max(0);

                instances.push(SlotInstance {
                    row_id,
                    class_id: class_id.to_string(),
                    sub_shift_id: sub_shift.id.clone(),
                    date,
                    abs_start,
                    abs_end,
                    location_id: location_id.clone(),
                    day_type,
                    required_slots,
                });
            }
        }
        date += Duration::days(1);
    }

    ExpandedRange {
        context_start,
        context_end,
        target_start,
        target_end,
        instances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data;

    #[test]
    fn context_range_extends_one_day_each_side() {
        let state = demo_data::generate_small();
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let expanded = expand(&state, start, end);
        assert_eq!(expanded.context_start, start - Duration::days(1));
        assert_eq!(expanded.context_end, end + Duration::days(1));
        assert!(expanded.instances.iter().any(|i| i.date == expanded.context_start));
        assert!(expanded.instances.iter().any(|i| i.date == expanded.context_end));
    }

    #[test]
    fn absolute_intervals_are_non_negative_and_ordered() {
        let state = demo_data::generate_small();
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let expanded = expand(&state, start, end);
        for instance in &expanded.instances {
            assert!(instance.abs_start >= 0);
            assert!(instance.abs_end >= instance.abs_start);
        }
    }

    #[test]
    fn weekend_day_type_uses_weekend_bucket() {
        let mut state = demo_data::generate_small();
        let row_id = {
            let row = state.section_rows().next().unwrap();
            build_shift_row_id(row.id(), &row.sub_shifts()[0].id)
        };
        state.min_slots_by_row_id.insert(
            row_id.clone(),
            MinSlots {
                weekday: 1,
                weekend: 3,
            },
        );
        // 2026-01-10 is a Saturday.
        let saturday = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let expanded = expand(&state, saturday, saturday);
        let instance = expanded
            .instances
            .iter()
            .find(|i| i.row_id == row_id && i.date == saturday)
            .unwrap();
        assert_eq!(instance.day_type, DayType::Weekend);
        assert_eq!(instance.required_slots, 3);
    }

    #[test]
    fn overlap_detection_matches_strict_overlap_rule() {
        let a = SlotInstance {
            row_id: "a".into(),
            class_id: "a".into(),
            sub_shift_id: "s1".into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            abs_start: 0,
            abs_end: 100,
            location_id: None,
            day_type: DayType::Weekday,
            required_slots: 0,
        };
        let touching = SlotInstance {
            abs_start: 100,
            abs_end: 200,
            ..a.clone()
        };
        let overlapping = SlotInstance {
            abs_start: 50,
            abs_end: 150,
            ..a.clone()
        };
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&overlapping));
    }
}
