//! State Normaliser (spec §4.1).
//!
//! Ports `original_source/backend/state.py::_normalize_state` and its
//! helpers (`_ensure_locations`, `_normalize_sub_shifts`,
//! `_resolve_shift_row`) function-for-function. Never fails for recoverable
//! inconsistencies — it repairs them and reports `changed = true`.

use std::collections::{HashMap, HashSet};

use crate::constants::{
    DEFAULT_LOCATION_ID, DEFAULT_LOCATION_NAME, DEFAULT_SUB_SHIFT_MINUTES,
    DEFAULT_SUB_SHIFT_START, DEFAULT_SUB_SHIFT_START_MINUTES, DEPRECATED_POOL_IDS,
    MAX_ON_CALL_REST_DAYS, MAX_WORKING_HOURS_TOLERANCE,
};
use crate::domain::{
    build_shift_row_id, format_minutes, parse_shift_row_id, AppState, Location, MinSlots,
    SubShift, WorkplaceRow,
};

/// Normalises a possibly-stale `AppState`, returning the canonical state and
/// whether anything changed (the caller decides whether to persist).
pub fn normalize(mut state: AppState) -> (AppState, bool) {
    let mut changed = false;

    changed |= ensure_default_location(&mut state);
    changed |= drop_deprecated_pool_rows(&mut state);
    changed |= normalize_sub_shifts(&mut state);
    changed |= normalize_row_locations(&mut state);

    let class_row_ids: HashSet<String> = state
        .section_rows()
        .map(|r| r.id().to_string())
        .collect();
    let sub_shift_ids_by_class: HashMap<String, HashSet<String>> = state
        .section_rows()
        .map(|r| {
            (
                r.id().to_string(),
                r.sub_shifts().iter().map(|s| s.id.clone()).collect(),
            )
        })
        .collect();
    let fallback_shift_by_class: HashMap<String, String> = state
        .section_rows()
        .map(|r| {
            let fallback = r
                .sub_shifts()
                .first()
                .map(|s| s.id.clone())
                .unwrap_or_else(|| "s1".to_string());
            (r.id().to_string(), fallback)
        })
        .collect();
    let all_row_ids: HashSet<String> = state.rows.iter().map(|r| r.id().to_string()).collect();

    changed |= remap_assignments(
        &mut state,
        &class_row_ids,
        &sub_shift_ids_by_class,
        &fallback_shift_by_class,
        &all_row_ids,
    );
    changed |= rebuild_min_slots(&mut state, &sub_shift_ids_by_class);
    changed |= remap_slot_overrides(&mut state, &class_row_ids, &sub_shift_ids_by_class);
    changed |= merge_solver_settings(&mut state, &class_row_ids);
    changed |= validate_solver_rules(&mut state);

    (state, changed)
}

fn ensure_default_location(state: &mut AppState) -> bool {
    let mut changed = false;
    if !state.locations.iter().any(|l| l.id == DEFAULT_LOCATION_ID) {
        state.locations.push(Location {
            id: DEFAULT_LOCATION_ID.to_string(),
            name: DEFAULT_LOCATION_NAME.to_string(),
        });
        changed = true;
    }
    changed
}

fn drop_deprecated_pool_rows(state: &mut AppState) -> bool {
    let before = state.rows.len();
    state
        .rows
        .retain(|r| !DEPRECATED_POOL_IDS.contains(&r.id()));
    let dropped = before != state.rows.len();
    let before_assignments = state.assignments.len();
    state
        .assignments
        .retain(|a| !DEPRECATED_POOL_IDS.contains(&a.row_id.as_str()));
    dropped || before_assignments != state.assignments.len()
}

/// Ports `_normalize_sub_shifts`: dedupe by order, clamp `endDayOffset` into
/// `[0,3]`, derive a missing `endTime`, sort, and truncate to 3.
fn normalize_sub_shifts(state: &mut AppState) -> bool {
    let mut changed = false;
    let location_ids: HashSet<String> = state.locations.iter().map(|l| l.id.clone()).collect();
    let locations_enabled = state.locations_enabled;

    for row in state.rows.iter_mut() {
        if !row.is_section() {
            continue;
        }
        let original = row.sub_shifts().to_vec();
        let normalized = normalize_sub_shift_list(&original);
        if normalized != original {
            changed = true;
        }
        if let Some(slot) = row.sub_shifts_mut() {
            *slot = normalized;
        }

        let needs_default_location = match row.location_id() {
            Some(id) if location_ids.contains(id) => false,
            _ => true,
        };
        if needs_default_location {
            row.set_location_id(Some(DEFAULT_LOCATION_ID.to_string()));
            changed = true;
        } else if !locations_enabled && row.location_id() != Some(DEFAULT_LOCATION_ID) {
            row.set_location_id(Some(DEFAULT_LOCATION_ID.to_string()));
            changed = true;
        }
    }
    changed
}

fn default_sub_shift() -> SubShift {
    SubShift {
        id: "s1".to_string(),
        name: "Shift 1".to_string(),
        order: 1,
        start_time: DEFAULT_SUB_SHIFT_START.to_string(),
        end_time: format_minutes(DEFAULT_SUB_SHIFT_START_MINUTES + DEFAULT_SUB_SHIFT_MINUTES),
        end_day_offset: 0,
        hours: None,
    }
}

fn normalize_sub_shift_list(sub_shifts: &[SubShift]) -> Vec<SubShift> {
    if sub_shifts.is_empty() {
        return vec![default_sub_shift()];
    }
    let mut used_orders: HashSet<u8> = HashSet::new();
    let mut normalized = Vec::new();
    for shift in sub_shifts {
        let mut order = if (1..=3).contains(&shift.order) && !used_orders.contains(&shift.order) {
            Some(shift.order)
        } else {
            None
        };
        if order.is_none() {
            order = (1..=3).find(|candidate| !used_orders.contains(candidate));
        }
        let Some(order) = order else {
            continue;
        };
        used_orders.insert(order);

        let shift_id = if shift.id.is_empty() {
            format!("s{order}")
        } else {
            shift.id.clone()
        };
        let shift_name = if shift.name.is_empty() {
            format!("Shift {order}")
        } else {
            shift.name.clone()
        };
        let end_day_offset = shift.end_day_offset.min(3);

        let start_minutes = shift.start_minutes().unwrap_or_else(|| {
            DEFAULT_SUB_SHIFT_START_MINUTES + DEFAULT_SUB_SHIFT_MINUTES * (order as i64 - 1)
        });
        let duration_minutes = shift
            .hours
            .filter(|h| *h >= 0.0)
            .map(|h| (h * 60.0) as i64)
            .unwrap_or(DEFAULT_SUB_SHIFT_MINUTES);
        let end_minutes = shift
            .end_minutes()
            .unwrap_or(start_minutes + duration_minutes);

        normalized.push(SubShift {
            id: shift_id,
            name: shift_name,
            order,
            start_time: format_minutes(start_minutes),
            end_time: format_minutes(end_minutes),
            end_day_offset,
            hours: None,
        });
    }
    if normalized.is_empty() {
        normalized.push(default_sub_shift());
    }
    normalized.sort_by_key(|s| s.order);
    normalized.truncate(3);
    normalized
}

fn normalize_row_locations(_state: &mut AppState) -> bool {
    // Folded into `normalize_sub_shifts` above (the Python source performs
    // both in the same per-row loop); kept as a no-op seam so future
    // location-only normalisation rules have an obvious home.
    false
}

fn remap_assignments(
    state: &mut AppState,
    class_row_ids: &HashSet<String>,
    sub_shift_ids_by_class: &HashMap<String, HashSet<String>>,
    fallback_shift_by_class: &HashMap<String, String>,
    all_row_ids: &HashSet<String>,
) -> bool {
    let mut changed = false;
    let mut next_assignments = Vec::with_capacity(state.assignments.len());

    for mut assignment in std::mem::take(&mut state.assignments) {
        let (class_id, sub_shift_id) = parse_shift_row_id(&assignment.row_id);
        if sub_shift_id.is_none() && class_row_ids.contains(class_id) {
            let Some(fallback) = fallback_shift_by_class.get(class_id) else {
                changed = true;
                continue;
            };
            assignment.row_id = build_shift_row_id(class_id, fallback);
            changed = true;
            next_assignments.push(assignment);
            continue;
        }

        if let Some(sub_shift_id) = sub_shift_id {
            if class_row_ids.contains(class_id) {
                let class_shift_ids = sub_shift_ids_by_class
                    .get(class_id)
                    .cloned()
                    .unwrap_or_default();
                if !class_shift_ids.contains(sub_shift_id) {
                    let Some(fallback) = fallback_shift_by_class.get(class_id) else {
                        changed = true;
                        continue;
                    };
                    assignment.row_id = build_shift_row_id(class_id, fallback);
                    changed = true;
                }
                next_assignments.push(assignment);
                continue;
            }
            changed = true;
            continue;
        }

        if class_row_ids.contains(&assignment.row_id)
            || assignment.row_id.starts_with("pool-")
            || all_row_ids.contains(&assignment.row_id)
        {
            next_assignments.push(assignment);
        } else {
            changed = true;
        }
    }
    state.assignments = next_assignments;
    changed
}

/// Rebuilds `minSlotsByRowId`: a base entry on the bare class id applies to
/// sub-shift `s1`; all other sub-shifts default to `(0,0)`; orphan keys are
/// pruned.
fn rebuild_min_slots(
    state: &mut AppState,
    sub_shift_ids_by_class: &HashMap<String, HashSet<String>>,
) -> bool {
    let mut changed = false;
    let mut min_slots = std::mem::take(&mut state.min_slots_by_row_id);

    for row in state.section_rows() {
        let base = min_slots.remove(row.id());
        if base.is_some() {
            changed = true;
        }
        for shift in row.sub_shifts() {
            let key = build_shift_row_id(row.id(), &shift.id);
            min_slots.entry(key).or_insert_with(|| {
                changed = true;
                if shift.id == "s1" {
                    base.unwrap_or_default()
                } else {
                    MinSlots::default()
                }
            });
        }
    }

    let valid_keys: HashSet<String> = sub_shift_ids_by_class
        .iter()
        .flat_map(|(class_id, shift_ids)| {
            shift_ids
                .iter()
                .map(move |s| build_shift_row_id(class_id, s))
        })
        .collect();
    let before = min_slots.len();
    min_slots.retain(|key, _| valid_keys.contains(key));
    changed |= before != min_slots.len();

    state.min_slots_by_row_id = min_slots;
    changed
}

/// Rewrites `slotOverridesByKey` keys through the same id remap, summing
/// overrides whose keys collapse together.
fn remap_slot_overrides(
    state: &mut AppState,
    class_row_ids: &HashSet<String>,
    sub_shift_ids_by_class: &HashMap<String, HashSet<String>>,
) -> bool {
    let mut changed = false;
    let mut next_overrides: HashMap<String, i64> = HashMap::new();

    for (key, value) in std::mem::take(&mut state.slot_overrides_by_key) {
        let Some((row_id, date_iso)) = key.split_once("__") else {
            continue;
        };
        if row_id.is_empty() || date_iso.is_empty() {
            continue;
        }
        let (class_id, sub_shift_id) = parse_shift_row_id(row_id);
        let next_row_id = if class_row_ids.contains(row_id) && sub_shift_id.is_none() {
            changed = true;
            build_shift_row_id(row_id, "s1")
        } else if let Some(sub_shift_id) = sub_shift_id {
            let Some(class_shift_ids) = sub_shift_ids_by_class.get(class_id) else {
                changed = true;
                continue;
            };
            if !class_shift_ids.contains(sub_shift_id) {
                let Some(fallback) = class_shift_ids.iter().next() else {
                    changed = true;
                    continue;
                };
                changed = true;
                build_shift_row_id(class_id, fallback)
            } else {
                row_id.to_string()
            }
        } else {
            row_id.to_string()
        };

        let next_key = format!("{next_row_id}__{date_iso}");
        if next_key != key {
            changed = true;
        }
        *next_overrides.entry(next_key).or_insert(0) += value;
    }

    state.slot_overrides_by_key = next_overrides;
    changed
}

fn merge_solver_settings(state: &mut AppState, class_row_ids: &HashSet<String>) -> bool {
    let mut changed = false;
    let settings = &mut state.solver_settings;

    let days_before = settings.on_call_rest_days_before.clamp(0, MAX_ON_CALL_REST_DAYS);
    if days_before != settings.on_call_rest_days_before {
        settings.on_call_rest_days_before = days_before;
        changed = true;
    }
    let days_after = settings.on_call_rest_days_after.clamp(0, MAX_ON_CALL_REST_DAYS);
    if days_after != settings.on_call_rest_days_after {
        settings.on_call_rest_days_after = days_after;
        changed = true;
    }
    let tolerance = settings
        .working_hours_tolerance_hours
        .clamp(0.0, MAX_WORKING_HOURS_TOLERANCE);
    if (tolerance - settings.working_hours_tolerance_hours).abs() > f64::EPSILON {
        settings.working_hours_tolerance_hours = tolerance;
        changed = true;
    }

    let valid_class = settings
        .on_call_rest_class_id
        .as_ref()
        .is_some_and(|id| class_row_ids.contains(id));
    if !valid_class {
        let fallback = class_row_ids.iter().next().cloned();
        if settings.on_call_rest_class_id != fallback {
            settings.on_call_rest_class_id = fallback;
            changed = true;
        }
    }

    changed
}

/// Disables any `SolverRule` whose referenced rows no longer exist.
fn validate_solver_rules(state: &mut AppState) -> bool {
    let mut changed = false;
    let valid_shift_row_ids: HashSet<String> = state
        .section_rows()
        .flat_map(|row| {
            row.sub_shifts()
                .iter()
                .map(move |shift| build_shift_row_id(row.id(), &shift.id))
        })
        .collect();

    for rule in state.solver_rules.iter_mut() {
        let mut enabled = rule.enabled;
        if !valid_shift_row_ids.contains(&rule.if_shift_row_id) {
            enabled = false;
        }
        if matches!(rule.then_type, crate::domain::ThenType::ShiftRow) {
            let then_valid = rule
                .then_shift_row_id
                .as_ref()
                .is_some_and(|id| valid_shift_row_ids.contains(id));
            if !then_valid {
                enabled = false;
            }
        }
        if enabled != rule.enabled {
            rule.enabled = enabled;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data;

    #[test]
    fn normalization_is_idempotent() {
        let state = demo_data::generate_small();
        let (once, _) = normalize(state);
        let (twice, changed_again) = normalize(once.clone());
        assert!(!changed_again, "second normalisation pass should be a no-op");
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn deprecated_pools_are_purged() {
        let mut state = demo_data::generate_small();
        state.rows.push(WorkplaceRow::Pool {
            id: "pool-not-allocated".to_string(),
            name: "Distribution Pool".to_string(),
        });
        state.assignments.push(crate::domain::Assignment {
            id: "a-dep".to_string(),
            row_id: "pool-not-allocated".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            clinician_id: state.clinicians[0].id.clone(),
            source: None,
        });

        let (normalized, changed) = normalize(state);
        assert!(changed);
        assert!(!normalized.rows.iter().any(|r| r.id() == "pool-not-allocated"));
        assert!(!normalized
            .assignments
            .iter()
            .any(|a| a.row_id == "pool-not-allocated"));
    }

    #[test]
    fn default_sub_shift_is_synthesised_for_empty_rows() {
        let mut state = demo_data::generate_small();
        if let Some(row) = state
            .rows
            .iter_mut()
            .find(|r| matches!(r, WorkplaceRow::Section { .. }))
        {
            if let Some(shifts) = row.sub_shifts_mut() {
                shifts.clear();
            }
        }
        let (normalized, changed) = normalize(state);
        assert!(changed);
        assert!(normalized
            .section_rows()
            .all(|r| !r.sub_shifts().is_empty()));
    }

    #[test]
    fn override_keys_aggregate_on_collision() {
        let mut state = demo_data::generate_small();
        let class_id = state
            .section_rows()
            .next()
            .expect("at least one section")
            .id()
            .to_string();
        state
            .slot_overrides_by_key
            .insert(format!("{class_id}__2026-01-05"), 2);
        state
            .slot_overrides_by_key
            .insert(format!("{class_id}::s1__2026-01-05"), 3);

        let (normalized, _) = normalize(state);
        let key = format!("{class_id}::s1__2026-01-05");
        assert_eq!(normalized.slot_overrides_by_key.get(&key), Some(&5));
    }
}
