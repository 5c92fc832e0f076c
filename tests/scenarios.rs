//! Concrete scenario tests (spec §8: S1-S6).

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use shift_scheduling::domain::{
    AppState, Assignment, AssignmentSource, Clinician, Location, MinSlots, SolverSettings,
    SubShift, WorkplaceRow,
};
use shift_scheduling::{domain, solver};

fn sub_shift(id: &str, order: u8, start: &str, end: &str, end_day_offset: u8) -> SubShift {
    SubShift {
        id: id.to_string(),
        name: format!("Shift {order}"),
        order,
        start_time: start.to_string(),
        end_time: end.to_string(),
        end_day_offset,
        hours: None,
    }
}

fn clinician(id: &str, qualified: &[&str]) -> Clinician {
    Clinician {
        id: id.to_string(),
        name: id.to_string(),
        qualified_class_ids: qualified.iter().map(|s| s.to_string()).collect(),
        preferred_class_ids: Vec::new(),
        vacations: Vec::new(),
        working_hours_per_week: None,
    }
}

fn base_state(class_id: &str, sub_shifts: Vec<SubShift>, clinicians: Vec<Clinician>) -> AppState {
    let min_slots_by_row_id = sub_shifts
        .iter()
        .map(|s| {
            (
                domain::build_shift_row_id(class_id, &s.id),
                MinSlots {
                    weekday: 1,
                    weekend: 1,
                },
            )
        })
        .collect::<HashMap<_, _>>();

    AppState {
        locations: vec![Location {
            id: "loc-1".to_string(),
            name: "Main".to_string(),
        }],
        locations_enabled: true,
        rows: vec![WorkplaceRow::Section {
            id: class_id.to_string(),
            name: class_id.to_string(),
            location_id: Some("loc-1".to_string()),
            sub_shifts,
        }],
        clinicians,
        assignments: Vec::new(),
        min_slots_by_row_id,
        slot_overrides_by_key: HashMap::new(),
        holiday_country: None,
        holiday_year: None,
        holidays: Vec::new(),
        published_week_starts: Vec::new(),
        solver_settings: SolverSettings::default(),
        solver_rules: Vec::new(),
    }
}

fn target_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

#[test]
fn s1_full_coverage_with_three_continuous_slots() {
    let mut state = base_state(
        "a",
        vec![
            sub_shift("s1", 1, "08:00", "12:00", 0),
            sub_shift("s2", 2, "12:00", "16:00", 0),
            sub_shift("s3", 3, "16:00", "20:00", 0),
        ],
        vec![clinician("c1", &["a"])],
    );
    state.solver_settings.prefer_continuous_shifts = true;

    let day = target_day();
    let outcome = solver::solve_range(&state, day, day, false, 4.0, 8);

    assert_eq!(outcome.assignments.len(), 3);
    assert!(outcome.assignments.iter().all(|a| a.clinician_id == "c1"));
    assert!(outcome.notes.is_empty());
}

#[test]
fn s2_gap_free_with_zero_required_middle() {
    let mut state = base_state(
        "a",
        vec![
            sub_shift("s1", 1, "08:00", "12:00", 0),
            sub_shift("s2", 2, "12:00", "16:00", 0),
            sub_shift("s3", 3, "16:00", "20:00", 0),
        ],
        vec![clinician("c1", &["a"])],
    );
    state.solver_settings.prefer_continuous_shifts = true;
    let middle_row_id = domain::build_shift_row_id("a", "s2");
    state.min_slots_by_row_id.insert(
        middle_row_id,
        MinSlots {
            weekday: 0,
            weekend: 0,
        },
    );

    let day = target_day();
    let outcome = solver::solve_range(&state, day, day, true, 4.0, 8);

    assert!(outcome.assignments.len() == 1 || outcome.assignments.len() == 2);
    let row_ids: Vec<&str> = outcome.assignments.iter().map(|a| a.row_id.as_str()).collect();
    let has_forbidden_combo =
        row_ids.contains(&"a::s1") && row_ids.contains(&"a::s3") && !row_ids.contains(&"a::s2");
    assert!(!has_forbidden_combo, "08-12 + 16-20 without the bridge must be forbidden");
}

#[test]
fn s3_multi_person_slot() {
    let state = base_state(
        "a",
        vec![sub_shift("s1", 1, "08:00", "12:00", 0)],
        vec![clinician("c1", &["a"]), clinician("c2", &["a"])],
    );
    let mut state = state;
    let row_id = domain::build_shift_row_id("a", "s1");
    state.min_slots_by_row_id.insert(
        row_id.clone(),
        MinSlots {
            weekday: 2,
            weekend: 2,
        },
    );

    let day = target_day();
    let outcome = solver::solve_range(&state, day, day, false, 4.0, 8);

    assert_eq!(outcome.assignments.len(), 2);
    assert!(outcome.assignments.iter().all(|a| a.row_id == row_id));
    let clinicians: std::collections::HashSet<&str> =
        outcome.assignments.iter().map(|a| a.clinician_id.as_str()).collect();
    assert_eq!(clinicians.len(), 2);
}

#[test]
fn s4_infeasible_qualification_reports_unmet_demand() {
    // The sole clinician is qualified for a class that isn't scheduled at
    // all, so the "mri" row has no qualified candidate for its slot.
    let state = base_state(
        "mri",
        vec![sub_shift("s1", 1, "08:00", "12:00", 0)],
        vec![clinician("c1", &["ct"])],
    );

    let day = target_day();
    let outcome = solver::solve_range(&state, day, day, false, 4.0, 8);

    assert!(outcome.assignments.is_empty());
    assert!(outcome.notes.iter().any(|n| n == "Could not fill all required slots"));
}

#[test]
fn s5_overnight_continuity() {
    let mut state = base_state(
        "a",
        vec![
            sub_shift("s1", 1, "16:00", "20:00", 0),
            sub_shift("s2", 2, "20:00", "08:00", 1),
        ],
        vec![clinician("c1", &["a"])],
    );
    state.solver_settings.prefer_continuous_shifts = true;

    let day = target_day();
    let outcome = solver::solve_range(&state, day, day, false, 4.0, 8);

    assert_eq!(outcome.assignments.len(), 2);
    assert!(outcome.assignments.iter().all(|a| a.clinician_id == "c1"));
}

#[test]
fn s6_on_call_rest_push_out_within_range() {
    let mut state = base_state(
        "a",
        vec![sub_shift("s1", 1, "08:00", "12:00", 0)],
        vec![clinician("c1", &["a"])],
    );
    // The rest class must be a qualifiable section so it can carry a
    // slot-instance for the manual assignment to resolve against.
    state.rows.push(WorkplaceRow::Section {
        id: "rest".to_string(),
        name: "On call".to_string(),
        location_id: Some("loc-1".to_string()),
        sub_shifts: vec![sub_shift("s1", 1, "08:00", "08:00", 1)],
    });

    let rest_day = target_day();
    let solved_day = rest_day + Duration::days(1);

    state.assignments.push(Assignment {
        id: "manual-rest".to_string(),
        row_id: domain::build_shift_row_id("rest", "s1"),
        date: rest_day,
        clinician_id: "c1".to_string(),
        source: Some(AssignmentSource::Manual),
    });
    state.solver_settings.on_call_rest_enabled = true;
    state.solver_settings.on_call_rest_class_id = Some("rest".to_string());
    state.solver_settings.on_call_rest_days_before = 0;
    state.solver_settings.on_call_rest_days_after = 1;

    let outcome = solver::solve_range(&state, solved_day, solved_day, false, 4.0, 8);

    assert!(outcome
        .assignments
        .iter()
        .all(|a| a.clinician_id != "c1" || a.row_id != "a::s1"));
    assert!(!outcome
        .notes
        .iter()
        .any(|n| n.contains("outside the solved range")));
}
