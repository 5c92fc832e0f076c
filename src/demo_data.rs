//! Demo data generators for clinical shift scheduling.
//!
//! Structure follows the teacher's generator: a seeded RNG, weighted
//! distributions picked via `pick_count`, and a `DemoData::{Small,Large}`
//! size knob exposed through the HTTP layer.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::{
    AppState, Clinician, Location, MinSlots, SolverSettings, SubShift, VacationRange,
    WorkplaceRow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn parameters(&self) -> DemoDataParameters {
        match self {
            DemoData::Small => DemoDataParameters {
                location_names: vec!["Main Campus".to_string(), "North Clinic".to_string()],
                class_names: vec![
                    "Emergency".to_string(),
                    "ICU".to_string(),
                    "Pediatrics".to_string(),
                ],
                clinician_count: 12,
                days_in_schedule: 14,
                sub_shift_count_distribution: vec![(1, 0.3), (2, 0.6), (3, 0.1)],
                qualification_count_distribution: vec![(1, 2.0), (2, 3.0), (3, 1.0)],
                vacation_count_distribution: vec![(0, 5.0), (1, 2.0)],
            },
            DemoData::Large => DemoDataParameters {
                location_names: vec![
                    "Main Campus".to_string(),
                    "North Clinic".to_string(),
                    "Riverside Annex".to_string(),
                ],
                class_names: vec![
                    "Emergency".to_string(),
                    "ICU".to_string(),
                    "Pediatrics".to_string(),
                    "Radiology".to_string(),
                    "Surgery".to_string(),
                    "Cardiology".to_string(),
                ],
                clinician_count: 40,
                days_in_schedule: 28,
                sub_shift_count_distribution: vec![(1, 0.2), (2, 0.5), (3, 0.3)],
                qualification_count_distribution: vec![(1, 1.0), (2, 3.0), (3, 2.0)],
                vacation_count_distribution: vec![(0, 4.0), (1, 3.0), (2, 1.0)],
            },
        }
    }
}

struct DemoDataParameters {
    location_names: Vec<String>,
    class_names: Vec<String>,
    clinician_count: usize,
    days_in_schedule: i64,
    sub_shift_count_distribution: Vec<(usize, f64)>,
    qualification_count_distribution: Vec<(usize, f64)>,
    vacation_count_distribution: Vec<(usize, f64)>,
}

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

/// Convenience wrapper used throughout the test suite.
pub fn generate_small() -> AppState {
    generate(DemoData::Small)
}

pub fn generate_large() -> AppState {
    generate(DemoData::Large)
}

/// Generates a synthetic, already-normalised `AppState` for the given size.
pub fn generate(demo: DemoData) -> AppState {
    let params = demo.parameters();
    let mut rng = StdRng::seed_from_u64(0);

    let locations: Vec<Location> = params
        .location_names
        .iter()
        .enumerate()
        .map(|(i, name)| Location {
            id: format!("loc-{i}"),
            name: name.clone(),
        })
        .collect();

    let start_date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

    let sub_shift_templates: Vec<Vec<(&str, &str, u8)>> = vec![
        vec![("06:00", "14:00", 0)],
        vec![("06:00", "14:00", 0), ("14:00", "22:00", 0)],
        vec![("06:00", "14:00", 0), ("14:00", "22:00", 0), ("22:00", "06:00", 1)],
    ];

    let mut rows = Vec::new();
    for (i, class_name) in params.class_names.iter().enumerate() {
        let class_id = format!("class-{i}");
        let sub_shift_count = pick_count(&mut rng, &params.sub_shift_count_distribution);
        let template = &sub_shift_templates[sub_shift_count.saturating_sub(1).min(2)];
        let sub_shifts: Vec<SubShift> = template
            .iter()
            .enumerate()
            .map(|(idx, (start, end, offset))| SubShift {
                id: format!("s{}", idx + 1),
                name: format!("Shift {}", idx + 1),
                order: (idx + 1) as u8,
                start_time: start.to_string(),
                end_time: end.to_string(),
                end_day_offset: *offset,
                hours: None,
            })
            .collect();
        let location_id = locations[i % locations.len()].id.clone();

        rows.push(WorkplaceRow::Section {
            id: class_id,
            name: class_name.clone(),
            location_id: Some(location_id),
            sub_shifts,
        });
    }
    rows.push(WorkplaceRow::Pool {
        id: "pool-rest-day".to_string(),
        name: "Rest Day".to_string(),
    });
    rows.push(WorkplaceRow::Pool {
        id: "pool-vacation".to_string(),
        name: "Vacation".to_string(),
    });

    let name_permutations = generate_name_permutations(&mut rng);
    let class_ids: Vec<String> = rows
        .iter()
        .filter(|r| r.is_section())
        .map(|r| r.id().to_string())
        .collect();

    let mut clinicians = Vec::new();
    for i in 0..params.clinician_count {
        let name = name_permutations[i % name_permutations.len()].clone();

        let qualification_count = pick_count(&mut rng, &params.qualification_count_distribution)
            .min(class_ids.len());
        let qualified: Vec<String> = class_ids
            .choose_multiple(&mut rng, qualification_count)
            .cloned()
            .collect();
        let mut preferred = qualified.clone();
        preferred.shuffle(&mut rng);
        preferred.truncate(rng.gen_range(0..=preferred.len()));

        let vacation_count = pick_count(&mut rng, &params.vacation_count_distribution);
        let vacations: Vec<VacationRange> = (0..vacation_count)
            .map(|_| {
                let offset = rng.gen_range(0..params.days_in_schedule.max(1));
                let span = rng.gen_range(1..=3);
                let start = start_date + Duration::days(offset);
                VacationRange {
                    start,
                    end: start + Duration::days(span - 1),
                }
            })
            .collect();

        let working_hours_per_week = if rng.gen_bool(0.7) {
            Some(*[32.0, 36.0, 40.0].choose(&mut rng).unwrap())
        } else {
            None
        };

        clinicians.push(Clinician {
            id: format!("c{i}"),
            name,
            qualified_class_ids: qualified,
            preferred_class_ids: preferred,
            vacations,
            working_hours_per_week,
        });
    }

    let mut min_slots_by_row_id = std::collections::HashMap::new();
    for class_id in &class_ids {
        let row = rows.iter().find(|r| r.id() == class_id).unwrap();
        for sub_shift in row.sub_shifts() {
            let row_id = crate::domain::build_shift_row_id(class_id, &sub_shift.id);
            min_slots_by_row_id.insert(
                row_id,
                MinSlots {
                    weekday: rng.gen_range(1..=3),
                    weekend: rng.gen_range(0..=2),
                },
            );
        }
    }

    AppState {
        locations,
        locations_enabled: true,
        rows,
        clinicians,
        assignments: Vec::new(),
        min_slots_by_row_id,
        slot_overrides_by_key: std::collections::HashMap::new(),
        holiday_country: None,
        holiday_year: None,
        holidays: Vec::new(),
        published_week_starts: Vec::new(),
        solver_settings: SolverSettings::default(),
        solver_rules: Vec::new(),
    }
}

/// Pick a count based on a weighted distribution.
fn pick_count(rng: &mut StdRng, distribution: &[(usize, f64)]) -> usize {
    let total_weight: f64 = distribution.iter().map(|(_, w)| w).sum();
    let mut choice = rng.gen::<f64>() * total_weight;

    for (count, weight) in distribution {
        if choice < *weight {
            return *count;
        }
        choice -= weight;
    }
    distribution.last().map(|(c, _)| *c).unwrap_or(1)
}

const FIRST_NAMES: &[&str] = &[
    "Amy", "Beth", "Carl", "Dan", "Elsa", "Flo", "Gus", "Hugo", "Ivy", "Jay",
];
const LAST_NAMES: &[&str] = &[
    "Cole", "Fox", "Green", "Jones", "King", "Li", "Poe", "Rye", "Smith", "Watt",
];

fn generate_name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("{} {}", first, last));
        }
    }
    names.shuffle(rng);
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_demo_has_expected_shape() {
        let state = generate(DemoData::Small);
        assert_eq!(state.clinicians.len(), 12);
        assert_eq!(state.section_rows().count(), 3);
        assert!(state.assignments.is_empty());
    }

    #[test]
    fn large_demo_has_more_clinicians_than_small() {
        let small = generate(DemoData::Small);
        let large = generate(DemoData::Large);
        assert!(large.clinicians.len() > small.clinicians.len());
    }

    #[test]
    fn demo_data_from_str_accepts_any_case() {
        assert_eq!("SMALL".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("small".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("LARGE".parse::<DemoData>(), Ok(DemoData::Large));
        assert!("invalid".parse::<DemoData>().is_err());
    }

    #[test]
    fn every_clinician_with_preferences_is_also_qualified() {
        let state = generate(DemoData::Small);
        for clinician in &state.clinicians {
            for class_id in &clinician.preferred_class_ids {
                assert!(clinician.qualified_class_ids.contains(class_id));
            }
        }
    }

    #[test]
    fn every_section_row_has_min_slots_for_every_sub_shift() {
        let state = generate(DemoData::Small);
        for row in state.section_rows() {
            for sub_shift in row.sub_shifts() {
                let row_id = crate::domain::build_shift_row_id(row.id(), &sub_shift.id);
                assert!(state.min_slots_by_row_id.contains_key(&row_id));
            }
        }
    }
}
