//! Benchmark for a single range solve.
//!
//! Run with: cargo run --release --bin bench

use std::time::Instant;

use chrono::NaiveDate;
use shift_scheduling::{constants, demo_data, solver};

fn main() {
    let state = demo_data::generate(demo_data::DemoData::Large);
    let n_clinicians = state.clinicians.len();
    let n_classes = state.section_rows().count();

    println!("Benchmark: range solve");
    println!("  Clinicians: {}", n_clinicians);
    println!("  Classes: {}", n_classes);
    println!();

    let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let end = start + chrono::Duration::days(6);

    let solve_start = Instant::now();
    let outcome = solver::solve_range(
        &state,
        start,
        end,
        false,
        constants::RANGE_BASE_BUDGET_SECONDS,
        constants::DEFAULT_SEARCH_WORKERS,
    );
    let elapsed = solve_start.elapsed();

    println!("Results:");
    println!("  Assignments: {}", outcome.assignments.len());
    println!("  Notes: {:?}", outcome.notes);
    println!("  Wall clock: {:.2?}", elapsed);
}
