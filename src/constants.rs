//! Process-wide defaults used by the state normaliser and slot expander.
//!
//! Values mirror the defaults implied by `original_source`'s
//! `_normalize_sub_shifts`: a default sub-shift starts at 08:00 and runs for
//! 4 hours, and the builtin "Distribution Pool" / "Reserve Pool" rows are the
//! two deprecated pool ids purged on load.

/// Separator between a class row id and a sub-shift id in a composite slot id.
pub const SHIFT_ROW_SEPARATOR: &str = "::";

pub const DEFAULT_LOCATION_ID: &str = "default-location";
pub const DEFAULT_LOCATION_NAME: &str = "Main Site";

pub const DEFAULT_SUB_SHIFT_START: &str = "08:00";
pub const DEFAULT_SUB_SHIFT_START_MINUTES: i64 = 8 * 60;
pub const DEFAULT_SUB_SHIFT_MINUTES: i64 = 4 * 60;

/// Deprecated pool row ids that never survive normalisation.
pub const DEPRECATED_POOL_IDS: &[&str] = &["pool-not-allocated", "pool-manual"];

pub const MINUTES_PER_DAY: i64 = 1440;

/// Default on-call rest window (days) when `onCallRestEnabled` is first turned on
/// without an explicit value.
pub const DEFAULT_ON_CALL_REST_DAYS: i64 = 1;
pub const MAX_ON_CALL_REST_DAYS: i64 = 7;
pub const MAX_WORKING_HOURS_TOLERANCE: f64 = 40.0;

/// Default single-day solve wall-clock budget, in seconds.
pub const SINGLE_DAY_BUDGET_SECONDS: f64 = 2.0;
/// Default range solve wall-clock budget for ranges up to a week.
pub const RANGE_BASE_BUDGET_SECONDS: f64 = 4.0;
/// Additional seconds granted per day beyond the first week of a range.
pub const RANGE_BUDGET_PER_EXTRA_DAY_SECONDS: f64 = 0.5;
pub const RANGE_BUDGET_CAP_SECONDS: f64 = 20.0;

pub const DEFAULT_SEARCH_WORKERS: usize = 8;

/// Base multipliers for the objective's lexicographic tiers (spec §4.4),
/// scaled per-solve by `omega_max` (see `crate::constraints::omega_max`).
pub const W_COV_BASE: i64 = 10_000;
pub const W_SLACK_BASE: i64 = 100;
pub const W_CONT_BASE: i64 = 20;
pub const W_HOURS_BASE: i64 = 50;
pub const W_PRIO_BASE: i64 = 10;
pub const W_PREF: i64 = 1;
