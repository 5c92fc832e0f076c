//! Constraint Builder + Objective Composer (spec §4.3/§4.4).
//!
//! Builds a `good_lp` model: one binary decision variable per
//! `(clinician, date, slot)` triple in the variable domain, the hard
//! constraints of §4.3, the coverage/slack pair per slot-instance, and the
//! weighted-sum objective of §4.4. Nothing here invokes a solver backend —
//! that is `solver.rs`'s job.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use good_lp::{variable, Constraint, Expression, ProblemVariables, Variable};

use crate::constants::{
    W_COV_BASE, W_CONT_BASE, W_HOURS_BASE, W_PREF, W_PRIO_BASE, W_SLACK_BASE,
};
use crate::domain::{build_shift_row_id, AppState, RuleEnforcement, ThenType};
use crate::expand::{ExpandedRange, SlotInstance};

#[derive(Debug, Clone)]
pub struct DecisionVar {
    pub variable: Variable,
    pub clinician_id: String,
    pub row_id: String,
    pub class_id: String,
    pub date: NaiveDate,
}

struct SlotCoverage {
    row_id: String,
    date: NaiveDate,
    omega: i64,
    target: i64,
    covered: Variable,
    slack: Variable,
    candidate_vars: Vec<Variable>,
}

pub struct BuiltModel {
    pub vars: ProblemVariables,
    pub constraints: Vec<Constraint>,
    pub objective: Expression,
    pub decision_vars: Vec<DecisionVar>,
    /// On-call rest conflicts against a manual assignment outside the
    /// target range: surfaced as notes, never as constraints.
    pub boundary_rest_notes: Vec<String>,
}

/// `ω_s`: the tie-break weight pushing high-priority sections first.
fn slot_weight(class_index: usize, total_classes: usize, sub_shift_order: u8) -> i64 {
    std::cmp::max(1, total_classes as i64 - class_index as i64) * 10 + (4 - sub_shift_order as i64)
}

/// `ω_max`: the worst-case `ω_s`, used to scale the objective's tiers.
pub fn omega_max(total_classes: usize) -> i64 {
    std::cmp::max(1, total_classes as i64) * 10 + 3
}

pub fn build(state: &AppState, expanded: &ExpandedRange, only_fill_required: bool) -> BuiltModel {
    let mut vars = ProblemVariables::new();
    let mut constraints = Vec::new();
    let mut decision_vars = Vec::new();
    let mut boundary_rest_notes = Vec::new();

    let class_ids: Vec<&str> = state.section_rows().map(|r| r.id()).collect();
    let class_index: HashMap<&str, usize> = class_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let total_classes = class_ids.len();

    // Manual assignments resolved against the context range's slot
    // instances, keyed by (clinician, row_id, date) for O(1) lookup.
    let mut manual_by_slot: HashMap<(String, String, NaiveDate), ()> = HashMap::new();
    let mut manual_instances: Vec<(&SlotInstance, String)> = Vec::new();
    for assignment in &state.assignments {
        if let Some(instance) = expanded
            .instances
            .iter()
            .find(|i| i.row_id == assignment.row_id && i.date == assignment.date)
        {
            manual_by_slot.insert((
                assignment.clinician_id.clone(),
                assignment.row_id.clone(),
                assignment.date,
            ));
            manual_instances.push((instance, assignment.clinician_id.clone()));
        }
    }

    // Decision variables: target dates only, qualified clinicians not on
    // vacation, not already manually filled for that exact slot, and not
    // overlapping any other manual assignment of the same clinician.
    let mut var_index: HashMap<(String, String, NaiveDate), Variable> = HashMap::new();
    let mut vars_by_clinician_date: HashMap<(String, NaiveDate), Vec<(Variable, &SlotInstance)>> =
        HashMap::new();

    for instance in &expanded.instances {
        if !expanded.is_target_date(instance.date) {
            continue;
        }
        for clinician in &state.clinicians {
            if !clinician.is_qualified(&instance.class_id) {
                continue;
            }
            if clinician.is_on_vacation(instance.date) {
                continue;
            }
            if manual_by_slot.contains_key(&(
                clinician.id.clone(),
                instance.row_id.clone(),
                instance.date,
            )) {
                continue;
            }
            let overlaps_manual = manual_instances.iter().any(|(manual_instance, c_id)| {
                c_id == &clinician.id && instance.overlaps(manual_instance)
            });
            if overlaps_manual {
                continue;
            }

            let variable = vars.add(variable().binary());
            var_index.insert(
                (clinician.id.clone(), instance.row_id.clone(), instance.date),
                variable,
            );
            vars_by_clinician_date
                .entry((clinician.id.clone(), instance.date))
                .or_default()
                .push((variable, instance));
            decision_vars.push(DecisionVar {
                variable,
                clinician_id: clinician.id.clone(),
                row_id: instance.row_id.clone(),
                class_id: instance.class_id.clone(),
                date: instance.date,
            });
        }
    }

    // 1. Pairwise temporal feasibility.
    for entries in vars_by_clinician_date.values() {
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (v1, s1) = entries[i];
                let (v2, s2) = entries[j];
                if s1.overlaps(s2) {
                    constraints.push((v1 + v2).leq(1.0));
                }
            }
        }
    }

    // Decision variables and manual assignments alike, as `Expression`s, so
    // constraints 2 and 3 range over the returned-union-manual candidate set
    // (manual entries are fixed-at-1 and carry no variable to optimise).
    let mut combined_by_clinician_date: HashMap<(String, NaiveDate), Vec<(Expression, &SlotInstance, bool)>> =
        HashMap::new();
    for (key, entries) in &vars_by_clinician_date {
        for (v, s) in entries {
            combined_by_clinician_date
                .entry(key.clone())
                .or_default()
                .push((Expression::from(*v), *s, false));
        }
    }
    for (instance, clinician_id) in &manual_instances {
        let instance: &SlotInstance = *instance;
        combined_by_clinician_date
            .entry((clinician_id.clone(), instance.date))
            .or_default()
            .push((Expression::from(1.0), instance, true));
    }

    // 2. Same-day same-location, when enabled.
    if state.solver_settings.enforce_same_location_per_day {
        for entries in combined_by_clinician_date.values() {
            for i in 0..entries.len() {
                for j in (i + 1)..entries.len() {
                    let (e1, s1, m1) = &entries[i];
                    let (e2, s2, m2) = &entries[j];
                    if *m1 && *m2 {
                        // Both fixed by existing state; nothing to constrain.
                        continue;
                    }
                    if s1.date != s2.date {
                        continue;
                    }
                    match (&s1.location_id, &s2.location_id) {
                        (Some(l1), Some(l2)) if l1 != l2 => {
                            constraints.push((e1.clone() + e2.clone()).leq(1.0));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    // 3. Continuity: pairwise-gap formulation with bridge variables.
    let mut continuity_joins: Vec<Expression> = Vec::new();
    if state.solver_settings.prefer_continuous_shifts {
        for entries in combined_by_clinician_date.values() {
            let mut sorted = entries.clone();
            sorted.sort_by_key(|(_, s, _)| s.abs_start);

            for i in 0..sorted.len() {
                let (ei, si, mi) = sorted[i].clone();
                for j in (i + 1)..sorted.len() {
                    let (ej, sj, mj) = sorted[j].clone();
                    if si.overlaps(sj) {
                        continue;
                    }
                    if mi && mj {
                        // Both fixed by existing state; nothing to optimise.
                        continue;
                    }
                    if si.abs_end == sj.abs_start {
                        // Touching: reward the join instead of constraining it.
                        let join = vars.add(variable().binary());
                        constraints.push(Expression::from(join).leq(ei.clone()));
                        constraints.push(Expression::from(join).leq(ej.clone()));
                        constraints.push((ei.clone() + ej.clone() - join).leq(1.0));
                        continuity_joins.push(Expression::from(join));
                        continue;
                    }

                    let bridges: Vec<Expression> = sorted
                        .iter()
                        .filter(|(_, sk, _)| sk.abs_start >= si.abs_end && sk.abs_end <= sj.abs_start)
                        .map(|(ek, _, _)| ek.clone())
                        .collect();

                    let lhs: Expression = if bridges.is_empty() {
                        ei.clone() + ej.clone()
                    } else {
                        let bridge_sum = bridges
                            .into_iter()
                            .fold(Expression::from(0.0), |acc, b| acc + b);
                        ei.clone() + ej.clone() - bridge_sum
                    };
                    constraints.push(lhs.leq(1.0));
                }
            }
        }
    }

    // 4. On-call rest.
    let settings = &state.solver_settings;
    if settings.on_call_rest_enabled
        && (settings.on_call_rest_days_before > 0 || settings.on_call_rest_days_after > 0)
    {
        if let Some(rest_class_id) = &settings.on_call_rest_class_id {
            for clinician in &state.clinicians {
                for date in expanded.context_dates() {
                    let rest_var = var_index_for_class(&var_index, &state, clinician, rest_class_id, date);
                    let rest_manual = manual_by_slot_for_class(&manual_by_slot, state, clinician, rest_class_id, date);
                    if rest_var.is_none() && !rest_manual {
                        continue;
                    }

                    let mut neighbour_dates = Vec::new();
                    for k in 1..=settings.on_call_rest_days_before {
                        neighbour_dates.push(date - Duration::days(k));
                    }
                    for k in 1..=settings.on_call_rest_days_after {
                        neighbour_dates.push(date + Duration::days(k));
                    }

                    for neighbour in neighbour_dates {
                        let neighbour_in_target = expanded.is_target_date(neighbour);
                        let neighbour_has_manual = state.assignments.iter().any(|a| {
                            a.clinician_id == clinician.id && a.date == neighbour && a.is_manual()
                        });

                        if !neighbour_in_target {
                            if neighbour_has_manual && (rest_var.is_some() || rest_manual) {
                                boundary_rest_notes.push(format!(
                                    "On-call rest conflict: {} has a manual assignment on {} outside the solved range, adjacent to a rest-class assignment on {}",
                                    clinician.name, neighbour, date
                                ));
                            }
                            continue;
                        }

                        if neighbour_has_manual {
                            // Invert: forbid the rest-class assignment itself.
                            if let Some(rv) = rest_var {
                                constraints.push(Expression::from(rv).leq(0.0));
                            } else if rest_manual {
                                boundary_rest_notes.push(format!(
                                    "On-call rest conflict: {} is manually assigned to the rest class on {} and also manually assigned on {}",
                                    clinician.name, date, neighbour
                                ));
                            }
                            continue;
                        }

                        if let Some(rv) = rest_var {
                            for (other_var, _) in vars_by_clinician_date
                                .get(&(clinician.id.clone(), neighbour))
                                .into_iter()
                                .flatten()
                            {
                                constraints.push((Expression::from(rv) + *other_var).leq(1.0));
                            }
                        }
                        if rest_manual {
                            for (other_var, _) in
                                vars_by_clinician_date.get(&(clinician.id.clone(), neighbour)).into_iter().flatten()
                            {
                                constraints.push(Expression::from(*other_var).leq(0.0));
                            }
                        }
                    }
                }
            }
        }
    }

    // SolverRule enforcement (hard or soft).
    let mut objective = Expression::from(0.0);
    for rule in state.solver_rules.iter().filter(|r| r.enabled) {
        for clinician in &state.clinicians {
            for date in expanded.target_dates() {
                let Some(&if_var) = var_index.get(&(clinician.id.clone(), rule.if_shift_row_id.clone(), date)) else {
                    continue;
                };
                let then_date = date + Duration::days(rule.day_delta);
                if !expanded.is_target_date(then_date) && !expanded.context_dates().any(|d| d == then_date) {
                    continue;
                }

                let then_expr: Expression = match rule.then_type {
                    ThenType::ShiftRow => {
                        let Some(then_row_id) = &rule.then_shift_row_id else {
                            continue;
                        };
                        match var_index.get(&(clinician.id.clone(), then_row_id.clone(), then_date)) {
                            Some(&v) => Expression::from(v),
                            None => Expression::from(0.0),
                        }
                    }
                    ThenType::Off => vars_by_clinician_date
                        .get(&(clinician.id.clone(), then_date))
                        .into_iter()
                        .flatten()
                        .fold(Expression::from(0.0), |acc, (v, _)| acc + *v),
                };

                match rule.then_type {
                    ThenType::ShiftRow => match settings.solver_rule_enforcement {
                        RuleEnforcement::Hard => {
                            // if_var == 1 implies then_expr >= 1
                            constraints.push((then_expr.clone() - if_var).geq(0.0));
                        }
                        RuleEnforcement::Soft { weight } => {
                            let slack = vars.add(variable().binary());
                            constraints.push((then_expr.clone() - Expression::from(if_var) + slack).geq(0.0));
                            objective = objective + (weight as f64) * slack;
                        }
                    },
                    ThenType::Off => match settings.solver_rule_enforcement {
                        RuleEnforcement::Hard => {
                            // if_var == 1 implies then_expr == 0; big-M not
                            // needed since then_expr is itself a 0/1 sum of
                            // binaries bounded by the day's candidate count.
                            let bound = vars_by_clinician_date
                                .get(&(clinician.id.clone(), then_date))
                                .map(|v| v.len())
                                .unwrap_or(0) as f64;
                            constraints.push(
                                (then_expr.clone() + bound * Expression::from(if_var)).leq(bound),
                            );
                        }
                        RuleEnforcement::Soft { weight } => {
                            let bound = vars_by_clinician_date
                                .get(&(clinician.id.clone(), then_date))
                                .map(|v| v.len())
                                .unwrap_or(0) as f64;
                            let slack = vars.add(variable().min(0.0).max(bound));
                            constraints.push(
                                (then_expr.clone() + bound * Expression::from(if_var) - slack)
                                    .leq(bound),
                            );
                            objective = objective + (weight as f64) * slack;
                        }
                    },
                }
            }
        }
    }

    // Coverage / slack, target dates only.
    let mut coverages = Vec::new();
    for instance in &expanded.instances {
        if !expanded.is_target_date(instance.date) {
            continue;
        }
        let Some(&class_idx) = class_index.get(instance.class_id.as_str()) else {
            continue;
        };
        let sub_shift_order = state
            .row_by_id(&instance.class_id)
            .and_then(|r| r.sub_shifts().iter().find(|s| s.id == instance.sub_shift_id))
            .map(|s| s.order)
            .unwrap_or(1);
        let omega = slot_weight(class_idx, total_classes, sub_shift_order);

        let manual_count = state
            .assignments
            .iter()
            .filter(|a| a.row_id == instance.row_id && a.date == instance.date)
            .count() as i64;
        let target = (instance.required_slots - manual_count).max(0);
        if target == 0 && manual_count == 0 && instance.required_slots == 0 {
            continue;
        }

        let candidate_vars: Vec<Variable> = decision_vars
            .iter()
            .filter(|dv| dv.row_id == instance.row_id && dv.date == instance.date)
            .map(|dv| dv.variable)
            .collect();

        let covered = vars.add(variable().binary());
        let slack = vars.add(variable().integer().min(0.0).max(target as f64));

        let sum_x = candidate_vars
            .iter()
            .fold(Expression::from(0.0), |acc, v| acc + *v);

        constraints.push((Expression::from(covered) - sum_x.clone() - (manual_count as f64)).leq(0.0));
        constraints.push((sum_x.clone() + (manual_count as f64) + Expression::from(slack) - (target as f64)).geq(0.0));
        if only_fill_required {
            constraints.push(sum_x.clone().leq(target as f64));
        }

        coverages.push(SlotCoverage {
            row_id: instance.row_id.clone(),
            date: instance.date,
            omega,
            target,
            covered,
            slack,
            candidate_vars,
        });
    }

    // Objective (spec §4.4).
    let omega_max_value = omega_max(total_classes);
    let w_cov = (W_COV_BASE * omega_max_value) as f64;
    let w_slack = (W_SLACK_BASE * omega_max_value) as f64;
    let w_hours = (W_HOURS_BASE * omega_max_value) as f64;
    let w_prio = (W_PRIO_BASE * omega_max_value) as f64;
    let w_cont = (W_CONT_BASE * omega_max_value) as f64;

    for coverage in &coverages {
        objective = objective - w_cov * (coverage.omega as f64) * Expression::from(coverage.covered);
        objective = objective + w_slack * (coverage.omega as f64) * Expression::from(coverage.slack);
        if !only_fill_required {
            for v in &coverage.candidate_vars {
                objective = objective - w_prio * (coverage.omega as f64) * Expression::from(*v);
            }
        }
    }

    for dv in &decision_vars {
        let Some(clinician) = state.clinician_by_id(&dv.clinician_id) else {
            continue;
        };
        let pref = clinician.preference_weight(&dv.class_id);
        if pref > 0 {
            objective = objective - (W_PREF as f64) * (pref as f64) * Expression::from(dv.variable);
        }
    }

    if !continuity_joins.is_empty() {
        let join_sum = continuity_joins
            .into_iter()
            .fold(Expression::from(0.0), |acc, j| acc + j);
        objective = objective - w_cont * join_sum;
    }

    objective = objective + hours_deviation_terms(state, expanded, &vars_by_clinician_date, &mut vars, &mut constraints, w_hours);

    BuiltModel {
        vars,
        constraints,
        objective,
        decision_vars,
        boundary_rest_notes,
    }
}

fn var_index_for_class(
    var_index: &HashMap<(String, String, NaiveDate), Variable>,
    state: &AppState,
    clinician: &crate::domain::Clinician,
    class_id: &str,
    date: NaiveDate,
) -> Option<Variable> {
    let row = state.row_by_id(class_id)?;
    for sub_shift in row.sub_shifts() {
        let row_id = build_shift_row_id(class_id, &sub_shift.id);
        if let Some(&v) = var_index.get(&(clinician.id.clone(), row_id, date)) {
            return Some(v);
        }
    }
    None
}

fn manual_by_slot_for_class(
    manual_by_slot: &HashMap<(String, String, NaiveDate), ()>,
    state: &AppState,
    clinician: &crate::domain::Clinician,
    class_id: &str,
    date: NaiveDate,
) -> bool {
    let Some(row) = state.row_by_id(class_id) else {
        return false;
    };
    row.sub_shifts().iter().any(|s| {
        let row_id = build_shift_row_id(class_id, &s.id);
        manual_by_slot.contains_key(&(clinician.id.clone(), row_id, date))
    })
}

/// Deadbanded absolute hours-deviation term, spec §4.4's soft tier.
fn hours_deviation_terms(
    state: &AppState,
    expanded: &ExpandedRange,
    vars_by_clinician_date: &HashMap<(String, NaiveDate), Vec<(Variable, &SlotInstance)>>,
    vars: &mut ProblemVariables,
    constraints: &mut Vec<Constraint>,
    w_hours: f64,
) -> Expression {
    let mut term = Expression::from(0.0);
    let target_days = (expanded.target_end - expanded.target_start).num_days() + 1;
    let whole_weeks = std::cmp::max(1, target_days / 7) as f64;

    for clinician in &state.clinicians {
        let Some(weekly_target) = clinician.working_hours_per_week else {
            continue;
        };
        let target_hours = weekly_target * whole_weeks;
        let tolerance = state.solver_settings.working_hours_tolerance_hours;

        let mut actual_minutes = Expression::from(0.0);
        let mut manual_minutes = 0.0_f64;
        for date in expanded.target_dates() {
            if let Some(entries) = vars_by_clinician_date.get(&(clinician.id.clone(), date)) {
                for (v, instance) in entries {
                    let minutes = (instance.abs_end - instance.abs_start) as f64;
                    actual_minutes = actual_minutes + Expression::from(*v) * minutes;
                }
            }
            for assignment in state
                .assignments
                .iter()
                .filter(|a| a.clinician_id == clinician.id && a.date == date)
            {
                if let Some(instance) = expanded
                    .instances
                    .iter()
                    .find(|i| i.row_id == assignment.row_id && i.date == date)
                {
                    manual_minutes += (instance.abs_end - instance.abs_start) as f64;
                }
            }
        }
        let actual_hours = actual_minutes * (1.0 / 60.0) + manual_minutes / 60.0;

        let dev_plus = vars.add(variable().min(0.0));
        let dev_minus = vars.add(variable().min(0.0));
        constraints.push(
            (actual_hours - target_hours - Expression::from(dev_plus) + Expression::from(dev_minus))
                .eq(0.0),
        );

        let excess_plus = vars.add(variable().min(0.0));
        let excess_minus = vars.add(variable().min(0.0));
        constraints.push((Expression::from(excess_plus) - Expression::from(dev_plus) + tolerance).geq(0.0));
        constraints.push((Expression::from(excess_minus) - Expression::from(dev_minus) + tolerance).geq(0.0));

        term = term + w_hours * Expression::from(excess_plus) + w_hours * Expression::from(excess_minus);
    }

    term
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{demo_data, expand};

    #[test]
    fn builds_a_nonempty_model_for_demo_data() {
        let state = demo_data::generate_small();
        let start = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let expanded = expand::expand(&state, start, end);
        let model = build(&state, &expanded, false);
        assert!(!model.decision_vars.is_empty());
        assert!(!model.constraints.is_empty());
    }

    #[test]
    fn vacationing_clinician_gets_no_decision_variables() {
        let mut state = demo_data::generate_small();
        let start = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        state.clinicians[0].vacations = vec![crate::domain::VacationRange { start, end }];
        let vacationing_id = state.clinicians[0].id.clone();

        let expanded = expand::expand(&state, start, end);
        let model = build(&state, &expanded, false);
        assert!(!model
            .decision_vars
            .iter()
            .any(|dv| dv.clinician_id == vacationing_id));
    }

    #[test]
    fn omega_max_scales_with_class_count() {
        assert_eq!(omega_max(0), 3);
        assert_eq!(omega_max(3), 33);
    }
}
