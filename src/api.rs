//! REST API handlers (spec §4.6/§6, expansion).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Duration;

use crate::config::Config;
use crate::demo_data::{self, DemoData};
use crate::domain::AppState;
use crate::dto::{
    HealthResponse, InfoResponse, NormalizeRequest, NormalizeResponse, SolveDayRequest,
    SolveDayResponse, SolveRangeRequest, SolveRangeResponse,
};
use crate::error::{Result, SchedulingError};
use crate::{normalize, solver};

/// State shared across handlers: process configuration only. The schedule
/// blob itself is never held server-side — it travels in the request body
/// and the response, per spec §3's "persistence is the caller's
/// responsibility".
#[derive(Clone)]
pub struct ServerState {
    config: Arc<Config>,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        .route("/v1/solve/day", post(solve_day))
        .route("/v1/solve/range", post(solve_range))
        .route("/v1/state/normalize", post(normalize_state))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "shift-scheduling",
        version: env!("CARGO_PKG_VERSION"),
        solver_engine: "good_lp/coin_cbc",
    })
}

async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::list_demo_data())
}

async fn get_demo_data(Path(id): Path<String>) -> std::result::Result<Json<AppState>, StatusCode> {
    match id.parse::<DemoData>() {
        Ok(demo) => Ok(Json(demo_data::generate(demo))),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

async fn normalize_state(Json(request): Json<NormalizeRequest>) -> Json<NormalizeResponse> {
    let (state, changed) = normalize::normalize(request.state);
    Json(NormalizeResponse { state, changed })
}

/// `solve_day` is `solve_range` with the target set restricted to a single
/// date (spec §4.6).
async fn solve_day(
    State(state): State<ServerState>,
    Json(request): Json<SolveDayRequest>,
) -> Result<Json<SolveDayResponse>> {
    let SolveDayRequest {
        date_iso,
        only_fill_required,
        state: app_state,
    } = request;
    let config = state.config.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        solver::solve_range(
            &app_state,
            date_iso,
            date_iso,
            only_fill_required,
            config.single_day_budget_seconds,
            config.search_workers,
        )
    })
    .await
    .map_err(|e| SchedulingError::StateInconsistent(e.to_string()))?;

    Ok(Json(SolveDayResponse {
        date_iso,
        assignments: outcome.assignments,
        notes: outcome.notes,
    }))
}

async fn solve_range(
    State(state): State<ServerState>,
    Json(request): Json<SolveRangeRequest>,
) -> Result<Json<SolveRangeResponse>> {
    let SolveRangeRequest {
        start_iso,
        end_iso,
        only_fill_required,
        state: app_state,
    } = request;
    let end_iso = end_iso.unwrap_or(start_iso + Duration::days(6));
    if end_iso < start_iso {
        return Err(SchedulingError::InputMalformed(
            "endISO must not precede startISO".to_string(),
        ));
    }
    let config = state.config.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        solver::solve_range(
            &app_state,
            start_iso,
            end_iso,
            only_fill_required,
            config.range_budget_seconds,
            config.search_workers,
        )
    })
    .await
    .map_err(|e| SchedulingError::StateInconsistent(e.to_string()))?;

    Ok(Json(SolveRangeResponse {
        start_iso,
        end_iso,
        assignments: outcome.assignments,
        notes: outcome.notes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data;

    fn test_state() -> ServerState {
        ServerState::new(Config::default())
    }

    #[tokio::test]
    async fn normalize_state_round_trips_an_already_normalized_state() {
        let state = demo_data::generate_small();
        let payload = serde_json::json!({ "state": state });
        let request: NormalizeRequest = serde_json::from_value(payload).unwrap();

        let Json(response) = normalize_state(Json(request)).await;

        assert!(!response.changed);
    }

    /// Exercises the wire contract directly: a request built with the
    /// literal `dateISO`/`only_fill_required` spelling from spec §6.1 must
    /// deserialize into `SolveDayRequest`.
    #[tokio::test]
    async fn solve_day_accepts_spec_wire_field_names() {
        let state = demo_data::generate_small();
        let payload = serde_json::json!({
            "dateISO": "2026-01-05",
            "only_fill_required": false,
            "state": state,
        });
        let request: SolveDayRequest =
            serde_json::from_value(payload).expect("dateISO/only_fill_required must deserialize");

        let response = solve_day(State(test_state()), Json(request)).await;

        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn solve_range_accepts_spec_wire_field_names_and_defaults_end_iso() {
        let state = demo_data::generate_small();
        let payload = serde_json::json!({
            "startISO": "2026-01-05",
            "only_fill_required": true,
            "state": state,
        });
        let request: SolveRangeRequest =
            serde_json::from_value(payload).expect("startISO must deserialize");

        let response = solve_range(State(test_state()), Json(request))
            .await
            .expect("feasible demo state should solve");

        assert_eq!(response.start_iso, response.end_iso - Duration::days(6));
    }

    #[tokio::test]
    async fn solve_range_rejects_an_inverted_range() {
        let state = demo_data::generate_small();
        let payload = serde_json::json!({
            "startISO": "2026-01-10",
            "endISO": "2026-01-05",
            "only_fill_required": false,
            "state": state,
        });
        let request: SolveRangeRequest = serde_json::from_value(payload).unwrap();

        let response = solve_range(State(test_state()), Json(request)).await;

        assert!(matches!(response, Err(SchedulingError::InputMalformed(_))));
    }
}
