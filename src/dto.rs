//! DTOs for the REST API requests/responses (spec §6.1/§6.2).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{AppState, Assignment};

#[derive(Debug, Clone, Deserialize)]
pub struct SolveDayRequest {
    #[serde(rename = "dateISO")]
    pub date_iso: NaiveDate,
    #[serde(default)]
    pub only_fill_required: bool,
    pub state: AppState,
}

#[derive(Debug, Serialize)]
pub struct SolveDayResponse {
    #[serde(rename = "dateISO")]
    pub date_iso: NaiveDate,
    pub assignments: Vec<Assignment>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolveRangeRequest {
    #[serde(rename = "startISO")]
    pub start_iso: NaiveDate,
    #[serde(rename = "endISO", default)]
    pub end_iso: Option<NaiveDate>,
    #[serde(default)]
    pub only_fill_required: bool,
    pub state: AppState,
}

#[derive(Debug, Serialize)]
pub struct SolveRangeResponse {
    #[serde(rename = "startISO")]
    pub start_iso: NaiveDate,
    #[serde(rename = "endISO")]
    pub end_iso: NaiveDate,
    pub assignments: Vec<Assignment>,
    pub notes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub state: AppState,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub state: AppState,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub solver_engine: &'static str,
}
