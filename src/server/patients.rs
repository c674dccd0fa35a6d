//! Patient record handlers. Thin pass-through to the store; every route here is
//! mounted behind a `RoleGate`, so a `RequestContext` is always present.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{error, info};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::RequestContext;
use crate::storage::{Patient, PatientInput};

#[derive(Debug, Deserialize)]
pub struct NotesPayload {
    pub notes: String,
}

fn parse_id(path: Result<Path<String>, PathRejection>) -> AppResult<i64> {
    let Path(raw) = path.map_err(|_| AppError::invalid_input("bad_uri", "Invalid patient ID in URI"))?;
    raw.parse::<i64>()
        .map_err(|_| AppError::invalid_input("bad_id", "Patient ID must be a valid number"))
}

fn invalid_json(msg: &str) -> impl FnOnce(JsonRejection) -> AppError + '_ {
    move |rej| {
        tracing::debug!(target: "clinic::patients", "rejected body: {rej}");
        AppError::invalid_input("bad_json", msg)
    }
}

pub async fn create_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<PatientInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = body.map_err(invalid_json("Invalid json request"))?;
    let patient = state.store.0.lock().create(input)?;
    info!(target: "clinic::patients", user = %ctx.username, id = patient.id, "patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn list_patients(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<Vec<Patient>>> {
    let patients = state.store.0.lock().list();
    tracing::debug!(target: "clinic::patients", user = %ctx.username, role = %ctx.role, count = patients.len(), "patients listed");
    Ok(Json(patients))
}

pub async fn update_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<PatientInput>, JsonRejection>,
) -> AppResult<Json<Patient>> {
    let id = parse_id(path)?;
    let Json(input) = body.map_err(invalid_json("Invalid json request"))?;
    let patient = state.store.0.lock().update(id, input).map_err(|e| {
        error!(target: "clinic::patients", id, "update failed: {e}");
        AppError::from(e)
    })?;
    info!(target: "clinic::patients", user = %ctx.username, id, "patient updated");
    Ok(Json(patient))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    ctx: RequestContext,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(path)?;
    state.store.0.lock().delete(id)?;
    info!(target: "clinic::patients", user = %ctx.username, id, "patient deleted");
    Ok(Json(serde_json::json!({ "message": "Patient deleted" })))
}

pub async fn update_patient_notes(
    State(state): State<AppState>,
    ctx: RequestContext,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<NotesPayload>, JsonRejection>,
) -> AppResult<Json<Patient>> {
    let id = parse_id(path)?;
    let Json(payload) = body.map_err(invalid_json("Invalid json data"))?;
    if payload.notes.is_empty() {
        return Err(AppError::invalid_input("bad_json", "Invalid json data"));
    }
    let patient = state.store.0.lock().update_notes(id, &payload.notes)?;
    info!(target: "clinic::patients", user = %ctx.username, id, "patient notes updated");
    Ok(Json(patient))
}
