use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medrec_api::{ApiError, ApiResponse, Message};
use medrec_core::{CoreError, PatientPatch, PatientView, SortField, SortOrder, validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::server::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct SortParams {
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

pub async fn root() -> impl IntoResponse {
    Json(Message::new("Patient Management System API"))
}

pub async fn about() -> impl IntoResponse {
    Json(Message::new(
        "A fully functional API to manage your patient records",
    ))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once the collection can be loaded.
pub async fn readyz(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.store.snapshot().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        ApiError::unavailable(e.to_string())
    })?;
    Ok((StatusCode::OK, Json(HealthResponse { status: "ready" })))
}

/// Whole collection as an id -> patient mapping, indented.
pub async fn view(State(state): State<AppState>) -> ApiResult<Response> {
    let collection = state.store.snapshot().await?;
    Ok(ApiResponse::ok(collection.view()).pretty().into_response())
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let patient = state.store.get(&id).await?;
    Ok(ApiResponse::ok(patient.view()).into_response())
}

pub async fn sort_patients(
    State(state): State<AppState>,
    Query(params): Query<SortParams>,
) -> ApiResult<Response> {
    let field =
        SortField::from_str(params.sort_by.as_deref().unwrap_or_default()).map_err(rejected)?;
    let order = params
        .order
        .as_deref()
        .map(SortOrder::from_str)
        .transpose()
        .map_err(rejected)?
        .unwrap_or_default();

    let sorted = state.store.sorted(field, order).await?;
    let views: Vec<PatientView<'_>> = sorted.iter().map(|p| p.view()).collect();
    Ok(ApiResponse::ok(views).into_response())
}

pub async fn create_patient(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body.map_err(json_rejection)?;
    let patient = validate(&body).map_err(|e| rejected(e.into()))?;
    state.store.create(patient).await?;
    Ok(Json(Message::new("patient created successfully")))
}

pub async fn edit_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body.map_err(json_rejection)?;
    let patch = match PatientPatch::from_value(&body) {
        Ok(patch) => patch,
        Err(issues) => {
            // An unknown id is reported before a malformed patch.
            state.store.get(&id).await?;
            return Err(rejected(issues.into()));
        }
    };
    state.store.update(&id, &patch).await?;
    Ok(Json(Message::new("patient info updated successfully")))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.store.delete(&id).await?;
    Ok(Json(Message::new("patient deleted successfully")))
}

fn rejected(err: CoreError) -> ApiError {
    tracing::warn!(category = %err.category(), error = %err, "Request rejected");
    err.into()
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        ApiError::unsupported_media_type(rejection.body_text())
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}
