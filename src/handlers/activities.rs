// src/handlers/activities.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::actor::CurrentActor,
    models::{Activity, ActivityKind},
};

// GET /api/clients/{id}/activities
#[utoipa::path(
    get,
    path = "/api/clients/{id}/activities",
    tag = "Activities",
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Histórico, do mais recente", body = Vec<Activity>),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn list_activities(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let history = app_state.activity_service.for_client(&actor, id)?;
    Ok((StatusCode::OK, Json(history)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogActivityPayload {
    #[schema(example = "visit")]
    pub kind: ActivityKind,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Visita na loja, pediu catálogo")]
    pub description: String,
}

// POST /api/clients/{id}/activities
// Registrar atividade NÃO mexe na recência de contato: só a ligação
// rápida e a criação do lead fazem isso.
#[utoipa::path(
    post,
    path = "/api/clients/{id}/activities",
    tag = "Activities",
    request_body = LogActivityPayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 201, description = "Registro anexado ao histórico", body = Activity),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn log_activity(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<LogActivityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let activity =
        app_state
            .activity_service
            .record(&actor, id, payload.kind, payload.description)?;
    Ok((StatusCode::CREATED, Json(activity)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickCallPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Atendeu, pediu retorno semana que vem")]
    pub note: String,
}

// POST /api/clients/{id}/quick-call
#[utoipa::path(
    post,
    path = "/api/clients/{id}/quick-call",
    tag = "Activities",
    request_body = QuickCallPayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 201, description = "Ligação registrada e recência carimbada", body = Activity),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn quick_call(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuickCallPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let activity = app_state.activity_service.quick_call(&actor, id, payload.note)?;
    Ok((StatusCode::CREATED, Json(activity)))
}
