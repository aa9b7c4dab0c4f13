// src/handlers/followups.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::actor::CurrentActor,
    models::Client,
    services::TaskOutcome,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DueQuery {
    // "Hoje" de referência; ausente = data corrente (hora ignorada)
    pub date: Option<NaiveDate>,
}

// GET /api/followups
#[utoipa::path(
    get,
    path = "/api/followups",
    tag = "Followups",
    params(
        DueQuery,
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Lembretes vencidos ou de hoje, do mais atrasado", body = Vec<Client>)
    )
)]
pub async fn list_due(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<DueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let due = app_state.followup_service.due_for(&actor, today);
    Ok((StatusCode::OK, Json(due)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePayload {
    #[schema(value_type = String, format = Date, example = "2024-06-20")]
    pub date: NaiveDate,
    pub note: Option<String>,
}

// POST /api/clients/{id}/follow-up
#[utoipa::path(
    post,
    path = "/api/clients/{id}/follow-up",
    tag = "Followups",
    request_body = SchedulePayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Lembrete agendado (substitui o pendente)", body = Client),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn schedule_followup(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<SchedulePayload>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.followup_service.schedule(
        &actor,
        id,
        payload.date,
        payload.note.as_deref(),
    )?;
    Ok((StatusCode::OK, Json(client)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskPayload {
    #[schema(example = "not-interested")]
    pub outcome: TaskOutcome,
    pub note: Option<String>,

    // Usada só com interested/busy; sem interesse ela é descartada
    #[schema(value_type = Option<String>, format = Date, example = "2024-06-20")]
    pub next_date: Option<NaiveDate>,
}

// POST /api/clients/{id}/follow-up/complete
#[utoipa::path(
    post,
    path = "/api/clients/{id}/follow-up/complete",
    tag = "Followups",
    request_body = CompleteTaskPayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Tarefa concluída", body = Client),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn complete_task(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.followup_service.complete_task(
        &actor,
        id,
        payload.outcome,
        payload.note.as_deref(),
        payload.next_date,
    )?;
    Ok((StatusCode::OK, Json(client)))
}
