// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{error::AppError, notify::SyncNotice},
    config::AppState,
    middleware::actor::CurrentActor,
    services::dashboard_service::{ContactHealth, FollowupBoard, PipelineSummary},
};

// GET /api/dashboard/pipeline
#[utoipa::path(
    get,
    path = "/api/dashboard/pipeline",
    tag = "Dashboard",
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Contagem por balde de exibição", body = PipelineSummary)
    )
)]
pub async fn pipeline_summary(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(app_state.dashboard_service.pipeline_summary(&actor))))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BoardQuery {
    pub date: Option<NaiveDate>,
}

// GET /api/dashboard/followups
#[utoipa::path(
    get,
    path = "/api/dashboard/followups",
    tag = "Dashboard",
    params(
        BoardQuery,
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Vencidos e de hoje, separados", body = FollowupBoard)
    )
)]
pub async fn followup_board(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<BoardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok((StatusCode::OK, Json(app_state.dashboard_service.followup_board(&actor, today))))
}

// GET /api/dashboard/contact-health
#[utoipa::path(
    get,
    path = "/api/dashboard/contact-health",
    tag = "Dashboard",
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Leads abertos do pior contato para o melhor", body = Vec<ContactHealth>)
    )
)]
pub async fn contact_health(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(app_state.dashboard_service.contact_health(&actor, Utc::now()))))
}

// GET /api/sync/errors
// As falhas de sincronização nunca bloqueiam a ação do usuário; a UI
// consulta aqui os avisos recentes para renderizar.
#[utoipa::path(
    get,
    path = "/api/sync/errors",
    tag = "Dashboard",
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Avisos recentes de sincronização", body = Vec<SyncNotice>)
    )
)]
pub async fn sync_errors(
    State(app_state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(app_state.notifier.recent())))
}
