// src/handlers/assignment.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::actor::CurrentActor,
    models::Client,
};

// =============================================================================
//  ATRIBUIÇÃO (somente admin; comandos serializados pelo lock da coleção)
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    pub rep_id: Uuid,
}

// POST /api/clients/{id}/assign
#[utoipa::path(
    post,
    path = "/api/clients/{id}/assign",
    tag = "Assignment",
    request_body = AssignPayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Lead atribuído", body = Client),
        (status = 403, description = "Somente admin reatribui"),
        (status = 404, description = "Lead desconhecido")
    )
)]
pub async fn assign_client(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignPayload>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state
        .assignment_service
        .assign(&actor, id, payload.rep_id)
        .await?;
    Ok((StatusCode::OK, Json(client)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignPayload {
    #[validate(length(min = 1, message = "required"))]
    pub client_ids: Vec<Uuid>,
    pub rep_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignResult {
    // Lote de assigns independentes: ids desconhecidos são pulados
    pub applied: usize,
}

// POST /api/clients/bulk-assign
#[utoipa::path(
    post,
    path = "/api/clients/bulk-assign",
    tag = "Assignment",
    request_body = BulkAssignPayload,
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Lote aplicado", body = BulkAssignResult),
        (status = 403, description = "Somente admin reatribui")
    )
)]
pub async fn bulk_assign(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<BulkAssignPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let applied = app_state
        .assignment_service
        .bulk_assign(&actor, &payload.client_ids, payload.rep_id)
        .await?;
    Ok((StatusCode::OK, Json(BulkAssignResult { applied })))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignPayload {
    #[validate(length(min = 1, message = "required"))]
    pub candidate_ids: Vec<Uuid>,

    // Ordem de desempate; ausente = todos os ativos, por nome
    pub rep_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPair {
    pub client_id: Uuid,
    pub rep_id: Uuid,
}

// POST /api/clients/auto-assign
#[utoipa::path(
    post,
    path = "/api/clients/auto-assign",
    tag = "Assignment",
    request_body = AutoAssignPayload,
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Distribuição gulosa aplicada", body = Vec<AssignedPair>),
        (status = 400, description = "Nenhum vendedor ativo"),
        (status = 403, description = "Somente admin reatribui")
    )
)]
pub async fn auto_assign(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<AutoAssignPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let assigned = app_state
        .assignment_service
        .auto_assign(&actor, &payload.candidate_ids, payload.rep_ids.as_deref())
        .await?;
    let pairs: Vec<AssignedPair> = assigned
        .into_iter()
        .map(|(client_id, rep_id)| AssignedPair { client_id, rep_id })
        .collect();
    Ok((StatusCode::OK, Json(pairs)))
}
