// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;
use uuid::Uuid;

use crate::{
    common::{error::AppError, patch::Patch},
    config::AppState,
    middleware::actor::CurrentActor,
    models::{Client, LeadStatus, LossReason},
    services::ClientQuery,
};

// =============================================================================
//  ÁREA 1: CADASTRO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Ahmed Kareem")]
    pub name: String,

    #[schema(example = "+9647701234567")]
    pub phone: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub instagram: Option<String>,
    pub maps_link: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Baghdad")]
    pub province: String,

    pub product_interest: Option<Uuid>,

    // Só admin consegue usar; para o vendedor o lead fica com ele mesmo
    pub assigned_to: Option<Uuid>,

    #[schema(value_type = Option<String>, format = Date, example = "2024-06-10")]
    pub follow_up_at: Option<NaiveDate>,
    pub follow_up_note: Option<String>,
}

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Lead criado", body = Client),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Telefone já cadastrado")
    ),
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    )
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<CreateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = app_state.client_service.create_client(
        &actor,
        &payload.name,
        payload.phone.as_deref(),
        payload.email.as_deref(),
        payload.address.as_deref(),
        payload.instagram.as_deref(),
        payload.maps_link.as_deref(),
        &payload.province,
        payload.product_interest,
        payload.assigned_to,
        payload.follow_up_at,
        payload.follow_up_note.as_deref(),
    )?;

    Ok((StatusCode::CREATED, Json(client)))
}

// =============================================================================
//  ÁREA 2: LISTAGEM
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListClientsQuery {
    // Filtra pelo balde de EXIBIÇÃO (sem vendedor = "new")
    pub status: Option<LeadStatus>,
    pub province: Option<String>,
    pub brand: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPage {
    pub items: Vec<Client>,
    pub total_count: usize,
    // Número de sequência da listagem: a UI descarta respostas com seq
    // menor que o da última requisição que ela despachou
    pub seq: u64,
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(
        ListClientsQuery,
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Página de leads visíveis ao ator", body = ClientPage)
    )
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<ListClientsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let query = ClientQuery {
        status: params.status,
        province: params.province,
        brand: params.brand,
        assigned_to: params.assigned_to,
        search: params.search,
    };
    let page = app_state.client_service.list(
        &actor,
        &query,
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(app_state.settings.default_page_size),
    );

    Ok((
        StatusCode::OK,
        Json(ClientPage {
            items: page.items,
            total_count: page.total_count,
            seq: page.seq,
        }),
    ))
}

// GET /api/clients/{id}
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Lead", body = Client),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.client_service.get(&actor, id)?;
    Ok((StatusCode::OK, Json(client)))
}

// =============================================================================
//  ÁREA 3: ATUALIZAÇÃO CADASTRAL
// =============================================================================

// Patch em três estados: chave ausente não toca, null limpa, valor grava.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientPayload {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub name: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub phone: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub email: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub address: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub instagram: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub maps_link: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<String>)]
    pub province: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[schema(value_type = Option<Uuid>)]
    pub product_interest: Patch<Uuid>,
}

// PATCH /api/clients/{id}
#[utoipa::path(
    patch,
    path = "/api/clients/{id}",
    tag = "Clients",
    request_body = UpdateClientPayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Lead atualizado", body = Client),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    // O wrapper serializa só as chaves enviadas; null = limpar
    let patch = serde_json::to_value(&payload).map_err(anyhow::Error::from)?;
    let client = app_state.client_service.update_details(&actor, id, patch)?;
    Ok((StatusCode::OK, Json(client)))
}

// =============================================================================
//  ÁREA 4: TRANSIÇÃO DE ESTÁGIO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    #[schema(example = "lost")]
    pub to: LeadStatus,

    // Obrigatório quando `to = lost`
    pub loss_reason: Option<LossReason>,
    pub loss_note: Option<String>,
}

// POST /api/clients/{id}/status
#[utoipa::path(
    post,
    path = "/api/clients/{id}/status",
    tag = "Clients",
    request_body = TransitionPayload,
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Transição aplicada", body = Client),
        (status = 400, description = "Perda sem motivo"),
        (status = 404, description = "Fora da visibilidade do ator")
    )
)]
pub async fn transition_client(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.client_service.transition(
        &actor,
        id,
        payload.to,
        payload.loss_reason,
        payload.loss_note.as_deref(),
    )?;
    Ok((StatusCode::OK, Json(client)))
}

// DELETE /api/clients/{id}
#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(
        ("id" = Uuid, Path, description = "Id do lead"),
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 204, description = "Removido (idempotente)"),
        (status = 403, description = "Somente admin")
    )
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.client_service.delete(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}
