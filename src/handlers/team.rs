// src/handlers/team.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::actor::CurrentActor,
    models::{Brand, MonthlyTarget, Representative},
};

// GET /api/team
// O time vem do provedor de identidade; aqui é somente leitura, para os
// inputs de seleção de atribuição.
#[utoipa::path(
    get,
    path = "/api/team",
    tag = "Team",
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Vendedores, por nome", body = Vec<Representative>)
    )
)]
pub async fn list_team(
    State(app_state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(app_state.client_service.team_members())))
}

// GET /api/brands
#[utoipa::path(
    get,
    path = "/api/brands",
    tag = "Team",
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Marcas disponíveis ao ator (allow-list aplicada)", body = Vec<Brand>)
    )
)]
pub async fn list_brands(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(app_state.client_service.brands_for(&actor))))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTargetPayload {
    pub member_id: Uuid,

    #[validate(range(min = 1, max = 12, message = "invalid_month"))]
    #[schema(example = 6)]
    pub month: u32,
    #[schema(example = 2024)]
    pub year: i32,

    pub deals_target: u32,
    pub visits_target: u32,
}

// PUT /api/targets
#[utoipa::path(
    put,
    path = "/api/targets",
    tag = "Team",
    request_body = UpsertTargetPayload,
    params(
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Meta criada ou atualizada (upsert por período)", body = MonthlyTarget),
        (status = 403, description = "Somente admin")
    )
)]
pub async fn upsert_target(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<UpsertTargetPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let target = app_state.client_service.upsert_target(
        &actor,
        payload.member_id,
        payload.month,
        payload.year,
        payload.deals_target,
        payload.visits_target,
    )?;
    Ok((StatusCode::OK, Json(target)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TargetsQuery {
    pub month: u32,
    pub year: i32,
}

// GET /api/targets
#[utoipa::path(
    get,
    path = "/api/targets",
    tag = "Team",
    params(
        TargetsQuery,
        ("x-actor-id" = Uuid, Header, description = "Id do ator atual")
    ),
    responses(
        (status = 200, description = "Metas do período (vendedor vê só a própria)", body = Vec<MonthlyTarget>)
    )
)]
pub async fn list_targets(
    State(app_state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<TargetsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let targets = app_state
        .client_service
        .targets_for(&actor, params.month, params.year);
    Ok((StatusCode::OK, Json(targets)))
}
