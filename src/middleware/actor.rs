// src/middleware/actor.rs

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::Representative};

// O provedor de identidade é externo: quem chega aqui já foi autenticado
// lá fora e manda só o id no cabeçalho x-actor-id. O guard resolve esse
// id contra o cache do time e injeta o ator nos "extensions".
pub async fn actor_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok());

    if let Some(raw) = header {
        if let Ok(id) = raw.parse::<Uuid>() {
            if let Some(actor) = app_state.team.get(id) {
                request.extensions_mut().insert(actor);
                return Ok(next.run(request).await);
            }
        }
    }

    Err(AppError::UnknownActor)
}

// Extrator para obter o ator atual diretamente nos handlers
pub struct CurrentActor(pub Representative);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Representative>()
            .cloned()
            .map(CurrentActor)
            .ok_or(AppError::UnknownActor)
    }
}
