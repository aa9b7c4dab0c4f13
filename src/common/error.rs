use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Erros de sincronização remota NÃO aparecem aqui: eles nunca bloqueiam
// o chamador (ver common::notify e store::outbox).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regra de negócio sobre um campo específico (ex: perda sem motivo).
    // Rejeitado ANTES de qualquer mutação: nenhum estado parcial.
    #[error("Campo inválido: {field} ({reason})")]
    FieldRule { field: &'static str, reason: String },

    #[error("Cliente já cadastrado")]
    DuplicateClient { existing_name: String },

    #[error("Ator sem permissão para esta ação")]
    Forbidden,

    #[error("Ator desconhecido")]
    UnknownActor,

    #[error("Registro não encontrado")]
    NotFound,

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Atalho para as regras de campo.
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::FieldRule { field, reason: reason.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "validationError": { "fields": details },
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::FieldRule { field, reason } => {
                let body = Json(json!({
                    "validationError": { "field": field, "reason": reason },
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::DuplicateClient { existing_name } => {
                let body = Json(json!({
                    "duplicateError": { "conflictingEntityName": existing_name },
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Ação não permitida para este ator."),
            AppError::UnknownActor => (StatusCode::UNAUTHORIZED, "Ator ausente ou desconhecido."),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Registro não encontrado."),

            // Todos os outros erros viram 500.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
