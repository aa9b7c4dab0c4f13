// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Call,
    Visit,
    Note,
    Email,
    Assignment,
    Reminder,
}

// Histórico de interações. Append-only: não existe update nem delete
// de Activity em lugar nenhum do motor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub client_id: Uuid,
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,

    #[schema(example = "Ligação de apresentação, pediu proposta por e-mail")]
    pub description: String,

    // Quem registrou (id do vendedor)
    pub actor: Uuid,
}
