// src/models/client.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Os estágios do funil. Qualquer estágio pode transitar para qualquer outro;
// as regras extras (perda, ganho, re-target) vivem em services::pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Qualifying,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    /// Um lead "aberto" ainda conta para a carga do vendedor.
    pub fn is_open(&self) -> bool {
        !matches!(self, LeadStatus::Won | LeadStatus::Lost)
    }
}

// Motivo obrigatório ao marcar um lead como perdido.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LossReason {
    Price,
    Competitor,
    Timing,
    Features,
    Other,
}

// --- CLIENTE (O Lead) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,

    #[schema(example = "Ahmed Kareem")]
    pub name: String,

    // Contato
    #[schema(example = "+9647701234567")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub instagram: Option<String>,
    pub maps_link: Option<String>,

    pub status: LeadStatus,

    // Vendedor responsável. `None` = ainda no balde "new" do funil.
    pub assigned_to: Option<Uuid>,

    #[schema(example = "Baghdad")]
    pub province: String,

    // Marca/produto de interesse (catálogo é somente leitura aqui)
    pub product_interest: Option<Uuid>,

    // Snapshot do preço no momento do ganho. Nunca recalculado depois.
    #[schema(example = "1500.00")]
    pub deal_value: Option<Decimal>,

    pub last_interaction_at: Option<DateTime<Utc>>,

    // No máximo UM follow-up pendente por lead
    #[schema(value_type = Option<String>, format = Date, example = "2024-06-10")]
    pub follow_up_at: Option<NaiveDate>,
    pub follow_up_note: Option<String>,

    pub loss_reason: Option<LossReason>,
    pub loss_note: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Lead aberto = ainda disputável (nem ganho, nem perdido).
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
