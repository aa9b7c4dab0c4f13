// src/models/catalog.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Catálogo de marcas/produtos. O CRUD do catálogo fica fora do motor;
// aqui ele só alimenta o snapshot de `deal_value` no ganho e as
// allow-lists de território.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: Uuid,

    #[schema(example = "Kerastase")]
    pub name: String,

    #[schema(example = "1500.00")]
    pub price: Decimal,
}
