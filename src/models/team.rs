// src/models/team.rs

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

// Papel do ator. `Admin` enxerga e muta tudo; `Rep` só o que é dele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Rep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RepStatus {
    Active,
    Inactive,
}

// Representa um vendedor vindo do provedor de identidade.
// Somente leitura no motor: nunca criamos nem mutamos vendedores aqui.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Representative {
    pub id: Uuid,

    #[schema(example = "Sara Hassan")]
    pub name: String,

    pub role: Role,
    pub status: RepStatus,

    // Territórios: listas vazias = sem restrição
    #[serde(default)]
    #[schema(example = json!(["Baghdad", "Basra"]))]
    pub allowed_provinces: Vec<String>,

    #[serde(default)]
    pub allowed_brands: Vec<Uuid>,
}

impl Representative {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == RepStatus::Active
    }
}
