// src/models/target.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Meta mensal de um vendedor. Chave lógica única: (member_id, month, year).
// O upsert do ClientService garante no máximo um registro por período.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTarget {
    pub id: Uuid,
    pub member_id: Uuid,

    #[schema(example = 6, minimum = 1, maximum = 12)]
    pub month: u32,
    #[schema(example = 2024)]
    pub year: i32,

    pub deals_target: u32,
    pub visits_target: u32,
}

impl MonthlyTarget {
    /// Mesma chave lógica = mesmo período do mesmo vendedor.
    pub fn same_period(&self, member_id: Uuid, month: u32, year: i32) -> bool {
        self.member_id == member_id && self.month == month && self.year == year
    }
}
