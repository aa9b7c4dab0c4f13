// src/services/pipeline.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use crate::common::error::AppError;
use crate::models::{Client, LeadStatus, LossReason};

// =========================================================================
//  MÁQUINA DE ESTADOS DO FUNIL
// =========================================================================

// Qualquer estágio pode ir para qualquer outro: não há ordem obrigatória.
// As três regras especiais:
//   - perda exige motivo, atomicamente, senão a transição é rejeitada;
//   - ganho congela o `dealValue` com o preço atual da marca;
//   - sair de `lost` limpa motivo e nota no MESMO patch.
//
// A função é pura: devolve o patch inteiro e quem aplica é o EntityStore,
// numa única mutação.
pub fn build_transition_patch(
    client: &Client,
    to: LeadStatus,
    reason: Option<LossReason>,
    note: Option<&str>,
    brand_price: Option<Decimal>,
) -> Result<Value, AppError> {
    let mut patch = Map::new();
    patch.insert("status".into(), json!(to));

    match to {
        LeadStatus::Lost => {
            let Some(reason) = reason else {
                // Rejeita ANTES de qualquer mutação: nenhum estado parcial
                return Err(AppError::field("lossReason", "obrigatório ao marcar perda"));
            };
            patch.insert("lossReason".into(), json!(reason));
            patch.insert("lossNote".into(), json!(note));
        }
        LeadStatus::Won => {
            // Snapshot do preço no momento do ganho; sem marca/preço a
            // transição passa sem tocar no campo
            if let Some(price) = brand_price {
                patch.insert("dealValue".into(), json!(price));
            }
            if client.status == LeadStatus::Lost {
                patch.insert("lossReason".into(), Value::Null);
                patch.insert("lossNote".into(), Value::Null);
            }
        }
        _ => {
            // Re-target (e qualquer outra saída de `lost`): o motivo da
            // perda não pode sobreviver a um lead que voltou a ser ativo
            if client.status == LeadStatus::Lost {
                patch.insert("lossReason".into(), Value::Null);
                patch.insert("lossNote".into(), Value::Null);
            }
        }
    }

    Ok(Value::Object(patch))
}

// =========================================================================
//  PROJEÇÃO DE EXIBIÇÃO (balde do funil)
// =========================================================================

/// Estágio de EXIBIÇÃO: lead sem vendedor e não-terminal aparece no balde
/// "new", qualquer que seja o status armazenado. Projeção pura: o status
/// gravado nunca é alterado por aqui.
pub fn display_stage(client: &Client) -> LeadStatus {
    if client.assigned_to.is_none() && client.status.is_open() {
        LeadStatus::New
    } else {
        client.status
    }
}

/// Agrupa um snapshot de leads pelos baldes de exibição.
pub fn pipeline_buckets(clients: &[Client]) -> HashMap<LeadStatus, Vec<&Client>> {
    let mut buckets: HashMap<LeadStatus, Vec<&Client>> = HashMap::new();
    for client in clients {
        buckets.entry(display_stage(client)).or_default().push(client);
    }
    buckets
}
