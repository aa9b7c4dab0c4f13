// src/services/activity_service.rs

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{Activity, ActivityKind, Client, Representative};
use crate::store::EntityStore;
use super::visibility;

#[derive(Clone)]
pub struct ActivityService {
    activities: EntityStore<Activity>,
    clients: EntityStore<Client>,
}

impl ActivityService {
    pub fn new(activities: EntityStore<Activity>, clients: EntityStore<Client>) -> Self {
        Self { activities, clients }
    }

    /// Anexa um registro ao histórico. O histórico é imutável: só existe
    /// append, nunca update nem delete.
    ///
    /// Atenção: registrar atividade NÃO atualiza `last_interaction_at` -
    /// a recência de contato só muda na criação do lead e na ligação
    /// rápida (`quick_call`).
    pub fn log(
        &self,
        client_id: Uuid,
        kind: ActivityKind,
        description: impl Into<String>,
        actor: Uuid,
    ) -> Result<Activity, AppError> {
        let activity = Activity {
            id: Uuid::new_v4(),
            client_id,
            kind,
            timestamp: Utc::now(),
            description: description.into(),
            actor,
        };
        self.activities.create(activity)
    }

    /// Registro vindo da UI: valida a visibilidade do ator antes do
    /// append (os serviços internos usam `log` com o ator já checado).
    pub fn record(
        &self,
        actor: &Representative,
        client_id: Uuid,
        kind: ActivityKind,
        description: impl Into<String>,
    ) -> Result<Activity, AppError> {
        let client = self.clients.get(client_id).ok_or(AppError::NotFound)?;
        if !visibility::can_view(actor, &client) {
            return Err(AppError::NotFound);
        }
        self.log(client_id, kind, description, actor.id)
    }

    /// Ligação rápida: registra a atividade E carimba a recência de
    /// contato na mesma ação.
    pub fn quick_call(
        &self,
        actor: &Representative,
        client_id: Uuid,
        note: impl Into<String>,
    ) -> Result<Activity, AppError> {
        let client = self.clients.get(client_id).ok_or(AppError::NotFound)?;
        if !visibility::can_mutate(actor, &client) {
            return Err(AppError::NotFound);
        }

        let activity = self.log(client_id, ActivityKind::Call, note, actor.id)?;
        self.clients
            .update(client_id, json!({ "lastInteractionAt": Utc::now() }))?;
        Ok(activity)
    }

    /// Histórico de um lead, do mais recente para o mais antigo.
    pub fn for_client(
        &self,
        actor: &Representative,
        client_id: Uuid,
    ) -> Result<Vec<Activity>, AppError> {
        let client = self.clients.get(client_id).ok_or(AppError::NotFound)?;
        if !visibility::can_view(actor, &client) {
            return Err(AppError::NotFound);
        }

        let mut history: Vec<Activity> = self
            .activities
            .snapshot()
            .into_iter()
            .filter(|a| a.client_id == client_id)
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }
}

/// Dias inteiros desde o último contato; `None` = nunca contatado.
/// Métrica de exibição apenas: ninguém decide transição por ela.
pub fn days_since_contact(client: &Client, now: DateTime<Utc>) -> Option<i64> {
    client
        .last_interaction_at
        .map(|last| (now - last).num_days())
}
