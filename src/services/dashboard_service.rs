// src/services/dashboard_service.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Client, LeadStatus, Representative};
use crate::store::EntityStore;
use super::{activity_service, followup_service, pipeline, visibility};

// 1. Contagem do funil (os cards do topo do quadro)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub new: usize,
    pub qualifying: usize,
    pub proposal: usize,
    pub won: usize,
    pub lost: usize,
}

// 2. Lembretes do dia
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowupBoard {
    pub overdue: Vec<Client>,
    pub due_today: Vec<Client>,
}

// 3. Saúde de contato por lead
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactHealth {
    pub client_id: Uuid,
    pub name: String,
    // `null` = nunca contatado
    pub days_since_contact: Option<i64>,
}

// Projeções de leitura para a camada de UI. Tudo aqui é derivado na hora
// a partir do cache: nada é gravado.
#[derive(Clone)]
pub struct DashboardService {
    clients: EntityStore<Client>,
}

impl DashboardService {
    pub fn new(clients: EntityStore<Client>) -> Self {
        Self { clients }
    }

    fn visible(&self, actor: &Representative) -> Vec<Client> {
        self.clients
            .snapshot()
            .into_iter()
            .filter(|c| visibility::can_view(actor, c))
            .collect()
    }

    /// Contagem por balde de exibição: sem vendedor e não-terminal conta
    /// em `new`, qualquer que seja o status gravado.
    pub fn pipeline_summary(&self, actor: &Representative) -> PipelineSummary {
        let clients = self.visible(actor);
        let buckets = pipeline::pipeline_buckets(&clients);
        let count = |stage: LeadStatus| buckets.get(&stage).map_or(0, Vec::len);

        PipelineSummary {
            new: count(LeadStatus::New),
            qualifying: count(LeadStatus::Qualifying),
            proposal: count(LeadStatus::Proposal),
            won: count(LeadStatus::Won),
            lost: count(LeadStatus::Lost),
        }
    }

    pub fn followup_board(&self, actor: &Representative, today: NaiveDate) -> FollowupBoard {
        let mut overdue = Vec::new();
        let mut due_today = Vec::new();
        for client in self.visible(actor) {
            if followup_service::is_overdue(&client, today) {
                overdue.push(client);
            } else if followup_service::is_due_today(&client, today) {
                due_today.push(client);
            }
        }
        overdue.sort_by_key(|c| c.follow_up_at);
        FollowupBoard { overdue, due_today }
    }

    /// Leads abertos do pior contato para o melhor; nunca contatado vem
    /// primeiro.
    pub fn contact_health(&self, actor: &Representative, now: DateTime<Utc>) -> Vec<ContactHealth> {
        let mut health: Vec<ContactHealth> = self
            .visible(actor)
            .into_iter()
            .filter(Client::is_open)
            .map(|c| ContactHealth {
                client_id: c.id,
                name: c.name.clone(),
                days_since_contact: activity_service::days_since_contact(&c, now),
            })
            .collect();
        health.sort_by_key(|h| std::cmp::Reverse(h.days_since_contact.unwrap_or(i64::MAX)));
        health
    }
}
