// src/services/followup_service.rs

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{ActivityKind, Client, LeadStatus, LossReason, Representative};
use crate::store::EntityStore;
use super::{activity_service::ActivityService, visibility};

// Nota fixada no lead quando a conclusão da tarefa marca desinteresse.
const NOT_INTERESTED_NOTE: &str = "Not Interested (Task Completion)";

// Resultado da tarefa de follow-up, como a UI envia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskOutcome {
    Interested,
    Busy,
    NotInterested,
    Done,
}

// =========================================================================
//  PREDICADOS DE VENCIMENTO (comparação só por data, hora ignorada)
// =========================================================================

pub fn is_overdue(client: &Client, today: NaiveDate) -> bool {
    matches!(client.follow_up_at, Some(date) if date < today)
}

pub fn is_due_today(client: &Client, today: NaiveDate) -> bool {
    client.follow_up_at == Some(today)
}

pub fn is_due(client: &Client, today: NaiveDate) -> bool {
    is_overdue(client, today) || is_due_today(client, today)
}

/// Patch único da conclusão de tarefa: limpar sempre vem primeiro; o que
/// acontece depois depende do resultado: mas tudo na MESMA mutação,
/// nunca em duas escritas sequenciais.
pub fn build_completion_patch(
    outcome: TaskOutcome,
    note: Option<&str>,
    next_date: Option<NaiveDate>,
) -> Value {
    let mut patch = Map::new();
    // 1. Sempre fecha o lembrete atual
    patch.insert("followUpAt".into(), Value::Null);
    patch.insert("followUpNote".into(), Value::Null);

    match outcome {
        TaskOutcome::Interested | TaskOutcome::Busy => {
            if let Some(next) = next_date {
                patch.insert("followUpAt".into(), json!(next));
                patch.insert("followUpNote".into(), json!(note));
            }
        }
        TaskOutcome::NotInterested => {
            // Sem interesse: vira perda, e qualquer `next_date` enviado
            // junto é descartado
            patch.insert("status".into(), json!(LeadStatus::Lost));
            patch.insert("lossReason".into(), json!(LossReason::Other));
            patch.insert("lossNote".into(), json!(NOT_INTERESTED_NOTE));
        }
        TaskOutcome::Done => {}
    }

    Value::Object(patch)
}

#[derive(Clone)]
pub struct FollowupService {
    clients: EntityStore<Client>,
    activities: ActivityService,
}

impl FollowupService {
    pub fn new(clients: EntityStore<Client>, activities: ActivityService) -> Self {
        Self { clients, activities }
    }

    /// Lembretes vencidos ou de hoje entre os leads visíveis ao ator,
    /// do mais atrasado para o mais recente.
    pub fn due_for(&self, actor: &Representative, today: NaiveDate) -> Vec<Client> {
        let mut due: Vec<Client> = self
            .clients
            .snapshot()
            .into_iter()
            .filter(|c| visibility::can_view(actor, c) && is_due(c, today))
            .collect();
        due.sort_by_key(|c| c.follow_up_at);
        due
    }

    /// Agenda (ou substitui) o ÚNICO lembrete pendente do lead.
    pub fn schedule(
        &self,
        actor: &Representative,
        client_id: Uuid,
        date: NaiveDate,
        note: Option<&str>,
    ) -> Result<Client, AppError> {
        let client = self.clients.get(client_id).ok_or(AppError::NotFound)?;
        if !visibility::can_mutate(actor, &client) {
            return Err(AppError::NotFound);
        }

        self.clients
            .update(client_id, json!({ "followUpAt": date, "followUpNote": note }))?
            .ok_or(AppError::NotFound)
    }

    /// Fecha a tarefa corrente e aplica o desdobramento do resultado.
    pub fn complete_task(
        &self,
        actor: &Representative,
        client_id: Uuid,
        outcome: TaskOutcome,
        note: Option<&str>,
        next_date: Option<NaiveDate>,
    ) -> Result<Client, AppError> {
        let client = self.clients.get(client_id).ok_or(AppError::NotFound)?;
        if !visibility::can_mutate(actor, &client) {
            return Err(AppError::NotFound);
        }

        let patch = build_completion_patch(outcome, note, next_date);
        let updated = self
            .clients
            .update(client_id, patch)?
            .ok_or(AppError::NotFound)?;

        let description = match outcome {
            TaskOutcome::Interested => "Tarefa concluída: interessado",
            TaskOutcome::Busy => "Tarefa concluída: ocupado, remarcar",
            TaskOutcome::NotInterested => "Tarefa concluída: sem interesse",
            TaskOutcome::Done => "Tarefa concluída",
        };
        self.activities
            .log(client_id, ActivityKind::Reminder, description, actor.id)?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::notify::Notifier;
    use crate::models::{Activity, RepStatus, Role};
    use crate::store::outbox::RetryPolicy;
    use crate::store::{InMemoryRemote, Outbox};
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    fn lead_with_followup(date: Option<NaiveDate>) -> Client {
        Client {
            id: Uuid::new_v4(),
            name: "Lead".into(),
            phone: None,
            email: None,
            address: None,
            instagram: None,
            maps_link: None,
            status: LeadStatus::Qualifying,
            assigned_to: None,
            province: "Baghdad".into(),
            product_interest: None,
            deal_value: None,
            last_interaction_at: None,
            follow_up_at: date,
            follow_up_note: date.map(|_| "ligar".to_string()),
            loss_reason: None,
            loss_note: None,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fronteira_de_vencimento_na_data_de_hoje() {
        let today = date(2024, 6, 10);

        let yesterday = lead_with_followup(Some(date(2024, 6, 9)));
        let exactly_today = lead_with_followup(Some(date(2024, 6, 10)));
        let tomorrow = lead_with_followup(Some(date(2024, 6, 11)));
        let none = lead_with_followup(None);

        assert!(is_overdue(&yesterday, today));
        assert!(is_due(&yesterday, today));

        assert!(!is_overdue(&exactly_today, today));
        assert!(is_due_today(&exactly_today, today));
        assert!(is_due(&exactly_today, today));

        assert!(!is_due(&tomorrow, today));
        assert!(!is_due(&none, today));
    }

    #[test]
    fn conclusao_interessado_remarca_no_mesmo_patch() {
        let next = date(2024, 6, 20);
        let patch = build_completion_patch(TaskOutcome::Interested, Some("quer proposta"), Some(next));

        assert_eq!(patch["followUpAt"], json!(next));
        assert_eq!(patch["followUpNote"], "quer proposta");
        assert!(patch.get("status").is_none());
    }

    #[test]
    fn conclusao_interessado_sem_data_so_limpa() {
        let patch = build_completion_patch(TaskOutcome::Interested, Some("sem data"), None);
        assert_eq!(patch["followUpAt"], Value::Null);
        assert_eq!(patch["followUpNote"], Value::Null);
    }

    #[test]
    fn sem_interesse_vira_perda_e_descarta_a_proxima_data() {
        let patch = build_completion_patch(
            TaskOutcome::NotInterested,
            Some("não quer"),
            Some(date(2024, 7, 1)),
        );

        assert_eq!(patch["status"], "lost");
        assert_eq!(patch["lossReason"], "other");
        assert_eq!(patch["lossNote"], NOT_INTERESTED_NOTE);
        // a data enviada junto foi ignorada
        assert_eq!(patch["followUpAt"], Value::Null);
    }

    #[test]
    fn conclusao_done_so_limpa() {
        let patch = build_completion_patch(TaskOutcome::Done, None, None);
        assert_eq!(patch["followUpAt"], Value::Null);
        assert_eq!(patch["followUpNote"], Value::Null);
        assert!(patch.get("status").is_none());
    }

    // --- fluxo completo contra o cache ---

    fn setup() -> (FollowupService, EntityStore<Client>, Representative) {
        let remote = Arc::new(InMemoryRemote::new());
        let policy = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1) };
        let outbox = Outbox::spawn(remote.clone(), Notifier::new(8), policy);
        let clients = EntityStore::<Client>::new(remote.clone(), outbox.clone());
        let activities = EntityStore::<Activity>::new(remote, outbox);
        let activity_service = ActivityService::new(activities, clients.clone());
        let admin = Representative {
            id: Uuid::new_v4(),
            name: "Admin".into(),
            role: Role::Admin,
            status: RepStatus::Active,
            allowed_provinces: vec![],
            allowed_brands: vec![],
        };
        (FollowupService::new(clients.clone(), activity_service), clients, admin)
    }

    #[tokio::test]
    async fn completar_sem_interesse_aplica_a_perda_no_lead() {
        let (service, clients, admin) = setup();
        let client = clients
            .create(lead_with_followup(Some(date(2024, 6, 9))))
            .unwrap();

        let updated = service
            .complete_task(
                &admin,
                client.id,
                TaskOutcome::NotInterested,
                None,
                Some(date(2024, 7, 1)),
            )
            .unwrap();

        assert_eq!(updated.status, LeadStatus::Lost);
        assert_eq!(updated.loss_reason, Some(LossReason::Other));
        assert_eq!(updated.loss_note.as_deref(), Some(NOT_INTERESTED_NOTE));
        assert_eq!(updated.follow_up_at, None);
    }

    #[tokio::test]
    async fn agendar_substitui_o_lembrete_unico() {
        let (service, clients, admin) = setup();
        let client = clients
            .create(lead_with_followup(Some(date(2024, 6, 9))))
            .unwrap();

        let updated = service
            .schedule(&admin, client.id, date(2024, 8, 1), Some("retomar"))
            .unwrap();

        // continua havendo UM lembrete, agora com a nova data
        assert_eq!(updated.follow_up_at, Some(date(2024, 8, 1)));
        assert_eq!(updated.follow_up_note.as_deref(), Some("retomar"));
    }

    #[tokio::test]
    async fn lista_de_vencidos_ordena_do_mais_atrasado() {
        let (service, clients, admin) = setup();
        clients.create(lead_with_followup(Some(date(2024, 6, 1)))).unwrap();
        clients.create(lead_with_followup(Some(date(2024, 6, 10)))).unwrap();
        clients.create(lead_with_followup(Some(date(2024, 6, 11)))).unwrap();

        let due = service.due_for(&admin, date(2024, 6, 10));
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].follow_up_at, Some(date(2024, 6, 1)));
    }
}
