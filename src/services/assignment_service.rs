// src/services/assignment_service.rs

use serde_json::json;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{ActivityKind, Client, Representative};
use crate::store::EntityStore;
use super::activity_service::ActivityService;

// Atribuição de leads a vendedores. Só admin reatribui: os direitos do
// vendedor param na visibilidade dos próprios leads.
//
// Todos os comandos seguram o lock de comando da coleção de clientes do
// começo ao fim: dois lotes de atribuição nunca se intercalam sobre o
// mesmo pool de candidatos (é isso que sustenta o invariante do guloso).
#[derive(Clone)]
pub struct AssignmentService {
    clients: EntityStore<Client>,
    team: EntityStore<Representative>,
    activities: ActivityService,
}

impl AssignmentService {
    pub fn new(
        clients: EntityStore<Client>,
        team: EntityStore<Representative>,
        activities: ActivityService,
    ) -> Self {
        Self { clients, team, activities }
    }

    fn ensure_admin(actor: &Representative) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Atribuição manual de um lead. Só mexe em `assignedTo`.
    pub async fn assign(
        &self,
        actor: &Representative,
        client_id: Uuid,
        rep_id: Uuid,
    ) -> Result<Client, AppError> {
        Self::ensure_admin(actor)?;
        let _guard = self.clients.lock_commands().await;
        self.assign_one(actor, client_id, rep_id)?
            .ok_or(AppError::NotFound)
    }

    /// Lote de atribuições independentes: sem tudo-ou-nada; ids
    /// desconhecidos são pulados. Retorna quantas foram aplicadas.
    pub async fn bulk_assign(
        &self,
        actor: &Representative,
        client_ids: &[Uuid],
        rep_id: Uuid,
    ) -> Result<usize, AppError> {
        Self::ensure_admin(actor)?;
        let _guard = self.clients.lock_commands().await;

        let mut applied = 0;
        for client_id in client_ids {
            if self.assign_one(actor, *client_id, rep_id)?.is_some() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Balanceamento guloso pelo menos carregado. NÃO é round-robin: a
    /// carga é reavaliada depois de CADA atribuição, então o vendedor
    /// mais folgado recebe primeiro, sempre. Empate = primeiro da lista.
    ///
    /// `rep_ids` fixa a ordem dos candidatos a receber; sem ela, entram
    /// todos os vendedores ativos ordenados por nome (determinístico).
    pub async fn auto_assign(
        &self,
        actor: &Representative,
        candidate_ids: &[Uuid],
        rep_ids: Option<&[Uuid]>,
    ) -> Result<Vec<(Uuid, Uuid)>, AppError> {
        Self::ensure_admin(actor)?;
        let _guard = self.clients.lock_commands().await;

        let reps = self.resolve_active_reps(rep_ids)?;
        let snapshot = self.clients.snapshot();

        // Carga atual de cada vendedor: leads abertos atribuídos a ele
        let mut loads: Vec<usize> = reps
            .iter()
            .map(|rep| {
                snapshot
                    .iter()
                    .filter(|c| c.assigned_to == Some(rep.id) && c.is_open())
                    .count()
            })
            .collect();

        let mut assigned = Vec::with_capacity(candidate_ids.len());
        for client_id in candidate_ids {
            // min_by_key devolve o PRIMEIRO mínimo: o desempate é a ordem
            // original da lista de vendedores
            let Some(idx) = loads
                .iter()
                .enumerate()
                .min_by_key(|&(_, load)| *load)
                .map(|(idx, _)| idx)
            else {
                break;
            };

            let rep_id = reps[idx].id;
            if self.assign_one(actor, *client_id, rep_id)?.is_some() {
                loads[idx] += 1;
                assigned.push((*client_id, rep_id));
            }
        }
        Ok(assigned)
    }

    /// Um assign com o lock já em mãos. `Ok(None)` = lead desconhecido.
    fn assign_one(
        &self,
        actor: &Representative,
        client_id: Uuid,
        rep_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        let rep = self
            .team
            .get(rep_id)
            .ok_or_else(|| AppError::field("repId", "vendedor desconhecido"))?;

        let updated = self
            .clients
            .update(client_id, json!({ "assignedTo": rep_id }))?;
        if updated.is_some() {
            self.activities.log(
                client_id,
                ActivityKind::Assignment,
                format!("Lead atribuído a {}", rep.name),
                actor.id,
            )?;
        }
        Ok(updated)
    }

    fn resolve_active_reps(
        &self,
        rep_ids: Option<&[Uuid]>,
    ) -> Result<Vec<Representative>, AppError> {
        let reps: Vec<Representative> = match rep_ids {
            // A ordem enviada é a ordem de desempate
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.team.get(*id))
                .filter(|rep| rep.is_active())
                .collect(),
            None => {
                let mut all: Vec<Representative> = self
                    .team
                    .snapshot()
                    .into_iter()
                    .filter(|rep| rep.is_active())
                    .collect();
                all.sort_by(|a, b| a.name.cmp(&b.name));
                all
            }
        };

        if reps.is_empty() {
            return Err(AppError::field("repIds", "nenhum vendedor ativo disponível"));
        }
        Ok(reps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::notify::Notifier;
    use crate::models::{Activity, LeadStatus, RepStatus, Role};
    use crate::store::outbox::RetryPolicy;
    use crate::store::{InMemoryRemote, Outbox};
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        service: AssignmentService,
        clients: EntityStore<Client>,
        team: EntityStore<Representative>,
        admin: Representative,
    }

    fn setup() -> Harness {
        let remote = Arc::new(InMemoryRemote::new());
        let policy = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1) };
        let outbox = Outbox::spawn(remote.clone(), Notifier::new(8), policy);
        let clients = EntityStore::<Client>::new(remote.clone(), outbox.clone());
        let team = EntityStore::<Representative>::new(remote.clone(), outbox.clone());
        let activities = EntityStore::<Activity>::new(remote, outbox);
        let activity_service = ActivityService::new(activities, clients.clone());

        let admin = team
            .create(Representative {
                id: Uuid::new_v4(),
                name: "Admin".into(),
                role: Role::Admin,
                status: RepStatus::Active,
                allowed_provinces: vec![],
                allowed_brands: vec![],
            })
            .unwrap();

        Harness {
            service: AssignmentService::new(clients.clone(), team.clone(), activity_service),
            clients,
            team,
            admin,
        }
    }

    impl Harness {
        fn rep(&self, name: &str) -> Representative {
            self.team
                .create(Representative {
                    id: Uuid::new_v4(),
                    name: name.into(),
                    role: Role::Rep,
                    status: RepStatus::Active,
                    allowed_provinces: vec![],
                    allowed_brands: vec![],
                })
                .unwrap()
        }

        fn lead(&self, assigned_to: Option<Uuid>, status: LeadStatus) -> Client {
            self.clients
                .create(Client {
                    id: Uuid::new_v4(),
                    name: "Lead".into(),
                    phone: None,
                    email: None,
                    address: None,
                    instagram: None,
                    maps_link: None,
                    status,
                    assigned_to,
                    province: "Baghdad".into(),
                    product_interest: None,
                    deal_value: None,
                    last_interaction_at: None,
                    follow_up_at: None,
                    follow_up_note: None,
                    loss_reason: None,
                    loss_note: None,
                    created_at: Utc::now(),
                })
                .unwrap()
        }

        fn load_of(&self, rep_id: Uuid) -> usize {
            self.clients
                .snapshot()
                .iter()
                .filter(|c| c.assigned_to == Some(rep_id) && c.is_open())
                .count()
        }
    }

    #[tokio::test]
    async fn somente_admin_atribui() {
        let h = setup();
        let seller = h.rep("Vendedor");
        let lead = h.lead(None, LeadStatus::New);

        let result = h.service.assign(&seller, lead.id, seller.id).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn assign_so_mexe_no_assigned_to() {
        let h = setup();
        let seller = h.rep("Vendedor");
        let lead = h.lead(None, LeadStatus::Qualifying);

        let updated = h.service.assign(&h.admin, lead.id, seller.id).await.unwrap();
        assert_eq!(updated.assigned_to, Some(seller.id));
        // nada além do vendedor muda
        assert_eq!(updated.status, LeadStatus::Qualifying);
        assert_eq!(updated.name, lead.name);
    }

    #[tokio::test]
    async fn bulk_pula_ids_desconhecidos() {
        let h = setup();
        let seller = h.rep("Vendedor");
        let a = h.lead(None, LeadStatus::New);
        let b = h.lead(None, LeadStatus::New);

        let applied = h
            .service
            .bulk_assign(&h.admin, &[a.id, Uuid::new_v4(), b.id], seller.id)
            .await
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(h.load_of(seller.id), 2);
    }

    #[tokio::test]
    async fn auto_assign_nivela_o_menos_carregado_primeiro() {
        let h = setup();
        let rep_a = h.rep("A");
        let rep_b = h.rep("B");

        // A começa com 3 leads abertos, B com 1
        for _ in 0..3 {
            h.lead(Some(rep_a.id), LeadStatus::Qualifying);
        }
        h.lead(Some(rep_b.id), LeadStatus::Qualifying);

        let c1 = h.lead(None, LeadStatus::New);
        let c2 = h.lead(None, LeadStatus::New);

        let assigned = h
            .service
            .auto_assign(&h.admin, &[c1.id, c2.id], Some(&[rep_a.id, rep_b.id]))
            .await
            .unwrap();

        // Os DOIS vão para B: 1→2 e depois 2→3 (a carga é reavaliada a
        // cada passo, então B segue sendo o menos carregado)
        assert_eq!(assigned, vec![(c1.id, rep_b.id), (c2.id, rep_b.id)]);
        assert_eq!(h.load_of(rep_a.id), 3);
        assert_eq!(h.load_of(rep_b.id), 3);
    }

    #[tokio::test]
    async fn empate_vai_para_o_primeiro_da_lista() {
        let h = setup();
        let rep_a = h.rep("A");
        let rep_b = h.rep("B");
        let lead = h.lead(None, LeadStatus::New);

        let assigned = h
            .service
            .auto_assign(&h.admin, &[lead.id], Some(&[rep_b.id, rep_a.id]))
            .await
            .unwrap();

        // cargas iguais (0 e 0): vence quem veio primeiro na lista
        assert_eq!(assigned[0].1, rep_b.id);
    }

    #[tokio::test]
    async fn auto_assign_distribui_com_diferenca_maxima_de_um() {
        let h = setup();
        let reps = [h.rep("A"), h.rep("B"), h.rep("C")];
        let rep_ids: Vec<Uuid> = reps.iter().map(|r| r.id).collect();

        let candidates: Vec<Uuid> = (0..7).map(|_| h.lead(None, LeadStatus::New).id).collect();
        h.service
            .auto_assign(&h.admin, &candidates, Some(&rep_ids))
            .await
            .unwrap();

        let loads: Vec<usize> = reps.iter().map(|r| h.load_of(r.id)).collect();
        assert_eq!(loads.iter().sum::<usize>(), 7);
        assert!(loads.iter().max().unwrap() - loads.iter().min().unwrap() <= 1);
    }

    #[tokio::test]
    async fn leads_ganhos_ou_perdidos_nao_contam_na_carga() {
        let h = setup();
        let rep_a = h.rep("A");
        let rep_b = h.rep("B");

        // A tem 2 leads, mas ambos fechados; B tem 1 aberto
        h.lead(Some(rep_a.id), LeadStatus::Won);
        h.lead(Some(rep_a.id), LeadStatus::Lost);
        h.lead(Some(rep_b.id), LeadStatus::Qualifying);

        let lead = h.lead(None, LeadStatus::New);
        let assigned = h
            .service
            .auto_assign(&h.admin, &[lead.id], Some(&[rep_a.id, rep_b.id]))
            .await
            .unwrap();

        // A carga real de A é 0, então o lead vai para A
        assert_eq!(assigned[0].1, rep_a.id);
    }

    #[tokio::test]
    async fn vendedor_inativo_fica_de_fora_do_rodizio() {
        let h = setup();
        let active = h.rep("Ativo");
        let inactive = h
            .team
            .create(Representative {
                id: Uuid::new_v4(),
                name: "Inativo".into(),
                role: Role::Rep,
                status: RepStatus::Inactive,
                allowed_provinces: vec![],
                allowed_brands: vec![],
            })
            .unwrap();

        let lead = h.lead(None, LeadStatus::New);
        let assigned = h
            .service
            .auto_assign(&h.admin, &[lead.id], Some(&[inactive.id, active.id]))
            .await
            .unwrap();

        assert_eq!(assigned[0].1, active.id);
    }

    #[tokio::test]
    async fn atribuicao_registra_atividade_no_historico() {
        let h = setup();
        let seller = h.rep("Vendedor");
        let lead = h.lead(None, LeadStatus::New);

        h.service.assign(&h.admin, lead.id, seller.id).await.unwrap();

        let history = h
            .service
            .activities
            .for_client(&h.admin, lead.id)
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, ActivityKind::Assignment);
    }
}
