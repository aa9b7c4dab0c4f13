// src/services/client_service.rs

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{Brand, Client, LeadStatus, LossReason, MonthlyTarget, Representative};
use crate::store::{EntityStore, PageResult};
use super::{pipeline, visibility};

// Campos que o patch genérico NÃO pode tocar: cada um tem a sua operação
// dedicada (transição, atribuição, ligação rápida) ou é imutável.
const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "status",
    "lossReason",
    "lossNote",
    "dealValue",
    "assignedTo",
    "lastInteractionAt",
    "createdAt",
];

// Filtros da listagem. O `status` filtra pelo balde de EXIBIÇÃO, então
// um lead sem vendedor aparece sob "new" mesmo com outro status gravado.
#[derive(Debug, Default, Clone)]
pub struct ClientQuery {
    pub status: Option<LeadStatus>,
    pub province: Option<String>,
    pub brand: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct ClientService {
    clients: EntityStore<Client>,
    team: EntityStore<Representative>,
    brands: EntityStore<Brand>,
    targets: EntityStore<MonthlyTarget>,
}

impl ClientService {
    pub fn new(
        clients: EntityStore<Client>,
        team: EntityStore<Representative>,
        brands: EntityStore<Brand>,
        targets: EntityStore<MonthlyTarget>,
    ) -> Self {
        Self { clients, team, brands, targets }
    }

    // =========================================================================
    //  1. CICLO DE VIDA DO LEAD
    // =========================================================================

    pub fn create_client(
        &self,
        actor: &Representative,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: Option<&str>,
        instagram: Option<&str>,
        maps_link: Option<&str>,
        province: &str,
        product_interest: Option<Uuid>,
        assigned_to: Option<Uuid>,
        follow_up_at: Option<NaiveDate>,
        follow_up_note: Option<&str>,
    ) -> Result<Client, AppError> {
        // 1. Território: vale só para registros novos
        if !visibility::can_create(actor, province, product_interest) {
            return Err(AppError::Forbidden);
        }

        // 2. Telefone duplicado: rejeita na hora, nomeando o conflito
        if let Some(phone) = phone {
            if let Some(existing) = self.find_by_phone(phone) {
                return Err(AppError::DuplicateClient { existing_name: existing.name });
            }
        }

        // 3. Vendedor: admin escolhe; o vendedor fica com o próprio lead
        //    (senão o registro sumiria da visão de quem o criou)
        let assigned_to = if actor.is_admin() { assigned_to } else { Some(actor.id) };

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: phone.map(String::from),
            email: email.map(String::from),
            address: address.map(String::from),
            instagram: instagram.map(String::from),
            maps_link: maps_link.map(String::from),
            status: LeadStatus::New,
            assigned_to,
            province: province.to_string(),
            product_interest,
            deal_value: None,
            // A criação conta como primeiro contato
            last_interaction_at: Some(now),
            follow_up_at,
            follow_up_note: follow_up_note.map(String::from),
            loss_reason: None,
            loss_note: None,
            created_at: now,
        };

        self.clients.create(client)
    }

    pub fn list(
        &self,
        actor: &Representative,
        query: &ClientQuery,
        page: usize,
        page_size: usize,
    ) -> PageResult<Client> {
        let needle = query.search.as_deref().map(str::to_lowercase);
        self.clients.list(
            |c| {
                visibility::can_view(actor, c)
                    && query.status.is_none_or(|s| pipeline::display_stage(c) == s)
                    && query.province.as_deref().is_none_or(|p| c.province == p)
                    && query.brand.is_none_or(|b| c.product_interest == Some(b))
                    && query.assigned_to.is_none_or(|r| c.assigned_to == Some(r))
                    && needle.as_deref().is_none_or(|n| {
                        c.name.to_lowercase().contains(n)
                            || c.phone.as_deref().is_some_and(|p| p.contains(n))
                    })
            },
            page,
            page_size,
        )
    }

    /// Fora da visibilidade do ator o lead "não existe": 404, não 403.
    pub fn get(&self, actor: &Representative, id: Uuid) -> Result<Client, AppError> {
        let client = self.clients.get(id).ok_or(AppError::NotFound)?;
        if !visibility::can_view(actor, &client) {
            return Err(AppError::NotFound);
        }
        Ok(client)
    }

    /// Patch de dados cadastrais. Status, atribuição e recência têm
    /// operações próprias e são recusados aqui.
    pub fn update_details(
        &self,
        actor: &Representative,
        id: Uuid,
        patch: Value,
    ) -> Result<Client, AppError> {
        let client = self.get(actor, id)?;
        if !visibility::can_mutate(actor, &client) {
            return Err(AppError::NotFound);
        }

        if let Some(changes) = patch.as_object() {
            for field in PROTECTED_FIELDS {
                if changes.contains_key(*field) {
                    return Err(AppError::field("patch", format!("use a operação dedicada para '{field}'")));
                }
            }
        }

        self.clients.update(id, patch)?.ok_or(AppError::NotFound)
    }

    /// Transição de estágio do funil, com as regras da máquina de estados
    /// aplicadas numa única mutação.
    pub fn transition(
        &self,
        actor: &Representative,
        id: Uuid,
        to: LeadStatus,
        reason: Option<LossReason>,
        note: Option<&str>,
    ) -> Result<Client, AppError> {
        let client = self.get(actor, id)?;
        if !visibility::can_mutate(actor, &client) {
            return Err(AppError::NotFound);
        }

        // Preço atual da marca, para o snapshot no ganho
        let brand_price = client
            .product_interest
            .and_then(|brand_id| self.brands.get(brand_id))
            .map(|brand| brand.price);

        let patch = pipeline::build_transition_patch(&client, to, reason, note, brand_price)?;
        self.clients.update(id, patch)?.ok_or(AppError::NotFound)
    }

    /// Remoção definitiva, só para admin. Id desconhecido = sucesso
    /// idempotente; o fim de vida normal de um lead é `won`/`lost`.
    pub fn delete(&self, actor: &Representative, id: Uuid) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.clients.delete(id);
        Ok(())
    }

    fn find_by_phone(&self, phone: &str) -> Option<Client> {
        let wanted = normalize_phone(phone);
        if wanted.is_empty() {
            return None;
        }
        self.clients
            .snapshot()
            .into_iter()
            .find(|c| c.phone.as_deref().map(normalize_phone).as_deref() == Some(wanted.as_str()))
    }

    // =========================================================================
    //  2. APOIO: TIME, CATÁLOGO E METAS
    // =========================================================================

    /// Lista do time para os inputs de seleção (quem atribui precisa dos
    /// nomes). Somente leitura: o time vem do provedor de identidade.
    pub fn team_members(&self) -> Vec<Representative> {
        let mut members = self.team.snapshot();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }

    /// Marcas disponíveis para o ator, já filtradas pela allow-list.
    pub fn brands_for(&self, actor: &Representative) -> Vec<Brand> {
        let mut brands = visibility::selectable_brands(actor, self.brands.snapshot());
        brands.sort_by(|a, b| a.name.cmp(&b.name));
        brands
    }

    /// Upsert da meta mensal: a chave lógica (member, month, year) tem no
    /// máximo um registro: existindo, é atualizado.
    pub fn upsert_target(
        &self,
        actor: &Representative,
        member_id: Uuid,
        month: u32,
        year: i32,
        deals_target: u32,
        visits_target: u32,
    ) -> Result<MonthlyTarget, AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        if !(1..=12).contains(&month) {
            return Err(AppError::field("month", "mês deve estar entre 1 e 12"));
        }

        let existing = self
            .targets
            .snapshot()
            .into_iter()
            .find(|t| t.same_period(member_id, month, year));

        match existing {
            Some(target) => self
                .targets
                .update(
                    target.id,
                    json!({ "dealsTarget": deals_target, "visitsTarget": visits_target }),
                )?
                .ok_or(AppError::NotFound),
            None => self.targets.create(MonthlyTarget {
                id: Uuid::new_v4(),
                member_id,
                month,
                year,
                deals_target,
                visits_target,
            }),
        }
    }

    /// Metas do período: admin vê todas, vendedor só a própria.
    pub fn targets_for(&self, actor: &Representative, month: u32, year: i32) -> Vec<MonthlyTarget> {
        let mut targets: Vec<MonthlyTarget> = self
            .targets
            .snapshot()
            .into_iter()
            .filter(|t| t.month == month && t.year == year)
            .filter(|t| actor.is_admin() || t.member_id == actor.id)
            .collect();
        targets.sort_by_key(|t| t.member_id);
        targets
    }
}

/// Comparação de telefones só pelos dígitos: espaços, traços e o `+`
/// não diferenciam dois números.
fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::notify::Notifier;
    use crate::models::{RepStatus, Role};
    use crate::store::outbox::RetryPolicy;
    use crate::store::{InMemoryRemote, Outbox};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        service: ClientService,
        brands: EntityStore<Brand>,
        admin: Representative,
    }

    fn setup() -> Harness {
        let remote = Arc::new(InMemoryRemote::new());
        let policy = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1) };
        let outbox = Outbox::spawn(remote.clone(), Notifier::new(8), policy);
        let clients = EntityStore::<Client>::new(remote.clone(), outbox.clone());
        let team = EntityStore::<Representative>::new(remote.clone(), outbox.clone());
        let brands = EntityStore::<Brand>::new(remote.clone(), outbox.clone());
        let targets = EntityStore::<MonthlyTarget>::new(remote, outbox);

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
            service: ClientService::new(clients, team, brands.clone(), targets),
            brands,
            admin,
        }
    }

    impl Harness {
        fn seller(&self, provinces: Vec<&str>) -> Representative {
            self.service
                .team
                .create(Representative {
                    id: Uuid::new_v4(),
                    name: "Vendedor".into(),
                    role: Role::Rep,
                    status: RepStatus::Active,
                    allowed_provinces: provinces.into_iter().map(String::from).collect(),
                    allowed_brands: vec![],
                })
                .unwrap()
        }

        fn create_simple(&self, name: &str, phone: Option<&str>) -> Result<Client, AppError> {
            self.service.create_client(
                &self.admin,
                name,
                phone,
                None,
                None,
                None,
                None,
                "Baghdad",
                None,
                None,
                None,
                None,
            )
        }
    }

    #[tokio::test]
    async fn criacao_comeca_em_new_e_carimba_o_primeiro_contato() {
        let h = setup();
        let client = h.create_simple("Novo Lead", None).unwrap();

        assert_eq!(client.status, LeadStatus::New);
        assert!(client.last_interaction_at.is_some());
        assert_eq!(client.deal_value, None);
    }

    #[tokio::test]
    async fn telefone_duplicado_nomeia_o_cliente_existente() {
        let h = setup();
        h.create_simple("Ahmed Kareem", Some("+9647701234567")).unwrap();

        let result = h.create_simple("Outro Nome", Some("+9647701234567"));
        match result {
            Err(AppError::DuplicateClient { existing_name }) => {
                assert_eq!(existing_name, "Ahmed Kareem");
            }
            other => panic!("esperava DuplicateClient, veio {other:?}"),
        }
    }

    #[tokio::test]
    async fn formatacao_diferente_ainda_e_duplicata() {
        let h = setup();
        h.create_simple("Ahmed Kareem", Some("+9647701234567")).unwrap();

        // dígitos diferentes (prefixo 0) NÃO são duplicata
        let result = h.create_simple("Outro", Some("0964 770-123-4567"));
        assert!(result.is_ok());

        let result = h.create_simple("Mais Um", Some("+964 770 123 4567"));
        assert!(matches!(result, Err(AppError::DuplicateClient { .. })));
    }

    #[tokio::test]
    async fn vendedor_fora_do_territorio_nao_cria() {
        let h = setup();
        let seller = h.seller(vec!["Basra"]);

        let result = h.service.create_client(
            &seller, "Lead", None, None, None, None, None, "Baghdad", None, None, None, None,
        );
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn lead_criado_por_vendedor_fica_com_ele() {
        let h = setup();
        let seller = h.seller(vec![]);

        let client = h
            .service
            .create_client(
                &seller, "Lead", None, None, None, None, None, "Baghdad", None, None, None, None,
            )
            .unwrap();
        assert_eq!(client.assigned_to, Some(seller.id));
    }

    #[tokio::test]
    async fn patch_generico_recusa_campos_protegidos() {
        let h = setup();
        let client = h.create_simple("Lead", None).unwrap();

        let result =
            h.service
                .update_details(&h.admin, client.id, json!({ "status": "won" }));
        assert!(matches!(result, Err(AppError::FieldRule { .. })));

        // campo cadastral passa normalmente
        let updated = h
            .service
            .update_details(&h.admin, client.id, json!({ "email": "novo@email.com" }))
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("novo@email.com"));
    }

    #[tokio::test]
    async fn transicao_para_won_congela_o_preco_da_marca() {
        let h = setup();
        let brand = h
            .brands
            .create(Brand {
                id: Uuid::new_v4(),
                name: "Kerastase".into(),
                price: Decimal::new(150_000, 2),
            })
            .unwrap();

        let client = h
            .service
            .create_client(
                &h.admin,
                "Lead",
                None,
                None,
                None,
                None,
                None,
                "Baghdad",
                Some(brand.id),
                None,
                None,
                None,
            )
            .unwrap();

        let won = h
            .service
            .transition(&h.admin, client.id, LeadStatus::Won, None, None)
            .unwrap();
        assert_eq!(won.status, LeadStatus::Won);
        assert_eq!(won.deal_value, Some(Decimal::new(150_000, 2)));
    }

    #[tokio::test]
    async fn transicao_para_lost_exige_motivo() {
        let h = setup();
        let client = h.create_simple("Lead", None).unwrap();

        let rejected =
            h.service
                .transition(&h.admin, client.id, LeadStatus::Lost, None, None);
        assert!(matches!(rejected, Err(AppError::FieldRule { field: "lossReason", .. })));
        // nada mudou no cache
        assert_eq!(h.service.get(&h.admin, client.id).unwrap().status, LeadStatus::New);

        let lost = h
            .service
            .transition(&h.admin, client.id, LeadStatus::Lost, Some(LossReason::Price), None)
            .unwrap();
        assert_eq!(lost.status, LeadStatus::Lost);
        assert_eq!(lost.loss_reason, Some(LossReason::Price));
    }

    #[tokio::test]
    async fn listagem_do_vendedor_so_traz_os_leads_dele() {
        let h = setup();
        let seller = h.seller(vec![]);

        h.create_simple("Do Admin", None).unwrap();
        h.service
            .create_client(
                &seller, "Do Vendedor", None, None, None, None, None, "Baghdad", None, None, None,
                None,
            )
            .unwrap();

        let page = h.service.list(&seller, &ClientQuery::default(), 1, 25);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "Do Vendedor");
    }

    #[tokio::test]
    async fn filtro_por_status_usa_o_balde_de_exibicao() {
        let h = setup();
        let client = h.create_simple("Sem Dono", None).unwrap();
        // Status gravado vira qualifying, mas segue sem vendedor
        h.service
            .transition(&h.admin, client.id, LeadStatus::Qualifying, None, None)
            .unwrap();

        let query = ClientQuery { status: Some(LeadStatus::New), ..Default::default() };
        let page = h.service.list(&h.admin, &query, 1, 25);
        assert_eq!(page.total_count, 1);

        let query = ClientQuery { status: Some(LeadStatus::Qualifying), ..Default::default() };
        assert_eq!(h.service.list(&h.admin, &query, 1, 25).total_count, 0);
    }

    #[tokio::test]
    async fn meta_mensal_e_upsert_por_periodo() {
        let h = setup();
        let member = Uuid::new_v4();

        let first = h
            .service
            .upsert_target(&h.admin, member, 6, 2024, 10, 20)
            .unwrap();
        let second = h
            .service
            .upsert_target(&h.admin, member, 6, 2024, 12, 25)
            .unwrap();

        // mesmo período = mesmo registro, valores novos
        assert_eq!(first.id, second.id);
        let targets = h.service.targets_for(&h.admin, 6, 2024);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].deals_target, 12);
        assert_eq!(targets[0].visits_target, 25);
    }

    #[tokio::test]
    async fn mes_invalido_e_rejeitado() {
        let h = setup();
        let result = h.service.upsert_target(&h.admin, Uuid::new_v4(), 13, 2024, 1, 1);
        assert!(matches!(result, Err(AppError::FieldRule { field: "month", .. })));
    }
}
