// src/config.rs

use std::{env, sync::Arc, time::Duration};

use crate::{
    common::notify::Notifier,
    models::{Activity, Brand, Client, MonthlyTarget, Representative},
    services::{
        ActivityService, AssignmentService, ClientService, DashboardService, FollowupService,
    },
    store::{
        outbox::spawn_reconciler, EntityStore, InMemoryRemote, Outbox, Reconcile, RemoteStore,
        RestRemoteStore, RetryPolicy,
    },
};

// Configuração carregada do ambiente, com padrões de desenvolvimento.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub remote_store_url: Option<String>,
    pub sync_max_retries: u32,
    pub sync_retry_base_ms: u64,
    pub reconcile_interval_secs: u64,
    pub default_page_size: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            remote_store_url: env::var("REMOTE_STORE_URL").ok(),
            sync_max_retries: env_or("SYNC_MAX_RETRIES", 3),
            sync_retry_base_ms: env_or("SYNC_RETRY_BASE_MS", 500),
            reconcile_interval_secs: env_or("RECONCILE_INTERVAL_SECS", 300),
            default_page_size: env_or("DEFAULT_PAGE_SIZE", 25),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub notifier: Notifier,
    pub outbox: Outbox,

    // Os caches otimistas, um por coleção
    pub clients: EntityStore<Client>,
    pub team: EntityStore<Representative>,
    pub activities: EntityStore<Activity>,
    pub targets: EntityStore<MonthlyTarget>,
    pub brands: EntityStore<Brand>,

    // Os serviços, montados sobre os caches
    pub client_service: ClientService,
    pub assignment_service: AssignmentService,
    pub followup_service: FollowupService,
    pub activity_service: ActivityService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env();

        // Sem REMOTE_STORE_URL rodamos em modo dev: o armazém em memória
        // aceita tudo e morre com o processo
        let remote: Arc<dyn RemoteStore> = match &settings.remote_store_url {
            Some(url) => {
                tracing::info!("🔗 Armazém remoto em {url}");
                Arc::new(RestRemoteStore::new(url.clone())?)
            }
            None => {
                tracing::warn!("REMOTE_STORE_URL ausente: usando armazém em memória (modo dev)");
                Arc::new(InMemoryRemote::new())
            }
        };

        Self::with_remote(settings, remote).await
    }

    // Separado para os testes de integração injetarem um remoto preparado.
    pub async fn with_remote(
        settings: Settings,
        remote: Arc<dyn RemoteStore>,
    ) -> anyhow::Result<Self> {
        let notifier = Notifier::new(64);
        let policy = RetryPolicy {
            max_attempts: settings.sync_max_retries,
            base_delay: Duration::from_millis(settings.sync_retry_base_ms),
        };
        let outbox = Outbox::spawn(remote.clone(), notifier.clone(), policy);

        let clients = EntityStore::<Client>::new(remote.clone(), outbox.clone());
        let team = EntityStore::<Representative>::new(remote.clone(), outbox.clone());
        let activities = EntityStore::<Activity>::new(remote.clone(), outbox.clone());
        let targets = EntityStore::<MonthlyTarget>::new(remote.clone(), outbox.clone());
        let brands = EntityStore::<Brand>::new(remote.clone(), outbox.clone());

        // Carga inicial a partir do remoto
        let seeded = clients.seed().await?
            + team.seed().await?
            + activities.seed().await?
            + targets.seed().await?
            + brands.seed().await?;
        tracing::info!("✅ Cache inicial carregado ({seeded} registros)");

        // Recarga periódica quando o outbox está ocioso
        let reconcilers: Vec<Arc<dyn Reconcile>> = vec![
            Arc::new(clients.clone()),
            Arc::new(team.clone()),
            Arc::new(activities.clone()),
            Arc::new(targets.clone()),
            Arc::new(brands.clone()),
        ];
        spawn_reconciler(
            reconcilers,
            outbox.clone(),
            Duration::from_secs(settings.reconcile_interval_secs),
        );

        // --- Monta o gráfico de dependências ---
        let activity_service = ActivityService::new(activities.clone(), clients.clone());
        let client_service =
            ClientService::new(clients.clone(), team.clone(), brands.clone(), targets.clone());
        let assignment_service =
            AssignmentService::new(clients.clone(), team.clone(), activity_service.clone());
        let followup_service = FollowupService::new(clients.clone(), activity_service.clone());
        let dashboard_service = DashboardService::new(clients.clone());

        Ok(Self {
            settings,
            notifier,
            outbox,
            clients,
            team,
            activities,
            targets,
            brands,
            client_service,
            assignment_service,
            followup_service,
            activity_service,
            dashboard_service,
        })
    }
}
