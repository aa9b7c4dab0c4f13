// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::common;
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Clients ---
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::transition_client,
        handlers::clients::delete_client,

        // --- Assignment ---
        handlers::assignment::assign_client,
        handlers::assignment::bulk_assign,
        handlers::assignment::auto_assign,

        // --- Followups ---
        handlers::followups::list_due,
        handlers::followups::schedule_followup,
        handlers::followups::complete_task,

        // --- Activities ---
        handlers::activities::list_activities,
        handlers::activities::log_activity,
        handlers::activities::quick_call,

        // --- Team ---
        handlers::team::list_team,
        handlers::team::list_brands,
        handlers::team::upsert_target,
        handlers::team::list_targets,

        // --- Dashboard ---
        handlers::dashboard::pipeline_summary,
        handlers::dashboard::followup_board,
        handlers::dashboard::contact_health,
        handlers::dashboard::sync_errors,
    ),
    components(schemas(
        models::Client,
        models::client::LeadStatus,
        models::client::LossReason,
        models::Representative,
        models::team::Role,
        models::team::RepStatus,
        models::Activity,
        models::activity::ActivityKind,
        models::MonthlyTarget,
        models::Brand,
        common::notify::SyncNotice,
        services::followup_service::TaskOutcome,
        services::dashboard_service::PipelineSummary,
        services::dashboard_service::FollowupBoard,
        services::dashboard_service::ContactHealth,
    )),
    modifiers(&ActorHeader),
    tags(
        (name = "Clients", description = "Ciclo de vida dos leads"),
        (name = "Assignment", description = "Atribuição manual, em lote e automática"),
        (name = "Followups", description = "Agendamento e conclusão de lembretes"),
        (name = "Activities", description = "Histórico de interações (append-only)"),
        (name = "Team", description = "Time, catálogo e metas"),
        (name = "Dashboard", description = "Projeções de leitura")
    )
)]
pub struct ApiDoc;

// A identidade vem de fora; a API só exige o id do ator no cabeçalho.
struct ActorHeader;

impl Modify for ActorHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "actor_header",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-actor-id"))),
            );
        }
    }
}
