// src/lib.rs

// Declaração dos nossos módulos
pub mod common;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppState;
use crate::middleware::actor::actor_guard;

/// Monta o router completo. Compartilhado entre o binário e os testes
/// de integração.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas de leads (protegidas pelo guard do ator)
    let client_routes = Router::new()
        .route("/"
               ,post(handlers::clients::create_client)
               .get(handlers::clients::list_clients)
        )
        .route("/bulk-assign"
               ,post(handlers::assignment::bulk_assign)
        )
        .route("/auto-assign"
               ,post(handlers::assignment::auto_assign)
        )
        .route("/{id}"
               ,get(handlers::clients::get_client)
               .patch(handlers::clients::update_client)
               .delete(handlers::clients::delete_client)
        )
        .route("/{id}/status"
               ,post(handlers::clients::transition_client)
        )
        .route("/{id}/assign"
               ,post(handlers::assignment::assign_client)
        )
        .route("/{id}/follow-up"
               ,post(handlers::followups::schedule_followup)
        )
        .route("/{id}/follow-up/complete"
               ,post(handlers::followups::complete_task)
        )
        .route("/{id}/activities"
               ,get(handlers::activities::list_activities)
               .post(handlers::activities::log_activity)
        )
        .route("/{id}/quick-call"
               ,post(handlers::activities::quick_call)
        );

    // Rotas de apoio: lembretes, time, catálogo, metas e projeções
    let workspace_routes = Router::new()
        .route("/followups", get(handlers::followups::list_due))
        .route("/team", get(handlers::team::list_team))
        .route("/brands", get(handlers::team::list_brands))
        .route("/targets"
               ,put(handlers::team::upsert_target)
               .get(handlers::team::list_targets)
        )
        .route("/dashboard/pipeline", get(handlers::dashboard::pipeline_summary))
        .route("/dashboard/followups", get(handlers::dashboard::followup_board))
        .route("/dashboard/contact-health", get(handlers::dashboard::contact_health))
        .route("/sync/errors", get(handlers::dashboard::sync_errors));

    let api_routes = Router::new()
        .nest("/clients", client_routes)
        .merge(workspace_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            actor_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state)
}
