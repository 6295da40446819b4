// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "OK" }))
}

pub fn build_router(app_state: AppState) -> Router {
    let company_routes = Router::new()
        .route(
            "/",
            post(handlers::companies::create_company).get(handlers::companies::list_companies),
        )
        .route("/search", get(handlers::companies::search_companies))
        .route("/statistics", get(handlers::companies::company_statistics))
        .route(
            "/bulk",
            put(handlers::companies::bulk_update_companies)
                .delete(handlers::companies::bulk_delete_companies),
        )
        .route(
            "/{id}",
            get(handlers::companies::get_company)
                .put(handlers::companies::update_company)
                .delete(handlers::companies::delete_company),
        )
        .route("/{id}/restore", post(handlers::companies::restore_company))
        .route(
            "/{id}/customers",
            get(handlers::companies::list_company_customers)
                .post(handlers::companies::link_company_customer),
        )
        .route(
            "/{id}/customers/{customer_id}",
            delete(handlers::companies::unlink_company_customer),
        );

    let customer_routes = Router::new()
        .route(
            "/",
            post(handlers::crm::create_customer).get(handlers::crm::list_customers),
        )
        .route(
            "/{id}",
            get(handlers::crm::get_customer)
                .put(handlers::crm::update_customer)
                .delete(handlers::crm::delete_customer),
        );

    let ticket_routes = Router::new()
        .route(
            "/",
            post(handlers::crm::create_ticket).get(handlers::crm::list_tickets),
        )
        .route("/{id}", get(handlers::crm::get_ticket))
        .route("/{id}/status", put(handlers::crm::update_ticket_status));

    let catalog_routes = Router::new()
        .route(
            "/items",
            post(handlers::catalog::create_item).get(handlers::catalog::list_items),
        )
        .route("/items/search", get(handlers::catalog::search_items))
        .route("/items/statistics", get(handlers::catalog::item_statistics))
        .route(
            "/items/{id}",
            get(handlers::catalog::get_item)
                .put(handlers::catalog::update_item)
                .delete(handlers::catalog::delete_item),
        )
        .route("/items/{id}/stock", put(handlers::catalog::update_stock))
        .route(
            "/items/{id}/stock-movements",
            get(handlers::catalog::list_stock_movements),
        )
        .route("/items/{id}/price", put(handlers::catalog::update_price))
        .route(
            "/items/{id}/price-history",
            get(handlers::catalog::list_price_history),
        )
        .route(
            "/items/{id}/tags",
            post(handlers::catalog::add_item_tags).delete(handlers::catalog::remove_item_tags),
        );

    let omnibridge_routes = Router::new()
        // Regras
        .route(
            "/automation-rules",
            get(handlers::omnibridge::list_rules).post(handlers::omnibridge::create_rule),
        )
        .route(
            "/automation-rules/{rule_id}",
            get(handlers::omnibridge::get_rule)
                .put(handlers::omnibridge::update_rule)
                .delete(handlers::omnibridge::delete_rule),
        )
        .route(
            "/automation-rules/{rule_id}/toggle",
            post(handlers::omnibridge::toggle_rule),
        )
        .route(
            "/automation-rules/{rule_id}/test",
            post(handlers::omnibridge::test_rule),
        )
        // Canais
        .route(
            "/channels",
            get(handlers::omnibridge::list_channels).post(handlers::omnibridge::create_channel),
        )
        .route(
            "/channels/{channel_id}/toggle",
            post(handlers::omnibridge::toggle_channel),
        )
        // Mensagens
        .route("/messages", get(handlers::omnibridge::list_messages))
        .route("/messages/process", post(handlers::omnibridge::process_message))
        .route("/messages/send", post(handlers::omnibridge::send_message))
        .route("/messages/{id}", get(handlers::omnibridge::get_message))
        .route("/messages/{id}/reply", post(handlers::omnibridge::reply_message))
        .route("/messages/{id}/forward", post(handlers::omnibridge::forward_message))
        .route("/messages/{id}/archive", post(handlers::omnibridge::archive_message))
        .route("/messages/{id}/read", post(handlers::omnibridge::read_message))
        .route("/messages/{id}/star", post(handlers::omnibridge::star_message))
        // Templates
        .route(
            "/templates",
            get(handlers::templates::list_templates).post(handlers::templates::create_template),
        )
        .route(
            "/templates/{id}",
            get(handlers::templates::get_template)
                .put(handlers::templates::update_template)
                .delete(handlers::templates::delete_template),
        )
        .route("/templates/{id}/install", post(handlers::templates::install_template))
        .route("/templates/{id}/toggle", post(handlers::templates::toggle_template))
        .route("/templates/{id}/render", post(handlers::templates::render_template))
        // Notificações
        .route("/notifications", get(handlers::omnibridge::list_notifications));

    // Tudo em /api, exceto /api/health, exige Bearer válido
    let protected = Router::new()
        .nest("/api/companies", company_routes)
        .nest("/api/customers", customer_routes)
        .nest("/api/tickets", ticket_routes)
        .nest("/api/materials-services-integration/working", catalog_routes)
        .nest("/api/omnibridge", omnibridge_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
