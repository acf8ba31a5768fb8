//! Axum router construction for the operations API.
//!
//! Assembles all routes into a single [`Router`] with CORS enabled for
//! cross-origin dashboard access and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, damage, events, logistics, posts, residents};
use crate::state::AppState;

/// Build the complete Axum router.
///
/// See the handler modules for the endpoint tables. CORS allows any
/// origin; deployments behind a gateway restrict it there.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Events
        .route("/api/events", post(events::create_event).get(events::list_events))
        .route("/api/events/active", get(events::active_event))
        .route("/api/events/{id}", get(events::get_event))
        .route("/api/events/{id}/resolve", post(events::resolve_event))
        .route("/api/events/{id}/dashboard", get(events::dashboard))
        // Posts
        .route(
            "/api/events/{id}/posts",
            post(posts::create_post).get(posts::list_posts),
        )
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/api/posts/{id}/occupancy", get(posts::occupancy))
        // Residents
        .route(
            "/api/events/{id}/residents",
            get(residents::list_residents),
        )
        .route(
            "/api/events/{id}/residents/counts",
            get(residents::condition_counts),
        )
        .route(
            "/api/events/{id}/residents/registry",
            post(residents::register_from_registry),
        )
        .route(
            "/api/events/{id}/residents/registry/bulk",
            post(residents::bulk_register),
        )
        .route(
            "/api/events/{id}/residents/manual",
            post(residents::register_manual),
        )
        .route(
            "/api/residents/{id}",
            get(residents::get_resident).delete(residents::delete_resident),
        )
        .route(
            "/api/residents/{id}/condition",
            put(residents::update_condition),
        )
        .route(
            "/api/residents/{id}/location",
            put(residents::update_location),
        )
        // Damage reports
        .route(
            "/api/events/{id}/damage-reports",
            post(damage::create_report).get(damage::list_reports),
        )
        .route(
            "/api/events/{id}/damage-reports/severity",
            get(damage::severity_counts),
        )
        .route("/api/damage-reports/{id}", get(damage::get_report))
        .route("/api/damage-reports/{id}/status", put(damage::update_status))
        // Logistics
        .route(
            "/api/posts/{id}/items",
            post(logistics::create_item).get(logistics::list_items),
        )
        .route(
            "/api/items/{id}",
            get(logistics::get_item).delete(logistics::delete_item),
        )
        .route(
            "/api/items/{id}/transactions",
            post(logistics::record_transaction).get(logistics::list_transactions),
        )
        .route("/api/items/{id}/verify", get(logistics::verify_item))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
