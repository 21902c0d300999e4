use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, put},
    Router,
};

use shared_config::AppConfig;
use shared_database::SchedulingStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn professional_routes(config: Arc<AppConfig>, store: Arc<dyn SchedulingStore>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/{professional_id}/slots", get(handlers::get_available_slots))
        .route("/{professional_id}/availabilities", get(handlers::get_availabilities))
        .route("/{professional_id}/services", get(handlers::get_services));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/{professional_id}/availabilities", put(handlers::set_availabilities))
        .route(
            "/{professional_id}/services/{service_id}",
            delete(handlers::deactivate_service),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(store)
}
