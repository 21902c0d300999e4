use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentServices};
use professional_cell::router::professional_routes;
use shared_config::AppConfig;
use shared_database::SchedulingStore;

pub fn create_router(
    config: Arc<AppConfig>,
    store: Arc<dyn SchedulingStore>,
    services: Arc<AppointmentServices>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Slot booking API is running!" }))
        .nest("/professionals", professional_routes(config.clone(), store))
        .nest("/appointments", appointment_routes(config, services))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use shared_database::InMemoryStore;
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = TestConfig::default().to_arc();
        let store: Arc<dyn SchedulingStore> = Arc::new(InMemoryStore::new());
        let services = Arc::new(AppointmentServices::new(store.clone(), &config));
        create_router(config, store, services)
    }

    #[tokio::test]
    async fn root_responds() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cells_are_nested_under_their_prefixes() {
        let professional_id = uuid::Uuid::new_v4();
        let services = app()
            .oneshot(
                Request::builder()
                    .uri(format!("/professionals/{}/services", professional_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(services.status(), StatusCode::OK);

        let mine = app()
            .oneshot(Request::builder().uri("/appointments/mine").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(mine.status(), StatusCode::UNAUTHORIZED);
    }
}
