use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{AppointmentServices, ReminderSettings, ReminderSweeper};
use notification_cell::{DispatcherConfig, NotificationDispatcher, NotificationOutbox, TwilioSmsSender};
use shared_config::{AppConfig, StoreBackend};
use shared_database::{InMemoryStore, SchedulingStore, SupabaseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting slot booking API server");

    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn SchedulingStore> = match config.store_backend {
        StoreBackend::Supabase => Arc::new(SupabaseStore::new(&config)),
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let services = Arc::new(AppointmentServices::new(store.clone(), &config));

    // Background workers share one cancellation token with the server
    let cancel = CancellationToken::new();

    let sweeper = Arc::new(ReminderSweeper::new(
        store.clone(),
        Arc::new(NotificationOutbox::new(store.clone())),
        ReminderSettings::from_app_config(&config),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        Arc::new(TwilioSmsSender::new(&config)),
        DispatcherConfig::from_app_config(&config),
    ));

    let sweeper_task = tokio::spawn(sweeper.run(cancel.clone()));
    let dispatcher_task = tokio::spawn(dispatcher.run(cancel.clone()));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(config.clone(), store, services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = shutdown.cancelled() => {}
            }
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    cancel.cancel();
    let _ = tokio::join!(sweeper_task, dispatcher_task);
    info!("Background workers stopped");

    Ok(())
}
