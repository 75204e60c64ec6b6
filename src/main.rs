use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use behavior_analytics_api::{
    config::Config,
    handlers,
    validation::{content_type_validation_middleware, request_size_validation_middleware},
    AppState,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Attaches a fresh `CancellationToken` to every request so analytics
/// handlers can observe cancellation at sub-query boundaries.
async fn cancellation_middleware(mut request: Request, next: Next) -> Response {
    let token = CancellationToken::new();
    request.extensions_mut().insert(token);
    next.run(request).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr;

    let state = Arc::new(AppState::new(config).await?);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/behaviors", post(handlers::create_event))
        .route("/behaviors", get(handlers::list_events))
        .route("/behaviors/batch", post(handlers::create_batch))
        .route("/behaviors/top-domains", get(handlers::top_domains))
        .route("/behaviors/stats", get(handlers::user_stats))
        .route("/behaviors/user-events", get(handlers::user_events))
        .route(
            "/behaviors/sessions/:session_id",
            get(handlers::session_summary),
        )
        .route(
            "/behaviors/users/:user_id/sessions",
            get(handlers::user_sessions),
        )
        .route(
            "/behaviors/:id",
            get(handlers::get_event).delete(handlers::delete_event),
        )
        .route("/metrics/tracked-time", get(handlers::tracked_time))
        .route(
            "/metrics/tracked-time-total",
            get(handlers::tracked_time_total),
        )
        .route("/metrics/engaged-time", get(handlers::engaged_time))
        .route(
            "/metrics/deep-work-sessions",
            get(handlers::deep_work_sessions),
        )
        .layer(middleware::from_fn(cancellation_middleware))
        .layer(middleware::from_fn(content_type_validation_middleware))
        .layer(middleware::from_fn(request_size_validation_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("behavior analytics API listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

