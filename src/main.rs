// src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use order_voice_backend::{
    config::{AppState, Settings},
    routes::build_router,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env().expect("failed to load configuration");
    let app_state = AppState::new(&settings).expect("failed to build application state");
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("🚀 Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .expect("server error");
}
