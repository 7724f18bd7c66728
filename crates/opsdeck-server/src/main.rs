use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use opsdeck_api::auth::{self, AppState, AppStateInner};
use opsdeck_api::incidents;
use opsdeck_api::middleware::require_auth;
use opsdeck_auth::CredentialStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsdeck=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("OPSDECK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("OPSDECK_DB_PATH").unwrap_or_else(|_| "opsdeck.db".into());
    let host = std::env::var("OPSDECK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("OPSDECK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and credential store
    let db = Arc::new(opsdeck_db::Database::open(&PathBuf::from(&db_path))?);
    let credentials = CredentialStore::new(db.clone())?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        credentials,
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/incidents/cyber", get(incidents::list_cyber))
        .route("/incidents/cyber", post(incidents::create_cyber))
        .route("/incidents/cyber/summary", get(incidents::cyber_summary))
        .route("/incidents/it", get(incidents::list_it))
        .route("/incidents/it", post(incidents::create_it))
        .route("/incidents/it/summary", get(incidents::it_summary))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Opsdeck server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
