use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use meeple_api::auth::{self, AppState, AppStateInner};
use meeple_api::middleware::require_auth;
use meeple_api::{listings, profiles, stars};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeple=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("MEEPLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("MEEPLE_DB_PATH").unwrap_or_else(|_| "meeple.db".into());
    let host = std::env::var("MEEPLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MEEPLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = meeple_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/listings", get(listings::list_listings))
        .route("/listings", post(listings::create_listing))
        .route("/listings/{listing_id}", get(listings::get_listing))
        .route("/listings/{listing_id}", delete(listings::delete_listing))
        .route(
            "/listings/{listing_id}/star",
            put(stars::star)
                .delete(stars::unstar)
                .get(stars::star_state),
        )
        .route("/users/me", put(profiles::update_me))
        .route("/users/me/recompute-vps", post(profiles::recompute_vps))
        .route("/users/{user_id}", get(profiles::get_profile))
        .route("/users/{user_id}/listings", get(listings::user_listings))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Meeple server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
