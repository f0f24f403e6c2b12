//! Gatehunt server: a session-authenticated scavenger hunt.
//!
//! Players register under one of four houses, solve puzzles strictly in
//! order within numbered groups, and wait out timed gates between groups.
//! Finishers are ranked by finish order and scored against the clock; an
//! admin dashboard manages the puzzle and gate catalog.

use axum::{
    Router,
    routing::{get, post},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod session;
pub mod state;
pub mod utils;
pub mod views;

use routes::{admin, auth, leaderboard, play};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let app = Router::new()
        .route("/", get(auth::landing))
        .route("/begin", get(auth::begin))
        .route("/return", get(auth::return_form).post(auth::return_submit))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route("/account", get(auth::account).post(auth::account_update))
        .route("/play", get(play::play))
        .route("/puzzle/{id}", get(play::puzzle))
        .route("/gate/{group_index}", get(play::gate))
        .route("/answer", post(play::answer))
        .route("/congratulations", get(play::congratulations))
        .route("/leaderboard", get(leaderboard::leaderboard))
        .route(
            "/admin/login",
            get(admin::login_form).post(admin::login_submit),
        )
        .route("/admin/logout", post(admin::logout))
        .route("/admin", get(admin::dashboard))
        .route("/admin/puzzles", post(admin::create_puzzle))
        .route("/admin/puzzles/{id}", post(admin::update_puzzle))
        .route("/admin/puzzles/{id}/delete", post(admin::delete_puzzle))
        .route("/admin/gates", post(admin::upsert_gate))
        .route("/admin/gates/{id}", post(admin::update_gate))
        .route("/admin/gates/{id}/delete", post(admin::delete_gate))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
