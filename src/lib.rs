pub mod config;
pub mod data;
pub mod error;
pub mod game;
pub mod handlers;
pub mod state;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use config::Config;
use handlers::{rest, ws};
use state::{AppState, ConnectionHub};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::data::{GameRegistry, InMemoryGameRegistry};

pub fn create_app(config: Config) -> Router {
    let registry: Arc<dyn GameRegistry> =
        Arc::new(InMemoryGameRegistry::new(config.game.turn_timer_seconds));
    let state = Arc::new(AppState {
        registry,
        hub: ConnectionHub::default(),
        config: Arc::new(config),
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/games", get(rest::list_games_handler))
        .route("/game", post(rest::create_game_handler))
        .route("/game/{id}", get(rest::get_game_handler))
        .route("/game/{id}/join", post(rest::join_game_handler))
        .route("/ws", get(ws::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)))
        .layer(cors)
}
