use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::{
    data::{
        CreateGameRequest, CreateGameResponse, GameRegistry, JoinGameRequest, JoinGameResponse,
        ServerMessage,
    },
    error::AppError,
    game::{GameId, GameSession},
    state::SharedState,
};

pub const MAX_NAME_LEN: usize = 20;

// ==============================================================================
// === REST API Handlers
// =============================================================================

fn validate_player_name(name: &str) -> Result<(), AppError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(AppError::Validation("player name must not be empty".to_string()));
    }
    if len > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "player name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn create_game_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CreateGameResponse>), AppError> {
    validate_player_name(&payload.host_name)?;

    let (session, host_player_id) = state.registry.create_game(payload.host_name).await;
    tracing::info!(game_id = %session.get_id(), host_id = %host_player_id, "Game created successfully");

    Ok((
        StatusCode::CREATED,
        Json(CreateGameResponse { session, host_player_id }),
    ))
}

#[instrument(skip(state))]
pub async fn get_game_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameSession>, AppError> {
    let session = state
        .registry
        .get(&game_id)
        .await
        .ok_or(AppError::GameNotFound(game_id))?;
    Ok(Json(session))
}

#[instrument(skip(state))]
pub async fn list_games_handler(State(state): State<SharedState>) -> Json<Vec<GameId>> {
    Json(state.registry.list().await)
}

#[instrument(skip(state, payload))]
pub async fn join_game_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, AppError> {
    validate_player_name(&payload.player_name)?;

    let (session, player_id) = state
        .registry
        .add_player(&game_id, payload.player_name)
        .await?;

    if let Some(player) = session.get_player(player_id) {
        state
            .hub
            .broadcast(
                &game_id,
                ServerMessage::PlayerJoined {
                    player: player.clone(),
                    session: session.clone(),
                },
            )
            .await;
    }

    tracing::info!(game_id = %game_id, player_id = %player_id, "Player joined successfully");
    Ok(Json(JoinGameResponse { session, player_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GameConfig, LoggingConfig, ServerConfig};
    use crate::data::InMemoryGameRegistry;
    use crate::game::{GameError, GamePhase, PlayerId, MAX_PLAYERS, OPENING_HAND};
    use crate::state::{AppState, ConnectionHub};
    use std::sync::Arc;

    fn setup_test_state() -> SharedState {
        let config = Config {
            server: ServerConfig { addr: "0.0.0.0:0".to_string() },
            logging: LoggingConfig { level: "debug".to_string() },
            game: GameConfig { turn_timer_seconds: 45 },
        };

        Arc::new(AppState {
            registry: Arc::new(InMemoryGameRegistry::new(config.game.turn_timer_seconds)),
            hub: ConnectionHub::default(),
            config: Arc::new(config),
        })
    }

    async fn create_game(state: &SharedState, host_name: &str) -> (GameId, PlayerId) {
        let (_, Json(created)) = create_game_handler(
            State(state.clone()),
            Json(CreateGameRequest { host_name: host_name.to_string() }),
        )
        .await
        .unwrap();
        (created.session.get_id().clone(), created.host_player_id)
    }

    #[tokio::test]
    async fn test_create_game_handler() {
        let state = setup_test_state();
        let result = create_game_handler(
            State(state.clone()),
            Json(CreateGameRequest { host_name: "Alice".to_string() }),
        )
        .await;

        assert!(result.is_ok());
        let (status, Json(response)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.session.get_phase(), GamePhase::Waiting);
        assert_eq!(
            response
                .session
                .get_player(response.host_player_id)
                .unwrap()
                .hand_size(),
            OPENING_HAND
        );

        // Verify in registry
        let stored = state.registry.get(response.session.get_id()).await;
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_create_game_rejects_bad_names() {
        let state = setup_test_state();

        let result = create_game_handler(
            State(state.clone()),
            Json(CreateGameRequest { host_name: String::new() }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = create_game_handler(
            State(state.clone()),
            Json(CreateGameRequest { host_name: "x".repeat(MAX_NAME_LEN + 1) }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_game_handler() {
        let state = setup_test_state();
        let (game_id, _host_id) = create_game(&state, "Alice").await;

        let Json(session) = get_game_handler(State(state.clone()), Path(game_id.clone()))
            .await
            .unwrap();
        assert_eq!(session.get_id(), &game_id);

        let missing = get_game_handler(State(state.clone()), Path(GameId::generate())).await;
        assert!(matches!(missing, Err(AppError::GameNotFound(_))));
    }

    #[tokio::test]
    async fn test_join_game_success() {
        let state = setup_test_state();
        let (game_id, host_id) = create_game(&state, "Alice").await;

        let result = join_game_handler(
            State(state.clone()),
            Path(game_id),
            Json(JoinGameRequest { player_name: "Bob".to_string() }),
        )
        .await;

        assert!(result.is_ok());
        let Json(response) = result.unwrap();
        assert_eq!(response.session.get_players().len(), 2);
        assert_eq!(response.session.get_phase(), GamePhase::Playing);
        assert_eq!(response.session.get_current_player_id(), host_id);
    }

    #[tokio::test]
    async fn test_join_full_game_fails() {
        let state = setup_test_state();
        let (game_id, _host_id) = create_game(&state, "Alice").await;

        for i in 1..MAX_PLAYERS {
            join_game_handler(
                State(state.clone()),
                Path(game_id.clone()),
                Json(JoinGameRequest { player_name: format!("Player{i}") }),
            )
            .await
            .unwrap();
        }

        let result = join_game_handler(
            State(state.clone()),
            Path(game_id),
            Json(JoinGameRequest { player_name: "Latecomer".to_string() }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Game(GameError::GameFull))));
    }

    #[tokio::test]
    async fn test_join_broadcasts_to_announced_connections() {
        let state = setup_test_state();
        let (game_id, host_id) = create_game(&state, "Alice").await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let conn = state.hub.register(tx).await;
        state.hub.announce(conn, game_id.clone(), host_id).await;

        join_game_handler(
            State(state.clone()),
            Path(game_id),
            Json(JoinGameRequest { player_name: "Bob".to_string() }),
        )
        .await
        .unwrap();

        match rx.try_recv().expect("host connection missed the broadcast") {
            ServerMessage::PlayerJoined { player, session } => {
                assert_eq!(player.get_name(), "Bob");
                assert_eq!(session.get_players().len(), 2);
            }
            other => panic!("Expected PlayerJoined broadcast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_join_does_not_broadcast() {
        let state = setup_test_state();
        let (game_id, host_id) = create_game(&state, "Alice").await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let conn = state.hub.register(tx).await;
        state.hub.announce(conn, game_id.clone(), host_id).await;

        let result = join_game_handler(
            State(state.clone()),
            Path(game_id),
            Json(JoinGameRequest { player_name: String::new() }),
        )
        .await;
        assert!(result.is_err());
        assert!(rx.try_recv().is_err());
    }
}
