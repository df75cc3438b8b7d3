use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::instrument;

use crate::{
    data::{ClientMessage, GameRegistry, ServerMessage},
    game::{CardId, GameId, PlayerId},
    state::{ConnectionId, SharedState},
};

// ==============================================================================
// === Websocket Handlers
// =============================================================================

#[instrument(skip(ws, state))]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Orchestrates the WebSocket lifecycle: Connect -> Announce -> Loop -> Disconnect
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (sender_tx, mut sender_rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();
    let connection_id = state.hub.register(sender_tx).await;
    tracing::info!(connection_id = %connection_id, "WebSocket connected.");

    // Split Socket
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Spawn Write Task (Server -> Client)
    let send_task = tokio::spawn(async move {
        while let Some(msg) = sender_rx.recv().await {
            let json_str = serde_json::to_string(&msg).unwrap_or_default();
            if ws_sender.send(Message::Text(json_str.into())).await.is_err() {
                break;
            }
        }
    });

    // Read Loop (Client -> Server)
    while let Some(Ok(msg)) = ws_receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => process_client_message(client_msg, connection_id, &state).await,
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Malformed client message");
                    send_error(&state, connection_id, "malformed message").await;
                }
            }
        }
    }

    // Cleanup on Disconnect
    handle_disconnect(connection_id, &state).await;
    send_task.abort();
}

/// Route incoming messages to logic
async fn process_client_message(msg: ClientMessage, connection_id: ConnectionId, state: &SharedState) {
    tracing::debug!(connection_id = %connection_id, "Received message: {:?}", msg);
    match msg {
        ClientMessage::JoinGame { game_id, player_id } => {
            handle_join_announce(connection_id, game_id, player_id, state).await
        }
        ClientMessage::PlayCard { card_id } => {
            handle_play_card(connection_id, card_id, state).await
        }
        ClientMessage::Accuse { accused_player_id } => {
            handle_accuse(connection_id, accused_player_id, state).await
        }
        ClientMessage::ContinueGame => handle_continue(connection_id, state).await,
    }
}

/// Associate the connection with a game it will receive broadcasts for.
/// Only members of the game may announce into it.
async fn handle_join_announce(
    connection_id: ConnectionId,
    game_id: GameId,
    player_id: PlayerId,
    state: &SharedState,
) {
    let Some(session) = state.registry.get(&game_id).await else {
        tracing::warn!(game_id = %game_id, player_id = %player_id, "Announce rejected: game not found.");
        send_error(state, connection_id, "game not found").await;
        return;
    };
    if session.get_player(player_id).is_none() {
        tracing::warn!(game_id = %game_id, player_id = %player_id, "Announce rejected: player not in game.");
        send_error(state, connection_id, "player is not in this game").await;
        return;
    }

    state.hub.announce(connection_id, game_id, player_id).await;
    state
        .hub
        .send_to(connection_id, ServerMessage::GameState { session })
        .await;
}

/// Execute the PLAY_CARD command logic
async fn handle_play_card(connection_id: ConnectionId, card_id: CardId, state: &SharedState) {
    let Some(sub) = state.hub.subscription(connection_id).await else {
        send_error(state, connection_id, "join a game first").await;
        return;
    };

    match state.registry.play_card(&sub.game_id, sub.player_id, card_id).await {
        Ok(session) => {
            state
                .hub
                .broadcast(&sub.game_id, ServerMessage::CardPlayed { session })
                .await;
        }
        Err(e) => send_error(state, connection_id, &e.to_string()).await,
    }
}

/// Execute the ACCUSE command logic
async fn handle_accuse(connection_id: ConnectionId, accused_player_id: PlayerId, state: &SharedState) {
    let Some(sub) = state.hub.subscription(connection_id).await else {
        send_error(state, connection_id, "join a game first").await;
        return;
    };

    match state
        .registry
        .accuse(&sub.game_id, sub.player_id, accused_player_id)
        .await
    {
        Ok(session) => {
            // Recipients show the reveal dialog off this one.
            state
                .hub
                .broadcast(&sub.game_id, ServerMessage::Accusation { session })
                .await;
        }
        Err(e) => send_error(state, connection_id, &e.to_string()).await,
    }
}

/// Execute the CONTINUE command logic
async fn handle_continue(connection_id: ConnectionId, state: &SharedState) {
    let Some(sub) = state.hub.subscription(connection_id).await else {
        send_error(state, connection_id, "join a game first").await;
        return;
    };

    match state.registry.continue_after_revelation(&sub.game_id).await {
        Ok(session) => {
            state
                .hub
                .broadcast(&sub.game_id, ServerMessage::GameState { session })
                .await;
        }
        Err(e) => send_error(state, connection_id, &e.to_string()).await,
    }
}

/// Cleanup when socket closes. An announced connection takes its player
/// out of the game and tells everyone left behind.
async fn handle_disconnect(connection_id: ConnectionId, state: &SharedState) {
    tracing::info!(connection_id = %connection_id, "WebSocket disconnected.");

    let Some(sub) = state.hub.disconnect(connection_id).await else {
        return;
    };

    if let Err(e) = state.registry.remove_player(&sub.game_id, sub.player_id).await {
        tracing::warn!(game_id = %sub.game_id, player_id = %sub.player_id, error = %e, "Failed to remove player on disconnect");
    }

    state
        .hub
        .broadcast(
            &sub.game_id,
            ServerMessage::PlayerLeft { player_id: sub.player_id },
        )
        .await;
}

/// Send an error message to a specific connection
async fn send_error(state: &SharedState, connection_id: ConnectionId, msg: &str) {
    state
        .hub
        .send_to(connection_id, ServerMessage::Error { message: msg.into() })
        .await;
}

#[cfg(test)]
mod ws_logic_tests {
    use std::sync::Arc;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::config::{Config, GameConfig, LoggingConfig, ServerConfig};
    use crate::data::InMemoryGameRegistry;
    use crate::game::{GamePhase, GameSession};
    use crate::state::{AppState, ConnectionHub};

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

    async fn connect(state: &SharedState) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = state.hub.register(tx).await;
        (connection_id, rx)
    }

    async fn connect_announced(
        state: &SharedState,
        game_id: &GameId,
        player_id: PlayerId,
    ) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let (connection_id, mut rx) = connect(state).await;
        handle_join_announce(connection_id, game_id.clone(), player_id, state).await;
        // Swallow the initial snapshot.
        match rx.try_recv().expect("expected initial game state") {
            ServerMessage::GameState { .. } => {}
            other => panic!("Expected GameState after announce, got {:?}", other),
        }
        (connection_id, rx)
    }

    async fn setup_game(state: &SharedState) -> (GameSession, PlayerId, PlayerId) {
        let (session, host_id) = state.registry.create_game("Alice".to_string()).await;
        let (session, guest_id) = state
            .registry
            .add_player(session.get_id(), "Bob".to_string())
            .await
            .unwrap();
        (session, host_id, guest_id)
    }

    #[tokio::test]
    async fn test_announce_for_unknown_game_is_rejected() {
        let state = setup_test_state();
        let (connection_id, mut rx) = connect(&state).await;

        handle_join_announce(connection_id, GameId::generate(), PlayerId::new(), &state).await;

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Error { .. })));
        assert!(state.hub.subscription(connection_id).await.is_none());
    }

    #[tokio::test]
    async fn test_announce_for_non_member_is_rejected() {
        let state = setup_test_state();
        let (session, _host_id, _guest_id) = setup_game(&state).await;
        let (connection_id, mut rx) = connect(&state).await;

        handle_join_announce(
            connection_id,
            session.get_id().clone(),
            PlayerId::new(),
            &state,
        )
        .await;

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Error { .. })));
        assert!(state.hub.subscription(connection_id).await.is_none());
    }

    #[tokio::test]
    async fn test_announce_subscribes_and_sends_snapshot() {
        let state = setup_test_state();
        let (session, host_id, _guest_id) = setup_game(&state).await;
        let (connection_id, _rx) =
            connect_announced(&state, session.get_id(), host_id).await;

        let sub = state.hub.subscription(connection_id).await.unwrap();
        assert_eq!(&sub.game_id, session.get_id());
        assert_eq!(sub.player_id, host_id);
    }

    #[tokio::test]
    async fn test_command_without_announce_is_rejected() {
        let state = setup_test_state();
        let (connection_id, mut rx) = connect(&state).await;

        handle_play_card(connection_id, CardId::new(), &state).await;

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Error { .. })));
    }

    #[tokio::test]
    async fn test_play_card_broadcasts_to_all_connections() {
        let state = setup_test_state();
        let (session, host_id, guest_id) = setup_game(&state).await;
        let game_id = session.get_id().clone();

        let (host_conn, mut host_rx) = connect_announced(&state, &game_id, host_id).await;
        let (_guest_conn, mut guest_rx) = connect_announced(&state, &game_id, guest_id).await;

        let card_id = session.get_player(host_id).unwrap().get_hand()[0].id;
        handle_play_card(host_conn, card_id, &state).await;

        for rx in [&mut host_rx, &mut guest_rx] {
            match rx.try_recv().expect("missed card_played broadcast") {
                ServerMessage::CardPlayed { session } => {
                    assert_eq!(session.get_center_pile().len(), 1);
                    assert_eq!(session.get_current_player_id(), guest_id);
                }
                other => panic!("Expected CardPlayed, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_rejected_command_errors_sender_only() {
        let state = setup_test_state();
        let (session, host_id, guest_id) = setup_game(&state).await;
        let game_id = session.get_id().clone();

        let (_host_conn, mut host_rx) = connect_announced(&state, &game_id, host_id).await;
        let (guest_conn, mut guest_rx) = connect_announced(&state, &game_id, guest_id).await;

        // Not Bob's turn.
        let card_id = session.get_player(guest_id).unwrap().get_hand()[0].id;
        handle_play_card(guest_conn, card_id, &state).await;

        assert!(matches!(guest_rx.try_recv(), Ok(ServerMessage::Error { .. })));
        assert!(host_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_accusation_round_trip() {
        let state = setup_test_state();
        let (session, host_id, guest_id) = setup_game(&state).await;
        let game_id = session.get_id().clone();

        let (host_conn, mut host_rx) = connect_announced(&state, &game_id, host_id).await;
        let (guest_conn, mut guest_rx) = connect_announced(&state, &game_id, guest_id).await;

        let card_id = session.get_player(host_id).unwrap().get_hand()[0].id;
        handle_play_card(host_conn, card_id, &state).await;
        let _ = host_rx.try_recv();
        let _ = guest_rx.try_recv();

        handle_accuse(guest_conn, host_id, &state).await;
        match guest_rx.try_recv().expect("missed accusation broadcast") {
            ServerMessage::Accusation { session } => {
                assert_eq!(session.get_phase(), GamePhase::Revelation);
                assert!(session.get_pending_accusation().is_some());
            }
            other => panic!("Expected Accusation, got {:?}", other),
        }
        assert!(matches!(host_rx.try_recv(), Ok(ServerMessage::Accusation { .. })));

        handle_continue(guest_conn, &state).await;
        match guest_rx.try_recv().expect("missed game state broadcast") {
            ServerMessage::GameState { session } => {
                assert_eq!(session.get_phase(), GamePhase::Playing);
                assert!(session.get_last_played_card().is_none());
            }
            other => panic!("Expected GameState, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_removes_player_and_notifies_rest() {
        let state = setup_test_state();
        let (session, host_id, guest_id) = setup_game(&state).await;
        let game_id = session.get_id().clone();

        let (_host_conn, mut host_rx) = connect_announced(&state, &game_id, host_id).await;
        let (guest_conn, _guest_rx) = connect_announced(&state, &game_id, guest_id).await;

        handle_disconnect(guest_conn, &state).await;

        match host_rx.try_recv().expect("missed player_left broadcast") {
            ServerMessage::PlayerLeft { player_id } => assert_eq!(player_id, guest_id),
            other => panic!("Expected PlayerLeft, got {:?}", other),
        }

        let session = state.registry.get(&game_id).await.unwrap();
        assert_eq!(session.get_players().len(), 1);
        assert_eq!(session.get_phase(), GamePhase::Finished);
    }

    #[tokio::test]
    async fn test_disconnect_of_unannounced_connection_changes_nothing() {
        let state = setup_test_state();
        let (session, host_id, _guest_id) = setup_game(&state).await;
        let game_id = session.get_id().clone();
        let (_host_conn, mut host_rx) = connect_announced(&state, &game_id, host_id).await;

        let (connection_id, _rx) = connect(&state).await;
        handle_disconnect(connection_id, &state).await;

        assert!(host_rx.try_recv().is_err());
        assert_eq!(state.registry.get(&game_id).await.unwrap().get_players().len(), 2);
    }
}
