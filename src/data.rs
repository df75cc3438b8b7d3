use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use crate::error::AppError;
use crate::game::deck::ThreadRngDealer;
use crate::game::{CardId, GameId, GameSession, Player, PlayerId};

// --- DTOs (Data Transfer Objects) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub host_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameResponse {
    pub session: GameSession,
    pub host_player_id: PlayerId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinGameRequest {
    pub player_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinGameResponse {
    pub session: GameSession,
    pub player_id: PlayerId,
}

// --- WebSocket wire messages ---

/// Commands a connection may send over its socket. Everything except
/// `join_game` requires the connection to have announced itself first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame { game_id: GameId, player_id: PlayerId },
    PlayCard { card_id: CardId },
    Accuse { accused_player_id: PlayerId },
    ContinueGame,
}

/// Everything the server pushes. A closed union so every payload shape
/// is checked at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    PlayerJoined { player: Player, session: GameSession },
    CardPlayed { session: GameSession },
    Accusation { session: GameSession },
    PlayerLeft { player_id: PlayerId },
    GameState { session: GameSession },
    Error { message: String },
}

// --- Game registry ---

/// Sole owner of session state. Each session sits behind its own lock,
/// so commands against one game serialize while unrelated games proceed
/// independently. Every method returns a snapshot taken under the lock.
#[async_trait]
pub trait GameRegistry: Send + Sync {
    async fn create_game(&self, host_name: String) -> (GameSession, PlayerId);
    /// Absence, not an error; callers decide what a missing game means.
    async fn get(&self, id: &GameId) -> Option<GameSession>;
    async fn list(&self) -> Vec<GameId>;
    async fn add_player(&self, id: &GameId, name: String) -> Result<(GameSession, PlayerId), AppError>;
    async fn remove_player(&self, id: &GameId, player_id: PlayerId) -> Result<GameSession, AppError>;
    async fn play_card(
        &self,
        id: &GameId,
        player_id: PlayerId,
        card_id: CardId,
    ) -> Result<GameSession, AppError>;
    async fn accuse(
        &self,
        id: &GameId,
        accusing_player_id: PlayerId,
        accused_player_id: PlayerId,
    ) -> Result<GameSession, AppError>;
    async fn continue_after_revelation(&self, id: &GameId) -> Result<GameSession, AppError>;
}

pub struct InMemoryGameRegistry {
    sessions: RwLock<HashMap<GameId, Arc<Mutex<GameSession>>>>,
    turn_timer_seconds: u32,
}

impl InMemoryGameRegistry {
    pub fn new(turn_timer_seconds: u32) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            turn_timer_seconds,
        }
    }

    async fn session(&self, id: &GameId) -> Result<Arc<Mutex<GameSession>>, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::GameNotFound(id.clone()))
    }
}

#[async_trait]
impl GameRegistry for InMemoryGameRegistry {
    #[instrument(skip(self, host_name))]
    async fn create_game(&self, host_name: String) -> (GameSession, PlayerId) {
        let mut sessions = self.sessions.write().await;
        let mut dealer = ThreadRngDealer::new();

        // Codes are short; retry until one is free.
        let id = loop {
            let candidate = GameId::generate();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = GameSession::new(id.clone(), host_name, self.turn_timer_seconds, &mut dealer);
        let host_id = session.get_current_player_id();
        sessions.insert(id, Arc::new(Mutex::new(session.clone())));
        (session, host_id)
    }

    async fn get(&self, id: &GameId) -> Option<GameSession> {
        let handle = self.sessions.read().await.get(id).cloned()?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    async fn list(&self) -> Vec<GameId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    #[instrument(skip(self, name))]
    async fn add_player(&self, id: &GameId, name: String) -> Result<(GameSession, PlayerId), AppError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        let mut dealer = ThreadRngDealer::new();
        let player_id = session.add_player(name, &mut dealer)?;
        Ok((session.clone(), player_id))
    }

    #[instrument(skip(self))]
    async fn remove_player(&self, id: &GameId, player_id: PlayerId) -> Result<GameSession, AppError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        session.remove_player(player_id)?;
        Ok(session.clone())
    }

    #[instrument(skip(self))]
    async fn play_card(
        &self,
        id: &GameId,
        player_id: PlayerId,
        card_id: CardId,
    ) -> Result<GameSession, AppError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        session.play_card(player_id, card_id)?;
        Ok(session.clone())
    }

    #[instrument(skip(self))]
    async fn accuse(
        &self,
        id: &GameId,
        accusing_player_id: PlayerId,
        accused_player_id: PlayerId,
    ) -> Result<GameSession, AppError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        let mut dealer = ThreadRngDealer::new();
        session.accuse(accusing_player_id, accused_player_id, &mut dealer)?;
        Ok(session.clone())
    }

    #[instrument(skip(self))]
    async fn continue_after_revelation(&self, id: &GameId) -> Result<GameSession, AppError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        session.continue_after_revelation()?;
        Ok(session.clone())
    }
}
