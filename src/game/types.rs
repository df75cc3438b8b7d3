use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)] // Serialize directly as the inner UUID string
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short join code identifying a session. Six uppercase alphanumerics,
/// generated by the registry (which retries on collision).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub const LEN: usize = 6;
    const CHARSET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code: String = (0..Self::LEN)
            .map(|_| Self::CHARSET[rng.random_range(0..Self::CHARSET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardKind {
    Truth,
    Lie,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Truth => "TRUTH",
            Self::Lie => "LIE",
        };
        write!(f, "{repr}")
    }
}

/// A face-down card. Owned by exactly one of: a deck, a hand, or the
/// center pile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
}

impl Card {
    pub fn new(kind: CardKind) -> Self {
        Self { id: CardId::new(), kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Waiting,
    Playing,
    Revelation,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("the table is full")]
    GameFull,

    #[error("player {0} is not at this table")]
    PlayerNotFound(PlayerId),

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("card {0} is not in your hand")]
    CardNotFound(CardId),

    #[error("there is no card to accuse")]
    NoCardToAccuse,

    #[error("only the most recent play can be accused")]
    WrongAccusationTarget,

    #[error("there is no revelation to resolve")]
    NoRevelationPending,

    #[error("the game is already finished")]
    GameFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    CardPlayed,
    Accusation,
    Revelation,
    Penalty,
    Join,
    Leave,
    GameStart,
}

/// Append-only narration record. Events are never read back to drive
/// game logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub actor_id: PlayerId,
    pub actor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_kind: Option<CardKind>,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl GameEvent {
    pub fn new(kind: EventKind, actor_id: PlayerId, actor_name: &str, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            actor_id,
            actor_name: actor_name.to_string(),
            target_id: None,
            target_name: None,
            card_kind: None,
            timestamp: Utc::now(),
            message,
        }
    }

    pub fn with_target(mut self, target_id: PlayerId, target_name: &str) -> Self {
        self.target_id = Some(target_id);
        self.target_name = Some(target_name.to_string());
        self
    }

    pub fn with_card(mut self, kind: CardKind) -> Self {
        self.card_kind = Some(kind);
        self
    }
}
