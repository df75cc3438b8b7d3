pub mod deck;
pub mod session;
pub mod types;


pub use session::{GameSession, Player, MAX_PLAYERS, MIN_PLAYERS, OPENING_HAND, PENALTY_CARDS};
pub use types::{Card, CardId, CardKind, GameError, GameId, GamePhase, PlayerId};
