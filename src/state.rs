use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::config::Config;
use crate::data::{GameRegistry, ServerMessage};
use crate::game::{GameId, PlayerId};

pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a connection announced itself as.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub game_id: GameId,
    pub player_id: PlayerId,
}

struct ConnectionEntry {
    sender: PlayerSender,
    subscription: Option<Subscription>,
}

#[derive(Default)]
struct HubIndex {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<GameId, HashSet<ConnectionId>>,
}

/// Tracks live connections and which game each one announced itself
/// into. Both directions of the index live under one lock so connect,
/// announce and disconnect update them together.
#[derive(Default)]
pub struct ConnectionHub {
    inner: RwLock<HubIndex>,
}

impl ConnectionHub {
    pub async fn register(&self, sender: PlayerSender) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.inner.write().await.connections.insert(
            connection_id,
            ConnectionEntry { sender, subscription: None },
        );
        connection_id
    }

    pub async fn announce(&self, connection_id: ConnectionId, game_id: GameId, player_id: PlayerId) {
        let mut inner = self.inner.write().await;
        let HubIndex { connections, rooms } = &mut *inner;
        let Some(entry) = connections.get_mut(&connection_id) else {
            return;
        };

        // Re-announcing moves the connection out of its previous room.
        if let Some(prev) = entry.subscription.take() {
            if let Some(room) = rooms.get_mut(&prev.game_id) {
                room.remove(&connection_id);
                if room.is_empty() {
                    rooms.remove(&prev.game_id);
                }
            }
        }

        entry.subscription = Some(Subscription {
            game_id: game_id.clone(),
            player_id,
        });
        rooms.entry(game_id).or_default().insert(connection_id);
    }

    pub async fn subscription(&self, connection_id: ConnectionId) -> Option<Subscription> {
        self.inner
            .read()
            .await
            .connections
            .get(&connection_id)
            .and_then(|entry| entry.subscription.clone())
    }

    /// Drops the connection from both sides of the index and hands back
    /// whatever it was announced as, if anything.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<Subscription> {
        let mut inner = self.inner.write().await;
        let entry = inner.connections.remove(&connection_id)?;
        if let Some(sub) = &entry.subscription {
            if let Some(room) = inner.rooms.get_mut(&sub.game_id) {
                room.remove(&connection_id);
                if room.is_empty() {
                    inner.rooms.remove(&sub.game_id);
                }
            }
        }
        entry.subscription
    }

    /// Best-effort fan-out to every connection announced into the game.
    /// No retry, no ordering guarantee across connections.
    pub async fn broadcast(&self, game_id: &GameId, message: ServerMessage) {
        let inner = self.inner.read().await;
        let Some(room) = inner.rooms.get(game_id) else {
            return;
        };
        for connection_id in room {
            if let Some(entry) = inner.connections.get(connection_id) {
                let _ = entry.sender.send(message.clone());
                tracing::debug!(game_id = %game_id, connection_id = %connection_id, "Broadcasted message");
            }
        }
    }

    pub async fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) {
        if let Some(entry) = self.inner.read().await.connections.get(&connection_id) {
            let _ = entry.sender.send(message);
        }
    }
}

pub struct AppState {
    pub registry: Arc<dyn GameRegistry>,
    pub hub: ConnectionHub,
    pub config: Arc<Config>,
}

pub type SharedState = Arc<AppState>;
