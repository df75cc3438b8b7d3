use serde::{Deserialize, Serialize};

use super::deck::Dealer;
use super::types::{
    Card, CardId, CardKind, ConnectionStatus, EventKind, GameError, GameEvent, GameId, GamePhase,
    PlayerId,
};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;
pub const OPENING_HAND: usize = 7;
pub const PENALTY_CARDS: usize = 3;

const AVATAR_GLYPHS: [&str; MAX_PLAYERS] = ["🦊", "🐻", "🦉", "🐸", "🦝", "🐙"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    hand: Vec<Card>,
    avatar: String,
    connection_status: ConnectionStatus,
}

impl Player {
    fn new(name: String, hand: Vec<Card>, seat: usize) -> Self {
        Self {
            id: PlayerId::new(),
            name,
            hand,
            avatar: AVATAR_GLYPHS[seat % AVATAR_GLYPHS.len()].to_string(),
            connection_status: ConnectionStatus::Online,
        }
    }

    pub fn get_id(&self) -> PlayerId {
        self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_hand(&self) -> &[Card] {
        &self.hand
    }

    /// Hand size is always derived, never stored.
    pub fn hand_size(&self) -> usize {
        self.hand.len()
    }
}

/// The unresolved challenge shown to clients while the phase is
/// [`GamePhase::Revelation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAccusation {
    pub accusing_player_id: PlayerId,
    pub revealed_card: Card,
}

/// Authoritative per-game state. All mutation happens through the
/// registry, which holds this behind a per-session lock; every public
/// mutator either applies its transition fully or returns an error and
/// leaves the session untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    id: GameId,
    phase: GamePhase,
    players: Vec<Player>,
    current_player_id: PlayerId,
    center_pile: Vec<Card>,
    last_played_card: Option<Card>,
    last_player_id: Option<PlayerId>,
    pending_accusation: Option<PendingAccusation>,
    events: Vec<GameEvent>,
    turn_timer_seconds: u32,
}

impl GameSession {
    pub fn new(
        id: GameId,
        host_name: String,
        turn_timer_seconds: u32,
        dealer: &mut impl Dealer,
    ) -> Self {
        let mut deck = dealer.shuffled_deck();
        let hand: Vec<Card> = deck.drain(..OPENING_HAND).collect();
        let host = Player::new(host_name, hand, 0);
        let host_id = host.id;
        let event = GameEvent::new(
            EventKind::Join,
            host_id,
            &host.name,
            format!("{} opened the table", host.name),
        );

        Self {
            id,
            phase: GamePhase::Waiting,
            players: vec![host],
            current_player_id: host_id,
            center_pile: Vec::new(),
            last_played_card: None,
            last_player_id: None,
            pending_accusation: None,
            events: vec![event],
            turn_timer_seconds,
        }
    }

    // Getters
    pub fn get_id(&self) -> &GameId {
        &self.id
    }

    pub fn get_phase(&self) -> GamePhase {
        self.phase
    }

    pub fn get_players(&self) -> &[Player] {
        &self.players
    }

    pub fn get_player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn get_current_player_id(&self) -> PlayerId {
        self.current_player_id
    }

    pub fn get_current_player(&self) -> Option<&Player> {
        self.get_player(self.current_player_id)
    }

    pub fn get_center_pile(&self) -> &[Card] {
        &self.center_pile
    }

    pub fn get_last_played_card(&self) -> Option<&Card> {
        self.last_played_card.as_ref()
    }

    pub fn get_last_player_id(&self) -> Option<PlayerId> {
        self.last_player_id
    }

    pub fn get_pending_accusation(&self) -> Option<&PendingAccusation> {
        self.pending_accusation.as_ref()
    }

    pub fn get_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn get_turn_timer_seconds(&self) -> u32 {
        self.turn_timer_seconds
    }

    /// Cards currently held across all hands and the center pile.
    pub fn total_cards(&self) -> usize {
        self.players.iter().map(Player::hand_size).sum::<usize>() + self.center_pile.len()
    }

    //  --- Public mutators ---

    /// Each joiner is dealt from an independent fresh deck; cards are not
    /// tracked as a single depleting pile across the game.
    #[tracing::instrument(skip(self, name, dealer))]
    pub fn add_player(&mut self, name: String, dealer: &mut impl Dealer) -> Result<PlayerId, GameError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::GameFull);
        }

        let mut deck = dealer.shuffled_deck();
        let hand: Vec<Card> = deck.drain(..OPENING_HAND).collect();
        let player = Player::new(name, hand, self.players.len());
        let player_id = player.id;

        self.events.push(GameEvent::new(
            EventKind::Join,
            player_id,
            &player.name,
            format!("{} joined the table", player.name),
        ));
        self.players.push(player);
        self.maybe_start();

        Ok(player_id)
    }

    /// Lobby-start rule: the first time membership reaches the minimum
    /// while still waiting, play begins.
    pub(crate) fn maybe_start(&mut self) {
        if self.phase == GamePhase::Waiting && self.players.len() >= MIN_PLAYERS {
            self.phase = GamePhase::Playing;
            let host = &self.players[0];
            self.events.push(GameEvent::new(
                EventKind::GameStart,
                host.id,
                &host.name,
                "The game begins".to_string(),
            ));
        }
    }

    /// The leaver's hand is discarded, not redistributed. Dropping below
    /// the minimum ends the game.
    #[tracing::instrument(skip(self))]
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        let player = self.players.remove(idx);

        self.events.push(GameEvent::new(
            EventKind::Leave,
            player.id,
            &player.name,
            format!("{} left the table", player.name),
        ));

        // Turn passes to whoever now sits at the vacated position.
        if self.current_player_id == player_id && !self.players.is_empty() {
            let next = idx % self.players.len();
            self.current_player_id = self.players[next].id;
        }

        if self.players.len() < MIN_PLAYERS {
            self.phase = GamePhase::Finished;
            tracing::info!(game_id = %self.id, "Membership dropped below minimum, game over");
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn play_card(&mut self, player_id: PlayerId, card_id: CardId) -> Result<(), GameError> {
        if self.phase == GamePhase::Finished {
            return Err(GameError::GameFinished);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if self.current_player_id != player_id {
            return Err(GameError::NotYourTurn);
        }

        let player = &mut self.players[idx];
        let card_idx = player
            .hand
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(GameError::CardNotFound(card_id))?;
        let card = player.hand.remove(card_idx);
        let player_name = player.name.clone();

        self.center_pile.push(card.clone());
        self.last_played_card = Some(card);
        self.last_player_id = Some(player_id);

        if self.players[idx].hand.is_empty() {
            // Winner. The turn deliberately does not advance.
            self.phase = GamePhase::Finished;
            self.events.push(GameEvent::new(
                EventKind::CardPlayed,
                player_id,
                &player_name,
                format!("{player_name} played their final card and wins"),
            ));
        } else {
            self.advance_turn();
            self.events.push(GameEvent::new(
                EventKind::CardPlayed,
                player_id,
                &player_name,
                format!("{player_name} played a card face-down"),
            ));
        }

        Ok(())
    }

    /// Resolves a challenge against the most recent play: reveal the
    /// card, penalize the liar (or the false accuser) with a fresh
    /// penalty batch, and enter the revelation phase.
    #[tracing::instrument(skip(self, dealer))]
    pub fn accuse(
        &mut self,
        accusing_player_id: PlayerId,
        accused_player_id: PlayerId,
        dealer: &mut impl Dealer,
    ) -> Result<(), GameError> {
        if self.phase == GamePhase::Finished {
            return Err(GameError::GameFinished);
        }
        let (revealed_card, last_player_id) = match (&self.last_played_card, self.last_player_id) {
            (Some(card), Some(pid)) => (card.clone(), pid),
            _ => return Err(GameError::NoCardToAccuse),
        };

        let accuser_name = self
            .get_player(accusing_player_id)
            .map(|p| p.name.clone())
            .ok_or(GameError::PlayerNotFound(accusing_player_id))?;
        let accused_name = self
            .get_player(accused_player_id)
            .map(|p| p.name.clone())
            .ok_or(GameError::PlayerNotFound(accused_player_id))?;
        if accused_player_id != last_player_id {
            return Err(GameError::WrongAccusationTarget);
        }

        let was_lie = revealed_card.kind == CardKind::Lie;
        let (recipient_id, recipient_name) = if was_lie {
            (accused_player_id, accused_name.clone())
        } else {
            (accusing_player_id, accuser_name.clone())
        };

        self.events.push(
            GameEvent::new(
                EventKind::Accusation,
                accusing_player_id,
                &accuser_name,
                format!("{accuser_name} accuses {accused_name} of lying"),
            )
            .with_target(accused_player_id, &accused_name)
            .with_card(revealed_card.kind),
        );
        self.events.push(
            GameEvent::new(
                EventKind::Revelation,
                accused_player_id,
                &accused_name,
                format!("The card was a {}", revealed_card.kind),
            )
            .with_card(revealed_card.kind),
        );
        self.events.push(GameEvent::new(
            EventKind::Penalty,
            recipient_id,
            &recipient_name,
            format!("{recipient_name} draws {PENALTY_CARDS} penalty cards"),
        ));

        let penalty = dealer.penalty_cards(PENALTY_CARDS);
        if let Some(recipient) = self.players.iter_mut().find(|p| p.id == recipient_id) {
            recipient.hand.extend(penalty);
        }

        self.phase = GamePhase::Revelation;
        self.pending_accusation = Some(PendingAccusation {
            accusing_player_id,
            revealed_card,
        });

        Ok(())
    }

    /// Closes the revelation and resumes play. The resolved play is
    /// cleared, so it can never be accused a second time. The turn does
    /// not advance; it already moved when the card was played.
    #[tracing::instrument(skip(self))]
    pub fn continue_after_revelation(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::Revelation {
            return Err(GameError::NoRevelationPending);
        }
        self.phase = GamePhase::Playing;
        self.pending_accusation = None;
        self.last_played_card = None;
        self.last_player_id = None;
        Ok(())
    }

    //  --- Private helpers ---
    fn advance_turn(&mut self) {
        if let Some(idx) = self
            .players
            .iter()
            .position(|p| p.id == self.current_player_id)
        {
            let next = (idx + 1) % self.players.len();
            self.current_player_id = self.players[next].id;
        }
    }
}
