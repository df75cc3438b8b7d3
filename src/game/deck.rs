use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{Card, CardKind};

pub const DECK_SIZE: usize = 60;
pub const KIND_COUNT: usize = DECK_SIZE / 2;

/// Source of fresh cards. Injected into every dealing operation so tests
/// can force deterministic card kinds.
pub trait Dealer {
    /// A full deck of [`DECK_SIZE`] cards, half truths and half lies, in
    /// uniformly random order.
    fn shuffled_deck(&mut self) -> Vec<Card>;

    /// `n` fresh cards, each kind decided by a fair coin.
    fn penalty_cards(&mut self, n: usize) -> Vec<Card>;
}

pub struct ThreadRngDealer {
    rng: rand::rngs::ThreadRng,
}

impl ThreadRngDealer {
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for ThreadRngDealer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dealer for ThreadRngDealer {
    fn shuffled_deck(&mut self) -> Vec<Card> {
        let mut cards: Vec<Card> = (0..KIND_COUNT)
            .map(|_| Card::new(CardKind::Truth))
            .chain((0..KIND_COUNT).map(|_| Card::new(CardKind::Lie)))
            .collect();
        cards.shuffle(&mut self.rng);
        cards
    }

    fn penalty_cards(&mut self, n: usize) -> Vec<Card> {
        (0..n)
            .map(|_| {
                let kind = if self.rng.random_bool(0.5) {
                    CardKind::Truth
                } else {
                    CardKind::Lie
                };
                Card::new(kind)
            })
            .collect()
    }
}
