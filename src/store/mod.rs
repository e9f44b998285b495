//! Storage layer for decks, cards, and mastery state
//!
//! `StudyStore` is the data-access contract the scheduling service works
//! against. `SqliteStore` is the production backend; `MemoryStore` is a
//! lightweight stand-in for tests and embedding.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Card, CardWithState, Deck, MasteryState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("deck not found: {0}")]
    DeckNotFound(Uuid),

    #[error("card not found: {0}")]
    CardNotFound(Uuid),

    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Data access for the scheduling service
pub trait StudyStore: Send + Sync {
    /// Whether `deck_id` exists and belongs to `user_id`
    fn owns_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Whether `card_id` exists and its deck belongs to `user_id`
    fn owns_card(&self, card_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// All cards of a deck joined with `user_id`'s mastery state
    ///
    /// Cards without a state row come back with box level 1 and no
    /// `next_review`.
    fn list_cards_with_state(&self, deck_id: Uuid, user_id: Uuid) -> Result<Vec<CardWithState>>;

    /// Mastery state for one (card, user) pair, if it was ever reviewed
    fn get_state(&self, card_id: Uuid, user_id: Uuid) -> Result<Option<MasteryState>>;

    /// Insert or update the single state row keyed by `(card_id, user_id)`
    fn upsert_state(&self, state: &MasteryState) -> Result<()>;

    fn create_deck(&self, deck: &Deck) -> Result<()>;

    fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>>;

    /// Delete a deck, its cards, and all mastery state for those cards
    fn delete_deck(&self, deck_id: Uuid) -> Result<()>;

    fn create_card(&self, card: &Card) -> Result<()>;

    fn get_card(&self, card_id: Uuid) -> Result<Option<Card>>;

    fn list_cards(&self, deck_id: Uuid) -> Result<Vec<Card>>;

    /// Delete a card and its mastery state
    fn delete_card(&self, card_id: Uuid) -> Result<()>;
}
