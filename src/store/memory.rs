//! In-memory study store
//!
//! Hash maps behind a mutex, mirroring the SQLite backend's behavior
//! including cascading deletes. Used by tests and by embedders that do not
//! want a database file.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::{Result, StoreError, StudyStore};
use crate::models::{Card, CardWithState, Deck, MasteryState};

#[derive(Default)]
struct Tables {
    decks: HashMap<Uuid, Deck>,
    cards: HashMap<Uuid, Card>,
    /// Keyed by (card_id, user_id)
    state: HashMap<(Uuid, Uuid), MasteryState>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StudyStore for MemoryStore {
    fn owns_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<bool> {
        let tables = self.tables();
        Ok(tables
            .decks
            .get(&deck_id)
            .map_or(false, |d| d.user_id == user_id))
    }

    fn owns_card(&self, card_id: Uuid, user_id: Uuid) -> Result<bool> {
        let tables = self.tables();
        let Some(card) = tables.cards.get(&card_id) else {
            return Ok(false);
        };
        Ok(tables
            .decks
            .get(&card.deck_id)
            .map_or(false, |d| d.user_id == user_id))
    }

    fn list_cards_with_state(&self, deck_id: Uuid, user_id: Uuid) -> Result<Vec<CardWithState>> {
        let tables = self.tables();
        let mut cards: Vec<&Card> = tables
            .cards
            .values()
            .filter(|c| c.deck_id == deck_id)
            .collect();
        cards.sort_by_key(|c| c.created_at);

        Ok(cards
            .into_iter()
            .map(|card| {
                let state = tables.state.get(&(card.id, user_id));
                CardWithState {
                    id: card.id,
                    front: card.front.clone(),
                    back: card.back.clone(),
                    box_level: state.map_or(1, |s| s.box_level),
                    next_review: state.and_then(|s| s.next_review),
                }
            })
            .collect())
    }

    fn get_state(&self, card_id: Uuid, user_id: Uuid) -> Result<Option<MasteryState>> {
        let tables = self.tables();
        Ok(tables.state.get(&(card_id, user_id)).cloned())
    }

    fn upsert_state(&self, state: &MasteryState) -> Result<()> {
        let mut tables = self.tables();
        tables
            .state
            .insert((state.card_id, state.user_id), state.clone());
        Ok(())
    }

    fn create_deck(&self, deck: &Deck) -> Result<()> {
        let mut tables = self.tables();
        tables.decks.insert(deck.id, deck.clone());
        Ok(())
    }

    fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>> {
        let tables = self.tables();
        let mut decks: Vec<Deck> = tables
            .decks
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        decks.sort_by_key(|d| d.created_at);
        Ok(decks)
    }

    fn delete_deck(&self, deck_id: Uuid) -> Result<()> {
        let mut tables = self.tables();
        if tables.decks.remove(&deck_id).is_none() {
            return Err(StoreError::DeckNotFound(deck_id));
        }

        let removed: Vec<Uuid> = tables
            .cards
            .values()
            .filter(|c| c.deck_id == deck_id)
            .map(|c| c.id)
            .collect();
        for card_id in &removed {
            tables.cards.remove(card_id);
        }
        tables.state.retain(|(card_id, _), _| !removed.contains(card_id));
        Ok(())
    }

    fn create_card(&self, card: &Card) -> Result<()> {
        let mut tables = self.tables();
        if !tables.decks.contains_key(&card.deck_id) {
            return Err(StoreError::DeckNotFound(card.deck_id));
        }
        tables.cards.insert(card.id, card.clone());
        Ok(())
    }

    fn get_card(&self, card_id: Uuid) -> Result<Option<Card>> {
        let tables = self.tables();
        Ok(tables.cards.get(&card_id).cloned())
    }

    fn list_cards(&self, deck_id: Uuid) -> Result<Vec<Card>> {
        let tables = self.tables();
        let mut cards: Vec<Card> = tables
            .cards
            .values()
            .filter(|c| c.deck_id == deck_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.created_at);
        Ok(cards)
    }

    fn delete_card(&self, card_id: Uuid) -> Result<()> {
        let mut tables = self.tables();
        if tables.cards.remove(&card_id).is_none() {
            return Err(StoreError::CardNotFound(card_id));
        }
        tables.state.retain(|(id, _), _| *id != card_id);
        Ok(())
    }
}
