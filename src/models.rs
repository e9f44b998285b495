//! Data models for decks, cards, and per-user mastery state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deck is a collection of flashcards belonging to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(user_id: Uuid, title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            created_at: Utc::now(),
        }
    }
}

/// A flashcard with question (front) and answer (back)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(deck_id: Uuid, front: String, back: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            deck_id,
            front,
            back,
            created_at: Utc::now(),
        }
    }
}

/// Per-user learning state for a single card
///
/// Keyed by `(card_id, user_id)`, at most one row per pair. Created lazily
/// by the first review; adding a card creates no state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryState {
    pub card_id: Uuid,
    pub user_id: Uuid,
    /// Leitner box level, always within 1..=5
    #[serde(default = "default_box_level")]
    pub box_level: i32,
    /// When the card was last reviewed; `None` if never
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the card next becomes due; `None` means due immediately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(default)]
    pub correct_count: i64,
    #[serde(default)]
    pub incorrect_count: i64,
}

fn default_box_level() -> i32 {
    1
}

impl MasteryState {
    pub fn new(card_id: Uuid, user_id: Uuid) -> Self {
        Self {
            card_id,
            user_id,
            box_level: default_box_level(),
            last_reviewed: None,
            next_review: None,
            correct_count: 0,
            incorrect_count: 0,
        }
    }
}

/// A card joined with the requesting user's mastery state
///
/// Read model for due-card selection and progress aggregation. A card that
/// was never reviewed carries `box_level` 1 and no `next_review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardWithState {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    pub box_level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
}

impl CardWithState {
    /// Check if the card is due for review at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review.map_or(true, |due| due <= now)
    }
}

/// Outcome of a recorded review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Box level after the review
    pub box_level: i32,
    /// Days until the card comes up again
    pub interval_days: i64,
    pub next_review: DateTime<Utc>,
}

/// Study progress for one deck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckProgress {
    pub total: usize,
    /// Cards the user has reviewed at least once
    pub studied: usize,
    /// Cards at the highest box level
    pub mastered: usize,
    pub study_pct: f64,
    pub mastery_pct: f64,
    /// Cards per box level 1 through 5; never-reviewed cards count at level 1
    pub box_histogram: [usize; 5],
}
