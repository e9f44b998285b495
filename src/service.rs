//! Review scheduling service
//!
//! `StudyService` is the caller-facing surface: recording reviews, picking
//! the next due card, aggregating deck progress, and the deck/card
//! operations around them. Every deck- or card-scoped call verifies
//! ownership first; a missing resource and someone else's resource produce
//! the same error.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::algorithm;
use crate::models::{Card, CardWithState, Deck, DeckProgress, MasteryState, ReviewOutcome};
use crate::store::{StoreError, StudyStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The deck or card does not exist, or belongs to someone else. The two
    /// cases are deliberately indistinguishable.
    #[error("not found or not owned: {0}")]
    NotFoundOrDenied(Uuid),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Number of mutexes guarding reviews; each (card, user) pair hashes to one
const REVIEW_LOCK_SHARDS: usize = 64;

pub struct StudyService<S: StudyStore> {
    store: S,
    review_locks: [Mutex<()>; REVIEW_LOCK_SHARDS],
}

impl<S: StudyStore> StudyService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            review_locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    /// Record one review of a card and reschedule it
    ///
    /// Creates the mastery state on first review. A correct answer promotes
    /// the card one box, an incorrect answer resets it to box 1, and the new
    /// box level alone determines the next interval.
    pub fn record_review(&self, card_id: Uuid, user_id: Uuid, correct: bool) -> Result<ReviewOutcome> {
        if !self.store.owns_card(card_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(card_id));
        }

        // Serialize reviews of the same (card, user) pair so the
        // read-modify-write cannot drop a concurrent update.
        let _guard = self
            .review_lock(card_id, user_id)
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let state = self
            .store
            .get_state(card_id, user_id)?
            .unwrap_or_else(|| MasteryState::new(card_id, user_id));

        let now = Utc::now();
        let updated = algorithm::apply_review(&state, correct, now);
        self.store.upsert_state(&updated)?;

        log::debug!(
            "review card={} user={} correct={} box {} -> {}",
            card_id,
            user_id,
            correct,
            state.box_level,
            updated.box_level
        );

        let interval_days = algorithm::interval_days(updated.box_level);
        Ok(ReviewOutcome {
            box_level: updated.box_level,
            interval_days,
            next_review: now + Duration::days(interval_days),
        })
    }

    /// Pick the card to study next
    ///
    /// Eligible cards are those never reviewed or with `next_review` in the
    /// past. Never-reviewed cards take priority, then the earliest due date;
    /// remaining ties are broken uniformly at random. `None` means nothing
    /// is due right now.
    pub fn next_due(&self, deck_id: Uuid, user_id: Uuid) -> Result<Option<CardWithState>> {
        if !self.store.owns_deck(deck_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(deck_id));
        }

        let cards = self.store.list_cards_with_state(deck_id, user_id)?;
        Ok(pick_due_card(cards, Utc::now(), &mut rand::thread_rng()))
    }

    /// Aggregate study progress over one deck
    pub fn progress(&self, deck_id: Uuid, user_id: Uuid) -> Result<DeckProgress> {
        if !self.store.owns_deck(deck_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(deck_id));
        }

        let cards = self.store.list_cards_with_state(deck_id, user_id)?;
        Ok(aggregate_progress(&cards))
    }

    pub fn create_deck(&self, user_id: Uuid, title: &str) -> Result<Deck> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::Validation("deck title is required".into()));
        }

        let deck = Deck::new(user_id, title.to_string());
        self.store.create_deck(&deck)?;
        log::info!("created deck {} for user {}", deck.id, user_id);
        Ok(deck)
    }

    pub fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>> {
        Ok(self.store.list_decks(user_id)?)
    }

    /// Delete a deck together with its cards and their mastery state
    pub fn delete_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<()> {
        if !self.store.owns_deck(deck_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(deck_id));
        }

        self.store.delete_deck(deck_id)?;
        log::info!("deleted deck {} and its cards", deck_id);
        Ok(())
    }

    pub fn add_card(&self, deck_id: Uuid, user_id: Uuid, front: &str, back: &str) -> Result<Card> {
        if !self.store.owns_deck(deck_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(deck_id));
        }

        let front = front.trim();
        let back = back.trim();
        if front.is_empty() || back.is_empty() {
            return Err(ServiceError::Validation(
                "card front and back are required".into(),
            ));
        }

        let card = Card::new(deck_id, front.to_string(), back.to_string());
        self.store.create_card(&card)?;
        log::debug!("added card {} to deck {}", card.id, deck_id);
        Ok(card)
    }

    pub fn list_cards(&self, deck_id: Uuid, user_id: Uuid) -> Result<Vec<Card>> {
        if !self.store.owns_deck(deck_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(deck_id));
        }
        Ok(self.store.list_cards(deck_id)?)
    }

    pub fn delete_card(&self, card_id: Uuid, user_id: Uuid) -> Result<()> {
        if !self.store.owns_card(card_id, user_id)? {
            return Err(ServiceError::NotFoundOrDenied(card_id));
        }

        self.store.delete_card(card_id)?;
        log::debug!("deleted card {}", card_id);
        Ok(())
    }

    fn review_lock(&self, card_id: Uuid, user_id: Uuid) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (card_id, user_id).hash(&mut hasher);
        &self.review_locks[hasher.finish() as usize % REVIEW_LOCK_SHARDS]
    }
}

/// Selection policy for the next card to study
///
/// Never-reviewed cards rank above reviewed-and-due cards, however overdue
/// the latter are. Within the winning group (never-reviewed, or sharing the
/// earliest `next_review`) one card is chosen uniformly at random.
fn pick_due_card<R: Rng>(
    cards: Vec<CardWithState>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<CardWithState> {
    let due: Vec<CardWithState> = cards.into_iter().filter(|c| c.is_due(now)).collect();

    let fresh: Vec<&CardWithState> = due.iter().filter(|c| c.next_review.is_none()).collect();
    if !fresh.is_empty() {
        return fresh.choose(rng).map(|c| (*c).clone());
    }

    let earliest = due.iter().filter_map(|c| c.next_review).min()?;
    let tied: Vec<&CardWithState> = due
        .iter()
        .filter(|c| c.next_review == Some(earliest))
        .collect();
    tied.choose(rng).map(|c| (*c).clone())
}

/// Roll deck-level numbers up from the joined card rows
fn aggregate_progress(cards: &[CardWithState]) -> DeckProgress {
    let total = cards.len();
    // A state row always carries next_review, so its presence marks a
    // studied card.
    let studied = cards.iter().filter(|c| c.next_review.is_some()).count();
    let mastered = cards
        .iter()
        .filter(|c| c.box_level >= algorithm::MAX_BOX_LEVEL)
        .count();

    let mut box_histogram = [0usize; 5];
    for card in cards {
        let level = card
            .box_level
            .clamp(algorithm::MIN_BOX_LEVEL, algorithm::MAX_BOX_LEVEL);
        box_histogram[(level - 1) as usize] += 1;
    }

    DeckProgress {
        total,
        studied,
        mastered,
        study_pct: percentage(studied, total),
        mastery_pct: percentage(mastered, total),
        box_histogram,
    }
}

/// Percentage rounded to one decimal; 0 for an empty set
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = count as f64 * 100.0 / total as f64;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_service() -> StudyService<MemoryStore> {
        StudyService::new(MemoryStore::new())
    }

    fn seed_deck(service: &StudyService<MemoryStore>) -> (Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        let deck = service.create_deck(user_id, "Spanish").unwrap();
        (deck.id, user_id)
    }

    fn card_row(front: &str, next_review: Option<DateTime<Utc>>) -> CardWithState {
        CardWithState {
            id: Uuid::new_v4(),
            front: front.to_string(),
            back: "answer".to_string(),
            box_level: if next_review.is_some() { 2 } else { 1 },
            next_review,
        }
    }

    #[test]
    fn test_create_deck_rejects_blank_title() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let err = service.create_deck(user_id, "   ").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_add_card_requires_front_and_back() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);

        let err = service.add_card(deck_id, user_id, "", "answer").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.add_card(deck_id, user_id, "question", " ").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_missing_and_foreign_are_the_same_error() {
        let service = test_service();
        let (deck_id, _) = seed_deck(&service);
        let stranger = Uuid::new_v4();

        let foreign = service.next_due(deck_id, stranger).unwrap_err();
        let missing = service.next_due(Uuid::new_v4(), stranger).unwrap_err();

        assert!(matches!(foreign, ServiceError::NotFoundOrDenied(_)));
        assert!(matches!(missing, ServiceError::NotFoundOrDenied(_)));
    }

    #[test]
    fn test_record_review_denied_for_foreign_card() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();
        let stranger = Uuid::new_v4();

        let err = service.record_review(card.id, stranger, true).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrDenied(_)));

        let err = service.record_review(Uuid::new_v4(), user_id, true).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrDenied(_)));
    }

    #[test]
    fn test_record_review_creates_state_lazily() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        assert!(service.store.get_state(card.id, user_id).unwrap().is_none());

        let outcome = service.record_review(card.id, user_id, true).unwrap();
        assert_eq!(outcome.box_level, 2);
        assert_eq!(outcome.interval_days, 3);

        let state = service.store.get_state(card.id, user_id).unwrap().unwrap();
        assert_eq!(state.box_level, 2);
        assert_eq!(state.correct_count, 1);
        assert_eq!(state.incorrect_count, 0);
    }

    #[test]
    fn test_record_review_incorrect_resets_to_box_one() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        for _ in 0..3 {
            service.record_review(card.id, user_id, true).unwrap();
        }
        let state = service.store.get_state(card.id, user_id).unwrap().unwrap();
        assert_eq!(state.box_level, 4);

        let outcome = service.record_review(card.id, user_id, false).unwrap();
        assert_eq!(outcome.box_level, 1);
        assert_eq!(outcome.interval_days, 1);
    }

    #[test]
    fn test_review_counters_sum_to_review_count() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        let outcomes = [true, false, true, true, false];
        for &correct in &outcomes {
            service.record_review(card.id, user_id, correct).unwrap();
        }

        let state = service.store.get_state(card.id, user_id).unwrap().unwrap();
        assert_eq!(
            state.correct_count + state.incorrect_count,
            outcomes.len() as i64
        );
        assert_eq!(state.correct_count, 3);
        assert_eq!(state.incorrect_count, 2);
    }

    #[test]
    fn test_next_due_empty_deck_is_none() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);

        assert!(service.next_due(deck_id, user_id).unwrap().is_none());
    }

    #[test]
    fn test_next_due_skips_cards_scheduled_in_the_future() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        // Reviewing pushes next_review at least one day out.
        service.record_review(card.id, user_id, true).unwrap();

        assert!(service.next_due(deck_id, user_id).unwrap().is_none());
    }

    #[test]
    fn test_next_due_returns_unreviewed_card() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        let picked = service.next_due(deck_id, user_id).unwrap().unwrap();
        assert_eq!(picked.id, card.id);
        assert_eq!(picked.box_level, 1);
        assert!(picked.next_review.is_none());
    }

    #[test]
    fn test_pick_prefers_never_reviewed_over_overdue() {
        let now = Utc::now();
        let overdue = card_row("overdue", Some(now - Duration::days(30)));
        let fresh = card_row("fresh", None);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let picked = pick_due_card(
                vec![overdue.clone(), fresh.clone()],
                now,
                &mut rng,
            )
            .unwrap();
            assert_eq!(picked.id, fresh.id);
        }
    }

    #[test]
    fn test_pick_orders_by_earliest_due_date() {
        let now = Utc::now();
        let older = card_row("older", Some(now - Duration::days(5)));
        let newer = card_row("newer", Some(now - Duration::days(1)));
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let picked = pick_due_card(vec![newer.clone(), older.clone()], now, &mut rng).unwrap();
            assert_eq!(picked.id, older.id);
        }
    }

    #[test]
    fn test_pick_never_returns_future_cards() {
        let now = Utc::now();
        let future = card_row("future", Some(now + Duration::days(3)));
        let mut rng = StdRng::seed_from_u64(7);

        assert!(pick_due_card(vec![future], now, &mut rng).is_none());
        assert!(pick_due_card(Vec::new(), now, &mut rng).is_none());
    }

    #[test]
    fn test_pick_tie_break_reaches_every_candidate() {
        let now = Utc::now();
        let cards = vec![card_row("a", None), card_row("b", None), card_row("c", None)];
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let picked = pick_due_card(cards.clone(), now, &mut rng).unwrap();
            seen.insert(picked.id);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_pick_tie_break_on_equal_due_dates() {
        let now = Utc::now();
        let due = Some(now - Duration::hours(2));
        let cards = vec![card_row("a", due), card_row("b", due)];
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let picked = pick_due_card(cards.clone(), now, &mut rng).unwrap();
            seen.insert(picked.id);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_progress_empty_deck_is_all_zero() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);

        let progress = service.progress(deck_id, user_id).unwrap();
        assert_eq!(progress.total, 0);
        assert_eq!(progress.studied, 0);
        assert_eq!(progress.mastered, 0);
        assert_eq!(progress.study_pct, 0.0);
        assert_eq!(progress.mastery_pct, 0.0);
        assert_eq!(progress.box_histogram, [0; 5]);
    }

    #[test]
    fn test_progress_counts_and_histogram() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);

        let mastered = service.add_card(deck_id, user_id, "a", "1").unwrap();
        let learning = service.add_card(deck_id, user_id, "b", "2").unwrap();
        service.add_card(deck_id, user_id, "c", "3").unwrap();
        service.add_card(deck_id, user_id, "d", "4").unwrap();

        // Four correct answers climb 1 -> 5.
        for _ in 0..4 {
            service.record_review(mastered.id, user_id, true).unwrap();
        }
        service.record_review(learning.id, user_id, true).unwrap();

        let progress = service.progress(deck_id, user_id).unwrap();
        assert_eq!(progress.total, 4);
        assert_eq!(progress.studied, 2);
        assert_eq!(progress.mastered, 1);
        assert_eq!(progress.study_pct, 50.0);
        assert_eq!(progress.mastery_pct, 25.0);
        assert_eq!(progress.box_histogram, [2, 1, 0, 0, 1]);
    }

    #[test]
    fn test_progress_rounds_to_one_decimal() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);

        let first = service.add_card(deck_id, user_id, "a", "1").unwrap();
        let second = service.add_card(deck_id, user_id, "b", "2").unwrap();
        service.add_card(deck_id, user_id, "c", "3").unwrap();

        service.record_review(first.id, user_id, true).unwrap();
        let progress = service.progress(deck_id, user_id).unwrap();
        assert_eq!(progress.study_pct, 33.3);

        service.record_review(second.id, user_id, true).unwrap();
        let progress = service.progress(deck_id, user_id).unwrap();
        assert_eq!(progress.study_pct, 66.7);
    }

    #[test]
    fn test_delete_deck_requires_ownership() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let stranger = Uuid::new_v4();

        let err = service.delete_deck(deck_id, stranger).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrDenied(_)));

        service.delete_deck(deck_id, user_id).unwrap();
        assert!(service.list_decks(user_id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_card_removes_it_from_study() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        service.delete_card(card.id, user_id).unwrap();

        assert!(service.list_cards(deck_id, user_id).unwrap().is_empty());
        assert!(service.next_due(deck_id, user_id).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_reviews_lose_no_updates() {
        let service = test_service();
        let (deck_id, user_id) = seed_deck(&service);
        let card = service.add_card(deck_id, user_id, "hola", "hello").unwrap();

        let threads = 8;
        let reviews_per_thread = 5;
        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    for _ in 0..reviews_per_thread {
                        service.record_review(card.id, user_id, true).unwrap();
                    }
                });
            }
        });

        let state = service.store.get_state(card.id, user_id).unwrap().unwrap();
        assert_eq!(
            state.correct_count + state.incorrect_count,
            (threads * reviews_per_thread) as i64
        );
        assert_eq!(state.box_level, 5);
    }
}
