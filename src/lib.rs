//! Leitner-box spaced repetition scheduling for flashcard decks
//!
//! This crate provides:
//! - Deck and card management (per-user flashcard collections)
//! - Leitner 5-box scheduling with fixed intervals (1, 3, 7, 14, 30 days)
//! - Per-(card, user) mastery state tracking
//! - Due-card selection and deck progress aggregation
//!
//! Identity is an opaque user id supplied by the caller; persistence goes
//! through the [`store::StudyStore`] trait, backed by SQLite or memory.

pub mod algorithm;
pub mod config;
pub mod models;
pub mod service;
pub mod store;

pub use config::{Config, ConfigError};
pub use models::*;
pub use service::{ServiceError, StudyService};
pub use store::{MemoryStore, SqliteStore, StoreError, StudyStore};
