//! SQLite-backed study store

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{Result, StoreError, StudyStore};
use crate::models::{Card, CardWithState, Deck, MasteryState};

/// Study store on a SQLite database.
///
/// One connection guarded by a mutex; rusqlite connections are not `Sync`.
/// UUIDs are stored as TEXT, timestamps as RFC 3339 TEXT. Foreign keys are
/// enabled so deleting a deck cascades to its cards and their mastery state.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        log::debug!("opened study database at {}", db_path.display());
        Self::init(conn)
    }

    /// Open an in-memory database, mainly for tests.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Decks owned by a user
            CREATE TABLE IF NOT EXISTS decks (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Cards belong to exactly one deck
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                deck_id TEXT NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            -- Per-user mastery state, one row per (card, user) pair
            CREATE TABLE IF NOT EXISTS card_progress (
                card_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                box_level INTEGER NOT NULL DEFAULT 1,
                last_reviewed TEXT,
                next_review TEXT,
                correct_count INTEGER NOT NULL DEFAULT 0,
                incorrect_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (card_id, user_id),
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            -- Indexes for per-user and per-deck lookups
            CREATE INDEX IF NOT EXISTS idx_decks_user_id ON decks(user_id);
            CREATE INDEX IF NOT EXISTS idx_cards_deck_id ON cards(deck_id);
            CREATE INDEX IF NOT EXISTS idx_progress_user_id ON card_progress(user_id);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StudyStore for SqliteStore {
    fn owns_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let owns: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM decks WHERE id = ?1 AND user_id = ?2)",
            params![deck_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(owns)
    }

    fn owns_card(&self, card_id: Uuid, user_id: Uuid) -> Result<bool> {
        let conn = self.conn();
        let owns: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM cards c
                JOIN decks d ON c.deck_id = d.id
                WHERE c.id = ?1 AND d.user_id = ?2
            )",
            params![card_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(owns)
    }

    fn list_cards_with_state(&self, deck_id: Uuid, user_id: Uuid) -> Result<Vec<CardWithState>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.front, c.back, COALESCE(p.box_level, 1), p.next_review
             FROM cards c
             LEFT JOIN card_progress p ON p.card_id = c.id AND p.user_id = ?2
             WHERE c.deck_id = ?1
             ORDER BY c.created_at",
        )?;

        let rows = stmt
            .query_map(params![deck_id.to_string(), user_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, front, back, box_level, next_review)| {
                Ok(CardWithState {
                    id: parse_uuid(&id)?,
                    front,
                    back,
                    box_level,
                    next_review: parse_opt_timestamp(next_review.as_deref())?,
                })
            })
            .collect()
    }

    fn get_state(&self, card_id: Uuid, user_id: Uuid) -> Result<Option<MasteryState>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT box_level, last_reviewed, next_review, correct_count, incorrect_count
                 FROM card_progress
                 WHERE card_id = ?1 AND user_id = ?2",
                params![card_id.to_string(), user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, i32>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((box_level, last_reviewed, next_review, correct_count, incorrect_count)) => {
                Ok(Some(MasteryState {
                    card_id,
                    user_id,
                    box_level,
                    last_reviewed: parse_opt_timestamp(last_reviewed.as_deref())?,
                    next_review: parse_opt_timestamp(next_review.as_deref())?,
                    correct_count,
                    incorrect_count,
                }))
            }
        }
    }

    fn upsert_state(&self, state: &MasteryState) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO card_progress
                (card_id, user_id, box_level, last_reviewed, next_review,
                 correct_count, incorrect_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (card_id, user_id) DO UPDATE SET
                box_level = excluded.box_level,
                last_reviewed = excluded.last_reviewed,
                next_review = excluded.next_review,
                correct_count = excluded.correct_count,
                incorrect_count = excluded.incorrect_count",
            params![
                state.card_id.to_string(),
                state.user_id.to_string(),
                state.box_level,
                state.last_reviewed.map(|t| t.to_rfc3339()),
                state.next_review.map(|t| t.to_rfc3339()),
                state.correct_count,
                state.incorrect_count,
            ],
        )?;
        Ok(())
    }

    fn create_deck(&self, deck: &Deck) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO decks (id, user_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                deck.id.to_string(),
                deck.user_id.to_string(),
                deck.title,
                deck.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, created_at FROM decks
             WHERE user_id = ?1
             ORDER BY created_at",
        )?;

        let rows = stmt
            .query_map(params![user_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, user_id, title, created_at)| {
                Ok(Deck {
                    id: parse_uuid(&id)?,
                    user_id: parse_uuid(&user_id)?,
                    title,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn delete_deck(&self, deck_id: Uuid) -> Result<()> {
        let conn = self.conn();
        let deleted = conn.execute(
            "DELETE FROM decks WHERE id = ?1",
            params![deck_id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::DeckNotFound(deck_id));
        }
        Ok(())
    }

    fn create_card(&self, card: &Card) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO cards (id, deck_id, front, back, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                card.id.to_string(),
                card.deck_id.to_string(),
                card.front,
                card.back,
                card.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_card(&self, card_id: Uuid) -> Result<Option<Card>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, deck_id, front, back, created_at FROM cards WHERE id = ?1",
                params![card_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, deck_id, front, back, created_at)) => Ok(Some(Card {
                id: parse_uuid(&id)?,
                deck_id: parse_uuid(&deck_id)?,
                front,
                back,
                created_at: parse_timestamp(&created_at)?,
            })),
        }
    }

    fn list_cards(&self, deck_id: Uuid) -> Result<Vec<Card>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, deck_id, front, back, created_at FROM cards
             WHERE deck_id = ?1
             ORDER BY created_at",
        )?;

        let rows = stmt
            .query_map(params![deck_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, deck_id, front, back, created_at)| {
                Ok(Card {
                    id: parse_uuid(&id)?,
                    deck_id: parse_uuid(&deck_id)?,
                    front,
                    back,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn delete_card(&self, card_id: Uuid) -> Result<()> {
        let conn = self.conn();
        let deleted = conn.execute(
            "DELETE FROM cards WHERE id = ?1",
            params![card_id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::CardNotFound(card_id));
        }
        Ok(())
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid uuid '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid timestamp '{}': {}", s, e)))
}

fn parse_opt_timestamp(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    s.map(parse_timestamp).transpose()
}
