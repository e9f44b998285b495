mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kartei-cli", about = "Leitner-box flashcard study CLI", version)]
struct Cli {
    /// Act as this user id (overrides KARTEI_USER and the config default)
    #[arg(long, global = true)]
    user: Option<Uuid>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Manage decks
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Manage cards
    #[command(subcommand)]
    Card(CardCommand),

    /// Study a deck
    #[command(subcommand)]
    Study(StudyCommand),

    /// Show study progress for a deck
    Progress {
        /// Deck id
        deck: Uuid,
    },
}

#[derive(Subcommand)]
enum DeckCommand {
    /// Create a new deck
    Create {
        /// Deck title
        title: String,
    },

    /// List your decks
    List,

    /// Delete a deck together with its cards and their study state
    Delete {
        /// Deck id
        deck: Uuid,
    },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Add a card to a deck
    Add {
        /// Deck id
        deck: Uuid,
        /// Question side
        front: String,
        /// Answer side
        back: String,
    },

    /// List cards in a deck
    List {
        /// Deck id
        deck: Uuid,
    },

    /// Delete a card
    Delete {
        /// Card id
        card: Uuid,
    },
}

#[derive(Subcommand)]
enum StudyCommand {
    /// Show the next card due for review
    Next {
        /// Deck id
        deck: Uuid,
    },

    /// Record a review result for a card
    Review {
        /// Card id
        card: Uuid,
        /// Whether the answer was correct
        #[arg(value_enum)]
        answer: ReviewAnswer,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ReviewAnswer {
    Correct,
    Wrong,
}

impl ReviewAnswer {
    fn is_correct(self) -> bool {
        matches!(self, ReviewAnswer::Correct)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let app = app::App::new(cli.config.as_deref(), cli.user)?;

    match cli.command {
        Command::Deck(cmd) => match cmd {
            DeckCommand::Create { title } => commands::deck::run_create(&app, &title, &cli.format),
            DeckCommand::List => commands::deck::run_list(&app, &cli.format),
            DeckCommand::Delete { deck } => commands::deck::run_delete(&app, deck, &cli.format),
        },
        Command::Card(cmd) => match cmd {
            CardCommand::Add { deck, front, back } => {
                commands::card::run_add(&app, deck, &front, &back, &cli.format)
            }
            CardCommand::List { deck } => commands::card::run_list(&app, deck, &cli.format),
            CardCommand::Delete { card } => commands::card::run_delete(&app, card, &cli.format),
        },
        Command::Study(cmd) => match cmd {
            StudyCommand::Next { deck } => commands::study::run_next(&app, deck, &cli.format),
            StudyCommand::Review { card, answer } => {
                commands::study::run_review(&app, card, answer.is_correct(), &cli.format)
            }
        },
        Command::Progress { deck } => commands::progress::run(&app, deck, &cli.format),
    }
}
