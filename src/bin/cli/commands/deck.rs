use anyhow::Result;
use uuid::Uuid;

use crate::app::App;
use crate::OutputFormat;

pub fn run_create(app: &App, title: &str, format: &OutputFormat) -> Result<()> {
    let deck = app.service.create_deck(app.user_id, title)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&deck)?);
        }
        OutputFormat::Plain => {
            println!("Created deck \"{}\"", deck.title);
            println!("  ID: {}", deck.id);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat) -> Result<()> {
    let decks = app.service.list_decks(app.user_id)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&decks)?);
        }
        OutputFormat::Plain => {
            if decks.is_empty() {
                println!("No decks yet. Create one with: kartei-cli deck create <title>");
            } else {
                for deck in decks {
                    println!("{}  {}", deck.id, deck.title);
                }
            }
        }
    }

    Ok(())
}

pub fn run_delete(app: &App, deck_id: Uuid, format: &OutputFormat) -> Result<()> {
    app.service.delete_deck(deck_id, app.user_id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": deck_id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted deck {} and all of its cards", deck_id);
        }
    }

    Ok(())
}
