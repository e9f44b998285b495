use anyhow::Result;
use uuid::Uuid;

use crate::app::App;
use crate::OutputFormat;

pub fn run_add(app: &App, deck_id: Uuid, front: &str, back: &str, format: &OutputFormat) -> Result<()> {
    let card = app.service.add_card(deck_id, app.user_id, front, back)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        OutputFormat::Plain => {
            println!("Added card \"{}\"", card.front);
            println!("  ID: {}", card.id);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, deck_id: Uuid, format: &OutputFormat) -> Result<()> {
    let cards = app.service.list_cards(deck_id, app.user_id)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("No cards in this deck yet.");
            } else {
                for card in cards {
                    println!("{}  {} / {}", card.id, card.front, card.back);
                }
            }
        }
    }

    Ok(())
}

pub fn run_delete(app: &App, card_id: Uuid, format: &OutputFormat) -> Result<()> {
    app.service.delete_card(card_id, app.user_id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": card_id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted card {}", card_id);
        }
    }

    Ok(())
}
