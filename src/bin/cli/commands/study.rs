use anyhow::Result;
use uuid::Uuid;

use kartei::algorithm::format_interval;

use crate::app::App;
use crate::OutputFormat;

pub fn run_next(app: &App, deck_id: Uuid, format: &OutputFormat) -> Result<()> {
    let card = app.service.next_due(deck_id, app.user_id)?;

    match format {
        OutputFormat::Json => match card {
            Some(card) => println!("{}", serde_json::to_string_pretty(&card)?),
            None => println!("null"),
        },
        OutputFormat::Plain => match card {
            Some(card) => {
                println!("Front: {}", card.front);
                println!("Back:  {}", card.back);
                println!("Box:   {}", card.box_level);
                println!("ID:    {}", card.id);
            }
            None => {
                println!("Nothing due right now.");
            }
        },
    }

    Ok(())
}

pub fn run_review(app: &App, card_id: Uuid, correct: bool, format: &OutputFormat) -> Result<()> {
    let outcome = app.service.record_review(card_id, app.user_id, correct)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Plain => {
            let verdict = if correct { "Correct" } else { "Wrong" };
            println!(
                "{}. Box {}, next review in {} (on {})",
                verdict,
                outcome.box_level,
                format_interval(outcome.interval_days),
                outcome.next_review.format("%Y-%m-%d")
            );
        }
    }

    Ok(())
}
