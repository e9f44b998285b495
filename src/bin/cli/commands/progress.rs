use anyhow::Result;
use uuid::Uuid;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, deck_id: Uuid, format: &OutputFormat) -> Result<()> {
    let progress = app.service.progress(deck_id, app.user_id)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        OutputFormat::Plain => {
            println!("Cards:    {}", progress.total);
            println!("Studied:  {} ({:.1}%)", progress.studied, progress.study_pct);
            println!("Mastered: {} ({:.1}%)", progress.mastered, progress.mastery_pct);
            println!("Boxes:");
            for (i, count) in progress.box_histogram.iter().enumerate() {
                println!("  box {}: {}", i + 1, count);
            }
        }
    }

    Ok(())
}
