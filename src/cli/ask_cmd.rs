use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::OutputOptions;
use crate::cli::renderer;
use crate::core::chat::ChatClient;
use crate::core::config::AppConfig;
use crate::core::ledger::LedgerStore;
use crate::core::models::usage::CallUsage;

#[derive(Serialize)]
struct AskPayload {
    answer: String,
    usage: CallUsage,
    day_cost: Option<f64>,
}

/// `aim ask`: one chat round-trip, usage recorded exactly once, then the
/// answer and the updated daily total.
pub async fn run(
    prompt: String,
    model: Option<String>,
    ledger_dir: Option<&PathBuf>,
    opts: &OutputOptions,
) -> Result<()> {
    // This path records, so a corrupt config is an error, not a default.
    let config = AppConfig::load()?;

    let client = match ChatClient::from_config(&config.chat, model) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };
    if opts.verbose {
        eprintln!("Asking {} at {}", client.model(), client.base_url());
    }

    let outcome = client.ask(&prompt).await?;

    let store = LedgerStore::new(config.ledger_dir(ledger_dir));
    store.record(&outcome.usage)?;

    if opts.is_json() {
        let payload = AskPayload {
            answer: outcome.answer,
            usage: outcome.usage,
            day_cost: store.daily_total()?,
        };
        println!("{}", opts.to_json(&payload)?);
    } else {
        println!("{}", outcome.answer);
        println!();
        let today = Local::now().date_naive();
        if let Some(ledger) = store.load_day(today)? {
            println!(
                "{}",
                renderer::render_day_total(
                    today,
                    ledger.day_cost,
                    ledger.usage_track.len(),
                    opts.use_color
                )
            );
        }
    }
    Ok(())
}
