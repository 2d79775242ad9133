use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;

use crate::cli::output::OutputOptions;
use crate::cli::report_cmd;
use crate::core::config::AppConfig;
use crate::core::ledger::LedgerStore;
use crate::core::models::usage::CallUsage;
use crate::core::pricing;

/// `aim record`: log one completed call into today's ledger.
///
/// Exactly one pricing source is needed: an explicit `--cost`, or a `--model`
/// with a known pricing entry. An explicit cost wins when both are given.
pub fn run(
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: Option<u64>,
    cost: Option<f64>,
    model: Option<String>,
    ledger_dir: Option<&PathBuf>,
    opts: &OutputOptions,
) -> Result<()> {
    let total_cost = match (cost, &model) {
        (Some(cost), _) => cost,
        (None, Some(model)) => match pricing::lookup(model) {
            Some(pricing) => pricing::calculate_cost(pricing, prompt_tokens, completion_tokens),
            None => {
                eprintln!("No pricing known for model '{}'; pass --cost instead.", model);
                std::process::exit(1);
            }
        },
        (None, None) => {
            eprintln!("Either --cost or --model is required to price the call.");
            std::process::exit(1);
        }
    };

    let mut usage = CallUsage::from_split(prompt_tokens, completion_tokens, total_cost);
    if let Some(total) = total_tokens {
        usage.total_tokens = total;
    }

    // Strict load: a corrupt config must not silently redirect where
    // records land.
    let config = AppConfig::load()?;
    let store = LedgerStore::new(config.ledger_dir(ledger_dir));
    store.record(&usage)?;

    if opts.verbose {
        eprintln!(
            "Recorded {} tokens (${:.6}) into {}",
            usage.total_tokens,
            usage.total_cost,
            store.dir().display()
        );
    }

    report_cmd::print_day(&store, Local::now().date_naive(), opts)
}
