use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::OutputOptions;
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::ledger::LedgerStore;
use crate::core::models::report::DayReport;
use crate::core::models::usage::UsageRecord;

#[derive(Serialize)]
struct TotalPayload {
    date: NaiveDate,
    calls: usize,
    /// `null` when nothing has been recorded for the day.
    day_cost: Option<f64>,
}

#[derive(Serialize)]
struct EmptyDayPayload {
    date: NaiveDate,
    calls: usize,
    day_cost: Option<f64>,
    records: Vec<UsageRecord>,
}

fn resolve_date(date: Option<String>) -> NaiveDate {
    match date {
        Some(s) => match LedgerStore::parse_date(&s) {
            Ok(date) => date,
            Err(_) => {
                eprintln!("Invalid date '{}' (expected DD-MM-YYYY)", s);
                std::process::exit(1);
            }
        },
        None => Local::now().date_naive(),
    }
}

fn open_store(ledger_dir: Option<&PathBuf>) -> LedgerStore {
    let config = AppConfig::load().unwrap_or_default();
    LedgerStore::new(config.ledger_dir(ledger_dir))
}

/// `aim total [--date]`: the running cost for one day.
pub fn total(
    date: Option<String>,
    ledger_dir: Option<&PathBuf>,
    opts: &OutputOptions,
) -> Result<()> {
    let store = open_store(ledger_dir);
    let date = resolve_date(date);
    let ledger = store.load_day(date)?;

    if opts.is_json() {
        let payload = TotalPayload {
            date,
            calls: ledger.as_ref().map_or(0, |l| l.usage_track.len()),
            day_cost: ledger.map(|l| l.day_cost),
        };
        println!("{}", opts.to_json(&payload)?);
    } else {
        match ledger {
            Some(ledger) => println!(
                "{}",
                renderer::render_day_total(
                    date,
                    ledger.day_cost,
                    ledger.usage_track.len(),
                    opts.use_color
                )
            ),
            None => println!("{}", renderer::render_no_usage(date, opts.use_color)),
        }
    }
    Ok(())
}

/// `aim show [--date]`: every recorded call for one day.
pub fn show(
    date: Option<String>,
    ledger_dir: Option<&PathBuf>,
    opts: &OutputOptions,
) -> Result<()> {
    let store = open_store(ledger_dir);
    let date = resolve_date(date);
    print_day(&store, date, opts)
}

/// Print the full day report; shared by `show` and the post-record output of
/// `record` and `ask`.
pub fn print_day(store: &LedgerStore, date: NaiveDate, opts: &OutputOptions) -> Result<()> {
    match store.load_day(date)? {
        Some(ledger) => {
            let report = DayReport::from_ledger(date, ledger);
            if opts.is_json() {
                println!("{}", opts.to_json(&report)?);
            } else {
                println!("{}", renderer::render_day_report(&report, opts.use_color));
            }
        }
        None => {
            if opts.is_json() {
                let payload = EmptyDayPayload {
                    date,
                    calls: 0,
                    day_cost: None,
                    records: Vec::new(),
                };
                println!("{}", opts.to_json(&payload)?);
            } else {
                println!("{}", renderer::render_no_usage(date, opts.use_color));
            }
        }
    }
    Ok(())
}
