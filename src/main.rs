mod cli;
mod core;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aim", about = "Daily LLM spend ledger CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ledger directory override
    #[arg(long, global = true, value_name = "DIR")]
    ledger_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one completed call into today's ledger
    Record {
        /// Prompt tokens consumed
        #[arg(long)]
        prompt_tokens: u64,

        /// Completion tokens produced
        #[arg(long)]
        completion_tokens: u64,

        /// Total tokens (defaults to prompt + completion)
        #[arg(long)]
        total_tokens: Option<u64>,

        /// Cost of the call in USD (wins over --model pricing)
        #[arg(long)]
        cost: Option<f64>,

        /// Model to derive the cost from
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Show the running cost for a day (default: today)
    Total {
        /// Day to query, DD-MM-YYYY
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List every recorded call for a day (default: today)
    Show {
        /// Day to query, DD-MM-YYYY
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Send a prompt to the configured chat model and record its usage
    Ask {
        /// Prompt text
        prompt: String,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = core::config::AppConfig::load().unwrap_or_default();
    let output_opts = cli::output::OutputOptions {
        format: if cli.json {
            cli::output::OutputFormat::Json
        } else {
            match cli
                .format
                .as_deref()
                .unwrap_or(config.settings.default_format.as_str())
            {
                "json" => cli::output::OutputFormat::Json,
                _ => cli::output::OutputFormat::Text,
            }
        },
        pretty: cli.pretty,
        use_color: if cli.no_color || config.settings.color == "never" {
            false
        } else if config.settings.color == "always" {
            true
        } else {
            cli::output::detect_color(true)
        },
        verbose: cli.verbose,
    };
    let ledger_dir = cli.ledger_dir.as_ref();

    match cli.command {
        None => cli::report_cmd::total(None, ledger_dir, &output_opts)?,
        Some(Commands::Record {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            cost,
            model,
        }) => cli::record_cmd::run(
            prompt_tokens,
            completion_tokens,
            total_tokens,
            cost,
            model,
            ledger_dir,
            &output_opts,
        )?,
        Some(Commands::Total { date }) => cli::report_cmd::total(date, ledger_dir, &output_opts)?,
        Some(Commands::Show { date }) => cli::report_cmd::show(date, ledger_dir, &output_opts)?,
        Some(Commands::Ask { prompt, model }) => {
            cli::ask_cmd::run(prompt, model, ledger_dir, &output_opts).await?
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
        },
    }

    Ok(())
}
