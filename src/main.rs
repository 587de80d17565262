//! Command-line front end for the trading journal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;

use trade_recap_lib::commands;
use trade_recap_lib::engine::{recap_view_for, DateRange, PeriodKind};
use trade_recap_lib::models::{CreateTradeInput, Currency, Direction, Outcome, Reflection};
use trade_recap_lib::Database;

#[derive(Parser, Debug)]
#[command(name = "trade-recap")]
#[command(about = "Trading journal with daily, weekly and monthly recaps", long_about = None)]
struct Cli {
    /// Path to the journal database
    #[arg(long, env = "TRADE_RECAP_DB", default_value = "trade_recap.db")]
    db: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Statistics for the day, week or month containing a date
    Recap {
        /// day, week or month
        #[arg(long, default_value = "day")]
        period: PeriodKind,

        /// Anchor date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record a trade
    Add {
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "long")]
        direction: Direction,
        #[arg(long)]
        outcome: Outcome,
        #[arg(long, default_value_t = 1.0)]
        risk_r: f64,
        #[arg(long)]
        potential_r: f64,
        #[arg(long, allow_negative_numbers = true)]
        actual_r: f64,
        /// Money value of one R
        #[arg(long)]
        r_value: f64,
        #[arg(long, default_value = "USD")]
        currency: Currency,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        entry_reason: String,
        #[arg(long, default_value = "")]
        exit_reason: String,
    },

    /// Export the whole journal as JSON, or trades as CSV
    Export {
        #[arg(long)]
        csv: bool,
        /// First day of the CSV export
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Last day of the CSV export
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON export
    Import { file: PathBuf },

    /// Cumulative P&L per trading day
    Curve {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },

    /// What the calendar shows for a day
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Economic events for the seven days from a date
    Events {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Write the journal entry for a day
    Journal {
        #[arg(long)]
        date: Option<NaiveDate>,
        text: String,
    },

    /// Write the reflection for the week ending on a day
    Reflect {
        #[arg(long)]
        date: Option<NaiveDate>,
        text: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn date_range(from: NaiveDate, to: NaiveDate) -> Result<DateRange> {
    if from > to {
        bail!("--from {} is after --to {}", from, to);
    }
    Ok(DateRange::new(from, to))
}

fn open_database(path: &Path) -> Result<Database> {
    Database::open(path).with_context(|| {
        let backups = path
            .parent()
            .map(|dir| dir.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"));
        format!(
            "failed to open journal {}; pre-migration backups are kept in {}",
            path.display(),
            backups.display()
        )
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let db = open_database(&cli.db)?;
    log::debug!("Using journal {}", cli.db.display());

    let today = Local::now().date_naive();

    match cli.command {
        Command::Recap { period, date } => {
            let recap = commands::get_period_stats(&db, date.unwrap_or(today), period)?;
            print_json(&recap)?;
        }
        Command::Add {
            ticker,
            direction,
            outcome,
            risk_r,
            potential_r,
            actual_r,
            r_value,
            currency,
            date,
            entry_reason,
            exit_reason,
        } => {
            let trade = commands::create_trade(
                &db,
                CreateTradeInput {
                    date: date.unwrap_or(today),
                    ticker,
                    direction,
                    risk_r,
                    potential_r,
                    r_value,
                    currency,
                    outcome,
                    actual_r,
                    entry_reason,
                    exit_reason,
                    reflection: Reflection::default(),
                    screenshot: None,
                },
            )?;
            print_json(&trade)?;
        }
        Command::Export {
            csv,
            from,
            to,
            output,
        } => {
            let content = if csv {
                let range = match (from, to) {
                    (Some(from), Some(to)) => Some(date_range(from, to)?),
                    _ => None,
                };
                commands::export_trades_csv(&db, range.as_ref())?
            } else {
                commands::export_all_data(&db)?
            };

            match output {
                Some(path) => {
                    fs::write(&path, content)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    log::info!("Export written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
        Command::Import { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let result = commands::import_all_data(&db, &json)?;
            print_json(&result)?;
        }
        Command::Curve { from, to } => {
            let curve = commands::get_equity_curve(&db, &date_range(from, to)?)?;
            print_json(&curve)?;
        }
        Command::Day { date } => {
            let date = date.unwrap_or(today);
            print_json(&serde_json::json!({
                "date": date,
                "view": recap_view_for(date),
                "cell": commands::get_day_cell(&db, date)?,
                "journal": commands::get_daily_journal_content(&db, date)?,
            }))?;
        }
        Command::Events { date } => {
            let (range, events) = commands::week_ahead_events(&db, date.unwrap_or(today))?;
            log::info!(
                "{} events between {} and {}",
                commands::upcoming_event_count(&events),
                range.start,
                range.end
            );
            print_json(&events)?;
        }
        Command::Journal { date, text } => {
            let journal = commands::save_daily_journal(&db, date.unwrap_or(today), &text)?;
            print_json(&journal)?;
        }
        Command::Reflect { date, text } => {
            let reflection = commands::save_weekly_reflection(&db, date.unwrap_or(today), &text)?;
            print_json(&reflection)?;
        }
    }

    Ok(())
}
