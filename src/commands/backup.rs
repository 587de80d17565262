use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::commands::events::{insert_event, query_events};
use crate::commands::journal::{query_daily_journals, query_weekly_reflections};
use crate::commands::settings::query_settings;
use crate::commands::trades::{insert_trade, query_all_trades, query_trades_in_range};
use crate::db::sql_types::weekday_to_sql;
use crate::db::Database;
use crate::engine::DateRange;
use crate::error::{JournalError, Result};
use crate::models::{
    Currency, DailyJournal, Direction, EconomicEvent, Outcome, Settings, Trade, WeeklyReflection,
};

pub const BACKUP_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupData {
    pub version: String,
    pub exported_at: String,
    #[serde(default)]
    pub settings: Option<Settings>,
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub weekly_reflections: Vec<WeeklyReflection>,
    #[serde(default)]
    pub daily_journals: Vec<DailyJournal>,
    #[serde(default)]
    pub economic_events: Vec<EconomicEvent>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates: usize,
    pub errors: Vec<String>,
}

/// Export all data to JSON
pub fn export_all_data(db: &Database) -> Result<String> {
    let conn = db.conn()?;

    let backup = BackupData {
        version: BACKUP_VERSION.to_string(),
        exported_at: Utc::now().to_rfc3339(),
        settings: Some(query_settings(&conn)?),
        trades: query_all_trades(&conn)?,
        weekly_reflections: query_weekly_reflections(&conn)?,
        daily_journals: query_daily_journals(&conn)?,
        economic_events: query_events(&conn, None)?,
    };

    log::info!(
        "Exported {} trades, {} reflections, {} journals, {} events",
        backup.trades.len(),
        backup.weekly_reflections.len(),
        backup.daily_journals.len(),
        backup.economic_events.len()
    );

    Ok(serde_json::to_string_pretty(&backup)?)
}

fn record_exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM {} WHERE id = ?", table), [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn apply_settings(conn: &Connection, settings: &Settings) -> Result<()> {
    conn.execute(
        "UPDATE settings SET default_currency = ?, week_starts_on = ?, win_rate_basis = ?, \
         updated_at = ? WHERE id = 1",
        params![
            settings.default_currency,
            weekday_to_sql(settings.week_starts_on),
            settings.win_rate_basis,
            Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

impl ImportResult {
    fn record(&mut self, kind: &str, id: &str, outcome: Result<bool>) {
        match outcome {
            Ok(true) => self.imported += 1,
            Ok(false) => self.duplicates += 1,
            Err(e) => {
                log::warn!("Skipping {} {}: {}", kind, id, e);
                self.errors.push(format!("{} {}: {}", kind, id, e));
            }
        }
    }
}

// Each import_* helper returns Ok(false) when the record is already stored.

fn import_trade(conn: &Connection, trade: &Trade) -> Result<bool> {
    trade.validate()?;
    if record_exists(conn, "trades", &trade.id)? {
        return Ok(false);
    }
    insert_trade(conn, trade)?;
    Ok(true)
}

fn import_reflection(conn: &Connection, reflection: &WeeklyReflection) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO weekly_reflections \
         (id, week_end_date, reflection, pnl, currency, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            reflection.id,
            reflection.week_end_date,
            reflection.reflection,
            reflection.pnl,
            reflection.currency,
            reflection.created_at,
            reflection.updated_at
        ],
    )?;
    Ok(inserted > 0)
}

fn import_journal(conn: &Connection, journal: &DailyJournal) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO daily_journals (id, date, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
        params![
            journal.id,
            journal.date,
            journal.content,
            journal.created_at,
            journal.updated_at
        ],
    )?;
    Ok(inserted > 0)
}

fn import_event(conn: &Connection, event: &EconomicEvent) -> Result<bool> {
    if record_exists(conn, "economic_events", &event.id)? {
        return Ok(false);
    }
    insert_event(conn, event)?;
    Ok(true)
}

/// Import data from a JSON backup.
///
/// Records whose id (or, for journals and reflections, whose day) is already
/// stored are counted as duplicates and left untouched. Trades that fail the
/// same checks as a new trade are reported in `errors` and skipped. Settings
/// from the backup replace the current ones.
pub fn import_all_data(db: &Database, json_data: &str) -> Result<ImportResult> {
    let backup: BackupData = serde_json::from_str(json_data)?;
    if backup.version != BACKUP_VERSION {
        log::warn!("Importing backup version {} into {}", backup.version, BACKUP_VERSION);
    }

    let mut conn = db.conn()?;
    let tx = conn.transaction()?;
    let mut result = ImportResult::default();

    if let Some(settings) = &backup.settings {
        apply_settings(&tx, settings)?;
    }

    for trade in &backup.trades {
        result.record("trade", &trade.id, import_trade(&tx, trade));
    }
    for reflection in &backup.weekly_reflections {
        let outcome = import_reflection(&tx, reflection);
        result.record("weekly reflection", &reflection.id, outcome);
    }
    for journal in &backup.daily_journals {
        result.record("daily journal", &journal.id, import_journal(&tx, journal));
    }
    for event in &backup.economic_events {
        result.record("economic event", &event.id, import_event(&tx, event));
    }

    tx.commit()?;

    log::info!(
        "Import finished: {} imported, {} duplicates, {} errors",
        result.imported,
        result.duplicates,
        result.errors.len()
    );

    Ok(result)
}

#[derive(Debug, Serialize)]
struct TradeCsvRow<'a> {
    id: &'a str,
    date: NaiveDate,
    ticker: &'a str,
    direction: Direction,
    outcome: Outcome,
    risk_r: f64,
    potential_r: f64,
    actual_r: f64,
    r_value: f64,
    pnl: f64,
    currency: Currency,
    followed_plan: bool,
    entry_reason: &'a str,
    exit_reason: &'a str,
}

impl<'a> From<&'a Trade> for TradeCsvRow<'a> {
    fn from(trade: &'a Trade) -> Self {
        Self {
            id: &trade.id,
            date: trade.date,
            ticker: &trade.ticker,
            direction: trade.direction,
            outcome: trade.outcome,
            risk_r: trade.risk_r,
            potential_r: trade.potential_r,
            actual_r: trade.actual_r,
            r_value: trade.r_value,
            pnl: trade.pnl,
            currency: trade.currency,
            followed_plan: trade.reflection.followed_plan,
            entry_reason: &trade.entry_reason,
            exit_reason: &trade.exit_reason,
        }
    }
}

/// Flat CSV of the trades in `range`, or of every trade when no range is given.
pub fn export_trades_csv(db: &Database, range: Option<&DateRange>) -> Result<String> {
    let trades = {
        let conn = db.conn()?;
        match range {
            Some(range) => query_trades_in_range(&conn, range)?,
            None => query_all_trades(&conn)?,
        }
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    for trade in &trades {
        writer.serialize(TradeCsvRow::from(trade))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| JournalError::IoError(e.into_error()))?;

    log::info!("Exported {} trades to CSV", trades.len());
    String::from_utf8(bytes).map_err(|e| JournalError::ValidationError(e.to_string()))
}
