use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::commands::settings::query_settings;
use crate::commands::trades::query_trades_in_range;
use crate::db::Database;
use crate::engine::{calculate_statistics_with, flatten_trades, select_week};
use crate::error::Result;
use crate::models::{DailyJournal, DailyTrades, WeeklyReflection};

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn map_row_to_journal(row: &rusqlite::Row) -> rusqlite::Result<DailyJournal> {
    Ok(DailyJournal {
        id: row.get(0)?,
        date: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn map_row_to_reflection(row: &rusqlite::Row) -> rusqlite::Result<WeeklyReflection> {
    Ok(WeeklyReflection {
        id: row.get(0)?,
        week_end_date: row.get(1)?,
        reflection: row.get(2)?,
        pnl: row.get(3)?,
        currency: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) fn query_daily_journals(conn: &Connection) -> Result<Vec<DailyJournal>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, content, created_at, updated_at
         FROM daily_journals ORDER BY date DESC",
    )?;
    let journals = stmt
        .query_map([], map_row_to_journal)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(journals)
}

pub(crate) fn query_weekly_reflections(conn: &Connection) -> Result<Vec<WeeklyReflection>> {
    let mut stmt = conn.prepare(
        "SELECT id, week_end_date, reflection, pnl, currency, created_at, updated_at
         FROM weekly_reflections ORDER BY week_end_date DESC",
    )?;
    let reflections = stmt
        .query_map([], map_row_to_reflection)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(reflections)
}

/// Creates or replaces the journal entry for `date`.
pub fn save_daily_journal(db: &Database, date: NaiveDate, content: &str) -> Result<DailyJournal> {
    let conn = db.conn()?;
    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO daily_journals (id, date, content, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(date) DO UPDATE SET
            content = excluded.content,
            updated_at = excluded.updated_at",
        params![new_id("JOURNAL"), date, content, now, now],
    )?;

    let journal = conn.query_row(
        "SELECT id, date, content, created_at, updated_at FROM daily_journals WHERE date = ?",
        [date],
        map_row_to_journal,
    )?;

    log::info!("Saved daily journal for {}", date);
    Ok(journal)
}

pub(crate) fn journal_exists(conn: &Connection, date: NaiveDate) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM daily_journals WHERE date = ?", [date], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Journal text for `date`, or an empty string when nothing was written.
pub fn get_daily_journal_content(db: &Database, date: NaiveDate) -> Result<String> {
    let conn = db.conn()?;
    let content: Option<String> = conn
        .query_row("SELECT content FROM daily_journals WHERE date = ?", [date], |row| row.get(0))
        .optional()?;
    Ok(content.unwrap_or_default())
}

pub fn get_daily_journals(db: &Database) -> Result<Vec<DailyJournal>> {
    let conn = db.conn()?;
    query_daily_journals(&conn)
}

/// Stores the reflection for the week ending on `week_end_date`, together with the
/// week-to-date P&L as of that day.
pub fn save_weekly_reflection(
    db: &Database,
    week_end_date: NaiveDate,
    reflection: &str,
) -> Result<WeeklyReflection> {
    let conn = db.conn()?;
    let config = query_settings(&conn)?.engine_config();

    let range = select_week(week_end_date, config.week_starts_on);
    let daily: DailyTrades = query_trades_in_range(&conn, &range)?.into_iter().collect();
    let stats = calculate_statistics_with(&flatten_trades(&daily, &range), &config);

    let now = Utc::now().timestamp();
    conn.execute(
        "INSERT INTO weekly_reflections
            (id, week_end_date, reflection, pnl, currency, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(week_end_date) DO UPDATE SET
            reflection = excluded.reflection,
            pnl = excluded.pnl,
            currency = excluded.currency,
            updated_at = excluded.updated_at",
        params![
            new_id("REFLECTION"),
            week_end_date,
            reflection,
            stats.total_pnl,
            stats.currency,
            now,
            now
        ],
    )?;

    let saved = conn.query_row(
        "SELECT id, week_end_date, reflection, pnl, currency, created_at, updated_at
         FROM weekly_reflections WHERE week_end_date = ?",
        [week_end_date],
        map_row_to_reflection,
    )?;

    log::info!(
        "Saved weekly reflection for week ending {} ({:.2} {})",
        week_end_date,
        saved.pnl,
        saved.currency
    );
    Ok(saved)
}

/// All weekly reflections, newest week first.
pub fn get_weekly_reflections(db: &Database) -> Result<Vec<WeeklyReflection>> {
    let conn = db.conn()?;
    query_weekly_reflections(&conn)
}
