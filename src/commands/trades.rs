use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::engine::DateRange;
use crate::error::{JournalError, Result};
use crate::models::{CreateTradeInput, DailyTrades, Emotions, Reflection, Trade, TradeFilters};

const TRADE_COLUMNS: &str = "id, date, ticker, direction, risk_r, potential_r, r_value, currency, \
     outcome, actual_r, pnl, entry_reason, exit_reason, what_went_wrong, what_went_right, \
     followed_plan, emotion_before, emotion_during, emotion_after, screenshot, created_at, \
     updated_at";

/// Helper function to map a database row to a Trade struct
pub(crate) fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        date: row.get(1)?,
        ticker: row.get(2)?,
        direction: row.get(3)?,
        risk_r: row.get(4)?,
        potential_r: row.get(5)?,
        r_value: row.get(6)?,
        currency: row.get(7)?,
        outcome: row.get(8)?,
        actual_r: row.get(9)?,
        pnl: row.get(10)?,
        entry_reason: row.get(11)?,
        exit_reason: row.get(12)?,
        reflection: Reflection {
            what_went_wrong: row.get(13)?,
            what_went_right: row.get(14)?,
            followed_plan: row.get(15)?,
            emotions: Emotions {
                before: row.get(16)?,
                during: row.get(17)?,
                after: row.get(18)?,
            },
        },
        screenshot: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

pub(crate) fn insert_trade(conn: &Connection, trade: &Trade) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO trades ({}) VALUES \
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRADE_COLUMNS
        ),
        params![
            trade.id,
            trade.date,
            trade.ticker,
            trade.direction,
            trade.risk_r,
            trade.potential_r,
            trade.r_value,
            trade.currency,
            trade.outcome,
            trade.actual_r,
            trade.pnl,
            trade.entry_reason,
            trade.exit_reason,
            trade.reflection.what_went_wrong,
            trade.reflection.what_went_right,
            trade.reflection.followed_plan,
            trade.reflection.emotions.before,
            trade.reflection.emotions.during,
            trade.reflection.emotions.after,
            trade.screenshot,
            trade.created_at,
            trade.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn query_trade(conn: &Connection, id: &str) -> Result<Option<Trade>> {
    let trade = conn
        .query_row(
            &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
            [id],
            map_row_to_trade,
        )
        .optional()?;
    Ok(trade)
}

pub(crate) fn query_trades_in_range(conn: &Connection, range: &DateRange) -> Result<Vec<Trade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades WHERE date >= ? AND date <= ? ORDER BY date ASC, rowid ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map(params![range.start, range.end], map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<Trade>>>()?;
    Ok(trades)
}

/// Every stored trade in date order.
pub(crate) fn query_all_trades(conn: &Connection) -> Result<Vec<Trade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades ORDER BY date ASC, rowid ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map([], map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<Trade>>>()?;
    Ok(trades)
}

fn new_trade_id() -> String {
    format!("TRADE-{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4())
}

pub fn create_trade(db: &Database, input: CreateTradeInput) -> Result<Trade> {
    input.validate()?;

    let trade = Trade::from_input(new_trade_id(), input, Utc::now().timestamp());
    {
        let conn = db.conn()?;
        insert_trade(&conn, &trade)?;
    }

    log::info!(
        "Created trade {} ({} {} {}, pnl {:.2} {})",
        trade.id,
        trade.date,
        trade.ticker,
        trade.outcome,
        trade.pnl,
        trade.currency
    );

    Ok(trade)
}

pub fn get_trade(db: &Database, id: &str) -> Result<Trade> {
    let conn = db.conn()?;
    query_trade(&conn, id)?.ok_or_else(|| JournalError::NotFound(format!("trade {}", id)))
}

pub fn get_trades(db: &Database, filters: &TradeFilters) -> Result<Vec<Trade>> {
    let conn = db.conn()?;

    let mut query = format!("SELECT {} FROM trades WHERE 1=1", TRADE_COLUMNS);
    let mut conditions = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(start_date) = filters.start_date {
        conditions.push("date >= ?");
        values.push(Box::new(start_date));
    }
    if let Some(end_date) = filters.end_date {
        conditions.push("date <= ?");
        values.push(Box::new(end_date));
    }
    if let Some(ticker) = &filters.ticker {
        conditions.push("ticker LIKE ?");
        values.push(Box::new(format!("%{}%", ticker)));
    }
    if let Some(direction) = filters.direction {
        conditions.push("direction = ?");
        values.push(Box::new(direction));
    }
    if let Some(outcome) = filters.outcome {
        conditions.push("outcome = ?");
        values.push(Box::new(outcome));
    }

    if !conditions.is_empty() {
        query.push_str(&format!(" AND {}", conditions.join(" AND ")));
    }

    query.push_str(" ORDER BY date DESC, rowid ASC");

    if let (Some(page), Some(limit)) = (filters.page, filters.limit) {
        let offset = (page.max(1) - 1) * limit;
        query.push_str(" LIMIT ? OFFSET ?");
        values.push(Box::new(limit));
        values.push(Box::new(offset));
    }

    let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<Trade>>>()?;

    Ok(trades)
}

/// Replaces a trade's content; the id and creation time are kept and pnl is fixed again
/// from the new values.
pub fn update_trade(db: &Database, id: &str, input: CreateTradeInput) -> Result<Trade> {
    input.validate()?;

    let conn = db.conn()?;
    let existing =
        query_trade(&conn, id)?.ok_or_else(|| JournalError::NotFound(format!("trade {}", id)))?;

    let mut trade = Trade::from_input(existing.id, input, Utc::now().timestamp());
    trade.created_at = existing.created_at;

    conn.execute(
        "UPDATE trades SET date = ?, ticker = ?, direction = ?, risk_r = ?, potential_r = ?,
            r_value = ?, currency = ?, outcome = ?, actual_r = ?, pnl = ?, entry_reason = ?,
            exit_reason = ?, what_went_wrong = ?, what_went_right = ?, followed_plan = ?,
            emotion_before = ?, emotion_during = ?, emotion_after = ?, screenshot = ?,
            updated_at = ?
         WHERE id = ?",
        params![
            trade.date,
            trade.ticker,
            trade.direction,
            trade.risk_r,
            trade.potential_r,
            trade.r_value,
            trade.currency,
            trade.outcome,
            trade.actual_r,
            trade.pnl,
            trade.entry_reason,
            trade.exit_reason,
            trade.reflection.what_went_wrong,
            trade.reflection.what_went_right,
            trade.reflection.followed_plan,
            trade.reflection.emotions.before,
            trade.reflection.emotions.during,
            trade.reflection.emotions.after,
            trade.screenshot,
            trade.updated_at,
            trade.id,
        ],
    )?;

    log::info!("Updated trade {}", trade.id);

    Ok(trade)
}

pub fn delete_trade(db: &Database, id: &str) -> Result<()> {
    let conn = db.conn()?;
    let deleted = conn.execute("DELETE FROM trades WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(JournalError::NotFound(format!("trade {}", id)));
    }
    log::info!("Deleted trade {}", id);
    Ok(())
}

/// Snapshot of the trades in `range`, grouped by day in entry order.
pub fn load_daily_trades(db: &Database, range: &DateRange) -> Result<DailyTrades> {
    let conn = db.conn()?;
    let trades = query_trades_in_range(&conn, range)?;
    log::debug!("Loaded {} trades for {} .. {}", trades.len(), range.start, range.end);
    Ok(trades.into_iter().collect())
}

pub fn get_trades_on(db: &Database, date: NaiveDate) -> Result<Vec<Trade>> {
    let conn = db.conn()?;
    query_trades_in_range(&conn, &DateRange::single(date))
}
