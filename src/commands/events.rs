use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::db::Database;
use crate::engine::{select_week_ahead, DateRange};
use crate::error::{JournalError, Result};
use crate::models::{date_key, EconomicEvent, EconomicEventInput, EconomicEvents};

fn map_row_to_event(row: &rusqlite::Row) -> rusqlite::Result<EconomicEvent> {
    Ok(EconomicEvent {
        id: row.get(0)?,
        date: row.get(1)?,
        indicator: row.get(2)?,
        actual: row.get(3)?,
        previous: row.get(4)?,
        forecast: row.get(5)?,
        currency: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const EVENT_COLUMNS: &str = "id, date, indicator, actual, previous, forecast, currency, created_at";

pub(crate) fn query_events(
    conn: &Connection,
    range: Option<&DateRange>,
) -> Result<Vec<EconomicEvent>> {
    let events = match range {
        Some(range) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM economic_events WHERE date >= ? AND date <= ? \
                 ORDER BY date ASC, rowid ASC",
                EVENT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![range.start, range.end], map_row_to_event)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM economic_events ORDER BY date ASC, rowid ASC",
                EVENT_COLUMNS
            ))?;
            let rows = stmt.query_map([], map_row_to_event)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    Ok(events)
}

pub(crate) fn insert_event(conn: &Connection, event: &EconomicEvent) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO economic_events ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            EVENT_COLUMNS
        ),
        params![
            event.id,
            event.date,
            event.indicator,
            event.actual,
            event.previous,
            event.forecast,
            event.currency,
            event.created_at
        ],
    )?;
    Ok(())
}

pub fn add_economic_event(db: &Database, input: EconomicEventInput) -> Result<EconomicEvent> {
    if input.indicator.trim().is_empty() {
        return Err(JournalError::ValidationError("indicator is required".to_string()));
    }

    let event = EconomicEvent {
        id: format!("EVENT-{}", uuid::Uuid::new_v4()),
        date: input.date,
        indicator: input.indicator.trim().to_string(),
        actual: input.actual,
        previous: input.previous,
        forecast: input.forecast,
        currency: input.currency,
        created_at: Utc::now().timestamp(),
    };

    let conn = db.conn()?;
    insert_event(&conn, &event)?;
    log::info!("Added economic event {} on {}", event.indicator, event.date);

    Ok(event)
}

pub(crate) fn group_by_day(events: Vec<EconomicEvent>) -> EconomicEvents {
    let mut grouped = EconomicEvents::new();
    for event in events {
        grouped.entry(date_key(event.date)).or_default().push(event);
    }
    grouped
}

pub fn get_economic_events(db: &Database, range: &DateRange) -> Result<EconomicEvents> {
    let conn = db.conn()?;
    Ok(group_by_day(query_events(&conn, Some(range))?))
}

/// Events for the seven days starting at `date`, as shown on the Sunday review.
pub fn week_ahead_events(db: &Database, date: NaiveDate) -> Result<(DateRange, EconomicEvents)> {
    let range = select_week_ahead(date);
    let events = get_economic_events(db, &range)?;
    Ok((range, events))
}

pub fn upcoming_event_count(events: &EconomicEvents) -> usize {
    events.values().map(Vec::len).sum()
}
