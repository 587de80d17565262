use rusqlite::Connection;

use crate::db::sql_types::{weekday_from_sql, weekday_to_sql};
use crate::db::Database;
use crate::error::Result;
use crate::models::{Settings, UpdateSettingsInput};

pub(crate) fn query_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT id, default_currency, week_starts_on, win_rate_basis, created_at, updated_at
         FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                default_currency: row.get(1)?,
                week_starts_on: weekday_from_sql(&row.get::<_, String>(2)?)?,
                win_rate_basis: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )?;

    Ok(settings)
}

pub fn get_settings(db: &Database) -> Result<Settings> {
    let conn = db.conn()?;
    query_settings(&conn)
}

pub fn update_settings(db: &Database, settings: UpdateSettingsInput) -> Result<Settings> {
    let conn = db.conn()?;

    // Build dynamic UPDATE query
    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(val) = settings.default_currency {
        updates.push("default_currency = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.week_starts_on {
        updates.push("week_starts_on = ?");
        values.push(Box::new(weekday_to_sql(val)));
    }
    if let Some(val) = settings.win_rate_basis {
        updates.push("win_rate_basis = ?");
        values.push(Box::new(val));
    }

    updates.push("updated_at = strftime('%s', 'now')");

    let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&query, params.as_slice())?;

    let updated = query_settings(&conn)?;
    log::info!(
        "Settings updated: currency={}, week starts {}, win rate basis {}",
        updated.default_currency,
        updated.week_starts_on,
        updated.win_rate_basis.as_str()
    );

    Ok(updated)
}
