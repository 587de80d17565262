//! SQLite text mappings for the journal enums.

use std::str::FromStr;

use chrono::Weekday;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::engine::WinRateBasis;
use crate::models::{Currency, Direction, Outcome};

macro_rules! sql_text_enum {
    ($($ty:ty),*) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let text = value.as_str()?;
                    <$ty>::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )*
    };
}

sql_text_enum!(Direction, Outcome, Currency, WinRateBasis);

/// Weekdays are stored by their short English name ("Mon").
pub fn weekday_to_sql(day: Weekday) -> String {
    day.to_string()
}

pub fn weekday_from_sql(text: &str) -> rusqlite::Result<Weekday> {
    Weekday::from_str(text).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("invalid weekday: {}", text).into(),
        )
    })
}
