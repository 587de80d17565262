use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};

/// Storage and lookup key format for a trading day.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT)
        .map_err(|_| JournalError::invalid("date", key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl FromStr for Direction {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            _ => Err(JournalError::invalid("direction", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Breakeven => "breakeven",
        }
    }
}

impl FromStr for Outcome {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" => Ok(Outcome::Win),
            "loss" => Ok(Outcome::Loss),
            "breakeven" | "be" => Ok(Outcome::Breakeven),
            _ => Err(JournalError::invalid("outcome", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl FromStr for Currency {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err(JournalError::invalid("currency", s)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Direction, Outcome, Currency);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Emotions {
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub during: String,
    #[serde(default)]
    pub after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    #[serde(default)]
    pub what_went_wrong: String,
    #[serde(default)]
    pub what_went_right: String,
    #[serde(default)]
    pub followed_plan: bool,
    #[serde(default)]
    pub emotions: Emotions,
}

/// One closed position. `pnl` is fixed when the trade is created and is
/// never derived again from `r_value` and `actual_r`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub date: NaiveDate,
    pub ticker: String,
    #[serde(default)]
    pub direction: Direction,
    pub risk_r: f64,
    pub potential_r: f64,
    pub r_value: f64,
    pub currency: Currency,
    pub outcome: Outcome,
    pub actual_r: f64,
    pub pnl: f64,
    #[serde(default)]
    pub entry_reason: String,
    #[serde(default)]
    pub exit_reason: String,
    #[serde(default)]
    pub reflection: Reflection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Trade {
    /// Same checks as `CreateTradeInput::validate`, plus a finite stored `pnl`.
    /// Used for trades that arrive whole, such as backup imports.
    pub fn validate(&self) -> Result<()> {
        check_trade_fields(
            &self.ticker,
            &[
                ("risk_r", self.risk_r),
                ("potential_r", self.potential_r),
                ("r_value", self.r_value),
                ("actual_r", self.actual_r),
                ("pnl", self.pnl),
            ],
        )
    }

    /// Builds a stored trade from validated input, fixing `pnl` at this point.
    pub fn from_input(id: String, input: CreateTradeInput, now: i64) -> Self {
        let pnl = input.r_value * input.actual_r;
        Trade {
            id,
            date: input.date,
            ticker: input.ticker.trim().to_string(),
            direction: input.direction,
            risk_r: input.risk_r,
            potential_r: input.potential_r,
            r_value: input.r_value,
            currency: input.currency,
            outcome: input.outcome,
            actual_r: input.actual_r,
            pnl,
            entry_reason: input.entry_reason,
            exit_reason: input.exit_reason,
            reflection: input.reflection,
            screenshot: input.screenshot,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTradeInput {
    pub date: NaiveDate,
    pub ticker: String,
    #[serde(default)]
    pub direction: Direction,
    pub risk_r: f64,
    pub potential_r: f64,
    pub r_value: f64,
    pub currency: Currency,
    pub outcome: Outcome,
    pub actual_r: f64,
    #[serde(default)]
    pub entry_reason: String,
    #[serde(default)]
    pub exit_reason: String,
    #[serde(default)]
    pub reflection: Reflection,
    #[serde(default)]
    pub screenshot: Option<String>,
}

fn check_trade_fields(ticker: &str, numbers: &[(&str, f64)]) -> Result<()> {
    if ticker.trim().is_empty() {
        return Err(JournalError::ValidationError("ticker is required".to_string()));
    }

    for (name, value) in numbers {
        if !value.is_finite() {
            return Err(JournalError::ValidationError(format!(
                "{} must be a finite number",
                name
            )));
        }
    }

    Ok(())
}

impl CreateTradeInput {
    pub fn validate(&self) -> Result<()> {
        check_trade_fields(
            &self.ticker,
            &[
                ("risk_r", self.risk_r),
                ("potential_r", self.potential_r),
                ("r_value", self.r_value),
                ("actual_r", self.actual_r),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub ticker: Option<String>,
    pub direction: Option<Direction>,
    pub outcome: Option<Outcome>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Trades grouped by `yyyy-MM-dd` day key. Each day keeps entry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyTrades(BTreeMap<String, Vec<Trade>>);

impl DailyTrades {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trade: Trade) {
        self.0.entry(date_key(trade.date)).or_default().push(trade);
    }

    pub fn get(&self, date: NaiveDate) -> &[Trade] {
        self.get_key(&date_key(date))
    }

    pub fn get_key(&self, key: &str) -> &[Trade] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Removes a trade from its day, dropping the day when it becomes empty.
    pub fn remove(&mut self, date: NaiveDate, trade_id: &str) -> Option<Trade> {
        let key = date_key(date);
        let day = self.0.get_mut(&key)?;
        let index = day.iter().position(|t| t.id == trade_id)?;
        let removed = day.remove(index);
        if day.is_empty() {
            self.0.remove(&key);
        }
        Some(removed)
    }

    pub fn trade_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Trade> for DailyTrades {
    fn from_iter<I: IntoIterator<Item = Trade>>(iter: I) -> Self {
        let mut daily = DailyTrades::new();
        for trade in iter {
            daily.insert(trade);
        }
        daily
    }
}
