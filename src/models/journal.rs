use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::trade::Currency;

/// Free-text review of a week, stored with the week-to-date result it was written against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReflection {
    pub id: String,
    pub week_end_date: NaiveDate,
    pub reflection: String,
    pub pnl: f64,
    pub currency: Currency,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyJournal {
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicEvent {
    pub id: String,
    pub date: NaiveDate,
    pub indicator: String,
    pub actual: Option<f64>,
    pub previous: Option<f64>,
    pub forecast: Option<f64>,
    pub currency: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicEventInput {
    pub date: NaiveDate,
    pub indicator: String,
    #[serde(default)]
    pub actual: Option<f64>,
    #[serde(default)]
    pub previous: Option<f64>,
    #[serde(default)]
    pub forecast: Option<f64>,
    pub currency: String,
}

/// Events grouped by `yyyy-MM-dd` day key.
pub type EconomicEvents = BTreeMap<String, Vec<EconomicEvent>>;
