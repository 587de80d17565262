use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::trade::Currency;
use crate::engine::{EngineConfig, WinRateBasis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: i32,
    pub default_currency: Currency,
    pub week_starts_on: Weekday,
    pub win_rate_basis: WinRateBasis,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            week_starts_on: self.week_starts_on,
            default_currency: self.default_currency,
            win_rate_basis: self.win_rate_basis,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub default_currency: Option<Currency>,
    pub week_starts_on: Option<Weekday>,
    pub win_rate_basis: Option<WinRateBasis>,
}
