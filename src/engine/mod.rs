//! Pure recap engine: period selection over a trade snapshot and the
//! statistics reduction. Nothing in here performs I/O.

pub mod calendar;
pub mod period;
pub mod statistics;

pub use calendar::*;
pub use period::*;
pub use statistics::*;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::models::Currency;

/// Explicit request configuration threaded into period selection and reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub week_starts_on: Weekday,
    /// Label used when there is no trade to take a currency from.
    pub default_currency: Currency,
    pub win_rate_basis: WinRateBasis,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            week_starts_on: Weekday::Mon,
            default_currency: Currency::Usd,
            win_rate_basis: WinRateBasis::Decisive,
        }
    }
}
