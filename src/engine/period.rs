use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::EngineConfig;
use crate::error::JournalError;
use crate::models::{DailyTrades, Trade};

/// Read-only source of trades keyed by calendar day.
pub trait TradeStore {
    fn trades_on(&self, date: NaiveDate) -> &[Trade];
}

impl TradeStore for DailyTrades {
    fn trades_on(&self, date: NaiveDate) -> &[Trade] {
        self.get(date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Day,
    Week,
    Month,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Day => "day",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(PeriodKind::Day),
            "week" | "weekly" => Ok(PeriodKind::Week),
            "month" | "monthly" => Ok(PeriodKind::Month),
            _ => Err(JournalError::invalid("period", s)),
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// Every day from `start` through `end`; empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn len_days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(0)
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

pub fn select_day(date: NaiveDate) -> DateRange {
    DateRange::single(date)
}

/// Week-to-date: from the start of the anchor's week through the anchor itself.
pub fn select_week(date: NaiveDate, week_starts_on: Weekday) -> DateRange {
    let days_back = date.weekday().days_since(week_starts_on);
    let start = date
        .checked_sub_days(Days::new(u64::from(days_back)))
        .unwrap_or(date);
    DateRange::new(start, date)
}

/// The anchor and the six days after it, as reviewed on a Sunday.
pub fn select_week_ahead(date: NaiveDate) -> DateRange {
    let end = date.checked_add_days(Days::new(6)).unwrap_or(date);
    DateRange::new(date, end)
}

/// The whole calendar month containing the anchor.
pub fn select_month(date: NaiveDate) -> DateRange {
    let start = date.with_day(1).unwrap_or(date);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    DateRange::new(start, end)
}

pub fn select_range(anchor: NaiveDate, kind: PeriodKind, config: &EngineConfig) -> DateRange {
    match kind {
        PeriodKind::Day => select_day(anchor),
        PeriodKind::Week => select_week(anchor, config.week_starts_on),
        PeriodKind::Month => select_month(anchor),
    }
}

/// Concatenates the trades of every day in the range, oldest day first.
/// Days the store has nothing for contribute nothing.
pub fn flatten_trades<S: TradeStore + ?Sized>(store: &S, range: &DateRange) -> Vec<Trade> {
    range
        .days()
        .flat_map(|day| store.trades_on(day).iter().cloned())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSelection {
    pub kind: PeriodKind,
    pub anchor: NaiveDate,
    pub range: DateRange,
    pub trades: Vec<Trade>,
}

pub fn select_trades<S: TradeStore + ?Sized>(
    store: &S,
    anchor: NaiveDate,
    kind: PeriodKind,
    config: &EngineConfig,
) -> PeriodSelection {
    let range = select_range(anchor, kind, config);
    let trades = flatten_trades(store, &range);
    log::debug!(
        "Selected {} trades for {} {} .. {}",
        trades.len(),
        kind,
        range.start,
        range.end
    );

    PeriodSelection {
        kind,
        anchor,
        range,
        trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Direction, Outcome, Reflection};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trade(id: &str, date: NaiveDate) -> Trade {
        Trade {
            id: id.to_string(),
            date,
            ticker: "CL".to_string(),
            direction: Direction::Long,
            risk_r: 1.0,
            potential_r: 2.0,
            r_value: 100.0,
            currency: Currency::Usd,
            outcome: Outcome::Win,
            actual_r: 1.0,
            pnl: 100.0,
            entry_reason: String::new(),
            exit_reason: String::new(),
            reflection: Reflection::default(),
            screenshot: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_week_is_truncated_at_anchor() {
        // 2024-05-15 is a Wednesday
        let range = select_week(day(2024, 5, 15), Weekday::Mon);
        assert_eq!(range.start, day(2024, 5, 13));
        assert_eq!(range.end, day(2024, 5, 15));
        assert_eq!(range.len_days(), 3);
        assert_eq!(range.days().count(), 3);
    }

    #[test]
    fn test_week_edges() {
        let monday = select_week(day(2024, 5, 13), Weekday::Mon);
        assert_eq!(monday, DateRange::single(day(2024, 5, 13)));

        let sunday = select_week(day(2024, 5, 19), Weekday::Mon);
        assert_eq!(sunday.start, day(2024, 5, 13));
        assert_eq!(sunday.len_days(), 7);

        let sunday_start = select_week(day(2024, 5, 15), Weekday::Sun);
        assert_eq!(sunday_start.start, day(2024, 5, 12));

        // Crosses a month boundary
        let cross = select_week(day(2024, 6, 1), Weekday::Mon);
        assert_eq!(cross.start, day(2024, 5, 27));
    }

    #[test]
    fn test_week_starts_on_configured_day_for_every_start() {
        let anchor = day(2024, 5, 15);
        for start in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            let range = select_week(anchor, start);
            assert_eq!(range.start.weekday(), start);
            assert_eq!(range.end, anchor);
            assert!((1..=7).contains(&range.len_days()));
        }
        // Anchor on the start day itself is a single-day week
        assert_eq!(select_week(anchor, Weekday::Wed), DateRange::single(anchor));
        assert_eq!(select_week(anchor, Weekday::Thu).len_days(), 7);
    }

    #[test]
    fn test_week_ahead_spans_seven_days() {
        let range = select_week_ahead(day(2024, 5, 26));
        assert_eq!(range.end, day(2024, 6, 1));
        assert_eq!(range.days().count(), 7);
    }

    #[test]
    fn test_month_covers_whole_calendar_month() {
        assert_eq!(
            select_month(day(2024, 2, 10)),
            DateRange::new(day(2024, 2, 1), day(2024, 2, 29))
        );
        assert_eq!(
            select_month(day(2023, 12, 31)),
            DateRange::new(day(2023, 12, 1), day(2023, 12, 31))
        );
        assert_eq!(select_month(day(2024, 4, 1)).len_days(), 30);
    }

    #[test]
    fn test_day_flattening_matches_direct_lookup() {
        let store: DailyTrades = vec![
            trade("a", day(2024, 5, 14)),
            trade("b", day(2024, 5, 14)),
            trade("c", day(2024, 5, 15)),
        ]
        .into_iter()
        .collect();

        let selected = flatten_trades(&store, &select_day(day(2024, 5, 14)));
        assert_eq!(selected.as_slice(), store.get(day(2024, 5, 14)));
    }

    #[test]
    fn test_flatten_orders_by_day_and_skips_missing_days() {
        let store: DailyTrades = vec![
            trade("late", day(2024, 5, 17)),
            trade("early", day(2024, 5, 13)),
            trade("outside", day(2024, 5, 20)),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::default();
        let selection = select_trades(&store, day(2024, 5, 17), PeriodKind::Week, &config);
        let ids: Vec<&str> = selection.trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_empty_store_yields_empty_selection() {
        let store = DailyTrades::new();
        let config = EngineConfig::default();
        let selection = select_trades(&store, day(2024, 5, 17), PeriodKind::Month, &config);
        assert!(selection.trades.is_empty());
        assert_eq!(selection.range.len_days(), 31);
    }

    #[test]
    fn test_inverted_range_has_no_days() {
        let range = DateRange::new(day(2024, 5, 2), day(2024, 5, 1));
        assert_eq!(range.days().count(), 0);
        assert_eq!(range.len_days(), 0);
    }

    #[test]
    fn test_period_kind_parsing() {
        assert_eq!("Weekly".parse::<PeriodKind>().unwrap(), PeriodKind::Week);
        assert!("year".parse::<PeriodKind>().is_err());
    }
}
