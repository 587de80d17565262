//! Routing for the journal calendar: what opens when a day is clicked and
//! what a day cell summarises. Kept apart from the reduction so that the
//! engine never sees presentation state.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::period::{
    flatten_trades, select_month, select_week, select_week_ahead, DateRange, TradeStore,
};
use super::statistics::{calculate_statistics_with, StatisticsSummary};
use super::EngineConfig;
use crate::models::{date_key, Currency, EconomicEvents};

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RecapView {
    #[default]
    Closed,
    DailyRecap,
    WeeklyReflection,
    MonthlyRecap,
    AddTrade,
    EditTrade { trade_id: String },
}

/// View opened by clicking a calendar day. Month end wins over the weekday rules.
pub fn recap_view_for(date: NaiveDate) -> RecapView {
    if is_last_day_of_month(date) {
        return RecapView::MonthlyRecap;
    }

    match date.weekday() {
        Weekday::Sun => RecapView::WeeklyReflection,
        _ => RecapView::DailyRecap,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarState {
    selected_date: Option<NaiveDate>,
    view: RecapView,
}

impl CalendarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn view(&self) -> &RecapView {
        &self.view
    }

    pub fn click_day(&mut self, date: NaiveDate) -> &RecapView {
        self.selected_date = Some(date);
        self.view = recap_view_for(date);
        &self.view
    }

    /// Saturday's daily recap hands over to the weekly reflection.
    pub fn open_weekly_reflection(&mut self) -> bool {
        let on_saturday = self.selected_date.map(|d| d.weekday()) == Some(Weekday::Sat);
        if on_saturday && self.view == RecapView::DailyRecap {
            self.view = RecapView::WeeklyReflection;
            return true;
        }
        false
    }

    /// Trades cannot be added from a Sunday, which is reserved for the week review.
    pub fn open_add_trade(&mut self) -> bool {
        match self.selected_date {
            Some(date) if date.weekday() != Weekday::Sun => {
                self.view = RecapView::AddTrade;
                true
            }
            _ => false,
        }
    }

    pub fn edit_trade(&mut self, trade_id: impl Into<String>) -> bool {
        if self.selected_date.is_none() {
            return false;
        }
        self.view = RecapView::EditTrade {
            trade_id: trade_id.into(),
        };
        true
    }

    /// Closes whatever is open; the selected day is kept.
    pub fn close(&mut self) {
        self.view = RecapView::Closed;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayCell {
    Empty,
    Day {
        pnl: f64,
        trade_count: usize,
        currency: Currency,
    },
    WeekSummary {
        range: DateRange,
        stats: StatisticsSummary,
    },
    MonthSummary {
        range: DateRange,
        stats: StatisticsSummary,
    },
}

/// What a calendar cell shows for `date`.
///
/// The month summary on the last day of the month takes precedence. Saturday
/// shows the week to date; Sunday shows the week that ended the day before.
pub fn day_cell<S: TradeStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    config: &EngineConfig,
) -> DayCell {
    let summarize = |range: DateRange| {
        let trades = flatten_trades(store, &range);
        calculate_statistics_with(&trades, config)
    };

    if is_last_day_of_month(date) {
        let range = select_month(date);
        return DayCell::MonthSummary {
            range,
            stats: summarize(range),
        };
    }

    match date.weekday() {
        Weekday::Sat => {
            let range = select_week(date, config.week_starts_on);
            DayCell::WeekSummary {
                range,
                stats: summarize(range),
            }
        }
        Weekday::Sun => {
            let saturday = date.pred_opt().unwrap_or(date);
            let range = select_week(saturday, config.week_starts_on);
            DayCell::WeekSummary {
                range,
                stats: summarize(range),
            }
        }
        _ => {
            let trades = store.trades_on(date);
            match trades.first() {
                None => DayCell::Empty,
                Some(first) => DayCell::Day {
                    pnl: trades.iter().map(|t| t.pnl).sum(),
                    trade_count: trades.len(),
                    currency: first.currency,
                },
            }
        }
    }
}

/// Range the calendar needs loaded to render `date`'s cell.
pub fn day_cell_range(date: NaiveDate, config: &EngineConfig) -> DateRange {
    let saturday = if date.weekday() == Weekday::Sun {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    };
    select_month(date).union(&select_week(saturday, config.week_starts_on))
}

/// A calendar cell together with its journal and economic event markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub cell: DayCell,
    pub has_journal: bool,
    pub event_count: usize,
    /// Events in the week ahead, only on Sundays that are not a month end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_event_count: Option<usize>,
}

fn shows_week_ahead(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun && !is_last_day_of_month(date)
}

/// Range of economic events the calendar needs loaded to render `date`.
pub fn calendar_events_range(date: NaiveDate) -> DateRange {
    if shows_week_ahead(date) {
        select_week_ahead(date)
    } else {
        DateRange::single(date)
    }
}

pub fn calendar_day<S: TradeStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    config: &EngineConfig,
    has_journal: bool,
    events: &EconomicEvents,
) -> CalendarDay {
    let count_on = |day: NaiveDate| events.get(&date_key(day)).map_or(0, Vec::len);

    let upcoming_event_count = shows_week_ahead(date)
        .then(|| select_week_ahead(date).days().map(count_on).sum());

    CalendarDay {
        date,
        cell: day_cell(store, date, config),
        has_journal,
        event_count: count_on(date),
        upcoming_event_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyTrades, Direction, EconomicEvent, Outcome, Reflection, Trade};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trade(id: &str, date: NaiveDate, direction: Direction, pnl: f64) -> Trade {
        Trade {
            id: id.to_string(),
            date,
            ticker: "DAX".to_string(),
            direction,
            risk_r: 1.0,
            potential_r: 2.0,
            r_value: 50.0,
            currency: Currency::Eur,
            outcome: if pnl > 0.0 { Outcome::Win } else { Outcome::Loss },
            actual_r: pnl / 50.0,
            pnl,
            entry_reason: String::new(),
            exit_reason: String::new(),
            reflection: Reflection::default(),
            screenshot: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_recap_view_routing() {
        // May 2024: the 15th is a Wednesday, the 18th a Saturday, the 19th a Sunday
        assert_eq!(recap_view_for(day(2024, 5, 15)), RecapView::DailyRecap);
        assert_eq!(recap_view_for(day(2024, 5, 18)), RecapView::DailyRecap);
        assert_eq!(recap_view_for(day(2024, 5, 19)), RecapView::WeeklyReflection);
        assert_eq!(recap_view_for(day(2024, 5, 31)), RecapView::MonthlyRecap);
        // 2024-06-30 is a Sunday and the last day of June
        assert_eq!(recap_view_for(day(2024, 6, 30)), RecapView::MonthlyRecap);
    }

    #[test]
    fn test_state_transitions() {
        let mut state = CalendarState::new();
        assert!(!state.open_add_trade());
        assert!(!state.edit_trade("x"));

        state.click_day(day(2024, 5, 18));
        assert_eq!(state.view(), &RecapView::DailyRecap);
        assert!(state.open_weekly_reflection());
        assert_eq!(state.view(), &RecapView::WeeklyReflection);

        state.click_day(day(2024, 5, 15));
        assert!(!state.open_weekly_reflection());
        assert!(state.open_add_trade());
        assert_eq!(state.view(), &RecapView::AddTrade);

        state.close();
        assert_eq!(state.view(), &RecapView::Closed);
        assert_eq!(state.selected_date(), Some(day(2024, 5, 15)));

        assert!(state.edit_trade("TRADE-1"));
        assert_eq!(
            state.view(),
            &RecapView::EditTrade {
                trade_id: "TRADE-1".to_string()
            }
        );

        state.click_day(day(2024, 5, 19));
        assert!(!state.open_add_trade());
        assert_eq!(state.view(), &RecapView::WeeklyReflection);
    }

    #[test]
    fn test_day_cells() {
        let store: DailyTrades = vec![
            trade("mon", day(2024, 5, 13), Direction::Long, 100.0),
            trade("wed-1", day(2024, 5, 15), Direction::Short, -40.0),
            trade("wed-2", day(2024, 5, 15), Direction::Long, 10.0),
            trade("fri", day(2024, 5, 17), Direction::Short, 60.0),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::default();

        assert_eq!(
            day_cell(&store, day(2024, 5, 15), &config),
            DayCell::Day {
                pnl: -30.0,
                trade_count: 2,
                currency: Currency::Eur
            }
        );
        assert_eq!(day_cell(&store, day(2024, 5, 14), &config), DayCell::Empty);

        // Sunday reports the Monday..Saturday week that just ended
        match day_cell(&store, day(2024, 5, 19), &config) {
            DayCell::WeekSummary { range, stats } => {
                assert_eq!(range, DateRange::new(day(2024, 5, 13), day(2024, 5, 18)));
                assert_eq!(stats.total_pnl, 130.0);
                assert_eq!(stats.long_stats.count, 2);
                assert_eq!(stats.short_stats.count, 2);
            }
            other => panic!("expected week summary, got {:?}", other),
        }

        match day_cell(&store, day(2024, 5, 31), &config) {
            DayCell::MonthSummary { stats, .. } => assert_eq!(stats.count, 4),
            other => panic!("expected month summary, got {:?}", other),
        }
    }

    fn event(date: NaiveDate, indicator: &str) -> EconomicEvent {
        EconomicEvent {
            id: format!("EVENT-{}", indicator),
            date,
            indicator: indicator.to_string(),
            actual: None,
            previous: None,
            forecast: None,
            currency: "USD".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_calendar_day_markers() {
        let mut events = EconomicEvents::new();
        for e in [
            event(day(2024, 5, 15), "CPI"),
            event(day(2024, 5, 20), "PMI"),
            event(day(2024, 5, 22), "FOMC"),
            event(day(2024, 5, 25), "Retail sales"),
            event(day(2024, 5, 26), "Outside"),
        ] {
            events.entry(date_key(e.date)).or_default().push(e);
        }
        let store = DailyTrades::new();
        let config = EngineConfig::default();

        let wednesday = calendar_day(&store, day(2024, 5, 15), &config, true, &events);
        assert!(wednesday.has_journal);
        assert_eq!(wednesday.event_count, 1);
        assert_eq!(wednesday.upcoming_event_count, None);
        assert_eq!(wednesday.cell, DayCell::Empty);

        // Sunday 2024-05-19 looks ahead through Saturday 2024-05-25
        let sunday = calendar_day(&store, day(2024, 5, 19), &config, false, &events);
        assert_eq!(sunday.event_count, 0);
        assert_eq!(sunday.upcoming_event_count, Some(3));
        assert_eq!(calendar_events_range(day(2024, 5, 19)).end, day(2024, 5, 25));

        // Month end on a Sunday keeps the month summary without the week ahead
        let month_end = calendar_day(&store, day(2024, 6, 30), &config, false, &events);
        assert_eq!(month_end.upcoming_event_count, None);
        assert!(matches!(month_end.cell, DayCell::MonthSummary { .. }));
        assert_eq!(calendar_events_range(day(2024, 6, 30)), DateRange::single(day(2024, 6, 30)));
    }

    #[test]
    fn test_day_cell_range_covers_previous_week_on_sunday() {
        // 2024-09-01 is a Sunday; the week before it starts in August
        let range = day_cell_range(day(2024, 9, 1), &EngineConfig::default());
        assert_eq!(range.start, day(2024, 8, 26));
        assert_eq!(range.end, day(2024, 9, 30));
    }
}
