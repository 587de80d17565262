use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::commands::events::{group_by_day, query_events};
use crate::commands::journal::journal_exists;
use crate::commands::settings::query_settings;
use crate::commands::trades::query_trades_in_range;
use crate::db::Database;
use crate::engine::{
    calculate_metrics, calculate_statistics_with, calendar_day, calendar_events_range,
    day_cell_range, equity_curve, select_range, select_trades, CalendarDay, DateRange,
    EngineConfig, EquityCurvePoint, PeriodKind, StatisticsSummary, TradeMetrics,
};
use crate::error::Result;
use crate::models::{DailyTrades, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecap {
    pub kind: PeriodKind,
    pub anchor: NaiveDate,
    pub range: DateRange,
    pub trades: Vec<Trade>,
    pub stats: StatisticsSummary,
    pub metrics: TradeMetrics,
}

/// Settings and the trades of the range they select, read through one connection guard.
struct Snapshot {
    config: EngineConfig,
    range: DateRange,
    daily: DailyTrades,
}

fn load_snapshot<F>(conn: &Connection, select: F) -> Result<Snapshot>
where
    F: FnOnce(&EngineConfig) -> DateRange,
{
    let config = query_settings(conn)?.engine_config();
    let range = select(&config);
    let daily = query_trades_in_range(conn, &range)?.into_iter().collect();
    Ok(Snapshot {
        config,
        range,
        daily,
    })
}

pub fn build_recap(
    daily: &DailyTrades,
    anchor: NaiveDate,
    kind: PeriodKind,
    config: &EngineConfig,
) -> PeriodRecap {
    let selection = select_trades(daily, anchor, kind, config);
    let stats = calculate_statistics_with(&selection.trades, config);
    let metrics = calculate_metrics(&selection.trades);

    PeriodRecap {
        kind,
        anchor,
        range: selection.range,
        trades: selection.trades,
        stats,
        metrics,
    }
}

pub fn get_period_stats(db: &Database, anchor: NaiveDate, kind: PeriodKind) -> Result<PeriodRecap> {
    let snapshot = {
        let conn = db.conn()?;
        load_snapshot(&conn, |config| select_range(anchor, kind, config))?
    };

    let recap = build_recap(&snapshot.daily, anchor, kind, &snapshot.config);
    log::info!(
        "{} recap for {}: {} trades, win rate {:.1}%, pnl {:.2} {}",
        kind,
        anchor,
        recap.stats.count,
        recap.stats.win_rate * 100.0,
        recap.stats.total_pnl,
        recap.stats.currency
    );

    Ok(recap)
}

pub fn get_equity_curve(db: &Database, range: &DateRange) -> Result<Vec<EquityCurvePoint>> {
    let snapshot = {
        let conn = db.conn()?;
        load_snapshot(&conn, |_| *range)?
    };
    Ok(equity_curve(&snapshot.daily, &snapshot.range))
}

/// What the calendar shows for `date`: trade summary, journal flag and event counts.
pub fn get_day_cell(db: &Database, date: NaiveDate) -> Result<CalendarDay> {
    let (snapshot, has_journal, events) = {
        let conn = db.conn()?;
        let snapshot = load_snapshot(&conn, |config| day_cell_range(date, config))?;
        let has_journal = journal_exists(&conn, date)?;
        let events = query_events(&conn, Some(&calendar_events_range(date)))?;
        (snapshot, has_journal, group_by_day(events))
    };

    Ok(calendar_day(
        &snapshot.daily,
        date,
        &snapshot.config,
        has_journal,
        &events,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::events::add_economic_event;
    use crate::commands::journal::save_daily_journal;
    use crate::commands::settings::update_settings;
    use crate::commands::test_support::{sample_input, test_db};
    use crate::commands::trades::{create_trade, get_trades};
    use crate::engine::{DayCell, WinRateBasis};
    use crate::models::{
        Currency, Direction, EconomicEventInput, Outcome, TradeFilters, UpdateSettingsInput,
    };
    use chrono::{Datelike, Weekday};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(db: &Database) {
        // Week of Monday 2024-05-13
        create_trade(db, sample_input(day(2024, 5, 13), Outcome::Win, 5.0)).unwrap();
        create_trade(db, sample_input(day(2024, 5, 15), Outcome::Loss, -3.0)).unwrap();
        let mut short = sample_input(day(2024, 5, 16), Outcome::Win, 1.5);
        short.direction = Direction::Short;
        create_trade(db, short).unwrap();
        create_trade(db, sample_input(day(2024, 5, 17), Outcome::Breakeven, 0.0)).unwrap();
        let mut eur = sample_input(day(2024, 5, 2), Outcome::Loss, -1.0);
        eur.currency = Currency::Eur;
        create_trade(db, eur).unwrap();
    }

    #[test]
    fn test_week_to_date_recap() {
        let db = test_db();
        seed(&db);

        let recap = get_period_stats(&db, day(2024, 5, 15), PeriodKind::Week).unwrap();
        assert_eq!(recap.range, DateRange::new(day(2024, 5, 13), day(2024, 5, 15)));
        assert_eq!(recap.trades.len(), 2);
        assert_eq!(recap.stats.win_count, 1);
        assert_eq!(recap.stats.loss_count, 1);
        assert_eq!(recap.stats.win_rate, 0.5);
        assert_eq!(recap.stats.total_pnl, 200.0);

        let full_week = get_period_stats(&db, day(2024, 5, 19), PeriodKind::Week).unwrap();
        assert_eq!(full_week.stats.count, 4);
        assert_eq!(full_week.stats.breakeven_count, 1);
        assert!((full_week.stats.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(full_week.stats.short_stats.count, 1);
    }

    #[test]
    fn test_month_and_day_recaps() {
        let db = test_db();
        seed(&db);

        let month = get_period_stats(&db, day(2024, 5, 9), PeriodKind::Month).unwrap();
        assert_eq!(month.stats.count, 5);
        // The earliest trade in May is the EUR one
        assert_eq!(month.stats.currency, Currency::Eur);
        assert_eq!(month.metrics.gross_profit, 650.0);

        let single = get_period_stats(&db, day(2024, 5, 16), PeriodKind::Day).unwrap();
        assert_eq!(single.trades.len(), 1);
        assert_eq!(single.stats.short_stats.win_rate, 1.0);

        let empty = get_period_stats(&db, day(2024, 7, 1), PeriodKind::Day).unwrap();
        assert_eq!(empty.stats.count, 0);
        assert_eq!(empty.stats.currency, Currency::Usd);
    }

    #[test]
    fn test_recap_uses_stored_settings() {
        let db = test_db();
        seed(&db);
        update_settings(
            &db,
            UpdateSettingsInput {
                week_starts_on: Some(Weekday::Wed),
                win_rate_basis: Some(WinRateBasis::AllTrades),
                ..UpdateSettingsInput::default()
            },
        )
        .unwrap();

        let recap = get_period_stats(&db, day(2024, 5, 17), PeriodKind::Week).unwrap();
        assert_eq!(recap.range.start, day(2024, 5, 15));
        assert_eq!(recap.stats.count, 3);
        assert!((recap.stats.win_rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_recaps_are_identical() {
        let db = test_db();
        seed(&db);
        let first = get_period_stats(&db, day(2024, 5, 31), PeriodKind::Month).unwrap();
        let second = get_period_stats(&db, day(2024, 5, 31), PeriodKind::Month).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_equity_curve_and_day_cell() {
        let db = test_db();
        seed(&db);

        let week = DateRange::new(day(2024, 5, 13), day(2024, 5, 19));
        let curve = get_equity_curve(&db, &week).unwrap();
        let cumulative: Vec<f64> = curve.iter().map(|p| p.cumulative_pnl).collect();
        assert_eq!(cumulative, vec![500.0, 200.0, 350.0, 350.0]);

        match get_day_cell(&db, day(2024, 5, 19)).unwrap().cell {
            DayCell::WeekSummary { stats, .. } => assert_eq!(stats.total_pnl, 350.0),
            other => panic!("expected week summary, got {:?}", other),
        }
    }

    #[test]
    fn test_day_cell_carries_journal_and_events() {
        let db = test_db();
        seed(&db);
        save_daily_journal(&db, day(2024, 5, 15), "Stopped out twice").unwrap();
        for (date, indicator) in [
            (day(2024, 5, 15), "CPI"),
            (day(2024, 5, 21), "FOMC minutes"),
            (day(2024, 5, 24), "Durable goods"),
        ] {
            add_economic_event(
                &db,
                EconomicEventInput {
                    date,
                    indicator: indicator.to_string(),
                    actual: None,
                    previous: None,
                    forecast: None,
                    currency: "USD".to_string(),
                },
            )
            .unwrap();
        }

        let wednesday = get_day_cell(&db, day(2024, 5, 15)).unwrap();
        assert!(wednesday.has_journal);
        assert_eq!(wednesday.event_count, 1);
        assert_eq!(
            wednesday.cell,
            DayCell::Day {
                pnl: -300.0,
                trade_count: 1,
                currency: Currency::Usd
            }
        );

        let sunday = get_day_cell(&db, day(2024, 5, 19)).unwrap();
        assert!(!sunday.has_journal);
        assert_eq!(sunday.upcoming_event_count, Some(2));
    }

    fn assert_recap_matches_store(db: &Database, recap: &PeriodRecap) {
        let stored = get_trades(
            db,
            &TradeFilters {
                start_date: Some(recap.range.start),
                end_date: Some(recap.range.end),
                ..TradeFilters::default()
            },
        )
        .unwrap();
        let mut recap_ids: Vec<&str> = recap.trades.iter().map(|t| t.id.as_str()).collect();
        let mut stored_ids: Vec<&str> = stored.iter().map(|t| t.id.as_str()).collect();
        recap_ids.sort_unstable();
        stored_ids.sort_unstable();
        assert_eq!(recap_ids, stored_ids, "recap over {:?}", recap.range);
    }

    #[test]
    fn test_recap_trades_match_store_for_reported_range() {
        let db = test_db();
        seed(&db);
        for start in [Weekday::Mon, Weekday::Thu, Weekday::Sun] {
            update_settings(
                &db,
                UpdateSettingsInput {
                    week_starts_on: Some(start),
                    ..UpdateSettingsInput::default()
                },
            )
            .unwrap();
            let recap = get_period_stats(&db, day(2024, 5, 17), PeriodKind::Week).unwrap();
            assert_eq!(recap.range.start.weekday(), start);
            assert_recap_matches_store(&db, &recap);
        }
    }

    #[test]
    fn test_recap_consistent_while_week_start_changes() {
        let db = test_db();
        seed(&db);
        let done = AtomicBool::new(false);

        thread::scope(|scope| {
            scope.spawn(|| {
                let starts = [Weekday::Mon, Weekday::Thu].into_iter().cycle();
                for start in starts.take(100_000) {
                    if done.load(Ordering::Relaxed) {
                        break;
                    }
                    let input = UpdateSettingsInput {
                        week_starts_on: Some(start),
                        ..UpdateSettingsInput::default()
                    };
                    update_settings(&db, input).unwrap();
                }
            });

            for _ in 0..500 {
                let recap = get_period_stats(&db, day(2024, 5, 17), PeriodKind::Week).unwrap();
                let expected = if recap.range.start == day(2024, 5, 13) { 4 } else { 2 };
                assert_eq!(recap.trades.len(), expected, "recap over {:?}", recap.range);
            }
            done.store(true, Ordering::Relaxed);
        });
    }
}
