use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::period::{DateRange, TradeStore};
use super::EngineConfig;
use crate::models::{Currency, Direction, Outcome, Trade};

/// Denominator used for win rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinRateBasis {
    /// wins / (wins + losses); breakeven trades are left out.
    #[default]
    Decisive,
    /// wins / every trade in the list.
    AllTrades,
}

impl WinRateBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinRateBasis::Decisive => "decisive",
            WinRateBasis::AllTrades => "all_trades",
        }
    }
}

impl std::str::FromStr for WinRateBasis {
    type Err = crate::error::JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decisive" => Ok(WinRateBasis::Decisive),
            "all_trades" | "all" => Ok(WinRateBasis::AllTrades),
            _ => Err(crate::error::JournalError::invalid("win_rate_basis", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DirectionStats {
    pub count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub breakeven_count: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub breakeven_count: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    /// Currency of the first trade; totals across mixed currencies are not converted.
    pub currency: Currency,
    pub long_stats: DirectionStats,
    pub short_stats: DirectionStats,
}

fn win_rate(tally: &DirectionStats, basis: WinRateBasis) -> f64 {
    let denominator = match basis {
        WinRateBasis::Decisive => tally.win_count + tally.loss_count,
        WinRateBasis::AllTrades => tally.count,
    };
    if denominator > 0 {
        tally.win_count as f64 / denominator as f64
    } else {
        0.0
    }
}

fn tally<'a>(trades: impl Iterator<Item = &'a Trade>, basis: WinRateBasis) -> DirectionStats {
    let mut stats = DirectionStats::default();
    for trade in trades {
        stats.count += 1;
        match trade.outcome {
            Outcome::Win => stats.win_count += 1,
            Outcome::Loss => stats.loss_count += 1,
            Outcome::Breakeven => stats.breakeven_count += 1,
        }
        // Stored pnl, breakeven included
        stats.total_pnl += trade.pnl;
    }
    stats.win_rate = win_rate(&stats, basis);
    stats
}

/// Reduces a trade list with the default configuration.
pub fn calculate_statistics(trades: &[Trade]) -> StatisticsSummary {
    calculate_statistics_with(trades, &EngineConfig::default())
}

pub fn calculate_statistics_with(trades: &[Trade], config: &EngineConfig) -> StatisticsSummary {
    let basis = config.win_rate_basis;
    let overall = tally(trades.iter(), basis);
    let long_stats = tally(trades.iter().filter(|t| t.direction == Direction::Long), basis);
    let short_stats = tally(trades.iter().filter(|t| t.direction == Direction::Short), basis);

    StatisticsSummary {
        count: overall.count,
        win_count: overall.win_count,
        loss_count: overall.loss_count,
        breakeven_count: overall.breakeven_count,
        win_rate: overall.win_rate,
        total_pnl: overall.total_pnl,
        currency: trades
            .first()
            .map(|t| t.currency)
            .unwrap_or(config.default_currency),
        long_stats,
        short_stats,
    }
}

/// Performance figures beyond the win/loss summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeMetrics {
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_actual_r: f64,
    pub followed_plan_rate: f64,
}

pub fn calculate_metrics(trades: &[Trade]) -> TradeMetrics {
    if trades.is_empty() {
        return TradeMetrics::default();
    }

    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl)
        .sum::<f64>()
        .abs();

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let best_trade = trades.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max);
    let worst_trade = trades.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min);

    let count = trades.len() as f64;
    let avg_actual_r = trades.iter().map(|t| t.actual_r).sum::<f64>() / count;
    let followed = trades.iter().filter(|t| t.reflection.followed_plan).count();

    TradeMetrics {
        gross_profit,
        gross_loss,
        profit_factor,
        best_trade,
        worst_trade,
        avg_actual_r,
        followed_plan_rate: followed as f64 / count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    pub cumulative_pnl: f64,
    pub daily_pnl: f64,
    pub trade_count: usize,
}

/// Running P&L over the days in `range` that have trades.
pub fn equity_curve<S: TradeStore + ?Sized>(store: &S, range: &DateRange) -> Vec<EquityCurvePoint> {
    let mut cumulative_pnl = 0.0;
    let mut result = Vec::new();

    for date in range.days() {
        let trades = store.trades_on(date);
        if trades.is_empty() {
            continue;
        }

        let daily_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        cumulative_pnl += daily_pnl;
        result.push(EquityCurvePoint {
            date,
            cumulative_pnl,
            daily_pnl,
            trade_count: trades.len(),
        });
    }

    result
}
