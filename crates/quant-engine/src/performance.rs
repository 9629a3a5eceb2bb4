//! 성과 통계.
//!
//! 완료된 체결 원장과 자산 곡선에서 한 번만 계산합니다.
//! 금액/퍼센트 값은 Decimal, 무차원 비율(샤프, 소르티노, 프로핏 팩터)은
//! f64를 사용합니다.

use quant_core::{DecimalExt, EquityPoint, Side, Trade};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;

/// 수익 지표.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// 최종 자산
    pub final_equity: Decimal,
    /// 순손익
    pub net_profit: Decimal,
    /// 총 수익률 (%)
    pub total_return_pct: Decimal,
    /// 연율화 수익률 (%, 기하평균)
    pub annualized_return_pct: Decimal,
}

/// 리스크 지표.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 최대 낙폭 (%)
    pub max_drawdown_pct: Decimal,
    /// 연율화 변동성
    pub annualized_volatility: f64,
    /// 샤프 비율
    pub sharpe_ratio: f64,
    /// 소르티노 비율 (하방 편차 기준)
    pub sortino_ratio: f64,
}

/// 매매 지표.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingMetrics {
    /// 총 체결 수 (매수 + 매도)
    pub total_trades: usize,
    /// 완결 매매 수 (매도 체결 기준)
    pub round_trips: usize,
    /// 수익 매매 수
    pub winning_trades: usize,
    /// 손실 매매 수
    pub losing_trades: usize,
    /// 승률 (%)
    pub win_rate_pct: Decimal,
    /// 프로핏 팩터 (총이익 / 총손실)
    pub profit_factor: f64,
    /// 평균 수익 (수익 매매)
    pub avg_win: Decimal,
    /// 평균 손실 (손실 매매, 음수)
    pub avg_loss: Decimal,
    /// 최대 단일 수익
    pub largest_win: Decimal,
    /// 최대 단일 손실
    pub largest_loss: Decimal,
    /// 최대 연속 수익 횟수
    pub max_consecutive_wins: usize,
    /// 최대 연속 손실 횟수
    pub max_consecutive_losses: usize,
    /// 평균 보유 일수
    pub avg_holding_days: f64,
    /// 총 거래 비용 (수수료 + 인지세 + 과호비)
    pub total_costs: Decimal,
    /// 총 슬리피지 비용
    pub total_slippage: Decimal,
}

/// 수익률 분포 버킷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// 구간 라벨 (예: "0% ~ 2%")
    pub label: String,
    /// 하한 (%, 없으면 -∞)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_pct: Option<Decimal>,
    /// 상한 (%, 없으면 +∞)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_pct: Option<Decimal>,
    /// 매매 수
    pub count: usize,
}

/// 성과 통계 묶음.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// 수익 지표
    pub return_metrics: ReturnMetrics,
    /// 리스크 지표
    pub risk_metrics: RiskMetrics,
    /// 매매 지표
    pub trading_metrics: TradingMetrics,
    /// 수익률 분포 히스토그램
    pub return_histogram: Vec<HistogramBucket>,
}

/// 완료된 원장에서 성과 통계를 계산합니다.
pub fn compute(
    config: &BacktestConfig,
    trades: &[Trade],
    equity_curve: &[EquityPoint],
) -> PerformanceSummary {
    PerformanceSummary {
        return_metrics: return_metrics(config, equity_curve),
        risk_metrics: risk_metrics(config, equity_curve),
        trading_metrics: trading_metrics(trades),
        return_histogram: return_histogram(trades),
    }
}

fn return_metrics(config: &BacktestConfig, equity_curve: &[EquityPoint]) -> ReturnMetrics {
    let initial = config.initial_capital;
    let final_equity = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(initial)
        .to_currency();
    let net_profit = (final_equity - initial).to_currency();
    let total_return_pct = net_profit
        .safe_div(initial, Decimal::ZERO)
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
        .to_percent();

    // 연율화: (최종/초기)^(연간 거래일 / 캔들 수) − 1
    let annualized_return_pct = {
        let bars = equity_curve.len();
        let growth = final_equity.safe_div(initial, Decimal::ONE).to_f64().unwrap_or(1.0);
        if bars == 0 || growth <= 0.0 {
            Decimal::ZERO
        } else {
            let exponent = f64::from(config.annual_trading_days) / bars as f64;
            let annualized = (growth.powf(exponent) - 1.0) * 100.0;
            Decimal::try_from(annualized)
                .map(|d| d.to_percent())
                .unwrap_or(Decimal::ZERO)
        }
    };

    ReturnMetrics {
        final_equity,
        net_profit,
        total_return_pct,
        annualized_return_pct,
    }
}

fn risk_metrics(config: &BacktestConfig, equity_curve: &[EquityPoint]) -> RiskMetrics {
    let max_drawdown_pct = equity_curve
        .iter()
        .map(|p| p.drawdown_pct)
        .max()
        .unwrap_or(Decimal::ZERO);

    // 캔들 단위 단순 수익률
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].equity.to_f64()?;
            let curr = w[1].equity.to_f64()?;
            if prev > 0.0 {
                Some(curr / prev - 1.0)
            } else {
                None
            }
        })
        .collect();

    if returns.len() < 2 {
        return RiskMetrics {
            max_drawdown_pct,
            annualized_volatility: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
        };
    }

    let n = returns.len() as f64;
    let annual_days = f64::from(config.annual_trading_days);
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let rf_per_bar = config.risk_free_rate / annual_days;
    let excess = mean - rf_per_bar;

    let annualized_volatility = std_dev * annual_days.sqrt();
    let sharpe_ratio = if std_dev > 0.0 {
        excess / std_dev * annual_days.sqrt()
    } else {
        0.0
    };

    // 하방 편차만 사용
    let downside_variance = returns
        .iter()
        .map(|r| r.min(0.0).powi(2))
        .sum::<f64>()
        / n;
    let downside_dev = downside_variance.sqrt();
    let sortino_ratio = if downside_dev > 0.0 {
        excess / downside_dev * annual_days.sqrt()
    } else {
        0.0
    };

    RiskMetrics {
        max_drawdown_pct,
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
    }
}

fn trading_metrics(trades: &[Trade]) -> TradingMetrics {
    let closed: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.side == Side::Sell && t.pnl.is_some())
        .collect();

    let pnls: Vec<Decimal> = closed.iter().filter_map(|t| t.pnl).collect();
    let wins: Vec<Decimal> = pnls.iter().copied().filter(|p| *p > Decimal::ZERO).collect();
    let losses: Vec<Decimal> = pnls.iter().copied().filter(|p| *p < Decimal::ZERO).collect();

    let gross_profit: Decimal = wins.iter().sum();
    let gross_loss: Decimal = -losses.iter().sum::<Decimal>();

    let win_rate_pct = if pnls.is_empty() {
        Decimal::ZERO
    } else {
        (Decimal::from(wins.len() as u64) / Decimal::from(pnls.len() as u64)
            * Decimal::ONE_HUNDRED)
            .to_percent()
    };

    let profit_factor = if gross_loss.is_zero() {
        if gross_profit.is_zero() {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
    };

    let avg_win = gross_profit
        .safe_div(Decimal::from(wins.len().max(1) as u64), Decimal::ZERO)
        .to_currency();
    let avg_loss = losses
        .iter()
        .sum::<Decimal>()
        .safe_div(Decimal::from(losses.len().max(1) as u64), Decimal::ZERO)
        .to_currency();

    let largest_win = wins.iter().copied().max().unwrap_or(Decimal::ZERO);
    let largest_loss = losses.iter().copied().min().unwrap_or(Decimal::ZERO);

    let (max_consecutive_wins, max_consecutive_losses) = consecutive_streaks(&pnls);

    let holding: Vec<i64> = closed.iter().filter_map(|t| t.holding_days).collect();
    let avg_holding_days = if holding.is_empty() {
        0.0
    } else {
        holding.iter().sum::<i64>() as f64 / holding.len() as f64
    };

    let total_costs: Decimal = trades.iter().map(|t| t.costs.total).sum();
    let total_slippage: Decimal = trades.iter().map(|t| t.slippage.abs()).sum();

    TradingMetrics {
        total_trades: trades.len(),
        round_trips: closed.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate_pct,
        profit_factor,
        avg_win,
        avg_loss,
        largest_win,
        largest_loss,
        max_consecutive_wins,
        max_consecutive_losses,
        avg_holding_days,
        total_costs: total_costs.to_currency(),
        total_slippage: total_slippage.to_currency(),
    }
}

/// 최대 연속 수익/손실 횟수.
fn consecutive_streaks(pnls: &[Decimal]) -> (usize, usize) {
    let mut max_wins = 0usize;
    let mut max_losses = 0usize;
    let mut current_wins = 0usize;
    let mut current_losses = 0usize;

    for pnl in pnls {
        if *pnl > Decimal::ZERO {
            current_wins += 1;
            current_losses = 0;
        } else if *pnl < Decimal::ZERO {
            current_losses += 1;
            current_wins = 0;
        } else {
            current_wins = 0;
            current_losses = 0;
        }
        max_wins = max_wins.max(current_wins);
        max_losses = max_losses.max(current_losses);
    }

    (max_wins, max_losses)
}

/// 고정 버킷 경계 (%).
const BUCKET_EDGES: [(&str, Option<Decimal>, Option<Decimal>); 8] = [
    ("-10% 이하", None, Some(dec!(-10))),
    ("-10% ~ -5%", Some(dec!(-10)), Some(dec!(-5))),
    ("-5% ~ -2%", Some(dec!(-5)), Some(dec!(-2))),
    ("-2% ~ 0%", Some(dec!(-2)), Some(dec!(0))),
    ("0% ~ 2%", Some(dec!(0)), Some(dec!(2))),
    ("2% ~ 5%", Some(dec!(2)), Some(dec!(5))),
    ("5% ~ 10%", Some(dec!(5)), Some(dec!(10))),
    ("10% 초과", Some(dec!(10)), None),
];

/// 완결 매매 수익률(%)의 고정 버킷 분포.
///
/// 구간은 하한 초과, 상한 이하로 셉니다 (0%는 "-2% ~ 0%" 구간).
pub fn return_histogram(trades: &[Trade]) -> Vec<HistogramBucket> {
    let returns: Vec<Decimal> = trades.iter().filter_map(|t| t.return_pct).collect();

    BUCKET_EDGES
        .iter()
        .map(|(label, lower, upper)| {
            let count = returns
                .iter()
                .filter(|r| {
                    let above = lower.map(|l| **r > l).unwrap_or(true);
                    let below = upper.map(|u| **r <= u).unwrap_or(true);
                    above && below
                })
                .count();
            HistogramBucket {
                label: (*label).to_string(),
                lower_pct: *lower,
                upper_pct: *upper,
                count,
            }
        })
        .collect()
}
