//! 실행 진단.
//!
//! 비정상 캔들, 이상 수익률 같은 품질 문제를 경고로 수집합니다.
//! 경고는 실행을 실패시키지 않으며, 리포트에 첨부되어 해석을 돕습니다.

use quant_core::{MarketStatus, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 경고 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// 단일 매매 수익률이 임계값 초과
    ExtremeTradeReturn,
    /// 비정상 캔들 존재
    AbnormalBars,
    /// 거래정지 캔들 존재
    SuspendedBars,
    /// 상한/하한가 캔들 존재
    LimitBars,
    /// 체결된 매매 없음
    NoTrades,
}

/// 진단 경고 1건.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticWarning {
    /// 종류
    pub kind: WarningKind,
    /// 설명
    pub message: String,
}

/// 실행 진단 결과.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// 경고 목록
    pub warnings: Vec<DiagnosticWarning>,
}

impl Diagnostics {
    /// 경고가 없는지 확인.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// 특정 종류의 경고가 있는지 확인.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// 완료된 실행에서 진단을 수집합니다.
pub fn diagnose(
    trades: &[Trade],
    statuses: &[MarketStatus],
    extreme_return_pct: Decimal,
) -> Diagnostics {
    let mut warnings = Vec::new();

    // 이상 수익률 매매
    for trade in trades {
        if let Some(return_pct) = trade.return_pct {
            if return_pct.abs() > extreme_return_pct {
                warn!(
                    trade_id = trade.id,
                    return_pct = %return_pct,
                    threshold = %extreme_return_pct,
                    "단일 매매 이상 수익률"
                );
                warnings.push(DiagnosticWarning {
                    kind: WarningKind::ExtremeTradeReturn,
                    message: format!(
                        "매매 #{} 수익률 {}%가 임계값 ±{}%를 초과했습니다",
                        trade.id, return_pct, extreme_return_pct
                    ),
                });
            }
        }
    }

    // 캔들 품질
    let abnormal = statuses
        .iter()
        .filter(|s| **s == MarketStatus::Abnormal)
        .count();
    if abnormal > 0 {
        warnings.push(DiagnosticWarning {
            kind: WarningKind::AbnormalBars,
            message: format!("비정상 캔들 {}개가 체결에서 제외되었습니다", abnormal),
        });
    }

    let suspended = statuses
        .iter()
        .filter(|s| **s == MarketStatus::Suspended)
        .count();
    if suspended > 0 {
        warnings.push(DiagnosticWarning {
            kind: WarningKind::SuspendedBars,
            message: format!("거래정지 캔들 {}개", suspended),
        });
    }

    let limit = statuses
        .iter()
        .filter(|s| matches!(s, MarketStatus::LimitUp | MarketStatus::LimitDown))
        .count();
    if limit > 0 {
        warnings.push(DiagnosticWarning {
            kind: WarningKind::LimitBars,
            message: format!("상한/하한가 캔들 {}개", limit),
        });
    }

    if trades.is_empty() {
        warnings.push(DiagnosticWarning {
            kind: WarningKind::NoTrades,
            message: "시뮬레이션 구간에서 체결된 매매가 없습니다".to_string(),
        });
    }

    Diagnostics { warnings }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use quant_core::{CostBreakdown, Side};
    use rust_decimal_macros::dec;

    use super::*;

    fn trade_with_return(return_pct: Decimal) -> Trade {
        Trade {
            id: 1,
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            side: Side::Sell,
            signal_price: dec!(100),
            execution_price: dec!(100),
            slippage: Decimal::ZERO,
            quantity: 100,
            notional: dec!(10000),
            costs: CostBreakdown {
                commission: dec!(5),
                stamp_duty: dec!(10),
                transfer_fee: dec!(0.2),
                total: dec!(15.2),
                total_pct: dec!(0.152),
            },
            lots: None,
            cash_before: dec!(0),
            cash_after: dec!(9984.8),
            position_before: 100,
            position_after: 0,
            pnl: Some(dec!(100)),
            return_pct: Some(return_pct),
            holding_days: Some(3),
            reason: "테스트".to_string(),
        }
    }

    #[test]
    fn test_extreme_return_flagged() {
        let trades = vec![trade_with_return(dec!(80))];
        let diag = diagnose(&trades, &[MarketStatus::Normal], dec!(50));
        assert!(diag.has(WarningKind::ExtremeTradeReturn));
    }

    #[test]
    fn test_normal_return_not_flagged() {
        let trades = vec![trade_with_return(dec!(8))];
        let diag = diagnose(&trades, &[MarketStatus::Normal], dec!(50));
        assert!(!diag.has(WarningKind::ExtremeTradeReturn));
        assert!(diag.is_clean());
    }

    #[test]
    fn test_bar_quality_warnings() {
        let trades = vec![trade_with_return(dec!(1))];
        let statuses = vec![
            MarketStatus::Normal,
            MarketStatus::Abnormal,
            MarketStatus::Suspended,
            MarketStatus::LimitUp,
        ];
        let diag = diagnose(&trades, &statuses, dec!(50));
        assert!(diag.has(WarningKind::AbnormalBars));
        assert!(diag.has(WarningKind::SuspendedBars));
        assert!(diag.has(WarningKind::LimitBars));
    }

    #[test]
    fn test_no_trades_warning() {
        let diag = diagnose(&[], &[MarketStatus::Normal], dec!(50));
        assert!(diag.has(WarningKind::NoTrades));
    }
}
