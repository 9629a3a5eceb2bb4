//! 체결 기록과 자산 곡선 포인트.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cost::CostBreakdown;
use super::lot::LotCalculation;

/// 매매 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 체결 1건.
///
/// 원장에 추가된 이후에는 불변이며, `id`는 실행 내에서 단조 증가합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// 실행 내 단조 증가 ID (1부터)
    pub id: u64,
    /// 체결 시각 (캔들 시각)
    pub time: DateTime<Utc>,
    /// 방향
    pub side: Side,
    /// 신호 가격 (슬리피지 적용 전)
    pub signal_price: Decimal,
    /// 체결 가격 (슬리피지 적용 후)
    pub execution_price: Decimal,
    /// 슬리피지 금액 (체결가 − 신호가, 매도는 음수)
    pub slippage: Decimal,
    /// 체결 수량
    pub quantity: u64,
    /// 약정 금액 (체결가 × 수량)
    pub notional: Decimal,
    /// 비용 내역
    pub costs: CostBreakdown,
    /// 매매단위 정렬 내역 (매수만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lots: Option<LotCalculation>,
    /// 체결 전 현금
    pub cash_before: Decimal,
    /// 체결 후 현금
    pub cash_after: Decimal,
    /// 체결 전 보유 수량
    pub position_before: u64,
    /// 체결 후 보유 수량
    pub position_after: u64,
    /// 실현 손익 (매도만, 비용 차감 후)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<Decimal>,
    /// 실현 수익률 (%, 진입 원가 대비, 매도만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_pct: Option<Decimal>,
    /// 보유 일수 (매도만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_days: Option<i64>,
    /// 체결 사유 (신호 사유 또는 `force_close`)
    pub reason: String,
}

/// 자산 곡선 포인트. 시뮬레이션 캔들 1개당 정확히 1개 생성됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// 캔들 시각
    pub time: DateTime<Utc>,
    /// 총 자산 (현금 + 보유 수량 × 종가)
    pub equity: Decimal,
    /// 현금
    pub cash: Decimal,
    /// 보유 수량
    pub position_quantity: u64,
    /// 최고점 대비 낙폭 (%)
    pub drawdown_pct: Decimal,
}
