//! 캔들 단위 시장 상태 분류.
//!
//! 신호가 발생해도 해당 캔들이 `Normal`이 아니면 체결할 수 없습니다.
//! 분류 결과는 실행을 중단시키지 않고, 감사 기록과 진단 경고로만 남습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::bar::Bar;

/// 상한가/하한가 판정 허용 오차 (변화율 절대값 기준 0.1%).
///
/// 가격 호가 단위 반올림 때문에 등락률이 제한폭에 정확히 일치하지 않는
/// 경우를 흡수합니다.
pub const LIMIT_TOLERANCE: Decimal = dec!(0.001);

/// 캔들 1개의 시장 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    /// 정상 거래
    Normal,
    /// 거래정지 (거래량 0)
    Suspended,
    /// 상한가
    LimitUp,
    /// 하한가
    LimitDown,
    /// 비정상 데이터 (OHLC 순서 위반, 0 이하 가격 등)
    Abnormal,
}

impl MarketStatus {
    /// 신호를 체결할 수 있는 상태인지 확인합니다.
    pub fn is_tradable(&self) -> bool {
        matches!(self, MarketStatus::Normal)
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketStatus::Normal => "normal",
            MarketStatus::Suspended => "suspended",
            MarketStatus::LimitUp => "limit_up",
            MarketStatus::LimitDown => "limit_down",
            MarketStatus::Abnormal => "abnormal",
        };
        write!(f, "{}", s)
    }
}

/// 캔들 1개를 분류합니다.
///
/// 판정 순서: 거래정지 → 상한/하한 → 비정상 → 정상.
/// 첫 캔들은 전일 종가가 없으므로 상한/하한 판정이 불가능합니다.
///
/// # 인자
///
/// * `bar` - 분류할 캔들
/// * `prev_close` - 직전 캔들 종가 (첫 캔들이면 None)
/// * `limit_rate` - 가격 제한폭 (예: 0.1 = ±10%)
pub fn classify_bar(bar: &Bar, prev_close: Option<Decimal>, limit_rate: Decimal) -> MarketStatus {
    if bar.volume.is_zero() {
        return MarketStatus::Suspended;
    }

    if let Some(prev) = prev_close {
        if prev > Decimal::ZERO {
            let change_ratio = (bar.close - prev) / prev;
            let threshold = limit_rate - LIMIT_TOLERANCE;

            if change_ratio >= threshold {
                return MarketStatus::LimitUp;
            }
            if change_ratio <= -threshold {
                return MarketStatus::LimitDown;
            }
        }
    }

    let has_non_positive_price = bar.open <= Decimal::ZERO
        || bar.high <= Decimal::ZERO
        || bar.low <= Decimal::ZERO
        || bar.close <= Decimal::ZERO;

    if has_non_positive_price || bar.volume < Decimal::ZERO || !bar.is_ohlc_consistent() {
        return MarketStatus::Abnormal;
    }

    MarketStatus::Normal
}

/// 시계열 전체를 분류합니다.
///
/// 반환 벡터는 입력과 같은 길이이며 인덱스가 정렬되어 있습니다.
pub fn classify_series(bars: &[Bar], limit_rate: Decimal) -> Vec<MarketStatus> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = if i > 0 { Some(bars[i - 1].close) } else { None };
            classify_bar(bar, prev_close, limit_rate)
        })
        .collect()
}
