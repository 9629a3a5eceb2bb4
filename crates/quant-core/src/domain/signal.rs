//! 트레이딩 신호 타입.
//!
//! 탐지기(detector)가 캔들 1개당 최대 1개의 [`Signal`]을 생성하고,
//! 실행 루프는 체결 여부와 차단 사유를 [`SignalRecord`]로 남깁니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::market_status::MarketStatus;

/// 신호가 지시하는 액션.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    /// 매수
    Buy,
    /// 매도
    Sell,
    /// 관망
    Hold,
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
            SignalAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// 신호 생성 시점의 지표 스냅샷.
///
/// 어떤 지표 값이 신호를 촉발했는지 감사할 수 있도록 신호에 함께 보관합니다.
/// 해당 시점에 정의되지 않은 지표는 `None`입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// 단기 이동평균
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma_short: Option<Decimal>,
    /// 장기 이동평균
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma_long: Option<Decimal>,
    /// RSI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<Decimal>,
    /// MACD DIF
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_dif: Option<Decimal>,
    /// MACD DEA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_dea: Option<Decimal>,
    /// MACD 히스토그램
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_hist: Option<Decimal>,
    /// 볼린저 상단
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boll_upper: Option<Decimal>,
    /// 볼린저 중단
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boll_middle: Option<Decimal>,
    /// 볼린저 하단
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boll_lower: Option<Decimal>,
    /// 거래량 이동평균
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_ma: Option<Decimal>,
    /// 신호 시점 종가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,
}

impl IndicatorSnapshot {
    /// 빈 스냅샷 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이동평균 설정.
    pub fn with_ma(mut self, short: Option<Decimal>, long: Option<Decimal>) -> Self {
        self.ma_short = short;
        self.ma_long = long;
        self
    }

    /// RSI 설정.
    pub fn with_rsi(mut self, rsi: Option<Decimal>) -> Self {
        self.rsi = rsi;
        self
    }

    /// MACD 설정.
    pub fn with_macd(
        mut self,
        dif: Option<Decimal>,
        dea: Option<Decimal>,
        hist: Option<Decimal>,
    ) -> Self {
        self.macd_dif = dif;
        self.macd_dea = dea;
        self.macd_hist = hist;
        self
    }

    /// 볼린저 밴드 설정.
    pub fn with_bollinger(
        mut self,
        upper: Option<Decimal>,
        middle: Option<Decimal>,
        lower: Option<Decimal>,
    ) -> Self {
        self.boll_upper = upper;
        self.boll_middle = middle;
        self.boll_lower = lower;
        self
    }

    /// 거래량 이동평균 설정.
    pub fn with_volume_ma(mut self, volume_ma: Option<Decimal>) -> Self {
        self.volume_ma = volume_ma;
        self
    }

    /// 종가 설정.
    pub fn with_close(mut self, close: Decimal) -> Self {
        self.close = Some(close);
        self
    }
}

/// 탐지기가 생성한 트레이딩 신호.
///
/// 병합 정책을 거친 뒤에는 캔들 1개당 최대 1개만 남습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// 고유 신호 ID
    pub id: Uuid,
    /// 액션 (매수/매도/관망)
    pub action: SignalAction,
    /// 신호 강도 (0.0 ~ 1.0, 탐지기가 제공하지 않으면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    /// 신호 사유 (사람이 읽을 수 있는 형태)
    pub reason: String,
    /// 신호를 생성한 탐지기 이름
    pub detector: String,
    /// 신호가 발생한 캔들 인덱스
    pub bar_index: usize,
    /// 신호가 발생한 캔들 시각
    pub time: DateTime<Utc>,
    /// 촉발 지표 스냅샷
    pub snapshot: IndicatorSnapshot,
}

impl Signal {
    /// 새 신호를 생성합니다.
    pub fn new(
        detector: impl Into<String>,
        action: SignalAction,
        bar_index: usize,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            strength: None,
            reason: String::new(),
            detector: detector.into(),
            bar_index,
            time,
            snapshot: IndicatorSnapshot::default(),
        }
    }

    /// 매수 신호를 생성합니다.
    pub fn buy(detector: impl Into<String>, bar_index: usize, time: DateTime<Utc>) -> Self {
        Self::new(detector, SignalAction::Buy, bar_index, time)
    }

    /// 매도 신호를 생성합니다.
    pub fn sell(detector: impl Into<String>, bar_index: usize, time: DateTime<Utc>) -> Self {
        Self::new(detector, SignalAction::Sell, bar_index, time)
    }

    /// 신호 강도를 설정합니다 (0.0 ~ 1.0으로 clamp).
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength.clamp(0.0, 1.0));
        self
    }

    /// 신호 사유를 설정합니다.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// 지표 스냅샷을 설정합니다.
    pub fn with_snapshot(mut self, snapshot: IndicatorSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// 체결 대상 신호인지 확인합니다 (매수 또는 매도).
    pub fn is_actionable(&self) -> bool {
        !matches!(self.action, SignalAction::Hold)
    }

    /// 병합/중복 제거에서 비교할 강도. 미지정이면 1.0으로 취급합니다.
    pub fn effective_strength(&self) -> f64 {
        self.strength.unwrap_or(1.0)
    }
}

/// 신호의 처리 결과 기록 (감사용).
///
/// 체결 불가 신호도 버리지 않고 사유와 함께 남깁니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    /// 원본 신호
    pub signal: Signal,
    /// 신호 발생 캔들의 시장 상태
    pub market_status: MarketStatus,
    /// 실제 체결 여부
    pub executed: bool,
    /// 체결되지 못한 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl SignalRecord {
    /// 체결된 신호 기록을 생성합니다.
    pub fn executed(signal: Signal, market_status: MarketStatus) -> Self {
        Self {
            signal,
            market_status,
            executed: false,
            block_reason: None,
        }
        .mark_executed()
    }

    /// 차단된 신호 기록을 생성합니다.
    pub fn blocked(
        signal: Signal,
        market_status: MarketStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            signal,
            market_status,
            executed: false,
            block_reason: Some(reason.into()),
        }
    }

    fn mark_executed(mut self) -> Self {
        self.executed = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_signal_builder() {
        let time = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let signal = Signal::buy("ma_crossover", 25, time)
            .with_strength(0.8)
            .with_reason("단기 이동평균 상향 돌파")
            .with_snapshot(
                IndicatorSnapshot::new()
                    .with_ma(Some(dec!(10.5)), Some(dec!(10.2)))
                    .with_close(dec!(10.6)),
            );

        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.strength, Some(0.8));
        assert_eq!(signal.bar_index, 25);
        assert!(signal.is_actionable());
        assert_eq!(signal.snapshot.ma_short, Some(dec!(10.5)));
    }

    #[test]
    fn test_strength_clamped() {
        let time = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let signal = Signal::sell("rsi_reversal", 0, time).with_strength(1.7);
        assert_eq!(signal.strength, Some(1.0));
    }

    #[test]
    fn test_effective_strength_default() {
        let time = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let signal = Signal::buy("volume_breakout", 3, time);
        assert_eq!(signal.effective_strength(), 1.0);
    }

    #[test]
    fn test_blocked_record() {
        let time = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let signal = Signal::buy("ma_crossover", 7, time);
        let record = SignalRecord::blocked(signal, MarketStatus::LimitUp, "상한가 캔들");

        assert!(!record.executed);
        assert_eq!(record.block_reason.as_deref(), Some("상한가 캔들"));
        assert_eq!(record.market_status, MarketStatus::LimitUp);
    }
}
