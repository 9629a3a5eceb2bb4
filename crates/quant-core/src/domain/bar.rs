//! OHLCV 캔들(Bar) 타입과 시계열 검증.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 캔들 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// 1분봉
    M1,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 일봉
    #[default]
    D1,
    /// 주봉
    W1,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        };
        write!(f, "{}", s)
    }
}

/// 고정 주기 OHLCV 캔들 1개.
///
/// 생성 이후 불변이며, 시계열은 시간 오름차순 + 타임스탬프 중복 없음을
/// 전제로 합니다 ([`validate_series`] 참고).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 캔들 시각
    pub time: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Bar {
    /// 새 캔들을 생성합니다.
    pub fn new(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 외부 피드의 `f64` 값으로부터 캔들을 생성합니다.
    ///
    /// NaN/무한대가 섞여 있으면 [`CoreError::InvalidInput`]으로 거부합니다.
    /// 지표 계산 전에 수행되는 유일한 부동소수점 → Decimal 경계입니다.
    pub fn from_f64(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CoreError> {
        let convert = |name: &str, v: f64| -> Result<Decimal, CoreError> {
            if !v.is_finite() {
                return Err(CoreError::invalid_input(format!(
                    "{} 값이 유한하지 않습니다: {}",
                    name, v
                )));
            }
            Decimal::try_from(v)
                .map_err(|e| CoreError::invalid_input(format!("{} 변환 실패: {}", name, e)))
        };

        Ok(Self {
            time,
            open: convert("open", open)?,
            high: convert("high", high)?,
            low: convert("low", low)?,
            close: convert("close", close)?,
            volume: convert("volume", volume)?,
        })
    }

    /// OHLC 순서가 올바른지 확인합니다.
    ///
    /// `high`가 시/종/저가보다 낮거나 `low`가 시/종/고가보다 높으면 false.
    pub fn is_ohlc_consistent(&self) -> bool {
        let body_max = self.open.max(self.close);
        let body_min = self.open.min(self.close);
        self.high >= body_max && self.low <= body_min && self.high >= self.low
    }
}

/// 캔들 시계열을 검증합니다.
///
/// 비어 있거나, 시간이 단조 증가하지 않거나, 타임스탬프가 중복되면
/// [`CoreError::InvalidInput`]을 반환합니다. 실행 루프는 어떤 부수효과도
/// 만들기 전에 이 검증을 통과해야 합니다.
///
/// OHLC 순서 위반은 여기서 거부하지 않습니다. 해당 캔들은
/// [`MarketStatus::Abnormal`](super::MarketStatus::Abnormal)로 분류되어
/// 실행에서 제외될 뿐, 실행 자체는 계속됩니다.
pub fn validate_series(bars: &[Bar]) -> Result<(), CoreError> {
    if bars.is_empty() {
        return Err(CoreError::invalid_input("캔들 시계열이 비어 있습니다"));
    }

    for (i, window) in bars.windows(2).enumerate() {
        if window[1].time <= window[0].time {
            return Err(CoreError::invalid_input(format!(
                "캔들 시간이 오름차순이 아닙니다: index {} ({}) >= index {} ({})",
                i,
                window[0].time,
                i + 1,
                window[1].time
            )));
        }
    }

    Ok(())
}
