//! MACD (이동평균 수렴·확산).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ema::ema;

/// MACD 시퀀스 묶음. 세 시퀀스 모두 입력과 길이가 같습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    /// DIF = EMA(fast) − EMA(slow)
    pub dif: Vec<Decimal>,
    /// DEA = EMA(DIF, signal_period)
    pub dea: Vec<Decimal>,
    /// 히스토그램 = (DIF − DEA) × 2
    pub histogram: Vec<Decimal>,
}

/// MACD를 계산합니다. 표준 파라미터는 (12, 26, 9)입니다.
///
/// EMA가 첫 값부터 정의되므로 MACD도 전 구간에서 정의됩니다.
pub fn macd(prices: &[Decimal], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);

    let dif: Vec<Decimal> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| *f - *s)
        .collect();

    let dea = ema(&dif, signal);

    let histogram: Vec<Decimal> = dif
        .iter()
        .zip(dea.iter())
        .map(|(d, e)| (*d - *e) * Decimal::TWO)
        .collect();

    MacdSeries {
        dif,
        dea,
        histogram,
    }
}
