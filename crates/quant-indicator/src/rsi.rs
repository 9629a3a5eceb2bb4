//! 상대강도지수 (RSI).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// RSI 중립값. 윈도우가 차기 전 구간에서 반환됩니다.
pub const RSI_NEUTRAL: Decimal = dec!(50);

/// 상대강도지수.
///
/// 최근 `period`개 등락의 단순(비평활) 평균으로 계산합니다:
/// `RSI = 100 − 100 / (1 + avg_gain / avg_loss)`.
///
/// - 윈도우가 차기 전(인덱스 < period)에는 중립값 50
/// - `avg_loss = 0`이면 100
/// - `period = 0`이면 전 구간 중립값
pub fn rsi(prices: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 {
        return vec![RSI_NEUTRAL; prices.len()];
    }

    let divisor = Decimal::from(period as u64);
    let mut out = Vec::with_capacity(prices.len());
    let mut gains: Vec<Decimal> = Vec::with_capacity(prices.len());
    let mut losses: Vec<Decimal> = Vec::with_capacity(prices.len());

    for (i, price) in prices.iter().enumerate() {
        if i > 0 {
            let change = *price - prices[i - 1];
            gains.push(change.max(Decimal::ZERO));
            losses.push((-change).max(Decimal::ZERO));
        }

        if i < period {
            out.push(RSI_NEUTRAL);
            continue;
        }

        // 최근 period개 등락의 단순 평균
        let window_start = gains.len() - period;
        let avg_gain: Decimal = gains[window_start..].iter().sum::<Decimal>() / divisor;
        let avg_loss: Decimal = losses[window_start..].iter().sum::<Decimal>() / divisor;

        if avg_loss.is_zero() {
            out.push(dec!(100));
        } else {
            let rs = avg_gain / avg_loss;
            out.push(dec!(100) - dec!(100) / (Decimal::ONE + rs));
        }
    }

    out
}
