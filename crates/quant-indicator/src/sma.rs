//! 단순 이동평균 (SMA).

use rust_decimal::Decimal;

/// 후행 단순 이동평균.
///
/// 인덱스 `period-1` 이전에는 윈도우가 차지 않으므로 `None`입니다.
/// `period`가 0이면 전 구간 `None`을 반환합니다.
pub fn sma(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    if period == 0 {
        return vec![None; prices.len()];
    }

    let divisor = Decimal::from(period as u64);
    let mut out = Vec::with_capacity(prices.len());
    let mut window_sum = Decimal::ZERO;

    for (i, price) in prices.iter().enumerate() {
        window_sum += *price;
        if i >= period {
            window_sum -= prices[i - period];
        }

        if i + 1 >= period {
            out.push(Some(window_sum / divisor));
        } else {
            out.push(None);
        }
    }

    out
}
