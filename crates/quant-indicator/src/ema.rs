//! 지수 이동평균 (EMA).

use rust_decimal::Decimal;

/// 지수 이동평균.
///
/// `ema[0] = prices[0]`,
/// `ema[i] = (prices[i] − ema[i−1]) × k + ema[i−1]`, `k = 2/(period+1)`.
/// 첫 값부터 정의되므로 반환 시퀀스에 `None`이 없습니다.
pub fn ema(prices: &[Decimal], period: usize) -> Vec<Decimal> {
    if prices.is_empty() {
        return vec![];
    }

    let k = Decimal::TWO / Decimal::from(period as u64 + 1);
    let mut out = Vec::with_capacity(prices.len());
    let mut prev = prices[0];
    out.push(prev);

    for price in &prices[1..] {
        prev = (*price - prev) * k + prev;
        out.push(prev);
    }

    out
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_ema_seed_is_first_price() {
        let prices = vec![dec!(10), dec!(11), dec!(12)];
        let out = ema(&prices, 2);
        assert_eq!(out[0], dec!(10));
    }

    #[test]
    fn test_ema_recurrence() {
        // period=1 → k=1 → EMA는 가격 자체를 따라감
        let prices = vec![dec!(10), dec!(20), dec!(30)];
        assert_eq!(ema(&prices, 1), prices);
    }

    #[test]
    fn test_ema_known_values() {
        // period=3 → k=0.5
        let prices = vec![dec!(10), dec!(14), dec!(12)];
        let out = ema(&prices, 3);
        assert_eq!(out[1], dec!(12)); // (14-10)*0.5+10
        assert_eq!(out[2], dec!(12)); // (12-12)*0.5+12
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 5).is_empty());
    }

    #[test]
    fn test_ema_constant_series() {
        let prices = vec![dec!(5); 10];
        assert!(ema(&prices, 4).iter().all(|v| *v == dec!(5)));
    }
}
