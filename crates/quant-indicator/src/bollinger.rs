//! 볼린저 밴드.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::sma::sma;

/// 볼린저 밴드 시퀀스 묶음. 세 시퀀스 모두 입력과 길이가 같습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerSeries {
    /// 상단 밴드 (middle + mult × σ)
    pub upper: Vec<Option<Decimal>>,
    /// 중단 밴드 (SMA)
    pub middle: Vec<Option<Decimal>>,
    /// 하단 밴드 (middle − mult × σ)
    pub lower: Vec<Option<Decimal>>,
}

/// 볼린저 밴드를 계산합니다. 표준 파라미터는 (20, 2)입니다.
///
/// 중단은 SMA(period), 밴드는 후행 윈도우의 모집단 표준편차 기준입니다.
/// 윈도우가 차기 전(인덱스 < period−1)에는 `None`입니다.
pub fn bollinger(prices: &[Decimal], period: usize, mult: Decimal) -> BollingerSeries {
    let middle = sma(prices, period);
    let mut upper = Vec::with_capacity(prices.len());
    let mut lower = Vec::with_capacity(prices.len());

    for (i, mid) in middle.iter().enumerate() {
        match mid {
            Some(mean) => {
                let window = &prices[i + 1 - period..=i];
                let std_dev = population_std_dev(window, *mean);
                upper.push(Some(*mean + mult * std_dev));
                lower.push(Some(*mean - mult * std_dev));
            }
            None => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollingerSeries {
        upper,
        middle,
        lower,
    }
}

/// 모집단 표준편차 (n 분모).
fn population_std_dev(window: &[Decimal], mean: Decimal) -> Decimal {
    if window.is_empty() {
        return Decimal::ZERO;
    }

    let variance = window
        .iter()
        .map(|p| {
            let d = *p - mean;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(window.len() as u64);

    variance.sqrt().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_bollinger_undefined_before_window() {
        let prices: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let out = bollinger(&prices, 20, dec!(2));
        assert!(out.middle[18].is_none());
        assert!(out.upper[18].is_none());
        assert!(out.middle[19].is_some());
        assert!(out.upper[19].is_some());
    }

    #[test]
    fn test_bollinger_constant_series_collapses() {
        // 변동이 없으면 σ=0 → 세 밴드가 일치
        let prices = vec![dec!(10); 25];
        let out = bollinger(&prices, 20, dec!(2));
        assert_eq!(out.upper[24], Some(dec!(10)));
        assert_eq!(out.middle[24], Some(dec!(10)));
        assert_eq!(out.lower[24], Some(dec!(10)));
    }

    #[test]
    fn test_bollinger_symmetric_around_middle() {
        let prices: Vec<Decimal> = (1..=40).map(|i| Decimal::from(i % 7 + 10)).collect();
        let out = bollinger(&prices, 20, dec!(2));
        for i in 19..prices.len() {
            let (u, m, l) = (
                out.upper[i].unwrap(),
                out.middle[i].unwrap(),
                out.lower[i].unwrap(),
            );
            assert!(u >= m && m >= l);
            // 상·하단이 중단 기준 대칭
            assert!(((u - m) - (m - l)).abs() < dec!(0.0000001));
        }
    }

    #[test]
    fn test_population_std_dev() {
        // [2, 4, 4, 4, 5, 5, 7, 9]의 모집단 σ = 2
        let window: Vec<Decimal> = [2, 4, 4, 4, 5, 5, 7, 9]
            .iter()
            .map(|v| Decimal::from(*v))
            .collect();
        let mean = dec!(5);
        let std_dev = population_std_dev(&window, mean);
        assert!((std_dev - dec!(2)).abs() < dec!(0.0000001));
    }
}
