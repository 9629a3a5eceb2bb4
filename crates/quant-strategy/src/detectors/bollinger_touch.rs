//! 볼린저 밴드 터치 탐지기.

use quant_core::{Bar, IndicatorSnapshot, Signal, StrategyParams};
use quant_indicator::{keys, IndicatorSet};
use rust_decimal::prelude::ToPrimitive;

use crate::traits::{PositionView, SignalDetector};

/// 볼린저 밴드 상/하단 터치 평균회귀.
///
/// - 종가 ≤ 하단 밴드 + 무포지션 → 매수
/// - 종가 ≥ 상단 밴드 + 포지션 보유 → 매도
///
/// 밴드가 완전히 수축한 구간(σ=0)에서는 신호를 내지 않습니다.
#[derive(Debug, Default)]
pub struct BollingerTouchDetector;

impl SignalDetector for BollingerTouchDetector {
    fn name(&self) -> &'static str {
        "bollinger_touch"
    }

    fn description(&self) -> &'static str {
        "볼린저 밴드 상/하단 터치"
    }

    fn detect(
        &self,
        _params: &StrategyParams,
        indicators: &IndicatorSet,
        bars: &[Bar],
        index: usize,
        position: &PositionView,
    ) -> Option<Signal> {
        let upper = indicators.value(keys::BOLL_UPPER, index)?;
        let middle = indicators.value(keys::BOLL_MIDDLE, index)?;
        let lower = indicators.value(keys::BOLL_LOWER, index)?;

        // 밴드 폭이 0이면 평균회귀 판단 불가
        let band_width = upper - lower;
        if band_width.is_zero() {
            return None;
        }

        let bar = &bars[index];
        let close = bar.close;
        let snapshot = IndicatorSnapshot::new()
            .with_bollinger(Some(upper), Some(middle), Some(lower))
            .with_close(close);

        if close <= lower && !position.has_position() {
            // 하단 이탈 폭이 클수록 강한 신호
            let depth = ((lower - close) / band_width).to_f64().unwrap_or(0.0);
            return Some(
                Signal::buy(self.name(), index, bar.time)
                    .with_strength((0.6 + depth).min(1.0))
                    .with_reason("볼린저 하단 밴드 터치")
                    .with_snapshot(snapshot),
            );
        }

        if close >= upper && position.has_position() {
            let depth = ((close - upper) / band_width).to_f64().unwrap_or(0.0);
            return Some(
                Signal::sell(self.name(), index, bar.time)
                    .with_strength((0.6 + depth).min(1.0))
                    .with_reason("볼린저 상단 밴드 터치")
                    .with_snapshot(snapshot),
            );
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use quant_core::{ParamValue, SignalAction};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn make_bars(closes: &[Decimal]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar::new(t0 + Duration::days(i as i64), *c, *c, *c, *c, dec!(10000)))
            .collect()
    }

    fn params() -> StrategyParams {
        StrategyParams::new().with("boll_period", ParamValue::Int(10))
    }

    #[test]
    fn test_lower_band_touch_buy() {
        // 좁은 박스권 후 급락 → 하단 밴드 이탈
        let mut closes: Vec<Decimal> = (0..12)
            .map(|i| dec!(100) + Decimal::from(i % 3))
            .collect();
        closes.push(dec!(80));
        let bars = make_bars(&closes);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = BollingerTouchDetector;

        let signal = detector
            .detect(&params, &indicators, &bars, 12, &PositionView::flat())
            .expect("하단 터치 신호 누락");
        assert_eq!(signal.action, SignalAction::Buy);
        assert!(signal.snapshot.boll_lower.is_some());
    }

    #[test]
    fn test_upper_band_touch_sell() {
        let mut closes: Vec<Decimal> = (0..12)
            .map(|i| dec!(100) + Decimal::from(i % 3))
            .collect();
        closes.push(dec!(120));
        let bars = make_bars(&closes);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = BollingerTouchDetector;

        let holding = PositionView::holding(100, dec!(100));
        let signal = detector
            .detect(&params, &indicators, &bars, 12, &holding)
            .expect("상단 터치 신호 누락");
        assert_eq!(signal.action, SignalAction::Sell);
    }

    #[test]
    fn test_collapsed_band_no_signal() {
        // 변동 없는 시계열 → 밴드 폭 0 → 신호 없음
        let closes = vec![dec!(100); 15];
        let bars = make_bars(&closes);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = BollingerTouchDetector;

        assert!(detector
            .detect(&params, &indicators, &bars, 14, &PositionView::flat())
            .is_none());
    }
}
