//! MACD 히스토그램 부호 전환 탐지기.

use quant_core::{Bar, IndicatorSnapshot, Signal, StrategyParams};
use quant_indicator::{keys, IndicatorSet};
use rust_decimal::Decimal;

use crate::traits::{PositionView, SignalDetector};

/// MACD 히스토그램 부호 전환.
///
/// - 히스토그램 음 → 양 전환 + 무포지션 → 매수
/// - 히스토그램 양 → 음 전환 + 포지션 보유 → 매도
#[derive(Debug, Default)]
pub struct MacdCrossDetector;

impl SignalDetector for MacdCrossDetector {
    fn name(&self) -> &'static str {
        "macd_cross"
    }

    fn description(&self) -> &'static str {
        "MACD 히스토그램 부호 전환"
    }

    fn detect(
        &self,
        _params: &StrategyParams,
        indicators: &IndicatorSet,
        bars: &[Bar],
        index: usize,
        position: &PositionView,
    ) -> Option<Signal> {
        if index == 0 {
            return None;
        }

        let hist = indicators.value(keys::MACD_HIST, index)?;
        let prev_hist = indicators.value(keys::MACD_HIST, index - 1)?;
        let dif = indicators.value(keys::MACD_DIF, index)?;
        let dea = indicators.value(keys::MACD_DEA, index)?;

        let bar = &bars[index];
        let snapshot = IndicatorSnapshot::new()
            .with_macd(Some(dif), Some(dea), Some(hist))
            .with_close(bar.close);

        let turned_positive = prev_hist <= Decimal::ZERO && hist > Decimal::ZERO;
        let turned_negative = prev_hist >= Decimal::ZERO && hist < Decimal::ZERO;

        if turned_positive && !position.has_position() {
            return Some(
                Signal::buy(self.name(), index, bar.time)
                    .with_strength(flip_strength(hist, prev_hist))
                    .with_reason("MACD 히스토그램 양전환")
                    .with_snapshot(snapshot),
            );
        }

        if turned_negative && position.has_position() {
            return Some(
                Signal::sell(self.name(), index, bar.time)
                    .with_strength(flip_strength(hist, prev_hist))
                    .with_reason("MACD 히스토그램 음전환")
                    .with_snapshot(snapshot),
            );
        }

        None
    }
}

/// 전환 폭 기반 강도: 직전 대비 변화가 클수록 강한 신호.
fn flip_strength(hist: Decimal, prev_hist: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;

    let swing = (hist - prev_hist).abs();
    let scale = hist.abs().max(prev_hist.abs());
    if scale.is_zero() {
        return 0.5;
    }
    let ratio = (swing / (scale * Decimal::TWO)).to_f64().unwrap_or(0.5);
    (0.5 + ratio * 0.5).min(1.0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use quant_core::SignalAction;
    use rust_decimal_macros::dec;

    use super::*;

    fn make_bars(closes: &[i64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let c = Decimal::from(*c);
                Bar::new(t0 + Duration::days(i as i64), c, c, c, c, dec!(10000))
            })
            .collect()
    }

    #[test]
    fn test_histogram_positive_flip_buy() {
        // 하락 후 V자 반등 → 히스토그램이 음에서 양으로 전환
        let mut closes: Vec<i64> = (0..30).map(|i| 100 - i).collect();
        closes.extend((0..30).map(|i| 70 + i * 2));
        let bars = make_bars(&closes);
        let params = StrategyParams::new();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = MacdCrossDetector;

        let buy_fired = (1..bars.len()).any(|i| {
            detector
                .detect(&params, &indicators, &bars, i, &PositionView::flat())
                .map(|s| s.action == SignalAction::Buy)
                .unwrap_or(false)
        });
        assert!(buy_fired, "양전환 매수 신호 누락");
    }

    #[test]
    fn test_histogram_negative_flip_sell() {
        // 상승 후 급락 → 히스토그램 음전환
        let mut closes: Vec<i64> = (0..30).map(|i| 100 + i).collect();
        closes.extend((0..30).map(|i| 130 - i * 2));
        let bars = make_bars(&closes);
        let params = StrategyParams::new();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = MacdCrossDetector;

        let holding = PositionView::holding(100, dec!(100));
        let sell_fired = (1..bars.len()).any(|i| {
            detector
                .detect(&params, &indicators, &bars, i, &holding)
                .map(|s| s.action == SignalAction::Sell)
                .unwrap_or(false)
        });
        assert!(sell_fired, "음전환 매도 신호 누락");
    }

    #[test]
    fn test_flat_series_no_signal() {
        let bars = make_bars(&[100; 40]);
        let params = StrategyParams::new();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = MacdCrossDetector;

        for i in 1..bars.len() {
            assert!(detector
                .detect(&params, &indicators, &bars, i, &PositionView::flat())
                .is_none());
        }
    }
}
