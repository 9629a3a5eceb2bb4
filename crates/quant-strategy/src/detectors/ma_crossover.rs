//! 이동평균 크로스오버 탐지기.

use quant_core::{Bar, IndicatorSnapshot, Signal, StrategyParams};
use quant_indicator::{keys, IndicatorSet};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::traits::{PositionView, SignalDetector};

/// 이동평균 골든/데드 크로스.
///
/// - 골든 크로스 (단기 MA가 장기 MA를 상향 돌파) + 무포지션 → 매수
/// - 데드 크로스 (하향 돌파) + 포지션 보유 → 매도
///
/// 돌파 판정은 직전 캔들과 현재 캔들의 대소 전환으로 합니다.
#[derive(Debug, Default)]
pub struct MaCrossoverDetector;

impl SignalDetector for MaCrossoverDetector {
    fn name(&self) -> &'static str {
        "ma_crossover"
    }

    fn description(&self) -> &'static str {
        "이동평균 골든/데드 크로스"
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

        let short = indicators.value(keys::MA_SHORT, index)?;
        let long = indicators.value(keys::MA_LONG, index)?;
        let prev_short = indicators.value(keys::MA_SHORT, index - 1)?;
        let prev_long = indicators.value(keys::MA_LONG, index - 1)?;

        let bar = &bars[index];
        let snapshot = IndicatorSnapshot::new()
            .with_ma(Some(short), Some(long))
            .with_close(bar.close);

        let golden_cross = prev_short <= prev_long && short > long;
        let death_cross = prev_short >= prev_long && short < long;

        if golden_cross && !position.has_position() {
            let strength = cross_strength(short, long);
            return Some(
                Signal::buy(self.name(), index, bar.time)
                    .with_strength(strength)
                    .with_reason("단기 이동평균 상향 돌파 (골든 크로스)")
                    .with_snapshot(snapshot),
            );
        }

        if death_cross && position.has_position() {
            let strength = cross_strength(long, short);
            return Some(
                Signal::sell(self.name(), index, bar.time)
                    .with_strength(strength)
                    .with_reason("단기 이동평균 하향 돌파 (데드 크로스)")
                    .with_snapshot(snapshot),
            );
        }

        None
    }
}

/// 이격 비율 기반 강도: 0.5 + 이격률 × 10, [0.5, 1.0] 범위.
fn cross_strength(upper: Decimal, lower: Decimal) -> f64 {
    if lower.is_zero() {
        return 0.5;
    }
    let gap = ((upper - lower) / lower).to_f64().unwrap_or(0.0).abs();
    (0.5 + gap * 10.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use quant_core::{ParamValue, SignalAction};
    use rust_decimal_macros::dec;

    use super::*;

    fn make_bars(closes: &[i64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let c = Decimal::from(*c);
                Bar::new(
                    t0 + Duration::days(i as i64),
                    c,
                    c + dec!(1),
                    c - dec!(1),
                    c,
                    dec!(10000),
                )
            })
            .collect()
    }

    fn params() -> StrategyParams {
        StrategyParams::new()
            .with("short_period", ParamValue::Int(2))
            .with("long_period", ParamValue::Int(4))
    }

    #[test]
    fn test_golden_cross_buy() {
        // 하락 후 급반등: 단기 MA가 장기 MA를 상향 돌파
        let bars = make_bars(&[100, 98, 96, 94, 92, 90, 100, 110]);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = MaCrossoverDetector;

        let fired: Vec<usize> = (0..bars.len())
            .filter(|i| {
                detector
                    .detect(&params, &indicators, &bars, *i, &PositionView::flat())
                    .map(|s| s.action == SignalAction::Buy)
                    .unwrap_or(false)
            })
            .collect();

        assert!(!fired.is_empty(), "골든 크로스 미탐지");
    }

    #[test]
    fn test_death_cross_requires_position() {
        // 상승 후 급락: 데드 크로스 지점
        let bars = make_bars(&[90, 92, 94, 96, 98, 100, 90, 80]);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = MaCrossoverDetector;

        let holding = PositionView::holding(100, dec!(95));
        let sell_fired = (0..bars.len()).any(|i| {
            detector
                .detect(&params, &indicators, &bars, i, &holding)
                .map(|s| s.action == SignalAction::Sell)
                .unwrap_or(false)
        });
        assert!(sell_fired);

        // 무포지션이면 데드 크로스에서도 매도 신호 없음
        let flat_sell = (0..bars.len()).any(|i| {
            detector
                .detect(&params, &indicators, &bars, i, &PositionView::flat())
                .map(|s| s.action == SignalAction::Sell)
                .unwrap_or(false)
        });
        assert!(!flat_sell);
    }

    #[test]
    fn test_no_signal_without_window() {
        let bars = make_bars(&[100, 101]);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = MaCrossoverDetector;
        assert!(detector
            .detect(&params, &indicators, &bars, 1, &PositionView::flat())
            .is_none());
    }
}
