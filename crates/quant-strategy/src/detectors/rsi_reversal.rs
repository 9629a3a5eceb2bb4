//! RSI 반전 탐지기.

use quant_core::{Bar, IndicatorSnapshot, Signal, StrategyParams};
use quant_indicator::{keys, IndicatorSet};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::traits::{PositionView, SignalDetector};

/// RSI 과매도/과매수 반전.
///
/// - RSI < 과매도 임계값 + 무포지션 → 매수 (임계값에서 멀수록 강한 신호)
/// - RSI > 과매수 임계값 + 포지션 보유 → 매도
///
/// 파라미터: `oversold`(30), `overbought`(70), `rsi_period`(14, 지표 계산 시 적용)
#[derive(Debug, Default)]
pub struct RsiReversalDetector;

impl SignalDetector for RsiReversalDetector {
    fn name(&self) -> &'static str {
        "rsi_reversal"
    }

    fn description(&self) -> &'static str {
        "RSI 과매도/과매수 반전"
    }

    fn detect(
        &self,
        params: &StrategyParams,
        indicators: &IndicatorSet,
        bars: &[Bar],
        index: usize,
        position: &PositionView,
    ) -> Option<Signal> {
        let oversold = params.get_decimal("oversold", dec!(30));
        let overbought = params.get_decimal("overbought", dec!(70));

        let rsi = indicators.value(keys::RSI, index)?;
        let bar = &bars[index];
        let snapshot = IndicatorSnapshot::new()
            .with_rsi(Some(rsi))
            .with_close(bar.close);

        if rsi < oversold && !position.has_position() {
            let strength = ((oversold - rsi) / oversold).to_f64().unwrap_or(0.0);
            return Some(
                Signal::buy(self.name(), index, bar.time)
                    .with_strength(0.5 + strength * 0.5)
                    .with_reason(format!("RSI 과매도 ({:.1})", rsi))
                    .with_snapshot(snapshot),
            );
        }

        if rsi > overbought && position.has_position() {
            let denominator = dec!(100) - overbought;
            let strength = ((rsi - overbought) / denominator).to_f64().unwrap_or(0.0);
            return Some(
                Signal::sell(self.name(), index, bar.time)
                    .with_strength(0.5 + strength * 0.5)
                    .with_reason(format!("RSI 과매수 ({:.1})", rsi))
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

    fn params() -> StrategyParams {
        StrategyParams::new().with("rsi_period", ParamValue::Int(4))
    }

    #[test]
    fn test_oversold_buy() {
        // 연속 하락 → RSI 0 → 과매도 매수
        let bars = make_bars(&[100, 98, 96, 94, 92, 90]);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = RsiReversalDetector;

        let signal = detector
            .detect(&params, &indicators, &bars, 5, &PositionView::flat())
            .expect("과매도 신호 누락");
        assert_eq!(signal.action, SignalAction::Buy);
        assert!(signal.effective_strength() > 0.9);
        assert!(signal.snapshot.rsi.is_some());
    }

    #[test]
    fn test_overbought_sell_requires_position() {
        let bars = make_bars(&[100, 102, 104, 106, 108, 110]);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = RsiReversalDetector;

        // 무포지션 → 과매수여도 매도 없음
        assert!(detector
            .detect(&params, &indicators, &bars, 5, &PositionView::flat())
            .is_none());

        let holding = PositionView::holding(100, dec!(100));
        let signal = detector
            .detect(&params, &indicators, &bars, 5, &holding)
            .expect("과매수 신호 누락");
        assert_eq!(signal.action, SignalAction::Sell);
    }

    #[test]
    fn test_neutral_zone_no_signal() {
        // 윈도우 이전 구간은 RSI 50 → 신호 없음
        let bars = make_bars(&[100, 99, 101]);
        let params = params();
        let indicators = IndicatorSet::compute(&bars, &params);
        let detector = RsiReversalDetector;
        assert!(detector
            .detect(&params, &indicators, &bars, 2, &PositionView::flat())
            .is_none());
    }
}
