//! 거래량 돌파 탐지기.

use quant_core::{Bar, IndicatorSnapshot, Signal, StrategyParams};
use quant_indicator::{keys, IndicatorSet};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::traits::{PositionView, SignalDetector};

/// 거래량 동반 신고가 돌파.
///
/// - 종가가 직전 N캔들 고가를 상향 돌파하고 거래량이 거래량 MA의
///   `volume_mult`배 이상 + 무포지션 → 매수
/// - 종가가 직전 N캔들 저가를 하향 이탈 + 포지션 보유 → 매도
///
/// 파라미터: `breakout_period`(20), `volume_mult`(2)
#[derive(Debug, Default)]
pub struct VolumeBreakoutDetector;

impl SignalDetector for VolumeBreakoutDetector {
    fn name(&self) -> &'static str {
        "volume_breakout"
    }

    fn description(&self) -> &'static str {
        "거래량 동반 신고가 돌파"
    }

    fn detect(
        &self,
        params: &StrategyParams,
        indicators: &IndicatorSet,
        bars: &[Bar],
        index: usize,
        position: &PositionView,
    ) -> Option<Signal> {
        let breakout_period = params.get_usize("breakout_period", 20);
        let volume_mult = params.get_decimal("volume_mult", dec!(2));

        if breakout_period == 0 || index < breakout_period {
            return None;
        }

        let bar = &bars[index];
        let window = &bars[index - breakout_period..index];

        let snapshot = IndicatorSnapshot::new()
            .with_volume_ma(indicators.value(keys::VOLUME_MA, index))
            .with_close(bar.close);

        if !position.has_position() {
            let window_high = window.iter().map(|b| b.high).max()?;
            let volume_ma = indicators.value(keys::VOLUME_MA, index)?;

            if bar.close > window_high && bar.volume >= volume_ma * volume_mult {
                let volume_ratio = bar
                    .volume
                    .checked_div(volume_ma)
                    .and_then(|r| r.to_f64())
                    .unwrap_or(1.0);
                return Some(
                    Signal::buy(self.name(), index, bar.time)
                        .with_strength((volume_ratio / 5.0).clamp(0.5, 1.0))
                        .with_reason(format!("{}캔들 신고가 거래량 돌파", breakout_period))
                        .with_snapshot(snapshot),
                );
            }
            return None;
        }

        let window_low = window.iter().map(|b| b.low).min()?;
        if bar.close < window_low {
            return Some(
                Signal::sell(self.name(), index, bar.time)
                    .with_strength(0.7)
                    .with_reason(format!("{}캔들 신저가 이탈", breakout_period))
                    .with_snapshot(snapshot),
            );
        }

        None
    }
}
