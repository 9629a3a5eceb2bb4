//! 신호 후처리 필터.

use quant_core::Signal;
use tracing::debug;

/// 최소 간격 안에서 연속 발화한 신호를 가장 강한 것 하나로 접습니다.
///
/// 입력은 캔들 인덱스 오름차순이어야 합니다. 직전에 남긴 신호와의
/// 간격이 `min_spacing` 미만이면 두 신호 중 강한 쪽만 남기고, 강도가
/// 같으면 먼저 발생한 쪽을 유지합니다. `min_spacing`이 1 이하면
/// 아무것도 접지 않습니다.
pub fn dedup_min_spacing(signals: &[Signal], min_spacing: usize) -> Vec<Signal> {
    if min_spacing <= 1 {
        return signals.to_vec();
    }

    let mut out: Vec<Signal> = Vec::with_capacity(signals.len());

    for signal in signals {
        match out.last_mut() {
            Some(last) if signal.bar_index.saturating_sub(last.bar_index) < min_spacing => {
                if signal.effective_strength() > last.effective_strength() {
                    debug!(
                        dropped = %last.detector,
                        dropped_index = last.bar_index,
                        kept = %signal.detector,
                        kept_index = signal.bar_index,
                        "연속 신호 교체"
                    );
                    *last = signal.clone();
                } else {
                    debug!(
                        dropped = %signal.detector,
                        dropped_index = signal.bar_index,
                        "연속 신호 제거"
                    );
                }
            }
            _ => out.push(signal.clone()),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use quant_core::SignalAction;

    use super::*;

    fn signal_at(index: usize, strength: f64) -> Signal {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::days(index as i64);
        Signal::new("test", SignalAction::Buy, index, time).with_strength(strength)
    }

    #[test]
    fn test_spacing_one_keeps_all() {
        let signals = vec![signal_at(0, 0.5), signal_at(1, 0.6), signal_at(2, 0.7)];
        assert_eq!(dedup_min_spacing(&signals, 1).len(), 3);
    }

    #[test]
    fn test_consecutive_keeps_strongest() {
        let signals = vec![signal_at(10, 0.5), signal_at(11, 0.9), signal_at(12, 0.6)];
        let out = dedup_min_spacing(&signals, 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bar_index, 11);
        assert_eq!(out[0].strength, Some(0.9));
    }

    #[test]
    fn test_tie_keeps_earliest() {
        let signals = vec![signal_at(10, 0.5), signal_at(11, 0.5)];
        let out = dedup_min_spacing(&signals, 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bar_index, 10);
    }

    #[test]
    fn test_spaced_signals_untouched() {
        let signals = vec![signal_at(0, 0.5), signal_at(5, 0.4), signal_at(10, 0.3)];
        let out = dedup_min_spacing(&signals, 3);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_min_spacing(&[], 5).is_empty());
    }
}
