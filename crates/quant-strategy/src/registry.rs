//! 탐지기 레지스트리와 병합 정책.
//!
//! 복합 전략이 여러 탐지기 계열을 동시에 활성화하면 같은 캔들에서
//! 신호가 여러 개 나올 수 있습니다. 레지스트리는 명시적 우선순위
//! 목록과 이름 있는 병합 정책으로 캔들 1개당 최대 1개의 신호를
//! 확정합니다.

use quant_core::{Bar, Signal, SignalAction, StrategyParams};
use quant_indicator::IndicatorSet;
use tracing::debug;

use crate::detectors::{
    BollingerTouchDetector, MaCrossoverDetector, MacdCrossDetector, RsiReversalDetector,
    VolumeBreakoutDetector,
};
use crate::traits::{PositionView, SignalDetector};
use crate::StrategyError;

/// 복수 신호 병합 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// 우선순위 순서에서 마지막으로 발화한 탐지기가 앞선 결과를 덮어씀.
    ///
    /// 원래 시스템의 순차 조건 블록이 만들어내던 동작을 그대로 보존한
    /// 기본값입니다. 의도된 설계인지는 불분명하므로 계약을 테스트로
    /// 고정해 두었습니다.
    #[default]
    LastWins,
    /// 처음 발화한 탐지기가 확정됩니다.
    FirstWins,
    /// 액션별 강도 합이 큰 쪽을 택하고 강도는 평균합니다. 동률이면 무신호.
    WeightedMerge,
}

/// 우선순위가 부여된 탐지기 목록.
pub struct DetectorRegistry {
    entries: Vec<(u32, Box<dyn SignalDetector>)>,
    policy: MergePolicy,
}

impl DetectorRegistry {
    /// 빈 레지스트리를 생성합니다 (기본 정책: LastWins).
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            policy: MergePolicy::default(),
        }
    }

    /// 병합 정책을 설정합니다.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 탐지기를 등록합니다. 평가 순서는 우선순위 오름차순입니다.
    pub fn register(mut self, priority: u32, detector: Box<dyn SignalDetector>) -> Self {
        self.entries.push((priority, detector));
        self.entries.sort_by_key(|(p, _)| *p);
        self
    }

    /// 내장 카탈로그 전체를 고정 우선순위로 등록한 레지스트리.
    pub fn builtin() -> Self {
        Self::new()
            .register(10, Box::new(MaCrossoverDetector))
            .register(20, Box::new(RsiReversalDetector))
            .register(30, Box::new(MacdCrossDetector))
            .register(40, Box::new(BollingerTouchDetector))
            .register(50, Box::new(VolumeBreakoutDetector))
    }

    /// 이름 목록으로 카탈로그에서 탐지기를 골라 레지스트리를 만듭니다.
    ///
    /// 우선순위는 목록 순서를 따릅니다. 카탈로그에 없는 이름은
    /// [`StrategyError::UnknownDetector`]입니다.
    pub fn from_names(names: &[&str]) -> Result<Self, StrategyError> {
        let mut registry = Self::new();
        for (i, name) in names.iter().enumerate() {
            let detector = make_detector(name)
                .ok_or_else(|| StrategyError::UnknownDetector(name.to_string()))?;
            registry = registry.register((i as u32 + 1) * 10, detector);
        }
        Ok(registry)
    }

    /// 등록된 탐지기 이름 (평가 순서대로).
    pub fn detector_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(_, d)| d.name()).collect()
    }

    /// 현재 병합 정책.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// 등록된 탐지기 수.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 지정 인덱스에서 모든 탐지기를 평가하고 병합 정책으로 1개 신호를
    /// 확정합니다. 아무것도 발화하지 않으면 `None` (관망)입니다.
    pub fn detect(
        &self,
        params: &StrategyParams,
        indicators: &IndicatorSet,
        bars: &[Bar],
        index: usize,
        position: &PositionView,
    ) -> Option<Signal> {
        let mut fired: Vec<Signal> = Vec::new();

        for (priority, detector) in &self.entries {
            if let Some(signal) = detector.detect(params, indicators, bars, index, position) {
                if signal.is_actionable() {
                    debug!(
                        detector = detector.name(),
                        priority,
                        index,
                        action = %signal.action,
                        "탐지기 발화"
                    );
                    fired.push(signal);
                }
            }
        }

        if fired.is_empty() {
            return None;
        }

        match self.policy {
            MergePolicy::LastWins => fired.pop(),
            MergePolicy::FirstWins => Some(fired.remove(0)),
            MergePolicy::WeightedMerge => weighted_merge(fired),
        }
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 카탈로그 이름으로 탐지기를 생성합니다.
fn make_detector(name: &str) -> Option<Box<dyn SignalDetector>> {
    match name {
        "ma_crossover" => Some(Box::new(MaCrossoverDetector)),
        "rsi_reversal" => Some(Box::new(RsiReversalDetector)),
        "macd_cross" => Some(Box::new(MacdCrossDetector)),
        "bollinger_touch" => Some(Box::new(BollingerTouchDetector)),
        "volume_breakout" => Some(Box::new(VolumeBreakoutDetector)),
        _ => None,
    }
}

/// 강도 가중 병합: 액션별 강도 합이 큰 쪽을 택합니다.
fn weighted_merge(fired: Vec<Signal>) -> Option<Signal> {
    let buy_weight: f64 = fired
        .iter()
        .filter(|s| s.action == SignalAction::Buy)
        .map(|s| s.effective_strength())
        .sum();
    let sell_weight: f64 = fired
        .iter()
        .filter(|s| s.action == SignalAction::Sell)
        .map(|s| s.effective_strength())
        .sum();

    if buy_weight == sell_weight {
        // 동률 → 확신 없음, 관망
        return None;
    }

    let winning_action = if buy_weight > sell_weight {
        SignalAction::Buy
    } else {
        SignalAction::Sell
    };

    let winners: Vec<&Signal> = fired.iter().filter(|s| s.action == winning_action).collect();
    let avg_strength =
        winners.iter().map(|s| s.effective_strength()).sum::<f64>() / winners.len() as f64;

    // 가장 강한 기여 탐지기의 신호를 기반으로 병합 결과를 구성
    let base = winners
        .iter()
        .max_by(|a, b| {
            a.effective_strength()
                .partial_cmp(&b.effective_strength())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|s| (**s).clone())?;

    let detectors: Vec<&str> = winners.iter().map(|s| s.detector.as_str()).collect();
    let reason = format!("가중 병합 ({})", detectors.join(", "));

    Some(base.with_strength(avg_strength).with_reason(reason))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    /// 항상 지정한 액션으로 발화하는 테스트 탐지기.
    struct FixedDetector {
        name: &'static str,
        action: SignalAction,
        strength: f64,
    }

    impl SignalDetector for FixedDetector {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "테스트용 고정 발화 탐지기"
        }

        fn detect(
            &self,
            _params: &StrategyParams,
            _indicators: &IndicatorSet,
            bars: &[Bar],
            index: usize,
            _position: &PositionView,
        ) -> Option<Signal> {
            let time = bars
                .get(index)
                .map(|b| b.time)
                .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC);
            Some(
                Signal::new(self.name, self.action, index, time).with_strength(self.strength),
            )
        }
    }

    fn fixture() -> (Vec<Bar>, IndicatorSet, StrategyParams) {
        use chrono::TimeZone;
        use rust_decimal_macros::dec;

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = vec![Bar::new(t0, dec!(10), dec!(10), dec!(10), dec!(10), dec!(100))];
        let indicators = IndicatorSet::empty(1);
        (bars, indicators, StrategyParams::new())
    }

    #[test]
    fn test_last_wins_overwrites_earlier() {
        // 우선순위 상 뒤에 평가되는 탐지기가 앞의 결과를 덮어쓴다 (기본 계약)
        let (bars, indicators, params) = fixture();
        let registry = DetectorRegistry::new()
            .register(
                10,
                Box::new(FixedDetector {
                    name: "first",
                    action: SignalAction::Buy,
                    strength: 1.0,
                }),
            )
            .register(
                20,
                Box::new(FixedDetector {
                    name: "second",
                    action: SignalAction::Sell,
                    strength: 0.3,
                }),
            );

        let signal = registry
            .detect(&params, &indicators, &bars, 0, &PositionView::flat())
            .unwrap();
        assert_eq!(signal.detector, "second");
        assert_eq!(signal.action, SignalAction::Sell);
    }

    #[test]
    fn test_first_wins_policy() {
        let (bars, indicators, params) = fixture();
        let registry = DetectorRegistry::new()
            .with_policy(MergePolicy::FirstWins)
            .register(
                10,
                Box::new(FixedDetector {
                    name: "first",
                    action: SignalAction::Buy,
                    strength: 1.0,
                }),
            )
            .register(
                20,
                Box::new(FixedDetector {
                    name: "second",
                    action: SignalAction::Sell,
                    strength: 0.3,
                }),
            );

        let signal = registry
            .detect(&params, &indicators, &bars, 0, &PositionView::flat())
            .unwrap();
        assert_eq!(signal.detector, "first");
    }

    #[test]
    fn test_priority_order_not_registration_order() {
        // 등록 순서가 아니라 우선순위 순서로 평가된다
        let (bars, indicators, params) = fixture();
        let registry = DetectorRegistry::new()
            .register(
                90,
                Box::new(FixedDetector {
                    name: "late",
                    action: SignalAction::Sell,
                    strength: 0.3,
                }),
            )
            .register(
                10,
                Box::new(FixedDetector {
                    name: "early",
                    action: SignalAction::Buy,
                    strength: 1.0,
                }),
            );

        let signal = registry
            .detect(&params, &indicators, &bars, 0, &PositionView::flat())
            .unwrap();
        // LastWins → 우선순위가 가장 높은(숫자가 큰) late가 확정
        assert_eq!(signal.detector, "late");
    }

    #[test]
    fn test_weighted_merge_majority() {
        let (bars, indicators, params) = fixture();
        let registry = DetectorRegistry::new()
            .with_policy(MergePolicy::WeightedMerge)
            .register(
                10,
                Box::new(FixedDetector {
                    name: "buy_a",
                    action: SignalAction::Buy,
                    strength: 0.6,
                }),
            )
            .register(
                20,
                Box::new(FixedDetector {
                    name: "buy_b",
                    action: SignalAction::Buy,
                    strength: 0.8,
                }),
            )
            .register(
                30,
                Box::new(FixedDetector {
                    name: "sell_a",
                    action: SignalAction::Sell,
                    strength: 0.9,
                }),
            );

        let signal = registry
            .detect(&params, &indicators, &bars, 0, &PositionView::flat())
            .unwrap();
        // 매수 합 1.4 > 매도 합 0.9
        assert_eq!(signal.action, SignalAction::Buy);
        assert!((signal.effective_strength() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_merge_tie_is_hold() {
        let (bars, indicators, params) = fixture();
        let registry = DetectorRegistry::new()
            .with_policy(MergePolicy::WeightedMerge)
            .register(
                10,
                Box::new(FixedDetector {
                    name: "buy",
                    action: SignalAction::Buy,
                    strength: 0.5,
                }),
            )
            .register(
                20,
                Box::new(FixedDetector {
                    name: "sell",
                    action: SignalAction::Sell,
                    strength: 0.5,
                }),
            );

        assert!(registry
            .detect(&params, &indicators, &bars, 0, &PositionView::flat())
            .is_none());
    }

    #[test]
    fn test_from_names() {
        let registry = DetectorRegistry::from_names(&["rsi_reversal", "ma_crossover"]).unwrap();
        assert_eq!(registry.detector_names(), vec!["rsi_reversal", "ma_crossover"]);

        assert!(DetectorRegistry::from_names(&["no_such_detector"]).is_err());
    }

    #[test]
    fn test_builtin_catalogue() {
        let registry = DetectorRegistry::builtin();
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.detector_names(),
            vec![
                "ma_crossover",
                "rsi_reversal",
                "macd_cross",
                "bollinger_touch",
                "volume_breakout"
            ]
        );
    }
}
