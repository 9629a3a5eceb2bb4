//! SignalDetector trait 정의.

use quant_core::{Bar, Signal, StrategyParams};
use quant_indicator::IndicatorSet;
use rust_decimal::Decimal;

/// 탐지기에 전달되는 포지션 상태 요약.
///
/// 시뮬레이션 원장의 읽기 전용 뷰입니다. 탐지기는 이 뷰로
/// "포지션 없음 → 매수만", "포지션 보유 → 매도만" 같은 조건을 판단합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionView {
    /// 보유 수량 (없으면 0)
    pub quantity: u64,
    /// 평균 진입 가격
    pub entry_price: Option<Decimal>,
}

impl PositionView {
    /// 포지션이 없는 상태.
    pub fn flat() -> Self {
        Self::default()
    }

    /// 보유 중인 상태.
    pub fn holding(quantity: u64, entry_price: Decimal) -> Self {
        Self {
            quantity,
            entry_price: Some(entry_price),
        }
    }

    /// 포지션 보유 여부.
    pub fn has_position(&self) -> bool {
        self.quantity > 0
    }
}

/// 신호 탐지기.
///
/// 구현은 순수 함수여야 합니다: 같은 (파라미터, 지표, 캔들, 인덱스,
/// 포지션)에 대해 항상 같은 결과를 반환하고, 인덱스 이후의 캔들을
/// 읽지 않습니다. 조건이 성립하지 않으면 `None`을 반환합니다.
pub trait SignalDetector: Send + Sync {
    /// 탐지기 이름 (카탈로그 키).
    fn name(&self) -> &'static str;

    /// 탐지기 설명.
    fn description(&self) -> &'static str;

    /// 지정 인덱스에서 신호를 탐지합니다.
    fn detect(
        &self,
        params: &StrategyParams,
        indicators: &IndicatorSet,
        bars: &[Bar],
        index: usize,
        position: &PositionView,
    ) -> Option<Signal>;
}
