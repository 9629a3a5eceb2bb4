//! 전략 신호 탐지기.
//!
//! 고정 카탈로그의 탐지기들이 지표 + 캔들 윈도우에서 신호를 만들고,
//! [`DetectorRegistry`]가 우선순위와 병합 정책에 따라 캔들 1개당 최대
//! 1개의 신호로 정리합니다.
//!
//! # 카탈로그
//!
//! - `ma_crossover`: 이동평균 골든/데드 크로스
//! - `rsi_reversal`: RSI 과매도/과매수 반전
//! - `macd_cross`: MACD 히스토그램 부호 전환
//! - `bollinger_touch`: 볼린저 밴드 상/하단 터치
//! - `volume_breakout`: 거래량 동반 신고가 돌파

pub mod detectors;
pub mod filters;
pub mod registry;
pub mod traits;

pub use detectors::{
    BollingerTouchDetector, MaCrossoverDetector, MacdCrossDetector, RsiReversalDetector,
    VolumeBreakoutDetector,
};
pub use filters::dedup_min_spacing;
pub use registry::{DetectorRegistry, MergePolicy};
pub use traits::{PositionView, SignalDetector};

use thiserror::Error;

/// 전략 계층 오류.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// 카탈로그에 없는 탐지기 이름
    #[error("알 수 없는 탐지기: {0}")]
    UnknownDetector(String),
}
