//! 백테스트 시뮬레이션 엔진.
//!
//! 과거 캔들과 파라미터화된 전략으로 결정적(replayable) 시뮬레이션을
//! 수행하고, 체결 원장 / 자산 곡선 / 성과·리스크 통계 / 민감도 분석
//! 결과를 생성합니다.
//!
//! # 구조
//!
//! ```text
//! BacktestEngine (캔들 순회 + 신호 검증 + 체결)
//!   ├── Account          // 현금/포지션 원장
//!   ├── DetectorRegistry // 신호 생성 (quant-strategy)
//!   └── performance      // 완료된 원장에서 통계 일괄 계산
//!
//! SensitivityEngine (파라미터 그리드 → 독립 실행 팬아웃)
//! ```
//!
//! 시뮬레이션 루프는 동기적·단일 스레드·결정적입니다. 동시성은
//! 민감도 분석의 그리드 포인트 단위에만 존재합니다.

pub mod account;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod performance;
pub mod sensitivity;

pub use config::BacktestConfig;
pub use diagnostics::{DiagnosticWarning, Diagnostics, WarningKind};
pub use engine::{BacktestEngine, BacktestError, BacktestReport, RunState};
pub use performance::{
    HistogramBucket, PerformanceSummary, ReturnMetrics, RiskMetrics, TradingMetrics,
};
pub use sensitivity::{
    DualParameterGrid, SensitivityEngine, SensitivityReport, SingleParameterSweep, SweepPoint,
};

/// 완료된 백테스트 리포트 저장소.
///
/// 프로세스 전역 싱글턴 대신 호출자가 수명주기를 관리합니다.
pub type RunStore = quant_core::RecordStore<BacktestReport>;
