//! 백테스트 엔진 공통 코어.
//!
//! 시뮬레이션 전반에서 사용하는 도메인 타입과 금액 연산을 제공합니다:
//!
//! - **Decimal 연산**: 모든 금액/비율 값은 `rust_decimal` 기반으로 계산되며,
//!   부동소수점 누적 오차가 파생 값에 섞이지 않습니다.
//! - **도메인 타입**: 캔들([`Bar`]), 신호([`Signal`]), 체결([`Trade`]),
//!   자산 곡선 포인트([`EquityPoint`]), 전략 파라미터([`StrategyParams`])
//! - **시장 상태 분류**: 거래정지/상한가/하한가/비정상 캔들 판별
//! - **수량/비용 모델**: 매매단위(lot) 정렬과 수수료/인지세/과호비 계산
//! - **레코드 저장소**: 완료된 실행 결과를 키로 관리하는 인메모리 저장소

pub mod decimal;
pub mod domain;
pub mod error;
pub mod store;

pub use decimal::{pct_change, DecimalExt};
pub use domain::{
    calculate_lot, classify_bar, classify_series, validate_series, Bar, CostBreakdown, CostModel,
    EquityPoint, IndicatorSnapshot, LotCalculation, MarketStatus, ParamEntry, ParamRange,
    ParamValue, Side, Signal, SignalAction, SignalRecord, StrategyParams, Timeframe, Trade,
};
pub use error::CoreError;
pub use store::RecordStore;

/// 코어 결과 타입.
pub type CoreResult<T> = Result<T, CoreError>;
