//! 백테스트 도메인 타입.

pub mod bar;
pub mod cost;
pub mod lot;
pub mod market_status;
pub mod params;
pub mod signal;
pub mod trade;

pub use bar::{validate_series, Bar, Timeframe};
pub use cost::{CostBreakdown, CostModel};
pub use lot::{calculate_lot, LotCalculation};
pub use market_status::{classify_bar, classify_series, MarketStatus};
pub use params::{ParamEntry, ParamRange, ParamValue, StrategyParams};
pub use signal::{IndicatorSnapshot, Signal, SignalAction, SignalRecord};
pub use trade::{EquityPoint, Side, Trade};
