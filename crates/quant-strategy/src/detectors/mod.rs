//! 내장 탐지기 카탈로그.

pub mod bollinger_touch;
pub mod ma_crossover;
pub mod macd_cross;
pub mod rsi_reversal;
pub mod volume_breakout;

pub use bollinger_touch::BollingerTouchDetector;
pub use ma_crossover::MaCrossoverDetector;
pub use macd_cross::MacdCrossDetector;
pub use rsi_reversal::RsiReversalDetector;
pub use volume_breakout::VolumeBreakoutDetector;
