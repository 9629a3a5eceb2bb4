//! 코어 오류 타입.

use thiserror::Error;

/// 코어 계층에서 발생하는 오류.
///
/// `InvalidInput`과 `DivisionByZero`만 실행을 중단시킵니다.
/// 캔들 품질 문제(비정상 OHLC 등)는 오류가 아니라
/// [`MarketStatus`](crate::domain::MarketStatus)로 분류되어 실행을 계속합니다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 잘못된 입력 (비단조 시간, 범위를 벗어난 설정 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 0으로 나누기
    ///
    /// 0 제수가 예견되는 경로에서는 [`DecimalExt::safe_div`](crate::decimal::DecimalExt::safe_div)를
    /// 사용해야 합니다.
    #[error("0으로 나눌 수 없습니다: {context}")]
    DivisionByZero {
        /// 어떤 계산에서 발생했는지
        context: &'static str,
    },
}

impl CoreError {
    /// 잘못된 입력 오류를 생성합니다.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
