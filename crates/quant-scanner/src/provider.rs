//! 캔들 데이터 협력자 인터페이스.
//!
//! 네트워크/저장소 구현은 이 코어의 범위 밖입니다. 스캐너는
//! [`BarProvider`] trait만 알고, 오류의 재시도 가능 여부로 재시도
//! 정책을 결정합니다.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quant_core::{Bar, Timeframe};
use thiserror::Error;

/// 데이터 협력자 오류.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 네트워크 오류 (일시적, 재시도 가능)
    #[error("네트워크 오류: {0}")]
    Network(String),

    /// 요청 한도 초과 (일시적, 지정 대기 후 재시도)
    #[error("요청 한도 초과")]
    RateLimited {
        /// 서버가 지정한 대기 시간 (ms)
        retry_after_ms: Option<u64>,
    },

    /// 요청 시간 초과 (일시적)
    #[error("요청 시간 초과")]
    Timeout,

    /// 알 수 없는 심볼 (치명적)
    #[error("알 수 없는 심볼: {0}")]
    UnknownSymbol(String),

    /// 응답 데이터 품질 오류 (치명적, 재시도해도 같은 데이터)
    #[error("데이터 오류: {0}")]
    InvalidData(String),
}

impl ProviderError {
    /// 재시도로 해소될 수 있는 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::RateLimited { .. } | ProviderError::Timeout
        )
    }

    /// 재시도가 무의미한 치명적 오류인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProviderError::UnknownSymbol(_) | ProviderError::InvalidData(_)
        )
    }

    /// 오류에 지정된 재시도 대기 시간 (ms).
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

/// 캔들 데이터 협력자.
///
/// 반환 시계열은 시간 오름차순이어야 하며, 스캐너가 사용 전에 다시
/// 검증합니다 (비단조 시계열은 [`ProviderError::InvalidData`]로 처리).
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// 심볼의 캔들 시계열을 조회합니다.
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ProviderError>;
}

/// 인메모리 고정 데이터 Provider.
///
/// 테스트와 오프라인 실행용입니다. 심볼별로 일시 실패 횟수를 스크립트할
/// 수 있어 재시도 경로 검증에 사용합니다.
pub struct StaticBarProvider {
    bars: HashMap<String, Vec<Bar>>,
    /// 심볼별 남은 일시 실패 횟수
    transient_failures: Mutex<HashMap<String, u32>>,
}

impl StaticBarProvider {
    /// 빈 Provider를 생성합니다.
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            transient_failures: Mutex::new(HashMap::new()),
        }
    }

    /// 심볼 데이터를 등록합니다.
    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.into(), bars);
        self
    }

    /// 심볼의 처음 `count`회 요청을 네트워크 오류로 실패시킵니다.
    pub fn with_transient_failures(self, symbol: impl Into<String>, count: u32) -> Self {
        self.transient_failures
            .lock()
            .expect("poisoned lock 없음")
            .insert(symbol.into(), count);
        self
    }
}

impl Default for StaticBarProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BarProvider for StaticBarProvider {
    async fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ProviderError> {
        {
            let mut failures = self
                .transient_failures
                .lock()
                .map_err(|_| ProviderError::Network("내부 잠금 오류".to_string()))?;
            if let Some(remaining) = failures.get_mut(symbol) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ProviderError::Network(format!(
                        "{} 일시 실패 (스크립트)",
                        symbol
                    )));
                }
            }
        }

        let bars = self
            .bars
            .get(symbol)
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))?;

        Ok(bars
            .iter()
            .filter(|b| b.time >= start && b.time <= end)
            .cloned()
            .collect())
    }
}
