//! 데이터 요청 재시도 정책.
//!
//! 네트워크 오류, 요청 한도 초과 같은 일시적 오류에 지수 백오프로
//! 재시도합니다. 치명적 오류([`ProviderError::is_fatal`])는 즉시
//! 실패를 반환합니다.
//!
//! # 예시
//!
//! ```rust,ignore
//! use quant_scanner::retry::{RetryConfig, with_retry};
//!
//! let config = RetryConfig::default();
//! let bars = with_retry(&config, || async {
//!     provider.fetch_bars("600519", timeframe, start, end).await
//! }).await?;
//! ```

use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::provider::ProviderError;

/// 재시도 설정.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 최대 재시도 횟수 (초기 시도 제외)
    pub max_retries: u32,
    /// 기본 대기 시간 (오류에 지정된 대기 시간이 없을 때 사용)
    pub base_delay: Duration,
    /// 최대 대기 시간
    pub max_delay: Duration,
    /// 지수 백오프 배수
    pub backoff_multiplier: f64,
    /// 지수 백오프 사용 여부
    pub use_exponential_backoff: bool,
    /// 지터(무작위 지연) 추가 여부. 스케줄링에만 영향
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_exponential_backoff: true,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// 빠른 재시도 (짧은 지연, 적은 횟수). 테스트/로컬 데이터용.
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
            add_jitter: false,
            ..Default::default()
        }
    }

    /// 재시도 없음.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// 시도 횟수와 오류 내용으로 대기 시간을 계산합니다.
    fn calculate_delay(&self, attempt: u32, error: &ProviderError) -> Duration {
        // 오류에 지정된 대기 시간이 있으면 우선 사용
        let base = error
            .retry_delay_ms()
            .map(Duration::from_millis)
            .unwrap_or(self.base_delay);

        let delay = if self.use_exponential_backoff && attempt > 0 {
            let multiplier = self.backoff_multiplier.powi(attempt as i32);
            Duration::from_secs_f64(base.as_secs_f64() * multiplier)
        } else {
            base
        };

        let delay = delay.min(self.max_delay);

        // 지터 추가 (±25%)
        if self.add_jitter {
            let jitter_range = delay.as_millis() as f64 * 0.25;
            let jitter = (rand_simple() * 2.0 - 1.0) * jitter_range;
            Duration::from_millis((delay.as_millis() as f64 + jitter).max(0.0) as u64)
        } else {
            delay
        }
    }
}

/// 간단한 난수 생성 (0.0 ~ 1.0).
/// 외부 의존성 없이 시스템 시간 기반으로 생성합니다.
fn rand_simple() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos as f64) / (u32::MAX as f64)
}

/// 재시도 통계.
#[derive(Debug, Clone)]
pub struct RetryStats {
    /// 총 시도 횟수
    pub total_attempts: u32,
    /// 총 대기 시간
    pub total_delay: Duration,
}

/// 재시도가 포함된 비동기 작업 실행.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    with_retry_stats(config, operation).await.map(|(value, _)| value)
}

/// 재시도가 포함된 비동기 작업 실행 (통계 포함).
///
/// 성공 시 (결과, 통계)를, 실패 시 마지막 오류를 반환합니다.
/// 실패하더라도 호출자는 시도 횟수를 알 수 없으므로, 시도 횟수가
/// 필요한 실패 보고에는 이 함수 바깥에서 `config.max_retries + 1`을
/// 상한으로 사용합니다.
pub async fn with_retry_stats<T, F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> Result<(T, RetryStats), ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    let mut total_delay = Duration::ZERO;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        attempts = attempt + 1,
                        total_delay_ms = total_delay.as_millis(),
                        "재시도 후 성공"
                    );
                }
                return Ok((
                    value,
                    RetryStats {
                        total_attempts: attempt + 1,
                        total_delay,
                    },
                ));
            }
            Err(e) => {
                // 치명적이거나 재시도 불가능한 오류는 즉시 실패
                if e.is_fatal() || !e.is_retryable() {
                    debug!(error = %e, "재시도 불가 오류, 즉시 실패 반환");
                    return Err(e);
                }

                if attempt >= config.max_retries {
                    warn!(
                        error = %e,
                        attempts = attempt + 1,
                        max_retries = config.max_retries,
                        "최대 재시도 횟수 초과"
                    );
                    return Err(e);
                }

                let delay = config.calculate_delay(attempt, &e);
                total_delay += delay;

                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "재시도 대기 중"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn test_immediate_success() {
        let config = RetryConfig::fast();
        let result = with_retry(&config, || async { Ok::<_, ProviderError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_on_transient_error() {
        let config = RetryConfig::fast();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let (value, stats) = with_retry_stats(&config, || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::Network("연결 실패".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_no_retry() {
        let config = RetryConfig::fast();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ProviderError::UnknownSymbol("XXX".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1); // 1번만 시도
    }

    #[tokio::test]
    async fn test_max_retries_exceeded() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay: Duration::from_millis(5),
            use_exponential_backoff: false,
            add_jitter: false,
            ..Default::default()
        };

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ProviderError::Timeout)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3); // 초기 1회 + 재시도 2회
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            use_exponential_backoff: true,
            add_jitter: false,
        };
        let error = ProviderError::Timeout;

        let d0 = config.calculate_delay(0, &error);
        let d1 = config.calculate_delay(1, &error);
        let d2 = config.calculate_delay(2, &error);
        let d4 = config.calculate_delay(4, &error);

        assert_eq!(d0, Duration::from_millis(100));
        assert_eq!(d1, Duration::from_millis(200));
        assert_eq!(d2, Duration::from_millis(400));
        assert_eq!(d4, Duration::from_millis(500)); // 상한
    }

    #[test]
    fn test_rate_limit_delay_takes_precedence() {
        let config = RetryConfig {
            add_jitter: false,
            use_exponential_backoff: false,
            ..Default::default()
        };
        let error = ProviderError::RateLimited {
            retry_after_ms: Some(1234),
        };
        assert_eq!(config.calculate_delay(0, &error), Duration::from_millis(1234));
    }
}
