//! 다중 심볼 스캔 루프.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quant_core::{
    classify_series, validate_series, Bar, DecimalExt, Signal, SignalAction, StrategyParams,
    Timeframe,
};
use quant_indicator::IndicatorSet;
use quant_strategy::{dedup_min_spacing, DetectorRegistry, MergePolicy, PositionView};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::provider::{BarProvider, ProviderError};
use crate::retry::{with_retry_stats, RetryConfig};

/// 스캔 설정.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 동시 조회 심볼 수
    pub concurrency: usize,
    /// 심볼 1개당 조회 시간 제한 (초과 시 해당 심볼만 실패)
    pub unit_timeout: Duration,
    /// 재시도 정책
    pub retry: RetryConfig,
    /// 신호 후 N캔들 승률 평가 구간
    pub horizon: usize,
    /// 연속 신호 최소 간격 (0 = 비활성)
    pub min_signal_spacing: usize,
    /// 가격 제한폭 (시장 상태 분류용)
    pub price_limit_rate: Decimal,
    /// 캔들 주기
    pub timeframe: Timeframe,
    /// 조회 시작 시각
    pub start: DateTime<Utc>,
    /// 조회 종료 시각
    pub end: DateTime<Utc>,
}

impl ScanConfig {
    /// 조회 구간으로 기본 설정을 생성합니다.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            concurrency: 4,
            unit_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            horizon: 5,
            min_signal_spacing: 0,
            price_limit_rate: dec!(0.1),
            timeframe: Timeframe::D1,
            start,
            end,
        }
    }

    /// 동시성 설정 (최소 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 재시도 정책 설정.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// 승률 평가 구간 설정.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// 단위 시간 제한 설정.
    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }
}

/// 심볼 1개의 스캔 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolScanResult {
    /// 심볼
    pub symbol: String,
    /// 조회된 캔들 수
    pub bars: usize,
    /// 매수 신호 수
    pub buy_signals: usize,
    /// 매도 신호 수
    pub sell_signals: usize,
    /// 체결 불가 캔들에서 차단된 신호 수
    pub blocked_signals: usize,
    /// 마지막 신호
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_signal: Option<Signal>,
    /// 매수 신호 후 N캔들 상승 비율 (%)
    pub win_rate_after_horizon_pct: Decimal,
    /// 승률 평가에 포함된 매수 신호 수
    pub evaluated_signals: usize,
    /// 랭킹 (1부터, 승률 내림차순)
    pub rank: usize,
}

/// 심볼 1개의 실패 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolScanFailure {
    /// 심볼
    pub symbol: String,
    /// 실패 사유
    pub error: String,
    /// 시도 횟수
    pub attempts: u32,
}

/// 배치 스캔 리포트.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// 배치 ID
    pub batch_id: Uuid,
    /// 심볼별 결과 (랭킹 순)
    pub results: Vec<SymbolScanResult>,
    /// 실패한 심볼 (배치는 계속 진행됨)
    pub failures: Vec<SymbolScanFailure>,
    /// 취소로 건너뛴 심볼 수
    pub cancelled: usize,
}

/// 다중 심볼 신호 스캐너.
///
/// 심볼 단위가 완전한 작업 단위입니다. 단위 사이에만 취소가 확인되며,
/// 진행 중인 단위는 끝까지 수행됩니다.
pub struct SignalScanner {
    config: ScanConfig,
    detectors: Vec<String>,
    policy: MergePolicy,
    params: StrategyParams,
    cancel: CancellationToken,
}

impl SignalScanner {
    /// 새 스캐너를 생성합니다.
    pub fn new(config: ScanConfig, detectors: Vec<String>, params: StrategyParams) -> Self {
        Self {
            config,
            detectors,
            policy: MergePolicy::default(),
            params,
            cancel: CancellationToken::new(),
        }
    }

    /// 병합 정책 설정.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 외부 취소 토큰 연결.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 심볼 목록을 스캔합니다.
    ///
    /// 한 심볼의 실패(조회 실패, 데이터 오류, 시간 초과)는 기록 후
    /// 건너뛰며 배치 전체를 중단시키지 않습니다.
    pub async fn scan(
        &self,
        provider: Arc<dyn BarProvider>,
        symbols: &[String],
    ) -> ScanReport {
        let batch_id = Uuid::new_v4();
        info!(
            %batch_id,
            symbols = symbols.len(),
            concurrency = self.config.concurrency,
            detectors = ?self.detectors,
            "다중 심볼 스캔 시작"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut handles = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let symbol = symbol.clone();
            let semaphore = semaphore.clone();
            let provider = provider.clone();
            let config = self.config.clone();
            let detectors = self.detectors.clone();
            let policy = self.policy;
            let params = self.params.clone();
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return UnitOutcome::Cancelled;
                };
                // 협조적 취소: 새 단위를 시작하지 않음
                if cancel.is_cancelled() {
                    debug!(symbol = %symbol, "취소됨, 단위 건너뜀");
                    return UnitOutcome::Cancelled;
                }

                scan_unit(&symbol, provider, &config, &detectors, policy, &params).await
            }));
        }

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled = 0usize;

        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(UnitOutcome::Scanned(result)) => results.push(result),
                Ok(UnitOutcome::Failed(failure)) => {
                    warn!(symbol = %failure.symbol, error = %failure.error, "심볼 스캔 실패, 건너뜀");
                    failures.push(failure);
                }
                Ok(UnitOutcome::Cancelled) => cancelled += 1,
                Err(e) => {
                    warn!(error = %e, "스캔 작업 중단");
                    failures.push(SymbolScanFailure {
                        symbol: String::new(),
                        error: e.to_string(),
                        attempts: 0,
                    });
                }
            }
        }

        assign_ranks(&mut results);

        info!(
            %batch_id,
            scanned = results.len(),
            failed = failures.len(),
            cancelled,
            "다중 심볼 스캔 완료"
        );

        ScanReport {
            batch_id,
            results,
            failures,
            cancelled,
        }
    }
}

/// 단위 작업 결과.
enum UnitOutcome {
    Scanned(SymbolScanResult),
    Failed(SymbolScanFailure),
    Cancelled,
}

/// 심볼 1개를 조회하고 신호를 집계합니다.
async fn scan_unit(
    symbol: &str,
    provider: Arc<dyn BarProvider>,
    config: &ScanConfig,
    detectors: &[String],
    policy: MergePolicy,
    params: &StrategyParams,
) -> UnitOutcome {
    // 조회: 단위 시간 제한 + 재시도
    let fetched = with_retry_stats(&config.retry, || async {
        match tokio::time::timeout(
            config.unit_timeout,
            provider.fetch_bars(symbol, config.timeframe, config.start, config.end),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    })
    .await;

    let bars = match fetched {
        Ok((bars, stats)) => {
            debug!(symbol, attempts = stats.total_attempts, bars = bars.len(), "캔들 조회 완료");
            bars
        }
        Err(e) => {
            let attempts = if e.is_fatal() { 1 } else { config.retry.max_retries + 1 };
            return UnitOutcome::Failed(SymbolScanFailure {
                symbol: symbol.to_string(),
                error: e.to_string(),
                attempts,
            });
        }
    };

    // 사용 전 검증: 비단조 시계열은 이 심볼만 실패시킴
    if let Err(e) = validate_series(&bars) {
        return UnitOutcome::Failed(SymbolScanFailure {
            symbol: symbol.to_string(),
            error: e.to_string(),
            attempts: 1,
        });
    }

    let names: Vec<&str> = detectors.iter().map(|s| s.as_str()).collect();
    let registry = match DetectorRegistry::from_names(&names) {
        Ok(registry) => registry.with_policy(policy),
        Err(e) => {
            return UnitOutcome::Failed(SymbolScanFailure {
                symbol: symbol.to_string(),
                error: e.to_string(),
                attempts: 1,
            });
        }
    };

    UnitOutcome::Scanned(aggregate_signals(symbol, &bars, &registry, config, params))
}

/// 탐지기를 실행하고 심볼 1개의 신호 집계를 만듭니다.
///
/// 시뮬레이션이 아니므로 현금/비용은 없지만, 매도 계열 탐지기가
/// 동작하도록 가상 포지션(매수 → 보유, 매도 → 청산)을 유지합니다.
fn aggregate_signals(
    symbol: &str,
    bars: &[Bar],
    registry: &DetectorRegistry,
    config: &ScanConfig,
    params: &StrategyParams,
) -> SymbolScanResult {
    let statuses = classify_series(bars, config.price_limit_rate);
    let indicators = IndicatorSet::compute(bars, params);

    let mut position = PositionView::flat();
    let mut accepted: Vec<Signal> = Vec::new();
    let mut blocked_signals = 0usize;

    for (i, bar) in bars.iter().enumerate() {
        let Some(signal) = registry.detect(params, &indicators, bars, i, &position) else {
            continue;
        };
        if !signal.is_actionable() {
            continue;
        }

        if !statuses[i].is_tradable() {
            blocked_signals += 1;
            continue;
        }

        match signal.action {
            SignalAction::Buy => position = PositionView::holding(1, bar.close),
            SignalAction::Sell => position = PositionView::flat(),
            SignalAction::Hold => {}
        }
        accepted.push(signal);
    }

    let deduped = if config.min_signal_spacing > 1 {
        dedup_min_spacing(&accepted, config.min_signal_spacing)
    } else {
        accepted
    };

    // 매수 신호 후 horizon캔들 뒤 종가 상승 비율
    let mut wins = 0usize;
    let mut evaluated = 0usize;
    for signal in deduped.iter().filter(|s| s.action == SignalAction::Buy) {
        let i = signal.bar_index;
        if i + config.horizon < bars.len() {
            evaluated += 1;
            if bars[i + config.horizon].close > bars[i].close {
                wins += 1;
            }
        }
    }
    let win_rate_after_horizon_pct = if evaluated == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(wins as u64) / Decimal::from(evaluated as u64) * Decimal::ONE_HUNDRED)
            .to_percent()
    };

    SymbolScanResult {
        symbol: symbol.to_string(),
        bars: bars.len(),
        buy_signals: deduped.iter().filter(|s| s.action == SignalAction::Buy).count(),
        sell_signals: deduped.iter().filter(|s| s.action == SignalAction::Sell).count(),
        blocked_signals,
        last_signal: deduped.last().cloned(),
        win_rate_after_horizon_pct,
        evaluated_signals: evaluated,
        rank: 0,
    }
}

/// 승률 내림차순 → 신호 수 내림차순 → 심볼 오름차순으로 랭킹을 부여합니다.
fn assign_ranks(results: &mut [SymbolScanResult]) {
    results.sort_by(|a, b| {
        b.win_rate_after_horizon_pct
            .cmp(&a.win_rate_after_horizon_pct)
            .then_with(|| {
                (b.buy_signals + b.sell_signals).cmp(&(a.buy_signals + a.sell_signals))
            })
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone};
    use quant_core::ParamValue;

    use super::*;
    use crate::provider::StaticBarProvider;

    fn make_bars(closes: &[i64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let c = Decimal::from(*c);
                Bar::new(
                    t0 + ChronoDuration::days(i as i64),
                    c,
                    c + dec!(1),
                    c - dec!(1),
                    c,
                    dec!(100000),
                )
            })
            .collect()
    }

    /// 크로스오버가 발생하고 이후 상승하는 시계열.
    fn crossover_closes() -> Vec<i64> {
        vec![100, 98, 96, 94, 92, 90, 92, 96, 100, 104, 108, 112, 116, 120, 124]
    }

    fn scan_window() -> (DateTime<Utc>, DateTime<Utc>) {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (t0, t0 + ChronoDuration::days(365))
    }

    fn cross_params() -> StrategyParams {
        StrategyParams::new()
            .with("short_period", ParamValue::Int(2))
            .with("long_period", ParamValue::Int(4))
    }

    fn scanner(config: ScanConfig) -> SignalScanner {
        SignalScanner::new(config, vec!["ma_crossover".to_string()], cross_params())
    }

    #[tokio::test]
    async fn test_batch_isolates_symbol_failure() {
        let (start, end) = scan_window();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("600519", make_bars(&crossover_closes()))
                .with_bars("000001", make_bars(&crossover_closes())),
        );

        let symbols = vec![
            "600519".to_string(),
            "없는심볼".to_string(),
            "000001".to_string(),
        ];
        let report = scanner(ScanConfig::new(start, end).with_retry(RetryConfig::fast()))
            .scan(provider, &symbols)
            .await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "없는심볼");
        assert_eq!(report.failures[0].attempts, 1); // 치명적 오류는 재시도 없음
        assert_eq!(report.cancelled, 0);

        // 랭킹은 1부터 연속 부여
        let ranks: Vec<usize> = report.results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_transient_failure_recovered_by_retry() {
        let (start, end) = scan_window();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("600519", make_bars(&crossover_closes()))
                .with_transient_failures("600519", 2),
        );

        let report = scanner(ScanConfig::new(start, end).with_retry(RetryConfig::fast()))
            .scan(provider, &["600519".to_string()])
            .await;

        assert_eq!(report.results.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_unit_only() {
        let (start, end) = scan_window();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("600519", make_bars(&crossover_closes()))
                .with_bars("000001", make_bars(&crossover_closes()))
                .with_transient_failures("600519", 10),
        );

        let report = scanner(ScanConfig::new(start, end).with_retry(RetryConfig::fast()))
            .scan(provider, &["600519".to_string(), "000001".to_string()])
            .await;

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].symbol, "000001");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].attempts, 3); // 초기 1회 + 재시도 2회
    }

    #[tokio::test]
    async fn test_win_rate_on_rising_series() {
        let (start, end) = scan_window();
        let provider = Arc::new(
            StaticBarProvider::new().with_bars("600519", make_bars(&crossover_closes())),
        );

        let report = scanner(
            ScanConfig::new(start, end)
                .with_retry(RetryConfig::no_retry())
                .with_horizon(3),
        )
        .scan(provider, &["600519".to_string()])
        .await;

        let result = &report.results[0];
        assert!(result.buy_signals >= 1);
        // 반등 후 계속 상승 → 평가된 매수 신호는 전부 승리
        assert!(result.evaluated_signals >= 1);
        assert_eq!(result.win_rate_after_horizon_pct, dec!(100));
        assert!(result.last_signal.is_some());
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_units() {
        let (start, end) = scan_window();
        let provider = Arc::new(
            StaticBarProvider::new().with_bars("600519", make_bars(&crossover_closes())),
        );

        let cancel = CancellationToken::new();
        cancel.cancel(); // 시작 전 취소

        let report = scanner(ScanConfig::new(start, end))
            .with_cancellation(cancel)
            .scan(provider, &["600519".to_string(), "000001".to_string()])
            .await;

        assert!(report.results.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(report.cancelled, 2);
    }

    #[tokio::test]
    async fn test_scan_is_deterministic() {
        let (start, end) = scan_window();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("600519", make_bars(&crossover_closes()))
                .with_bars("000001", make_bars(&[100, 101, 100, 101, 100, 101, 100, 101])),
        );
        let symbols = vec!["600519".to_string(), "000001".to_string()];

        let first = scanner(ScanConfig::new(start, end))
            .scan(provider.clone(), &symbols)
            .await;
        let second = scanner(ScanConfig::new(start, end))
            .scan(provider, &symbols)
            .await;

        for (a, b) in first.results.iter().zip(second.results.iter()) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.buy_signals, b.buy_signals);
            assert_eq!(a.sell_signals, b.sell_signals);
            assert_eq!(a.win_rate_after_horizon_pct, b.win_rate_after_horizon_pct);
            assert_eq!(a.rank, b.rank);
        }
    }
}
