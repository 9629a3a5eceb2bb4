//! 파라미터 민감도 분석.
//!
//! 기준 파라미터에서 1~2개 파라미터만 그리드로 바꿔가며 시뮬레이션을
//! 반복 실행하고, 최적값과 안정성 점수, 히트맵을 만듭니다.
//!
//! 그리드 포인트는 서로 완전히 독립입니다. 포인트마다 파라미터 사본과
//! 새 엔진을 만들며, 공유 가변 상태가 없습니다. 실행은 세마포어로
//! 동시성이 제한된 블로킹 워커에서 수행되고, 결과는 그리드 인덱스로
//! 병합되므로 완료 순서는 결과에 영향을 주지 않습니다.

use std::sync::Arc;

use quant_core::{Bar, ParamValue, StrategyParams};
use quant_strategy::{DetectorRegistry, MergePolicy};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::BacktestConfig;
use crate::engine::{BacktestEngine, BacktestReport};

/// 그리드 포인트 1개의 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    /// 파라미터 값
    pub value: ParamValue,
    /// 총 수익률 (%)
    pub total_return_pct: Decimal,
    /// 샤프 비율
    pub sharpe_ratio: f64,
    /// 승률 (%)
    pub win_rate_pct: Decimal,
    /// 최적 포인트 여부 (스윕당 정확히 1개)
    pub optimal: bool,
}

/// 단일 파라미터 스윕 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleParameterSweep {
    /// 파라미터 이름
    pub param_name: String,
    /// 포인트별 결과 (그리드 순서)
    pub points: Vec<SweepPoint>,
    /// 최적 파라미터 값 (총 수익률 최대 기준)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_value: Option<ParamValue>,
    /// 안정성 점수 (0~1, 분산이 클수록 낮음)
    pub stability_score: f64,
    /// 실패하여 제외된 포인트 수
    pub failed_points: usize,
}

/// 이중 파라미터 히트맵.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualParameterGrid {
    /// 가로축 파라미터 이름
    pub x_name: String,
    /// 세로축 파라미터 이름
    pub y_name: String,
    /// 가로축 값 목록
    pub x_values: Vec<ParamValue>,
    /// 세로축 값 목록
    pub y_values: Vec<ParamValue>,
    /// 총 수익률(%) 행렬, `cells[y][x]`. 실패 포인트는 `None`
    pub cells: Vec<Vec<Option<Decimal>>>,
    /// 최적 셀 좌표 `(y, x)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_cell: Option<(usize, usize)>,
}

/// 민감도 분석 리포트.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityReport {
    /// 단일 파라미터 스윕 결과
    pub single: Vec<SingleParameterSweep>,
    /// 이중 파라미터 히트맵 (요청한 경우만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dual: Option<DualParameterGrid>,
}

/// 민감도 분석 엔진.
pub struct SensitivityEngine {
    config: BacktestConfig,
    detectors: Vec<String>,
    policy: MergePolicy,
    concurrency: usize,
}

impl SensitivityEngine {
    /// 새 민감도 엔진을 생성합니다.
    pub fn new(config: BacktestConfig, detectors: Vec<String>) -> Self {
        Self {
            config,
            detectors,
            policy: MergePolicy::default(),
            concurrency: 4,
        }
    }

    /// 병합 정책 설정.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 동시 실행 포인트 수 설정 (최소 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 단일 파라미터 스윕.
    ///
    /// `values`의 각 값으로 `param_name`만 바꾼 독립 실행을 수행합니다.
    /// 실패한 포인트는 로그 후 집계에서 제외되며 스윕 전체를 실패시키지
    /// 않습니다.
    pub async fn sweep_single(
        &self,
        bars: Arc<Vec<Bar>>,
        base_params: &StrategyParams,
        param_name: &str,
        values: Vec<ParamValue>,
    ) -> SingleParameterSweep {
        info!(
            param = param_name,
            grid_size = values.len(),
            concurrency = self.concurrency,
            "단일 파라미터 스윕 시작"
        );

        let jobs: Vec<StrategyParams> = values
            .iter()
            .map(|v| {
                let mut params = base_params.clone();
                params.set(param_name, v.clone());
                params
            })
            .collect();

        let reports = self.run_grid(bars, jobs).await;

        let mut points: Vec<SweepPoint> = Vec::with_capacity(values.len());
        let mut failed_points = 0usize;
        for (value, report) in values.iter().zip(reports.iter()) {
            match report {
                Some(report) => points.push(SweepPoint {
                    value: value.clone(),
                    total_return_pct: report.return_metrics.total_return_pct,
                    sharpe_ratio: report.risk_metrics.sharpe_ratio,
                    win_rate_pct: report.trading_metrics.win_rate_pct,
                    optimal: false,
                }),
                None => failed_points += 1,
            }
        }

        // 최적 포인트: 총 수익률 최대 (동률이면 앞선 값)
        let mut optimal_index: Option<usize> = None;
        let mut best: Option<Decimal> = None;
        for (i, point) in points.iter().enumerate() {
            if best.map(|b| point.total_return_pct > b).unwrap_or(true) {
                best = Some(point.total_return_pct);
                optimal_index = Some(i);
            }
        }
        if let Some(i) = optimal_index {
            points[i].optimal = true;
        }

        let returns: Vec<f64> = points
            .iter()
            .filter_map(|p| p.total_return_pct.to_f64())
            .collect();

        SingleParameterSweep {
            param_name: param_name.to_string(),
            optimal_value: optimal_index.map(|i| points[i].value.clone()),
            stability_score: stability_score(&returns),
            failed_points,
            points,
        }
    }

    /// 이중 파라미터 히트맵 스윕.
    ///
    /// `cells[y][x]`는 `(y_values[y], x_values[x])` 조합의 총 수익률입니다.
    pub async fn sweep_dual(
        &self,
        bars: Arc<Vec<Bar>>,
        base_params: &StrategyParams,
        x: (&str, Vec<ParamValue>),
        y: (&str, Vec<ParamValue>),
    ) -> DualParameterGrid {
        let (x_name, x_values) = x;
        let (y_name, y_values) = y;

        info!(
            x = x_name,
            y = y_name,
            grid_size = x_values.len() * y_values.len(),
            "이중 파라미터 스윕 시작"
        );

        let mut jobs: Vec<StrategyParams> = Vec::with_capacity(x_values.len() * y_values.len());
        for y_value in &y_values {
            for x_value in &x_values {
                let mut params = base_params.clone();
                params.set(x_name, x_value.clone());
                params.set(y_name, y_value.clone());
                jobs.push(params);
            }
        }

        let reports = self.run_grid(bars, jobs).await;

        let width = x_values.len();
        let cells: Vec<Vec<Option<Decimal>>> = y_values
            .iter()
            .enumerate()
            .map(|(iy, _)| {
                (0..width)
                    .map(|ix| {
                        reports[iy * width + ix]
                            .as_ref()
                            .map(|r| r.return_metrics.total_return_pct)
                    })
                    .collect()
            })
            .collect();

        // 최적 셀: 총 수익률 최대
        let mut optimal_cell: Option<(usize, usize)> = None;
        let mut best: Option<Decimal> = None;
        for (iy, row) in cells.iter().enumerate() {
            for (ix, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    if best.map(|b| *value > b).unwrap_or(true) {
                        best = Some(*value);
                        optimal_cell = Some((iy, ix));
                    }
                }
            }
        }

        DualParameterGrid {
            x_name: x_name.to_string(),
            y_name: y_name.to_string(),
            x_values,
            y_values,
            cells,
            optimal_cell,
        }
    }

    /// 그리드 실행: 포인트별 독립 엔진을 제한된 동시성으로 수행합니다.
    ///
    /// 반환 벡터는 입력 순서를 유지하며, 실패 포인트는 `None`입니다.
    async fn run_grid(
        &self,
        bars: Arc<Vec<Bar>>,
        jobs: Vec<StrategyParams>,
    ) -> Vec<Option<BacktestReport>> {
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);

        for (index, params) in jobs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let bars = bars.clone();
            let config = self.config.clone();
            let detectors = self.detectors.clone();
            let policy = self.policy;

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };

                let result = tokio::task::spawn_blocking(move || {
                    let names: Vec<&str> = detectors.iter().map(|s| s.as_str()).collect();
                    let registry = DetectorRegistry::from_names(&names)?.with_policy(policy);
                    let mut engine = BacktestEngine::new(config, registry);
                    engine.run(&bars, &params)
                })
                .await;

                match result {
                    Ok(Ok(report)) => (index, Some(report)),
                    Ok(Err(e)) => {
                        warn!(index, error = %e, "그리드 포인트 실패, 집계에서 제외");
                        (index, None)
                    }
                    Err(e) => {
                        warn!(index, error = %e, "그리드 포인트 작업 중단, 집계에서 제외");
                        (index, None)
                    }
                }
            }));
        }

        let mut results: Vec<Option<BacktestReport>> = (0..total).map(|_| None).collect();
        for joined in futures::future::join_all(handles).await {
            if let Ok((index, report)) = joined {
                results[index] = report;
            }
        }
        results
    }
}

/// 안정성 점수: `1 / (1 + σ / (|μ| + 1))`.
///
/// 스윕의 총 수익률 분산이 클수록 (파라미터에 민감할수록) 낮아집니다.
/// 포인트가 1개 이하이면 1.0입니다.
fn stability_score(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 1.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let dispersion = variance.sqrt() / (mean.abs() + 1.0);
    1.0 / (1.0 + dispersion)
}
