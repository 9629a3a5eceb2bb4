//! sensitivity 서브커맨드.

use std::sync::Arc;

use anyhow::Context;
use quant_core::ParamValue;
use quant_engine::SensitivityEngine;
use rust_decimal::Decimal;
use tracing::info;

use crate::commands::{load_config, load_params, parse_detectors};
use crate::data::load_bars_csv;

/// 단일 파라미터 민감도 스윕을 실행합니다.
#[allow(clippy::too_many_arguments)]
pub async fn run_sensitivity(
    bars_path: &str,
    config_path: Option<&str>,
    detectors: &str,
    params_path: Option<&str>,
    param_name: &str,
    values: &str,
    concurrency: usize,
    output_path: Option<&str>,
) -> anyhow::Result<()> {
    let bars = Arc::new(load_bars_csv(bars_path)?);
    let config = load_config(config_path)?;
    let base_params = load_params(params_path)?;
    let grid = parse_values(values)?;

    info!(
        param = param_name,
        grid_size = grid.len(),
        concurrency,
        "민감도 스윕 실행"
    );

    let engine = SensitivityEngine::new(config, parse_detectors(detectors))
        .with_concurrency(concurrency);
    let sweep = engine
        .sweep_single(bars, &base_params, param_name, grid)
        .await;

    println!("파라미터 '{}' 스윕 결과", sweep.param_name);
    println!("───────────────────────────────────────");
    for point in &sweep.points {
        let marker = if point.optimal { " ← 최적" } else { "" };
        println!(
            "{:>10} | 수익률 {:>8}% | 샤프 {:>6.2} | 승률 {:>7}%{}",
            point.value.display(),
            point.total_return_pct,
            point.sharpe_ratio,
            point.win_rate_pct,
            marker
        );
    }
    println!("───────────────────────────────────────");
    println!("안정성 점수: {:.3}", sweep.stability_score);
    if sweep.failed_points > 0 {
        println!("실패 포인트: {}개 (집계 제외)", sweep.failed_points);
    }

    if let Some(output_path) = output_path {
        let json = serde_json::to_string_pretty(&sweep)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("리포트 저장 실패: {}", output_path))?;
        info!(path = output_path, "리포트 저장 완료");
    }

    Ok(())
}

/// 쉼표 구분 그리드 값을 파싱합니다. 소수점이 있으면 Number, 없으면 Int.
fn parse_values(values: &str) -> anyhow::Result<Vec<ParamValue>> {
    values
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.contains('.') {
                let value: Decimal = s
                    .parse()
                    .with_context(|| format!("그리드 값 파싱 실패: {}", s))?;
                Ok(ParamValue::Number(value))
            } else {
                let value: i64 = s
                    .parse()
                    .with_context(|| format!("그리드 값 파싱 실패: {}", s))?;
                Ok(ParamValue::Int(value))
            }
        })
        .collect()
}
