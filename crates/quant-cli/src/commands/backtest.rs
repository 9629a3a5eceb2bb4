//! backtest 서브커맨드.

use anyhow::Context;
use quant_engine::BacktestEngine;
use quant_strategy::DetectorRegistry;
use tracing::info;

use crate::commands::{load_config, load_params, parse_detectors};
use crate::data::load_bars_csv;

/// CSV 캔들로 백테스트를 실행하고 요약을 출력합니다.
pub fn run_backtest(
    bars_path: &str,
    config_path: Option<&str>,
    detectors: &str,
    params_path: Option<&str>,
    output_path: Option<&str>,
) -> anyhow::Result<()> {
    let bars = load_bars_csv(bars_path)?;
    let config = load_config(config_path)?;
    let params = load_params(params_path)?;

    let detector_names = parse_detectors(detectors);
    let names: Vec<&str> = detector_names.iter().map(|s| s.as_str()).collect();
    let registry = DetectorRegistry::from_names(&names)?;

    info!(bars = bars.len(), detectors = ?detector_names, "백테스트 실행");

    let mut engine = BacktestEngine::new(config, registry);
    let report = engine.run(&bars, &params)?;

    println!("{}", report.summary());

    if let Some(output_path) = output_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("리포트 저장 실패: {}", output_path))?;
        info!(path = output_path, "리포트 저장 완료");
    }

    Ok(())
}
