//! CLI 서브커맨드 구현.

pub mod backtest;
pub mod sensitivity;

use anyhow::Context;
use quant_core::StrategyParams;
use quant_engine::BacktestConfig;

/// 설정 TOML을 읽습니다. 경로가 없으면 기본값입니다.
pub fn load_config(path: Option<&str>) -> anyhow::Result<BacktestConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("설정 파일을 열 수 없습니다: {}", path))?;
            toml::from_str(&content).with_context(|| format!("설정 파싱 실패: {}", path))
        }
        None => Ok(BacktestConfig::default()),
    }
}

/// 파라미터 JSON을 읽습니다. 경로가 없으면 빈 파라미터입니다.
pub fn load_params(path: Option<&str>) -> anyhow::Result<StrategyParams> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("파라미터 파일을 열 수 없습니다: {}", path))?;
            serde_json::from_str(&content).with_context(|| format!("파라미터 파싱 실패: {}", path))
        }
        None => Ok(StrategyParams::new()),
    }
}

/// 쉼표 구분 탐지기 목록을 파싱합니다.
pub fn parse_detectors(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
