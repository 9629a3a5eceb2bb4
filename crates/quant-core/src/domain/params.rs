//! 전략 파라미터.
//!
//! 외부 파서 협력자가 이미 구조화/검증한 파라미터를 받는 모델입니다.
//! 한 번의 실행 안에서는 불변이며, 민감도 분석만 값을 바꾼 사본을 만듭니다.
//! 선언 순서가 보존됩니다 (그리드 스윕 결과를 파라미터 순서대로 보고하기 위함).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 파라미터 값.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum ParamValue {
    /// 정수
    Int(i64),
    /// 소수 (기간 배수, 임계값 등)
    Number(Decimal),
    /// 불리언 플래그
    Flag(bool),
    /// 문자열 (티커, 변형 이름 등)
    Text(String),
}

impl ParamValue {
    /// 수치 값으로 변환합니다 (Int/Number만 해당).
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Int(v) => Some(Decimal::from(*v)),
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// 표시용 문자열.
    pub fn display(&self) -> String {
        match self {
            ParamValue::Int(v) => v.to_string(),
            ParamValue::Number(v) => v.to_string(),
            ParamValue::Flag(v) => v.to_string(),
            ParamValue::Text(v) => v.clone(),
        }
    }
}

/// 수치 파라미터의 허용 범위 (닫힌 구간).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    /// 최솟값
    pub min: Decimal,
    /// 최댓값
    pub max: Decimal,
}

impl ParamRange {
    /// 새 범위를 생성합니다.
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// 값이 범위 안에 있는지 확인합니다.
    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// 이름 있는 파라미터 항목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    /// 파라미터 이름
    pub name: String,
    /// 값
    pub value: ParamValue,
    /// 허용 범위 (수치 파라미터만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ParamRange>,
}

/// 순서가 보존되는 전략 파라미터 집합.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    entries: Vec<ParamEntry>,
}

impl StrategyParams {
    /// 빈 파라미터 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 파라미터를 추가합니다 (빌더 스타일).
    ///
    /// 같은 이름이 이미 있으면 값을 교체합니다.
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    /// 범위가 있는 파라미터를 추가합니다.
    pub fn with_range(
        mut self,
        name: impl Into<String>,
        value: ParamValue,
        range: ParamRange,
    ) -> Self {
        let name = name.into();
        self.entries.retain(|e| e.name != name);
        self.entries.push(ParamEntry {
            name,
            value,
            range: Some(range),
        });
        self
    }

    /// 파라미터 값을 설정합니다. 기존 범위는 유지됩니다.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.value = value;
        } else {
            self.entries.push(ParamEntry {
                name,
                value,
                range: None,
            });
        }
    }

    /// 이름으로 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.value)
    }

    /// usize 값을 조회합니다 (없거나 타입이 다르면 기본값).
    pub fn get_usize(&self, name: &str, default: usize) -> usize {
        match self.get(name) {
            Some(ParamValue::Int(v)) if *v >= 0 => *v as usize,
            Some(ParamValue::Number(v)) => v.to_usize().unwrap_or(default),
            _ => default,
        }
    }

    /// Decimal 값을 조회합니다 (없거나 타입이 다르면 기본값).
    pub fn get_decimal(&self, name: &str, default: Decimal) -> Decimal {
        self.get(name).and_then(|v| v.as_decimal()).unwrap_or(default)
    }

    /// bool 값을 조회합니다.
    pub fn get_flag(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(ParamValue::Flag(v)) => *v,
            _ => default,
        }
    }

    /// 문자열 값을 조회합니다.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// 선언 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &ParamEntry> {
        self.entries.iter()
    }

    /// 파라미터 개수.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 모든 수치 파라미터가 선언된 범위 안에 있는지 검증합니다.
    ///
    /// 실행 시작 전에 호출되며, 위반 시 [`CoreError::InvalidInput`]입니다.
    pub fn validate(&self) -> Result<(), CoreError> {
        for entry in &self.entries {
            if let (Some(range), Some(value)) = (&entry.range, entry.value.as_decimal()) {
                if !range.contains(value) {
                    return Err(CoreError::invalid_input(format!(
                        "파라미터 '{}' 값 {}이(가) 허용 범위 [{}, {}]를 벗어났습니다",
                        entry.name, value, range.min, range.max
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_order_preserved() {
        let params = StrategyParams::new()
            .with("short_period", ParamValue::Int(5))
            .with("long_period", ParamValue::Int(20))
            .with("oversold", ParamValue::Number(dec!(30)));

        let names: Vec<_> = params.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["short_period", "long_period", "oversold"]);
    }

    #[test]
    fn test_set_replaces_value() {
        let mut params = StrategyParams::new().with("period", ParamValue::Int(14));
        params.set("period", ParamValue::Int(7));
        assert_eq!(params.get_usize("period", 0), 7);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_typed_getters() {
        let params = StrategyParams::new()
            .with("period", ParamValue::Int(14))
            .with("mult", ParamValue::Number(dec!(2.5)))
            .with("enabled", ParamValue::Flag(true))
            .with("ticker", ParamValue::Text("600519".to_string()));

        assert_eq!(params.get_usize("period", 0), 14);
        assert_eq!(params.get_decimal("mult", Decimal::ZERO), dec!(2.5));
        assert!(params.get_flag("enabled", false));
        assert_eq!(params.get_text("ticker"), Some("600519"));
        assert_eq!(params.get_usize("missing", 9), 9);
    }

    #[test]
    fn test_range_validation() {
        let params = StrategyParams::new().with_range(
            "period",
            ParamValue::Int(200),
            ParamRange::new(dec!(2), dec!(100)),
        );
        assert!(params.validate().is_err());

        let ok = StrategyParams::new().with_range(
            "period",
            ParamValue::Int(14),
            ParamRange::new(dec!(2), dec!(100)),
        );
        assert!(ok.validate().is_ok());
    }
}
