//! CSV 캔들 로더.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use quant_core::Bar;
use serde::Deserialize;

/// CSV 행 스키마. 날짜는 `YYYY-MM-DD` 또는 RFC 3339.
#[derive(Debug, Deserialize)]
struct BarRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// CSV 파일에서 캔들 시계열을 읽습니다.
///
/// 비유한 값(NaN/무한대)이 있는 행은 전체 로드를 실패시킵니다.
/// 품질이 의심되는 데이터로 조용히 백테스트하지 않습니다.
pub fn load_bars_csv(path: &str) -> anyhow::Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("캔들 CSV를 열 수 없습니다: {}", path))?;

    let mut bars = Vec::new();
    for (line, row) in reader.deserialize::<BarRow>().enumerate() {
        let row = row.with_context(|| format!("CSV {}행 파싱 실패", line + 2))?;
        let time = parse_date(&row.date)
            .with_context(|| format!("CSV {}행 날짜 파싱 실패: {}", line + 2, row.date))?;
        let bar = Bar::from_f64(time, row.open, row.high, row.low, row.close, row.volume)
            .with_context(|| format!("CSV {}행 값 오류", line + 2))?;
        bars.push(bar);
    }

    Ok(bars)
}

/// `YYYY-MM-DD` 또는 RFC 3339 문자열을 UTC 시각으로 변환합니다.
fn parse_date(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .context("자정 시각 구성 실패")?;
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
