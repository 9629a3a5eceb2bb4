//! 이름 → 지표 시퀀스 집합.
//!
//! 탐지기가 참조하는 표준 지표들을 캔들 시계열과 인덱스 정렬된 형태로
//! 한 번에 계산해 담습니다. 모든 시퀀스는 캔들 수와 길이가 같습니다.

use std::collections::HashMap;

use quant_core::{Bar, CoreError, StrategyParams};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{bollinger, macd, rsi, sma};

/// 표준 지표 키.
pub mod keys {
    /// 단기 이동평균
    pub const MA_SHORT: &str = "ma_short";
    /// 장기 이동평균
    pub const MA_LONG: &str = "ma_long";
    /// RSI
    pub const RSI: &str = "rsi";
    /// MACD DIF
    pub const MACD_DIF: &str = "macd_dif";
    /// MACD DEA
    pub const MACD_DEA: &str = "macd_dea";
    /// MACD 히스토그램
    pub const MACD_HIST: &str = "macd_hist";
    /// 볼린저 상단
    pub const BOLL_UPPER: &str = "boll_upper";
    /// 볼린저 중단
    pub const BOLL_MIDDLE: &str = "boll_middle";
    /// 볼린저 하단
    pub const BOLL_LOWER: &str = "boll_lower";
    /// 거래량 이동평균
    pub const VOLUME_MA: &str = "volume_ma";
}

/// 인덱스 정렬된 지표 시퀀스 집합.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    len: usize,
    series: HashMap<String, Vec<Option<Decimal>>>,
}

impl IndicatorSet {
    /// 캔들 수 기준의 빈 집합을 생성합니다.
    pub fn empty(len: usize) -> Self {
        Self {
            len,
            series: HashMap::new(),
        }
    }

    /// 전략 파라미터에 따라 표준 지표를 일괄 계산합니다.
    ///
    /// 파라미터 키와 기본값:
    /// `short_period`(5), `long_period`(20), `rsi_period`(14),
    /// `macd_fast`(12), `macd_slow`(26), `macd_signal`(9),
    /// `boll_period`(20), `boll_mult`(2), `volume_period`(20)
    pub fn compute(bars: &[Bar], params: &StrategyParams) -> Self {
        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<Decimal> = bars.iter().map(|b| b.volume).collect();

        let short_period = params.get_usize("short_period", 5);
        let long_period = params.get_usize("long_period", 20);
        let rsi_period = params.get_usize("rsi_period", 14);
        let macd_fast = params.get_usize("macd_fast", 12);
        let macd_slow = params.get_usize("macd_slow", 26);
        let macd_signal = params.get_usize("macd_signal", 9);
        let boll_period = params.get_usize("boll_period", 20);
        let boll_mult = params.get_decimal("boll_mult", dec!(2));
        let volume_period = params.get_usize("volume_period", 20);

        let mut set = Self::empty(bars.len());

        set.put(keys::MA_SHORT, sma(&closes, short_period));
        set.put(keys::MA_LONG, sma(&closes, long_period));
        set.put(keys::RSI, defined(rsi(&closes, rsi_period)));

        let macd_out = macd(&closes, macd_fast, macd_slow, macd_signal);
        set.put(keys::MACD_DIF, defined(macd_out.dif));
        set.put(keys::MACD_DEA, defined(macd_out.dea));
        set.put(keys::MACD_HIST, defined(macd_out.histogram));

        let boll = bollinger(&closes, boll_period, boll_mult);
        set.put(keys::BOLL_UPPER, boll.upper);
        set.put(keys::BOLL_MIDDLE, boll.middle);
        set.put(keys::BOLL_LOWER, boll.lower);

        set.put(keys::VOLUME_MA, sma(&volumes, volume_period));

        set
    }

    /// 시퀀스를 추가합니다. 길이가 캔들 수와 다르면 거부합니다.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        series: Vec<Option<Decimal>>,
    ) -> Result<(), CoreError> {
        if series.len() != self.len {
            return Err(CoreError::invalid_input(format!(
                "지표 시퀀스 길이 불일치: 캔들 {}개, 시퀀스 {}개",
                self.len,
                series.len()
            )));
        }
        self.series.insert(name.into(), series);
        Ok(())
    }

    // compute()는 항상 같은 길이의 시퀀스를 만들므로 내부 삽입은 실패하지 않음
    fn put(&mut self, name: &str, series: Vec<Option<Decimal>>) {
        debug_assert_eq!(series.len(), self.len);
        self.series.insert(name.to_string(), series);
    }

    /// 이름으로 시퀀스를 조회합니다.
    pub fn series(&self, name: &str) -> Option<&[Option<Decimal>]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// 특정 인덱스의 지표 값을 조회합니다.
    ///
    /// 시퀀스가 없거나 해당 시점에 미정의면 `None`입니다.
    pub fn value(&self, name: &str, index: usize) -> Option<Decimal> {
        self.series.get(name).and_then(|s| s.get(index).copied().flatten())
    }

    /// 캔들 수.
    pub fn len(&self) -> usize {
        self.len
    }

    /// 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 등록된 지표 이름 목록.
    pub fn names(&self) -> Vec<&str> {
        self.series.keys().map(|k| k.as_str()).collect()
    }
}

/// 전 구간 정의된 시퀀스를 `Option` 표현으로 변환합니다.
fn defined(series: Vec<Decimal>) -> Vec<Option<Decimal>> {
    series.into_iter().map(Some).collect()
}
