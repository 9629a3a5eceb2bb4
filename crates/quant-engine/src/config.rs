//! 백테스트 설정.

use chrono::{DateTime, Utc};
use quant_core::{CostModel, Timeframe};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::engine::BacktestError;

/// 백테스트 설정.
///
/// 실행 시작 전에 [`validate`](BacktestConfig::validate)로 범위를 검증하며,
/// 위반은 어떤 부수효과보다 먼저 실패합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 초기 자본금
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// 수수료율 (예: 0.0003 = 0.03%)
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// 최저 수수료
    #[serde(default = "default_min_commission")]
    pub min_commission: Decimal,

    /// 인지세율 (매도 전용)
    #[serde(default = "default_stamp_duty_rate")]
    pub stamp_duty_rate: Decimal,

    /// 과호비율
    #[serde(default = "default_transfer_fee_rate")]
    pub transfer_fee_rate: Decimal,

    /// 슬리피지율 (체결가에 반영)
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: Decimal,

    /// 매매단위 (A주 기본 100주)
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,

    /// 가격 제한폭 (예: 0.1 = ±10%)
    #[serde(default = "default_price_limit_rate")]
    pub price_limit_rate: Decimal,

    /// 연간 거래일 수 (연율화 계산용)
    #[serde(default = "default_annual_trading_days")]
    pub annual_trading_days: u32,

    /// 무위험 이자율 (연율, 샤프 계산용)
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// 단일 거래 이상 수익률 경고 임계값 (%)
    #[serde(default = "default_extreme_return_pct")]
    pub extreme_return_pct: Decimal,

    /// 연속 신호 최소 간격 (캔들 수, 0 = 비활성)
    #[serde(default)]
    pub min_signal_spacing: usize,

    /// 캔들 주기
    #[serde(default)]
    pub timeframe: Timeframe,

    /// 시뮬레이션 시작 시각 (None이면 전체 구간)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// 시뮬레이션 종료 시각 (None이면 전체 구간)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

fn default_initial_capital() -> Decimal {
    dec!(1000000)
}
fn default_commission_rate() -> Decimal {
    dec!(0.0003)
}
fn default_min_commission() -> Decimal {
    dec!(5)
}
fn default_stamp_duty_rate() -> Decimal {
    dec!(0.001)
}
fn default_transfer_fee_rate() -> Decimal {
    dec!(0.00002)
}
fn default_slippage_rate() -> Decimal {
    dec!(0.001)
}
fn default_lot_size() -> u64 {
    100
}
fn default_price_limit_rate() -> Decimal {
    dec!(0.1)
}
fn default_annual_trading_days() -> u32 {
    250
}
fn default_risk_free_rate() -> f64 {
    0.03
}
fn default_extreme_return_pct() -> Decimal {
    dec!(50)
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            commission_rate: default_commission_rate(),
            min_commission: default_min_commission(),
            stamp_duty_rate: default_stamp_duty_rate(),
            transfer_fee_rate: default_transfer_fee_rate(),
            slippage_rate: default_slippage_rate(),
            lot_size: default_lot_size(),
            price_limit_rate: default_price_limit_rate(),
            annual_trading_days: default_annual_trading_days(),
            risk_free_rate: default_risk_free_rate(),
            extreme_return_pct: default_extreme_return_pct(),
            min_signal_spacing: 0,
            timeframe: Timeframe::D1,
            start_time: None,
            end_time: None,
        }
    }
}

impl BacktestConfig {
    /// 초기 자본금으로 설정을 생성합니다.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    /// 수수료율 설정.
    pub fn with_commission_rate(mut self, rate: Decimal) -> Self {
        self.commission_rate = rate;
        self
    }

    /// 최저 수수료 설정.
    pub fn with_min_commission(mut self, min: Decimal) -> Self {
        self.min_commission = min;
        self
    }

    /// 인지세율 설정.
    pub fn with_stamp_duty_rate(mut self, rate: Decimal) -> Self {
        self.stamp_duty_rate = rate;
        self
    }

    /// 슬리피지율 설정.
    pub fn with_slippage_rate(mut self, rate: Decimal) -> Self {
        self.slippage_rate = rate;
        self
    }

    /// 매매단위 설정.
    pub fn with_lot_size(mut self, lot_size: u64) -> Self {
        self.lot_size = lot_size;
        self
    }

    /// 가격 제한폭 설정.
    pub fn with_price_limit_rate(mut self, rate: Decimal) -> Self {
        self.price_limit_rate = rate;
        self
    }

    /// 연속 신호 최소 간격 설정.
    pub fn with_min_signal_spacing(mut self, spacing: usize) -> Self {
        self.min_signal_spacing = spacing;
        self
    }

    /// 시뮬레이션 구간 설정.
    pub fn with_window(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// 비용 모델을 구성합니다.
    pub fn cost_model(&self) -> CostModel {
        CostModel {
            commission_rate: self.commission_rate,
            min_commission: self.min_commission,
            stamp_duty_rate: self.stamp_duty_rate,
            transfer_fee_rate: self.transfer_fee_rate,
        }
    }

    /// 설정 범위 검증.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::invalid_input("초기 자본은 0보다 커야 합니다"));
        }

        for (name, rate) in [
            ("commission_rate", self.commission_rate),
            ("stamp_duty_rate", self.stamp_duty_rate),
            ("transfer_fee_rate", self.transfer_fee_rate),
            ("slippage_rate", self.slippage_rate),
        ] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(BacktestError::invalid_input(format!(
                    "{}은(는) [0, 1) 범위여야 합니다: {}",
                    name, rate
                )));
            }
        }

        if self.min_commission < Decimal::ZERO {
            return Err(BacktestError::invalid_input("최저 수수료는 음수일 수 없습니다"));
        }
        if self.lot_size == 0 {
            return Err(BacktestError::invalid_input("매매단위는 1 이상이어야 합니다"));
        }
        if self.price_limit_rate <= Decimal::ZERO || self.price_limit_rate > Decimal::ONE {
            return Err(BacktestError::invalid_input(format!(
                "price_limit_rate는 (0, 1] 범위여야 합니다: {}",
                self.price_limit_rate
            )));
        }
        if self.annual_trading_days == 0 || self.annual_trading_days > 366 {
            return Err(BacktestError::invalid_input(format!(
                "annual_trading_days가 비정상입니다: {}",
                self.annual_trading_days
            )));
        }
        if self.extreme_return_pct <= Decimal::ZERO {
            return Err(BacktestError::invalid_input(
                "extreme_return_pct는 0보다 커야 합니다",
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end <= start {
                return Err(BacktestError::invalid_input(
                    "종료 시각은 시작 시각 이후여야 합니다",
                ));
            }
        }

        Ok(())
    }
}
