//! 거래 비용 모델.
//!
//! A주 비용 구조를 따릅니다:
//! - 수수료: 약정 금액 × 요율, 최저 수수료 하한 적용
//! - 인지세: 매도 시에만 부과
//! - 과호비(이체 수수료): 매수/매도 모두 부과
//! - 슬리피지는 체결 가격에 반영되므로 이 모델에 포함되지 않습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::DecimalExt;

/// 거래 1건의 비용 내역.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// 위탁 수수료
    pub commission: Decimal,
    /// 인지세 (매수 시 0)
    pub stamp_duty: Decimal,
    /// 과호비
    pub transfer_fee: Decimal,
    /// 합계
    pub total: Decimal,
    /// 약정 금액 대비 비용 비율 (%)
    pub total_pct: Decimal,
}

/// 비용 계산 모델.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// 수수료율 (예: 0.0003 = 0.03%)
    pub commission_rate: Decimal,
    /// 최저 수수료
    pub min_commission: Decimal,
    /// 인지세율 (매도 전용, 예: 0.001 = 0.1%)
    pub stamp_duty_rate: Decimal,
    /// 과호비율 (예: 0.00002 = 0.002%)
    pub transfer_fee_rate: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            commission_rate: dec!(0.0003),
            min_commission: dec!(5),
            stamp_duty_rate: dec!(0.001),
            transfer_fee_rate: dec!(0.00002),
        }
    }
}

impl CostModel {
    /// 약정 금액에 대한 비용을 계산합니다.
    ///
    /// 금액이 0이면 모든 항목이 0입니다 (최저 수수료도 부과하지 않음).
    pub fn cost(&self, amount: Decimal, is_sell: bool) -> CostBreakdown {
        if amount.is_zero() {
            return CostBreakdown {
                commission: Decimal::ZERO,
                stamp_duty: Decimal::ZERO,
                transfer_fee: Decimal::ZERO,
                total: Decimal::ZERO,
                total_pct: Decimal::ZERO,
            };
        }

        let commission = (amount * self.commission_rate)
            .max(self.min_commission)
            .to_currency();
        let stamp_duty = if is_sell {
            (amount * self.stamp_duty_rate).to_currency()
        } else {
            Decimal::ZERO
        };
        let transfer_fee = (amount * self.transfer_fee_rate).to_currency();
        let total = commission + stamp_duty + transfer_fee;
        let total_pct = total
            .safe_div(amount, Decimal::ZERO)
            .checked_mul(Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
            .to_percent();

        CostBreakdown {
            commission,
            stamp_duty,
            transfer_fee,
            total,
            total_pct,
        }
    }

    /// 매수 비용.
    pub fn buy_cost(&self, amount: Decimal) -> CostBreakdown {
        self.cost(amount, false)
    }

    /// 매도 비용.
    pub fn sell_cost(&self, amount: Decimal) -> CostBreakdown {
        self.cost(amount, true)
    }

    /// 동일 약정 금액 기준 왕복(매수 + 매도) 비용 합계.
    pub fn round_trip_cost(&self, amount: Decimal) -> Decimal {
        self.buy_cost(amount).total + self.sell_cost(amount).total
    }
}
