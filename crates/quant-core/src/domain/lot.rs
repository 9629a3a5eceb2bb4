//! 매매단위(lot) 정렬 수량 계산.
//!
//! A주는 100주 단위로만 매수할 수 있으므로, 주문 금액을 수량으로 바꿀 때
//! 반드시 매매단위 배수로 내림 정렬합니다. 정렬 과정에서 체결되지 못하는
//! 잔여 금액은 `rounding_loss`로 보고합니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::DecimalExt;
use crate::error::CoreError;

/// 매매단위 정렬 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotCalculation {
    /// 금액 기준 요청 주수 (`⌊amount / price⌋`)
    pub requested_quantity: u64,
    /// 매매단위 (예: 100주)
    pub lot_size: u64,
    /// 체결 가능한 lot 수
    pub actual_lots: u64,
    /// 실제 체결 주수 (`actual_lots × lot_size`)
    pub actual_quantity: u64,
    /// 정렬로 체결되지 못한 금액
    pub rounding_loss: Decimal,
    /// 요청 금액 대비 잔여 금액 비율 (%)
    pub rounding_loss_pct: Decimal,
}

impl LotCalculation {
    /// 한 주도 체결할 수 없는 결과인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.actual_quantity == 0
    }
}

/// 주문 금액을 매매단위 정렬 수량으로 변환합니다.
///
/// `requested = ⌊amount/price⌋`, `lots = ⌊requested/lot_size⌋`,
/// `quantity = lots × lot_size`, `loss = amount − quantity × price`.
///
/// # 오류
///
/// * 가격이 0이면 [`CoreError::DivisionByZero`]
/// * 가격이 음수이거나 매매단위가 0이면 [`CoreError::InvalidInput`]
pub fn calculate_lot(
    amount: Decimal,
    price: Decimal,
    lot_size: u64,
) -> Result<LotCalculation, CoreError> {
    if price < Decimal::ZERO {
        return Err(CoreError::invalid_input(format!(
            "가격은 음수일 수 없습니다: {}",
            price
        )));
    }
    if lot_size == 0 {
        return Err(CoreError::invalid_input("매매단위는 0일 수 없습니다"));
    }

    let requested_quantity = amount
        .try_div(price, "매매단위 계산")?
        .floor()
        .to_u64()
        .unwrap_or(0);

    let actual_lots = requested_quantity / lot_size;
    let actual_quantity = actual_lots * lot_size;

    let rounding_loss = (amount - Decimal::from(actual_quantity) * price).to_currency();
    let rounding_loss_pct = rounding_loss
        .safe_div(amount, Decimal::ZERO)
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
        .to_percent();

    Ok(LotCalculation {
        requested_quantity,
        lot_size,
        actual_lots,
        actual_quantity,
        rounding_loss,
        rounding_loss_pct,
    })
}
