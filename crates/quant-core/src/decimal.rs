//! 금액/비율 Decimal 연산.
//!
//! 모든 파생 금액과 비율은 이 모듈을 거쳐 계산됩니다.
//! 원시 `f64` 산술로 금액을 만들면 반올림 오차가 원장 전체에 누적되므로,
//! 외부 경계(통계의 무차원 비율 제외)에서는 `Decimal`만 사용합니다.
//!
//! # 정준 반올림
//!
//! - 통화: 소수 2자리, half-up (midpoint away from zero)
//! - 비율(%): 소수 4자리, half-up
//!
//! 직렬화 경계에서 이 두 반올림만 적용하면 결과 객체는 손실 없이
//! 왕복(serialize → deserialize)됩니다.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CoreError;

/// 통화 반올림 자릿수.
pub const CURRENCY_DP: u32 = 2;

/// 비율(%) 반올림 자릿수.
pub const PERCENT_DP: u32 = 4;

/// `Decimal` 금액 연산 확장.
pub trait DecimalExt: Sized {
    /// 나눗셈. 제수가 0이면 [`CoreError::DivisionByZero`]를 반환합니다.
    fn try_div(self, divisor: Decimal, context: &'static str) -> Result<Decimal, CoreError>;

    /// 안전 나눗셈. 제수가 0이면 호출자가 지정한 기본값을 반환합니다.
    ///
    /// 빈 구간 통계처럼 0 제수가 정상적으로 발생할 수 있는 곳에서 사용합니다.
    fn safe_div(self, divisor: Decimal, default: Decimal) -> Decimal;

    /// 통화 반올림 (2자리, half-up).
    fn to_currency(self) -> Decimal;

    /// 비율 반올림 (4자리, half-up).
    fn to_percent(self) -> Decimal;
}

impl DecimalExt for Decimal {
    fn try_div(self, divisor: Decimal, context: &'static str) -> Result<Decimal, CoreError> {
        if divisor.is_zero() {
            return Err(CoreError::DivisionByZero { context });
        }
        Ok(self / divisor)
    }

    fn safe_div(self, divisor: Decimal, default: Decimal) -> Decimal {
        if divisor.is_zero() {
            default
        } else {
            self / divisor
        }
    }

    fn to_currency(self) -> Decimal {
        self.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
    }

    fn to_percent(self) -> Decimal {
        self.round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// 변화율(%)을 계산합니다: `(to - from) / from * 100`.
///
/// `from`이 0이면 0%를 반환합니다.
pub fn pct_change(from: Decimal, to: Decimal) -> Decimal {
    (to - from)
        .safe_div(from, Decimal::ZERO)
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
        .to_percent()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_try_div() {
        let r = dec!(10).try_div(dec!(4), "테스트").unwrap();
        assert_eq!(r, dec!(2.5));
    }

    #[test]
    fn test_try_div_zero() {
        let r = dec!(10).try_div(Decimal::ZERO, "테스트");
        assert!(matches!(r, Err(CoreError::DivisionByZero { .. })));
    }

    #[test]
    fn test_safe_div_zero_returns_default() {
        assert_eq!(dec!(10).safe_div(Decimal::ZERO, dec!(-1)), dec!(-1));
        assert_eq!(dec!(10).safe_div(dec!(2), dec!(-1)), dec!(5));
    }

    #[test]
    fn test_currency_rounding_half_up() {
        // 반올림 경계: 0.005는 올림
        assert_eq!(dec!(1.005).to_currency(), dec!(1.01));
        assert_eq!(dec!(1.004).to_currency(), dec!(1.00));
        // 음수도 절대값 기준으로 half-up
        assert_eq!(dec!(-1.005).to_currency(), dec!(-1.01));
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(dec!(0.123456).to_percent(), dec!(0.1235));
        assert_eq!(dec!(0.12344).to_percent(), dec!(0.1234));
    }

    #[test]
    fn test_pct_change() {
        assert_eq!(pct_change(dec!(100), dec!(110)), dec!(10));
        assert_eq!(pct_change(Decimal::ZERO, dec!(110)), Decimal::ZERO);
        assert_eq!(pct_change(dec!(100), dec!(90)), dec!(-10));
    }
}
