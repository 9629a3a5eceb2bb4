//! 현금/포지션 원장.
//!
//! 시뮬레이션 한 번에 하나의 종목 포지션만 관리합니다.
//! 모든 변경은 엔진의 체결 경로에서만 일어나며, 중간 상태가 외부에
//! 노출되지 않습니다.

use chrono::{DateTime, Utc};
use quant_core::DecimalExt;
use quant_strategy::PositionView;
use rust_decimal::Decimal;

/// 단일 종목 계좌 원장.
#[derive(Debug, Clone)]
pub struct Account {
    cash: Decimal,
    quantity: u64,
    entry_price: Decimal,
    /// 진입 원가 (약정 금액 + 진입 비용). 실현 손익 계산의 기준.
    entry_cost_basis: Decimal,
    entry_time: Option<DateTime<Utc>>,
}

impl Account {
    /// 초기 자본금으로 원장을 생성합니다.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash: initial_capital,
            quantity: 0,
            entry_price: Decimal::ZERO,
            entry_cost_basis: Decimal::ZERO,
            entry_time: None,
        }
    }

    /// 현재 현금.
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// 보유 수량.
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// 평균 진입가.
    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// 진입 원가 (약정 + 비용).
    pub fn entry_cost_basis(&self) -> Decimal {
        self.entry_cost_basis
    }

    /// 진입 시각.
    pub fn entry_time(&self) -> Option<DateTime<Utc>> {
        self.entry_time
    }

    /// 포지션 보유 여부.
    pub fn has_position(&self) -> bool {
        self.quantity > 0
    }

    /// 탐지기에 전달할 읽기 전용 뷰.
    pub fn position_view(&self) -> PositionView {
        if self.has_position() {
            PositionView::holding(self.quantity, self.entry_price)
        } else {
            PositionView::flat()
        }
    }

    /// 현재 종가 기준 총 자산.
    pub fn equity(&self, close: Decimal) -> Decimal {
        (self.cash + Decimal::from(self.quantity) * close).to_currency()
    }

    /// 매수 체결을 반영합니다.
    ///
    /// `total_outlay`(약정 + 비용)만큼 현금을 차감하고 포지션을 엽니다.
    /// 현금이 부족한 호출은 엔진의 수량 축소 루프에서 이미 걸러집니다.
    pub fn open(
        &mut self,
        quantity: u64,
        execution_price: Decimal,
        total_outlay: Decimal,
        time: DateTime<Utc>,
    ) {
        debug_assert!(self.quantity == 0, "중복 진입");
        debug_assert!(total_outlay <= self.cash, "현금 초과 체결");

        self.cash = (self.cash - total_outlay).to_currency();
        self.quantity = quantity;
        self.entry_price = execution_price;
        self.entry_cost_basis = total_outlay;
        self.entry_time = Some(time);
    }

    /// 매도 체결을 반영합니다.
    ///
    /// 순수령액(`net_proceeds`)을 현금에 더하고 포지션을 닫은 뒤
    /// (실현 손익, 보유 일수)를 반환합니다.
    pub fn close(&mut self, net_proceeds: Decimal, time: DateTime<Utc>) -> (Decimal, Option<i64>) {
        let pnl = (net_proceeds - self.entry_cost_basis).to_currency();
        let holding_days = self.entry_time.map(|entry| (time - entry).num_days());

        self.cash = (self.cash + net_proceeds).to_currency();
        self.quantity = 0;
        self.entry_price = Decimal::ZERO;
        self.entry_cost_basis = Decimal::ZERO;
        self.entry_time = None;

        (pnl, holding_days)
    }
}
