//! 백테스트 시뮬레이션 루프.

use chrono::{DateTime, Utc};
use quant_core::{
    calculate_lot, classify_series, validate_series, Bar, CoreError, CostModel, DecimalExt,
    EquityPoint, LotCalculation, Side, Signal, SignalAction, SignalRecord, StrategyParams, Trade,
};
use quant_indicator::IndicatorSet;
use quant_strategy::{DetectorRegistry, MergePolicy, StrategyError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::account::Account;
use crate::config::BacktestConfig;
use crate::diagnostics::{self, Diagnostics};
use crate::performance::{self, HistogramBucket, ReturnMetrics, RiskMetrics, TradingMetrics};

/// 백테스트 오류.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// 잘못된 입력 (설정 범위 위반, 비단조 캔들 등). 부수효과 이전에 실패
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 코어 계산 오류 (0 나누기 등)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// 전략 구성 오류
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

impl BacktestError {
    /// 잘못된 입력 오류를 생성합니다.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// 실행 상태 머신.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// 시작 전
    Idle,
    /// 실행 중
    Running,
    /// 정상 완료
    Completed,
    /// 검증 실패 또는 내부 오류로 중단
    Failed,
}

/// 백테스트 실행 리포트.
///
/// 생성 이후 변경되지 않는 종단 객체입니다. 금액은 소수 2자리,
/// 비율은 소수 4자리로 정준 반올림되어 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// 실행 설정
    pub config: BacktestConfig,
    /// 전략 파라미터
    pub params: StrategyParams,
    /// 사용한 탐지기 (평가 순서대로)
    pub detectors: Vec<String>,
    /// 신호 병합 정책
    pub merge_policy: MergePolicy,
    /// 체결 원장
    pub trades: Vec<Trade>,
    /// 자산 곡선 (캔들 1개당 1포인트)
    pub equity_curve: Vec<EquityPoint>,
    /// 신호 감사 기록 (체결/차단 포함)
    pub signal_records: Vec<SignalRecord>,
    /// 수익 지표
    pub return_metrics: ReturnMetrics,
    /// 리스크 지표
    pub risk_metrics: RiskMetrics,
    /// 매매 지표
    pub trading_metrics: TradingMetrics,
    /// 수익률 분포
    pub return_histogram: Vec<HistogramBucket>,
    /// 진단 경고
    pub diagnostics: Diagnostics,
    /// 시뮬레이션한 캔들 수
    pub data_points: usize,
    /// 시뮬레이션 시작 캔들 시각
    pub start_time: DateTime<Utc>,
    /// 시뮬레이션 종료 캔들 시각
    pub end_time: DateTime<Utc>,
}

impl BacktestReport {
    /// 요약 문자열.
    pub fn summary(&self) -> String {
        format!(
            "백테스트 결과 요약\n\
             ═══════════════════════════════════════\n\
             기간: {} → {} ({} 캔들)\n\
             ───────────────────────────────────────\n\
             초기 자본: {}\n\
             최종 자산: {}\n\
             총 수익률: {}%\n\
             연율화 수익률: {}%\n\
             ───────────────────────────────────────\n\
             체결 수: {} (완결 매매 {})\n\
             승률: {}%\n\
             프로핏 팩터: {:.2}\n\
             ───────────────────────────────────────\n\
             샤프 비율: {:.2}\n\
             소르티노 비율: {:.2}\n\
             최대 낙폭: {}%\n\
             총 비용: {}\n\
             진단 경고: {}건\n\
             ═══════════════════════════════════════",
            self.start_time.format("%Y-%m-%d"),
            self.end_time.format("%Y-%m-%d"),
            self.data_points,
            self.config.initial_capital,
            self.return_metrics.final_equity,
            self.return_metrics.total_return_pct,
            self.return_metrics.annualized_return_pct,
            self.trading_metrics.total_trades,
            self.trading_metrics.round_trips,
            self.trading_metrics.win_rate_pct,
            self.trading_metrics.profit_factor,
            self.risk_metrics.sharpe_ratio,
            self.risk_metrics.sortino_ratio,
            self.risk_metrics.max_drawdown_pct,
            self.trading_metrics.total_costs,
            self.diagnostics.warnings.len(),
        )
    }
}

/// 백테스트 엔진.
///
/// 상태 머신: `Idle → Running → Completed | Failed`.
/// 같은 (캔들, 파라미터, 설정)에 대해 항상 같은 체결 원장과 자산 곡선을
/// 생성합니다. 루프 안에 비결정적 요소가 없습니다.
pub struct BacktestEngine {
    config: BacktestConfig,
    registry: DetectorRegistry,
    state: RunState,
}

impl BacktestEngine {
    /// 새 엔진을 생성합니다.
    pub fn new(config: BacktestConfig, registry: DetectorRegistry) -> Self {
        Self {
            config,
            registry,
            state: RunState::Idle,
        }
    }

    /// 현재 실행 상태.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// 설정 참조.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 시뮬레이션을 실행합니다.
    ///
    /// 검증(설정 범위, 파라미터 범위, 캔들 단조성)은 어떤 부수효과보다
    /// 먼저 수행되며, 실패 시 상태는 `Failed`가 됩니다. 캔들 품질
    /// 문제(비정상/정지/상하한)는 실행을 중단시키지 않고 신호 차단과
    /// 진단 경고로만 반영됩니다.
    pub fn run(
        &mut self,
        bars: &[Bar],
        params: &StrategyParams,
    ) -> Result<BacktestReport, BacktestError> {
        let run_bars = match self.validate_inputs(bars, params) {
            Ok(bars) => bars,
            Err(e) => {
                self.state = RunState::Failed;
                return Err(e);
            }
        };
        self.state = RunState::Running;

        let data_points = run_bars.len();
        let start_time = run_bars[0].time;
        let end_time = run_bars[data_points - 1].time;

        info!(
            data_points,
            start = %start_time,
            end = %end_time,
            detectors = ?self.registry.detector_names(),
            "백테스트 시작"
        );

        let statuses = classify_series(run_bars, self.config.price_limit_rate);
        let indicators = IndicatorSet::compute(run_bars, params);
        let cost_model = self.config.cost_model();

        let mut account = Account::new(self.config.initial_capital);
        let mut trades: Vec<Trade> = Vec::new();
        let mut records: Vec<SignalRecord> = Vec::new();
        let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(data_points);
        let mut peak = Decimal::ZERO;
        let mut last_executed_index: Option<usize> = None;

        for (i, bar) in run_bars.iter().enumerate() {
            // 1. 신호 요청
            let signal =
                self.registry
                    .detect(params, &indicators, run_bars, i, &account.position_view());

            if let Some(signal) = signal.filter(|s| s.is_actionable()) {
                let status = statuses[i];

                // 2. 시장 상태 검증
                if !status.is_tradable() {
                    debug!(index = i, status = %status, action = %signal.action, "체결 불가 캔들");
                    records.push(SignalRecord::blocked(
                        signal,
                        status,
                        format!("체결 불가 상태: {}", status),
                    ));
                } else if self.spacing_violated(i, last_executed_index) {
                    records.push(SignalRecord::blocked(
                        signal,
                        status,
                        "최소 신호 간격 미달",
                    ));
                } else {
                    match signal.action {
                        SignalAction::Buy => {
                            if account.has_position() {
                                records.push(SignalRecord::blocked(
                                    signal,
                                    status,
                                    "이미 포지션 보유 중",
                                ));
                            } else if account.cash() <= Decimal::ZERO {
                                records.push(SignalRecord::blocked(signal, status, "가용 현금 없음"));
                            } else {
                                match self.try_buy(
                                    &mut account,
                                    &cost_model,
                                    &signal,
                                    bar,
                                    trades.len() as u64 + 1,
                                )? {
                                    Some(trade) => {
                                        last_executed_index = Some(i);
                                        trades.push(trade);
                                        records.push(SignalRecord::executed(signal, status));
                                    }
                                    None => {
                                        records.push(SignalRecord::blocked(
                                            signal,
                                            status,
                                            "현금이 1 매매단위 금액에 미달",
                                        ));
                                    }
                                }
                            }
                        }
                        SignalAction::Sell => {
                            if !account.has_position() {
                                records.push(SignalRecord::blocked(
                                    signal,
                                    status,
                                    "보유 포지션 없음",
                                ));
                            } else {
                                let trade = self.execute_sell(
                                    &mut account,
                                    &cost_model,
                                    bar,
                                    trades.len() as u64 + 1,
                                    signal.reason.clone(),
                                );
                                last_executed_index = Some(i);
                                trades.push(trade);
                                records.push(SignalRecord::executed(signal, status));
                            }
                        }
                        SignalAction::Hold => unreachable!("is_actionable로 걸러짐"),
                    }
                }
            }

            // 3. 자산 곡선 (캔들당 정확히 1포인트)
            let equity = account.equity(bar.close);
            peak = peak.max(equity);
            equity_curve.push(EquityPoint {
                time: bar.time,
                equity,
                cash: account.cash(),
                position_quantity: account.quantity(),
                drawdown_pct: drawdown_pct(peak, equity),
            });
        }

        // 4. 미청산 포지션 강제 청산 (마지막 캔들 종가)
        if account.has_position() {
            let last_bar = run_bars.last().unwrap();
            info!(quantity = account.quantity(), "백테스트 종료: 미청산 포지션 강제 청산");

            let trade = self.execute_sell(
                &mut account,
                &cost_model,
                last_bar,
                trades.len() as u64 + 1,
                "force_close".to_string(),
            );
            trades.push(trade);

            // 마지막 자산 포인트를 청산 후 상태로 교체
            let equity = account.equity(last_bar.close);
            peak = peak.max(equity);
            if let Some(last_point) = equity_curve.last_mut() {
                *last_point = EquityPoint {
                    time: last_bar.time,
                    equity,
                    cash: account.cash(),
                    position_quantity: 0,
                    drawdown_pct: drawdown_pct(peak, equity),
                };
            }
        }

        // 5. 통계/진단 (완료된 원장 기준 1회)
        let summary = performance::compute(&self.config, &trades, &equity_curve);
        let diagnostics =
            diagnostics::diagnose(&trades, &statuses, self.config.extreme_return_pct);

        self.state = RunState::Completed;
        info!(
            trades = trades.len(),
            total_return_pct = %summary.return_metrics.total_return_pct,
            "백테스트 완료"
        );

        Ok(BacktestReport {
            config: self.config.clone(),
            params: params.clone(),
            detectors: self
                .registry
                .detector_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            merge_policy: self.registry.policy(),
            trades,
            equity_curve,
            signal_records: records,
            return_metrics: summary.return_metrics,
            risk_metrics: summary.risk_metrics,
            trading_metrics: summary.trading_metrics,
            return_histogram: summary.return_histogram,
            diagnostics,
            data_points,
            start_time,
            end_time,
        })
    }

    /// 입력 검증 + 시뮬레이션 구간 절단. 부수효과 없음.
    fn validate_inputs<'a>(
        &self,
        bars: &'a [Bar],
        params: &StrategyParams,
    ) -> Result<&'a [Bar], BacktestError> {
        self.config.validate()?;
        params.validate().map_err(BacktestError::from)?;
        validate_series(bars).map_err(BacktestError::from)?;

        let start = bars
            .iter()
            .position(|b| self.config.start_time.map(|t| b.time >= t).unwrap_or(true))
            .unwrap_or(bars.len());
        let end = bars
            .iter()
            .rposition(|b| self.config.end_time.map(|t| b.time <= t).unwrap_or(true))
            .map(|i| i + 1)
            .unwrap_or(0);

        if start >= end {
            return Err(BacktestError::invalid_input(
                "시뮬레이션 구간에 캔들이 없습니다",
            ));
        }

        Ok(&bars[start..end])
    }

    /// 최소 신호 간격 검사. 직전 체결 기준입니다.
    fn spacing_violated(&self, index: usize, last_executed: Option<usize>) -> bool {
        if self.config.min_signal_spacing == 0 {
            return false;
        }
        match last_executed {
            Some(last) => index - last < self.config.min_signal_spacing,
            None => false,
        }
    }

    /// 매수 체결 시도.
    ///
    /// 가용 현금 전액을 예산으로 매매단위 정렬 후, 비용 포함 금액이
    /// 현금을 넘지 않는 최대 lot 수까지 축소합니다. 1 lot도 감당할 수
    /// 없으면 `None`입니다.
    fn try_buy(
        &self,
        account: &mut Account,
        cost_model: &CostModel,
        signal: &Signal,
        bar: &Bar,
        trade_id: u64,
    ) -> Result<Option<Trade>, BacktestError> {
        let signal_price = bar.close;
        let execution_price =
            (signal_price * (Decimal::ONE + self.config.slippage_rate)).to_currency();
        let cash = account.cash();

        let initial_lot = calculate_lot(cash, execution_price, self.config.lot_size)?;
        if initial_lot.is_empty() {
            return Ok(None);
        }

        // 비용 포함 감당 가능한 최대 lot 수 탐색
        let mut lots = initial_lot.actual_lots;
        let (quantity, notional, costs) = loop {
            let quantity = lots * self.config.lot_size;
            let notional = (Decimal::from(quantity) * execution_price).to_currency();
            let costs = cost_model.buy_cost(notional);
            if notional + costs.total <= cash {
                break (quantity, notional, costs);
            }
            lots -= 1;
            if lots == 0 {
                return Ok(None);
            }
        };

        let rounding_loss = (cash - Decimal::from(quantity) * execution_price).to_currency();
        let lot = LotCalculation {
            requested_quantity: initial_lot.requested_quantity,
            lot_size: self.config.lot_size,
            actual_lots: lots,
            actual_quantity: quantity,
            rounding_loss,
            rounding_loss_pct: rounding_loss
                .safe_div(cash, Decimal::ZERO)
                .checked_mul(Decimal::ONE_HUNDRED)
                .unwrap_or(Decimal::ZERO)
                .to_percent(),
        };

        let cash_before = cash;
        let total_outlay = notional + costs.total;
        account.open(quantity, execution_price, total_outlay, bar.time);

        debug!(
            trade_id,
            quantity,
            price = %execution_price,
            outlay = %total_outlay,
            "매수 체결"
        );

        Ok(Some(Trade {
            id: trade_id,
            time: bar.time,
            side: Side::Buy,
            signal_price,
            execution_price,
            slippage: ((execution_price - signal_price) * Decimal::from(quantity)).to_currency(),
            quantity,
            notional,
            costs,
            lots: Some(lot),
            cash_before,
            cash_after: account.cash(),
            position_before: 0,
            position_after: quantity,
            pnl: None,
            return_pct: None,
            holding_days: None,
            reason: signal.reason.clone(),
        }))
    }

    /// 전량 매도 체결 (신호 매도와 강제 청산이 공유).
    fn execute_sell(
        &self,
        account: &mut Account,
        cost_model: &CostModel,
        bar: &Bar,
        trade_id: u64,
        reason: String,
    ) -> Trade {
        let signal_price = bar.close;
        let execution_price =
            (signal_price * (Decimal::ONE - self.config.slippage_rate)).to_currency();
        let quantity = account.quantity();
        let notional = (Decimal::from(quantity) * execution_price).to_currency();
        let costs = cost_model.sell_cost(notional);
        let net_proceeds = notional - costs.total;

        let cash_before = account.cash();
        let entry_basis = account.entry_cost_basis();
        let (pnl, holding_days) = account.close(net_proceeds, bar.time);
        let return_pct = pnl
            .safe_div(entry_basis, Decimal::ZERO)
            .checked_mul(Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
            .to_percent();

        debug!(
            trade_id,
            quantity,
            price = %execution_price,
            pnl = %pnl,
            reason = %reason,
            "매도 체결"
        );

        Trade {
            id: trade_id,
            time: bar.time,
            side: Side::Sell,
            signal_price,
            execution_price,
            slippage: ((execution_price - signal_price) * Decimal::from(quantity)).to_currency(),
            quantity,
            notional,
            costs,
            lots: None,
            cash_before,
            cash_after: account.cash(),
            position_before: quantity,
            position_after: 0,
            pnl: Some(pnl),
            return_pct: Some(return_pct),
            holding_days,
            reason,
        }
    }
}

/// 최고점 대비 낙폭 (%).
fn drawdown_pct(peak: Decimal, equity: Decimal) -> Decimal {
    (peak - equity)
        .safe_div(peak, Decimal::ZERO)
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
        .to_percent()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use quant_core::ParamValue;
    use rust_decimal_macros::dec;

    use super::*;

    fn make_bars(closes: &[i64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let c = Decimal::from(*c);
                Bar::new(
                    t0 + Duration::days(i as i64),
                    c,
                    c + dec!(1),
                    c - dec!(1),
                    c,
                    dec!(100000),
                )
            })
            .collect()
    }

    fn cross_params() -> StrategyParams {
        StrategyParams::new()
            .with("short_period", ParamValue::Int(2))
            .with("long_period", ParamValue::Int(4))
    }

    fn cheap_config() -> BacktestConfig {
        // 단순화를 위해 슬리피지/과호비 제거
        BacktestConfig::new(dec!(1000000))
            .with_slippage_rate(Decimal::ZERO)
            .with_commission_rate(dec!(0.0003))
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut engine = BacktestEngine::new(
            cheap_config(),
            DetectorRegistry::from_names(&["ma_crossover"]).unwrap(),
        );
        assert_eq!(engine.state(), RunState::Idle);

        let bars = make_bars(&[100, 98, 96, 94, 92, 90, 100, 110, 120, 115]);
        engine.run(&bars, &cross_params()).unwrap();
        assert_eq!(engine.state(), RunState::Completed);
    }

    #[test]
    fn test_invalid_input_fails_before_side_effects() {
        let mut engine = BacktestEngine::new(
            cheap_config(),
            DetectorRegistry::from_names(&["ma_crossover"]).unwrap(),
        );

        // 시간 역전 캔들
        let mut bars = make_bars(&[100, 101, 102]);
        bars.swap(0, 2);
        let result = engine.run(&bars, &cross_params());
        assert!(result.is_err());
        assert_eq!(engine.state(), RunState::Failed);
    }

    #[test]
    fn test_empty_bars_rejected() {
        let mut engine = BacktestEngine::new(
            cheap_config(),
            DetectorRegistry::from_names(&["ma_crossover"]).unwrap(),
        );
        assert!(engine.run(&[], &cross_params()).is_err());
        assert_eq!(engine.state(), RunState::Failed);
    }

    #[test]
    fn test_equity_curve_one_point_per_bar() {
        let mut engine = BacktestEngine::new(
            cheap_config(),
            DetectorRegistry::from_names(&["ma_crossover"]).unwrap(),
        );
        let bars = make_bars(&[100, 98, 96, 94, 92, 90, 100, 110, 120, 115]);
        let report = engine.run(&bars, &cross_params()).unwrap();

        assert_eq!(report.equity_curve.len(), bars.len());
        for (point, bar) in report.equity_curve.iter().zip(bars.iter()) {
            assert_eq!(point.time, bar.time);
        }
    }

    #[test]
    fn test_window_filter() {
        let bars = make_bars(&[100, 98, 96, 94, 92, 90, 100, 110, 120, 115]);
        let start = bars[3].time;
        let config = cheap_config().with_window(Some(start), None);
        let mut engine = BacktestEngine::new(
            config,
            DetectorRegistry::from_names(&["ma_crossover"]).unwrap(),
        );
        let report = engine.run(&bars, &cross_params()).unwrap();
        assert_eq!(report.data_points, 7);
        assert_eq!(report.start_time, start);
    }
}
