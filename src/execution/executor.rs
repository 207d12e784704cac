use chrono::NaiveDateTime;
use std::sync::Arc;
use thiserror::Error;

use super::allocator::{AllocationPlan, Candidate};
use crate::api::{Exchange, ExchangeError};
use crate::indicators::format_price;
use crate::models::{
    Blacklist, OrderAmount, OrderStatus, Side, TimeInForce, TradeRecord, FAILED_ORDER_ID,
};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("market buy failed: {0}")]
    BuyFailed(#[source] ExchangeError),
    #[error("market buy reported no fills")]
    NoFills,
}

/// Per-instrument progress through one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStage {
    Pending,
    Bought,
    SellPlaced,
    /// Bought without a protective sell; recorded with [`FAILED_ORDER_ID`]
    SellFailed,
}

#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub records: Vec<TradeRecord>,
    /// Instruments whose buy never went through
    pub failures: Vec<(String, ExecutionError)>,
}

impl ExecutionReport {
    pub fn unprotected(&self) -> usize {
        self.records.iter().filter(|r| r.is_unprotected()).count()
    }
}

/// Turns an allocation plan into market buys with take-profit limit sells
pub struct Executor {
    exchange: Arc<dyn Exchange>,
    take_profit_multiplier: f64,
}

impl Executor {
    pub fn new(exchange: Arc<dyn Exchange>, take_profit_multiplier: f64) -> Self {
        Self {
            exchange,
            take_profit_multiplier,
        }
    }

    /// Target sell price for an average entry, rounded to the tick precision
    pub fn take_profit_price(&self, average_price: f64, tick_precision: u32) -> String {
        format_price(average_price * self.take_profit_multiplier, tick_precision)
    }

    /// Attempt one entry per plan slot, in order
    ///
    /// A failed buy still uses up its slot.
    pub async fn execute_plan(
        &self,
        plan: &AllocationPlan,
        blacklist: &Blacklist,
        max_open_per_symbol: u32,
        now: NaiveDateTime,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        for candidate in plan.slots(blacklist, max_open_per_symbol) {
            match self.execute(candidate, plan.notional, now).await {
                Ok(record) => report.records.push(record),
                Err(e) => {
                    tracing::error!(symbol = %candidate.symbol, "Entry aborted: {}", e);
                    report.failures.push((candidate.symbol.clone(), e));
                }
            }
        }

        tracing::info!(
            "Execution finished: {} recorded ({} unprotected), {} failed",
            report.records.len(),
            report.unprotected(),
            report.failures.len()
        );
        report
    }

    /// Pending -> Bought -> SellPlaced | SellFailed
    pub async fn execute(
        &self,
        candidate: &Candidate,
        notional: f64,
        now: NaiveDateTime,
    ) -> Result<TradeRecord, ExecutionError> {
        let symbol = candidate.symbol.as_str();
        let mut stage = TradeStage::Pending;
        tracing::debug!(symbol, ?stage, "Buying {:.2} quote", notional);

        let buy = self
            .exchange
            .place_market_order(symbol, Side::Buy, OrderAmount::Quote(format!("{:.6}", notional)))
            .await
            .map_err(ExecutionError::BuyFailed)?;
        let average_price = buy.average_fill_price().ok_or(ExecutionError::NoFills)?;
        stage = TradeStage::Bought;

        let target_price = self.take_profit_price(average_price, candidate.tick_precision);
        tracing::info!(
            symbol,
            ?stage,
            average_price,
            buy_order = %buy.client_order_id,
            quantity = %buy.executed_quantity,
            "Placing take-profit sell at {}",
            target_price
        );

        let order_id = match self
            .exchange
            .place_limit_order(
                symbol,
                Side::Sell,
                &buy.executed_quantity,
                &target_price,
                TimeInForce::GoodTillCancelled,
            )
            .await
        {
            Ok(order_id) => {
                stage = TradeStage::SellPlaced;
                order_id
            }
            Err(e) => {
                stage = TradeStage::SellFailed;
                tracing::error!(symbol, "Take-profit sell failed, position unprotected: {}", e);
                FAILED_ORDER_ID.to_string()
            }
        };
        tracing::debug!(symbol, ?stage, order_id = %order_id, "Entry recorded");

        Ok(TradeRecord {
            order_id,
            timestamp: now,
            symbol: symbol.to_string(),
            quantity: buy.executed_quantity,
            entry_price: average_price,
            exit_price: target_price,
            status: OrderStatus::New,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoExchange;

    #[async_trait::async_trait]
    impl Exchange for NoExchange {
        async fn get_candles(
            &self,
            _: &str,
            _: &str,
            _: usize,
        ) -> crate::api::ExchangeResult<Vec<crate::models::Candle>> {
            Err(ExchangeError::NotFound("candles".to_string()))
        }

        async fn place_market_order(
            &self,
            _: &str,
            _: Side,
            _: OrderAmount,
        ) -> crate::api::ExchangeResult<crate::models::MarketOrder> {
            Err(ExchangeError::Api {
                code: -2010,
                msg: "Account has insufficient balance".to_string(),
            })
        }

        async fn place_limit_order(
            &self,
            _: &str,
            _: Side,
            _: &str,
            _: &str,
            _: TimeInForce,
        ) -> crate::api::ExchangeResult<String> {
            Err(ExchangeError::NotFound("order".to_string()))
        }

        async fn cancel_order(&self, _: &str, _: &str) -> crate::api::ExchangeResult<()> {
            Ok(())
        }

        async fn get_order_status(
            &self,
            _: &str,
            _: &str,
        ) -> crate::api::ExchangeResult<OrderStatus> {
            Ok(OrderStatus::New)
        }

        async fn list_instruments(
            &self,
        ) -> crate::api::ExchangeResult<Vec<crate::models::Instrument>> {
            Ok(Vec::new())
        }

        async fn get_free_balance(&self, _: &str) -> crate::api::ExchangeResult<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_take_profit_price_rounding() {
        let executor = Executor::new(Arc::new(NoExchange), 1.02);
        assert_eq!(executor.take_profit_price(100.0, 2), "102.00");
        assert_eq!(executor.take_profit_price(0.5, 4), "0.5100");
    }

    #[tokio::test]
    async fn test_buy_failure_aborts_instrument() {
        let executor = Executor::new(Arc::new(NoExchange), 1.02);
        let candidate = Candidate {
            symbol: "BTCUSDT".to_string(),
            tick_precision: 2,
        };
        let result = executor
            .execute(&candidate, 10.0, chrono::Utc::now().naive_utc())
            .await;
        assert!(matches!(result, Err(ExecutionError::BuyFailed(_))));
    }

    #[tokio::test]
    async fn test_failed_buys_use_up_slots() {
        let executor = Executor::new(Arc::new(NoExchange), 1.02);
        let plan = AllocationPlan {
            candidates: (0..6)
                .map(|i| Candidate {
                    symbol: format!("C{}USDT", i),
                    tick_precision: 2,
                })
                .collect(),
            divider: 4,
            notional: 10.0,
        };
        let report = executor
            .execute_plan(&plan, &Blacklist::default(), 2, chrono::Utc::now().naive_utc())
            .await;

        assert!(report.records.is_empty());
        assert_eq!(report.failures.len(), 4);
    }
}
