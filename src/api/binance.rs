use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::{BinanceAuth, Exchange, ExchangeError, ExchangeResult};
use crate::config::BinanceConfig;
use crate::models::{
    Candle, Fill, Instrument, MarketOrder, OrderAmount, OrderStatus, Side, TimeInForce,
};

/// Binance spot REST client
///
/// Cloneable; all clones share the same rate limiter. SIGNED endpoints fail
/// with [`ExchangeError::Unauthenticated`] when no key pair is configured.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    auth: Option<BinanceAuth>,
    recv_window_ms: u64,
    timeout_secs: u64,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

/// One kline row: open time, OHLC, volume, close time, quote volume, trades,
/// taker base volume, taker quote volume, unused
type KlineRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    String,
);

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolFilter {
    filter_type: String,
    tick_size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    client_order_id: String,
    #[serde(default)]
    executed_qty: String,
    #[serde(default)]
    fills: Vec<FillEntry>,
}

#[derive(Debug, Deserialize)]
struct FillEntry {
    price: String,
    qty: String,
}

#[derive(Debug, Deserialize)]
struct OrderQuery {
    status: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    asset: String,
    free: String,
}

fn parse_number(raw: &str, field: &str) -> ExchangeResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| ExchangeError::Decode(format!("{} is not numeric: {:?}", field, raw)))
}

fn decode_kline(row: KlineRow) -> ExchangeResult<Candle> {
    let (_, open, _, _, close, _, close_time, quote_volume, ..) = row;
    Ok(Candle {
        open: parse_number(&open, "open")?,
        close: parse_number(&close, "close")?,
        quote_volume: parse_number(&quote_volume, "quote volume")?,
        close_time: DateTime::<Utc>::from_timestamp_millis(close_time)
            .ok_or_else(|| ExchangeError::Decode(format!("bad close time {}", close_time)))?,
    })
}

fn decode_instrument(info: SymbolInfo) -> Instrument {
    let tick_size = info
        .filters
        .into_iter()
        .find(|f| f.filter_type == "PRICE_FILTER")
        .and_then(|f| f.tick_size)
        .unwrap_or_default();
    Instrument {
        symbol: info.symbol,
        quote_asset: info.quote_asset,
        status: info.status,
        tick_size,
    }
}

fn decode_market_order(response: OrderResponse) -> ExchangeResult<MarketOrder> {
    let fills = response
        .fills
        .iter()
        .map(|fill| {
            Ok(Fill {
                price: parse_number(&fill.price, "fill price")?,
                quantity: parse_number(&fill.qty, "fill quantity")?,
            })
        })
        .collect::<ExchangeResult<Vec<_>>>()?;
    Ok(MarketOrder {
        client_order_id: response.client_order_id,
        executed_quantity: response.executed_qty,
        fills,
    })
}

fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

impl BinanceClient {
    pub fn new(config: &BinanceConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        let auth = match (config.api_key.clone(), config.api_secret.clone()) {
            (Some(key), Some(secret)) => Some(BinanceAuth::new(key, secret)),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            auth,
            recv_window_ms: config.recv_window_ms,
            timeout_secs: config.request_timeout_secs,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> ExchangeResult<T> {
        let mut query = encode_query(params);
        let mut headers = Vec::new();
        if signed {
            let auth = self
                .auth
                .as_ref()
                .ok_or(ExchangeError::Unauthenticated("binance api key/secret"))?;
            query = auth.signed_query(&query, self.recv_window_ms, Utc::now().timestamp_millis());
            headers.push(("X-MBX-APIKEY", auth.api_key().to_string()));
        }

        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };

        self.rate_limiter.until_ready().await;

        let mut request = self.client.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => ExchangeError::Api {
                    code: err.code,
                    msg: err.msg,
                },
                Err(_) => ExchangeError::Api {
                    code: i64::from(status.as_u16()),
                    msg: body,
                },
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Decode(format!("{} from {}: {}", e, path, body)))
    }

    fn map_send_error(&self, err: reqwest::Error) -> ExchangeError {
        if err.is_timeout() {
            ExchangeError::Timeout(self.timeout_secs)
        } else {
            ExchangeError::Http(err)
        }
    }
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        let rows: Vec<KlineRow> = self
            .request(
                Method::GET,
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
                false,
            )
            .await?;
        rows.into_iter().map(decode_kline).collect()
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: OrderAmount,
    ) -> ExchangeResult<MarketOrder> {
        let sizing = match amount {
            OrderAmount::Quote(notional) => ("quoteOrderQty", notional),
            OrderAmount::Base(quantity) => ("quantity", quantity),
        };
        let response: OrderResponse = self
            .request(
                Method::POST,
                "/api/v3/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.as_str().to_string()),
                    ("type", "MARKET".to_string()),
                    sizing,
                    ("newClientOrderId", uuid::Uuid::new_v4().simple().to_string()),
                    ("newOrderRespType", "FULL".to_string()),
                ],
                true,
            )
            .await?;
        decode_market_order(response)
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: &str,
        price: &str,
        time_in_force: TimeInForce,
    ) -> ExchangeResult<String> {
        let response: OrderResponse = self
            .request(
                Method::POST,
                "/api/v3/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.as_str().to_string()),
                    ("type", "LIMIT".to_string()),
                    ("timeInForce", time_in_force.as_str().to_string()),
                    ("quantity", quantity.to_string()),
                    ("price", price.to_string()),
                    ("newClientOrderId", uuid::Uuid::new_v4().simple().to_string()),
                    ("newOrderRespType", "ACK".to_string()),
                ],
                true,
            )
            .await?;
        Ok(response.client_order_id)
    }

    async fn cancel_order(&self, symbol: &str, client_order_id: &str) -> ExchangeResult<()> {
        let _: serde_json::Value = self
            .request(
                Method::DELETE,
                "/api/v3/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("origClientOrderId", client_order_id.to_string()),
                ],
                true,
            )
            .await?;
        Ok(())
    }

    async fn get_order_status(
        &self,
        symbol: &str,
        client_order_id: &str,
    ) -> ExchangeResult<OrderStatus> {
        let order: OrderQuery = self
            .request(
                Method::GET,
                "/api/v3/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("origClientOrderId", client_order_id.to_string()),
                ],
                true,
            )
            .await?;
        Ok(OrderStatus::parse(&order.status))
    }

    async fn list_instruments(&self) -> ExchangeResult<Vec<Instrument>> {
        let info: ExchangeInfo = self
            .request(Method::GET, "/api/v3/exchangeInfo", &[], false)
            .await?;
        Ok(info.symbols.into_iter().map(decode_instrument).collect())
    }

    async fn get_free_balance(&self, asset: &str) -> ExchangeResult<f64> {
        let account: AccountInfo = self
            .request(
                Method::GET,
                "/api/v3/account",
                &[("omitZeroBalances", "true".to_string())],
                true,
            )
            .await?;
        let balance = account
            .balances
            .into_iter()
            .find(|b| b.asset == asset)
            .ok_or_else(|| ExchangeError::NotFound(format!("asset {}", asset)))?;
        parse_number(&balance.free, "free balance")
    }
}
