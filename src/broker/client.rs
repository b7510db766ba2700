// =============================================================================
// HttpGateway — bearer-token broker/data client implementing MarketDataGateway
// =============================================================================
//
// Per-call timeout, JSON decode with `anyhow::Context`, redacted `Debug`.
// Equity/options brokers in this domain (Alpaca, Tradier-style) authenticate
// via a bearer token header rather than signed query strings, so a static
// `Authorization` header is attached to every request.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::broker::{
    Account, Clock, MarketDataGateway, OptionChain, OptionContract, OptionsOrderRequest, OrderAck,
    OrderRequest, OrderType, Position, TimeInForce,
};
use crate::types::{Bar, OptionSide};

/// Per-call timeout for ordinary requests (market data, account, orders).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// Total budget for paginated chain fetches.
const CHAIN_FETCH_BUDGET: Duration = Duration::from_secs(45);
const CHAIN_MAX_PAGES: u32 = 20;

/// HTTP gateway to a broker/data provider REST API.
pub struct HttpGateway {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let token = token.into();
        let mut headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self {
            token,
            base_url: base_url.into(),
            client,
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse response body for {path}"))?;
        if !status.is_success() {
            anyhow::bail!("GET {path} returned {status}: {body}");
        }
        Ok(body)
    }

    fn parse_bar(v: &serde_json::Value) -> Option<Bar> {
        Some(Bar {
            timestamp: v.get("t")?.as_i64()?,
            open: v.get("o")?.as_f64()?,
            high: v.get("h")?.as_f64()?,
            low: v.get("l")?.as_f64()?,
            close: v.get("c")?.as_f64()?,
            volume: v.get("v").and_then(|x| x.as_f64()).unwrap_or(0.0),
            vwap: v.get("vw").and_then(|x| x.as_f64()),
        })
    }
}

#[async_trait]
impl MarketDataGateway for HttpGateway {
    #[instrument(skip(self), name = "gateway::get_clock")]
    async fn get_clock(&self) -> Result<Clock> {
        let body = self.get_json("/v2/clock").await?;
        Ok(Clock {
            is_open: body["is_open"].as_bool().unwrap_or(false),
            next_open: body["next_open"]
                .as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&chrono::Utc))
                .unwrap_or_else(chrono::Utc::now),
            next_close: body["next_close"]
                .as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&chrono::Utc))
                .unwrap_or_else(chrono::Utc::now),
        })
    }

    #[instrument(skip(self), name = "gateway::get_account")]
    async fn get_account(&self) -> Result<Account> {
        let body = self.get_json("/v2/account").await?;
        Ok(Account {
            equity: body["equity"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
            buying_power: body["buying_power"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
            cash: body["cash"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
            daytrade_count: body["daytrade_count"].as_u64().unwrap_or(0) as u32,
        })
    }

    #[instrument(skip(self), name = "gateway::get_positions")]
    async fn get_positions(&self) -> Result<Vec<Position>> {
        let body = self.get_json("/v2/positions").await?;
        let arr = body.as_array().context("positions response is not an array")?;
        Ok(arr
            .iter()
            .filter_map(|p| {
                Some(Position {
                    symbol: p["symbol"].as_str()?.to_string(),
                    qty: p["qty"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
                    avg_entry_price: p["avg_entry_price"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
                    market_value: p["market_value"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
                    unrealized_pl: p["unrealized_pl"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
                    unrealized_plpc: p["unrealized_plpc"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
                })
            })
            .collect())
    }

    async fn get_options_positions(&self) -> Result<Vec<Position>> {
        let all = self.get_positions().await?;
        // OSI-shaped symbols only: root + YYMMDD + C/P + 8-digit strike.
        Ok(all
            .into_iter()
            .filter(|p| !crate::chain::parse_osi(&p.symbol).unknown)
            .collect())
    }

    #[instrument(skip(self), name = "gateway::get_history")]
    async fn get_history(&self, ticker: &str, days: u32) -> Result<Vec<Bar>> {
        let body = self
            .get_json(&format!("/v2/bars/daily?symbol={ticker}&limit={days}"))
            .await?;
        let arr = body["bars"].as_array().context("missing bars array")?;
        Ok(arr.iter().filter_map(Self::parse_bar).collect())
    }

    #[instrument(skip(self), name = "gateway::get_intraday_bars")]
    async fn get_intraday_bars(&self, ticker: &str, timeframe: &str, limit: u32) -> Result<Vec<Bar>> {
        let body = self
            .get_json(&format!("/v2/bars?symbol={ticker}&timeframe={timeframe}&limit={limit}"))
            .await?;
        let arr = body["bars"].as_array().context("missing bars array")?;
        Ok(arr.iter().filter_map(Self::parse_bar).collect())
    }

    #[instrument(skip(self), name = "gateway::get_options_snapshots")]
    async fn get_options_snapshots(
        &self,
        ticker: &str,
        expiration: Option<&str>,
        side: Option<OptionSide>,
    ) -> Result<OptionChain> {
        let deadline = tokio::time::Instant::now() + CHAIN_FETCH_BUDGET;
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..CHAIN_MAX_PAGES {
            if tokio::time::Instant::now() >= deadline {
                warn!(ticker, page, "options chain pagination exceeded 45s budget, truncating");
                break;
            }
            let mut path = format!("/v2/options/snapshots?ticker={ticker}");
            if let Some(exp) = expiration {
                path.push_str(&format!("&expiration={exp}"));
            }
            if let Some(t) = page_token.as_deref() {
                path.push_str(&format!("&page_token={t}"));
            }

            let body = match tokio::time::timeout(REQUEST_TIMEOUT, self.get_json(&path)).await {
                Ok(Ok(b)) => b,
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(ticker, page, "options chain page timed out");
                    break;
                }
            };

            let entries = body["contracts"].as_array().cloned().unwrap_or_default();
            for e in &entries {
                if let Some(c) = parse_contract(e) {
                    all.push(c);
                }
            }
            page_token = body["next_page_token"].as_str().map(|s| s.to_string());
            if page_token.is_none() {
                break;
            }
        }

        if let Some(s) = side {
            all.retain(|c| c.side == s);
        }
        debug!(ticker, count = all.len(), "options chain fetched");
        Ok(all)
    }

    #[instrument(skip(self), name = "gateway::get_option_expirations")]
    async fn get_option_expirations(&self, ticker: &str) -> Result<Vec<String>> {
        let body = self
            .get_json(&format!("/v2/options/expirations?ticker={ticker}"))
            .await?;
        let mut dates: Vec<String> = body["expirations"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        dates.sort();
        Ok(dates)
    }

    #[instrument(skip(self), name = "gateway::create_order")]
    async fn create_order(&self, req: OrderRequest) -> Result<OrderAck> {
        let body = serde_json::json!({
            "symbol": req.symbol,
            "side": match req.side { crate::types::Side::Buy => "buy", crate::types::Side::Sell => "sell" },
            "qty": req.qty,
            "notional": req.notional,
            "type": match req.order_type { OrderType::Market => "market", OrderType::Limit => "limit" },
            "time_in_force": match req.time_in_force { TimeInForce::Day => "day", TimeInForce::Gtc => "gtc" },
            "limit_price": req.limit_price,
        });
        self.submit_order("/v2/orders", body).await
    }

    #[instrument(skip(self), name = "gateway::create_options_order")]
    async fn create_options_order(&self, req: OptionsOrderRequest) -> Result<OrderAck> {
        let body = serde_json::json!({
            "symbol": req.osi_symbol,
            "side": match req.side { crate::types::Side::Buy => "buy", crate::types::Side::Sell => "sell" },
            "qty": req.qty,
            "type": match req.order_type { OrderType::Market => "market", OrderType::Limit => "limit" },
            "limit_price": req.limit_price,
            "time_in_force": match req.time_in_force { TimeInForce::Day => "day", TimeInForce::Gtc => "gtc" },
        });
        self.submit_order("/v2/options/orders", body).await
    }

    async fn close_position(&self, symbol: &str, qty: Option<f64>) -> Result<OrderAck> {
        let url = format!("{}/v2/positions/{symbol}", self.base_url);
        let mut req = self.client.delete(&url);
        if let Some(q) = qty {
            req = req.query(&[("qty", q.to_string())]);
        }
        let resp = req.send().await.context("close_position request failed")?;
        ack_from_response(resp).await
    }

    async fn close_options_position(&self, osi: &str, qty: Option<u32>) -> Result<OrderAck> {
        let url = format!("{}/v2/options/positions/{osi}", self.base_url);
        let mut req = self.client.delete(&url);
        if let Some(q) = qty {
            req = req.query(&[("qty", q)]);
        }
        let resp = req.send().await.context("close_options_position request failed")?;
        ack_from_response(resp).await
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        let url = format!("{}/v2/orders", self.base_url);
        self.client
            .delete(&url)
            .send()
            .await
            .context("cancel_all_orders request failed")?;
        Ok(())
    }

    async fn close_all_positions(&self) -> Result<()> {
        let url = format!("{}/v2/positions", self.base_url);
        self.client
            .delete(&url)
            .send()
            .await
            .context("close_all_positions request failed")?;
        Ok(())
    }
}

impl HttpGateway {
    async fn submit_order(&self, path: &str, body: serde_json::Value) -> Result<OrderAck> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        ack_from_response(resp).await
    }
}

async fn ack_from_response(resp: reqwest::Response) -> Result<OrderAck> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.context("failed to parse order response")?;
    if !status.is_success() {
        anyhow::bail!("order request returned {status}: {body}");
    }
    Ok(OrderAck {
        order_id: body["id"].as_str().unwrap_or_default().to_string(),
        status: body["status"].as_str().unwrap_or("accepted").to_string(),
    })
}

fn parse_contract(v: &serde_json::Value) -> Option<OptionContract> {
    let osi = v["symbol"].as_str()?.to_string();
    let parsed = crate::chain::parse_osi(&osi);
    if parsed.unknown {
        return None;
    }
    Some(OptionContract {
        underlying: parsed.underlying,
        strike: parsed.strike,
        expiration: parsed.expiration,
        side: parsed.side?,
        open_interest: v["open_interest"].as_u64().unwrap_or(0),
        implied_volatility: v["implied_volatility"].as_f64().unwrap_or(0.0),
        greeks: crate::broker::Greeks {
            delta: v["greeks"]["delta"].as_f64().unwrap_or(0.0),
            gamma: v["greeks"]["gamma"].as_f64().unwrap_or(0.0),
            theta: v["greeks"]["theta"].as_f64().unwrap_or(0.0),
            vega: v["greeks"]["vega"].as_f64().unwrap_or(0.0),
            rho: v["greeks"]["rho"].as_f64().unwrap_or(0.0),
        },
        quote: crate::broker::Quote {
            bid: v["bid"].as_f64().unwrap_or(0.0),
            ask: v["ask"].as_f64().unwrap_or(0.0),
            last: v["last"].as_f64().unwrap_or(0.0),
            bid_size: v["bid_size"].as_u64().unwrap_or(0) as u32,
            ask_size: v["ask_size"].as_u64().unwrap_or(0) as u32,
        },
        volume: v["volume"].as_u64().unwrap_or(0),
        osi,
        greeks_estimated: false,
    })
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let gw = HttpGateway::new("https://broker.example", "super-secret-token");
        let debug_str = format!("{gw:?}");
        assert!(!debug_str.contains("super-secret-token"));
        assert!(debug_str.contains("<redacted>"));
        // `token` field exists on the struct even though unused outside Debug.
        let _ = &gw.token;
    }

    #[test]
    fn parse_contract_rejects_unknown_osi() {
        let v = serde_json::json!({ "symbol": "not-an-osi" });
        assert!(parse_contract(&v).is_none());
    }

    #[test]
    fn parse_contract_parses_well_formed() {
        let v = serde_json::json!({
            "symbol": "SPY260212C00500000",
            "open_interest": 1200,
            "implied_volatility": 0.21,
            "greeks": {"delta": 0.45, "gamma": 0.02, "theta": -0.1, "vega": 0.05, "rho": 0.01},
            "bid": 2.4, "ask": 2.5, "last": 2.45, "bid_size": 10, "ask_size": 10,
            "volume": 150
        });
        let c = parse_contract(&v).unwrap();
        assert_eq!(c.underlying, "SPY");
        assert_eq!(c.strike, 500.0);
        assert!(c.is_well_formed());
    }
}
