//! Gamma metadata API plus CLOB order books.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::CatalogConfig;
use crate::domain::{BookTop, Event, Market};
use crate::error::{AugurError, Result};
use crate::exchange::{CatalogSnapshot, MarketCatalog};

const DEFAULT_TICK_SIZE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaEvent {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub markets: Vec<GammaMarket>,
}

/// Gamma market. List-valued fields arrive as JSON-encoded strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    pub id: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outcomes: Option<String>,
    #[serde(default)]
    pub outcome_prices: Option<String>,
    #[serde(default)]
    pub clob_token_ids: Option<String>,
    #[serde(default)]
    pub order_price_min_tick_size: Option<Decimal>,
    #[serde(default)]
    pub order_min_size: Option<Decimal>,
    #[serde(default)]
    pub neg_risk: Option<bool>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub events: Vec<GammaEventRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GammaEventRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookResponse {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

/// Parse a stringified JSON list such as `"[\"Yes\", \"No\"]"`
pub fn parse_string_list(raw: Option<&str>) -> Option<Vec<String>> {
    serde_json::from_str(raw?).ok()
}

impl GammaMarket {
    /// Convert to a domain market; `None` when the list fields are malformed
    pub fn into_market(self, event_id: &str) -> Option<Market> {
        let outcomes = parse_string_list(self.outcomes.as_deref())?;
        let token_ids = parse_string_list(self.clob_token_ids.as_deref()).unwrap_or_default();
        let prices = parse_string_list(self.outcome_prices.as_deref())
            .map(|ps| ps.iter().map(|p| p.trim().parse::<Decimal>().ok()).collect())
            .unwrap_or_else(|| vec![None; outcomes.len()]);

        let event_id = self
            .events
            .first()
            .map(|e| e.id.clone())
            .unwrap_or_else(|| event_id.to_string());

        Some(Market {
            id: self.id,
            event_id,
            question: self.question.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            outcomes,
            token_ids,
            prices,
            tick_size: self.order_price_min_tick_size.unwrap_or(DEFAULT_TICK_SIZE),
            min_order_size: self.order_min_size.unwrap_or(Decimal::ONE),
            neg_risk: self.neg_risk.unwrap_or(false),
            active: self.active,
            closed: self.closed,
        })
    }
}

impl GammaEvent {
    pub fn to_event(&self) -> Event {
        Event {
            id: self.id.clone(),
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            end_time: self
                .end_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc)),
            market_ids: self.markets.iter().map(|m| m.id.clone()).collect(),
            active: self.active,
            closed: self.closed,
            archived: self.archived,
            restricted: self.restricted,
        }
    }

    /// Markets that parsed; malformed ones are logged and skipped
    pub fn to_markets(&self) -> Vec<Market> {
        self.markets
            .iter()
            .cloned()
            .filter_map(|m| {
                let id = m.id.clone();
                let market = m.into_market(&self.id);
                if market.is_none() {
                    warn!(market_id = %id, event_id = %self.id, "skipping malformed Gamma market");
                }
                market
            })
            .collect()
    }
}

impl BookResponse {
    /// Best bid is the highest bid and best ask the lowest ask, whatever the
    /// order the venue lists levels in.
    pub fn top(&self) -> BookTop {
        let best_bid = self.bids.iter().max_by(|a, b| a.price.cmp(&b.price));
        let best_ask = self.asks.iter().min_by(|a, b| a.price.cmp(&b.price));

        BookTop {
            best_bid: best_bid.map(|l| l.price),
            best_ask: best_ask.map(|l| l.price),
            bid_size: best_bid.map(|l| l.size),
            ask_size: best_ask.map(|l| l.size),
        }
    }
}

/// Market catalog backed by the public Gamma and CLOB REST APIs
pub struct GammaCatalog {
    config: CatalogConfig,
    http: Client,
}

impl GammaCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AugurError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AugurError::RateLimited(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AugurError::MarketDataUnavailable(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Open events, paginated up to `max_events`
    #[instrument(skip(self))]
    pub async fn fetch_events(&self) -> Result<Vec<GammaEvent>> {
        let url = format!("{}/events", self.config.gamma_url);
        let limit = self.config.page_limit.max(1);
        let mut events: Vec<GammaEvent> = Vec::new();

        while events.len() < self.config.max_events {
            let page: Vec<GammaEvent> = self
                .get_json(
                    &url,
                    &[
                        ("active", "true".to_string()),
                        ("closed", "false".to_string()),
                        ("archived", "false".to_string()),
                        ("limit", limit.to_string()),
                        ("offset", events.len().to_string()),
                    ],
                )
                .await?;

            let done = page.len() < limit;
            events.extend(page);
            if done {
                break;
            }
        }

        events.truncate(self.config.max_events);
        debug!("Fetched {} events from Gamma", events.len());
        Ok(events)
    }

    async fn fetch_market(&self, market_id: &str) -> Result<Option<Market>> {
        let url = format!("{}/markets/{}", self.config.gamma_url, market_id);
        let raw: GammaMarket = match self.get_json(&url, &[]).await {
            Ok(raw) => raw,
            Err(AugurError::MarketDataUnavailable(reason)) => {
                debug!(market_id, %reason, "market lookup failed");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(raw.into_market(""))
    }

    async fn fetch_book(&self, token_id: &str) -> Result<BookResponse> {
        let url = format!("{}/book", self.config.clob_url);
        self.get_json(&url, &[("token_id", token_id.to_string())]).await
    }
}

#[async_trait]
impl MarketCatalog for GammaCatalog {
    async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.fetch_events().await?.iter().map(GammaEvent::to_event).collect())
    }

    async fn list_markets(&self, event_id: &str) -> Result<Vec<Market>> {
        let url = format!("{}/events/{}", self.config.gamma_url, event_id);
        match self.get_json::<GammaEvent>(&url, &[]).await {
            Ok(event) => Ok(event.to_markets()),
            // Vanished events simply have no markets
            Err(AugurError::MarketDataUnavailable(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn get_price(&self, market_id: &str, outcome: &str) -> Result<Option<Decimal>> {
        Ok(self
            .fetch_market(market_id)
            .await?
            .and_then(|m| m.price_of(outcome)))
    }

    async fn get_book(&self, market_id: &str, outcome: &str) -> Result<Option<BookTop>> {
        let Some(market) = self.fetch_market(market_id).await? else {
            return Ok(None);
        };
        let Some(token_id) = market.token_id(outcome) else {
            return Ok(None);
        };

        let book = self.fetch_book(token_id).await?.top();
        if book.best_bid.is_none() && book.best_ask.is_none() {
            return Ok(None);
        }
        Ok(Some(book))
    }

    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let raw = self.fetch_events().await?;
        let mut snapshot = CatalogSnapshot::default();

        for gamma_event in raw {
            let event = gamma_event.to_event();
            if !event.is_tradeable() {
                continue;
            }
            snapshot.markets.extend(gamma_event.to_markets());
            snapshot.events.push(event);
        }

        debug!(
            events = snapshot.events.len(),
            markets = snapshot.markets.len(),
            "catalog snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const EVENT_JSON: &str = r#"{
        "id": "903",
        "title": "London weather",
        "description": "Daily rainfall markets",
        "endDate": "2026-11-01T12:00:00Z",
        "active": true,
        "closed": false,
        "archived": false,
        "restricted": false,
        "markets": [
            {
                "id": "m-rain",
                "question": "Will it rain in London on Friday?",
                "outcomes": "[\"Yes\", \"No\"]",
                "outcomePrices": "[\"0.40\", \"0.60\"]",
                "clobTokenIds": "[\"111\", \"222\"]",
                "orderPriceMinTickSize": 0.01,
                "orderMinSize": 5,
                "negRisk": false,
                "active": true,
                "closed": false
            },
            {
                "id": "m-broken",
                "question": "Malformed",
                "outcomes": "not json",
                "active": true,
                "closed": false
            }
        ]
    }"#;

    #[test]
    fn test_parse_stringified_lists() {
        assert_eq!(
            parse_string_list(Some(r#"["Yes", "No"]"#)),
            Some(vec!["Yes".to_string(), "No".to_string()])
        );
        assert_eq!(parse_string_list(Some("garbage")), None);
        assert_eq!(parse_string_list(None), None);
    }

    #[test]
    fn test_event_conversion() {
        let raw: GammaEvent = serde_json::from_str(EVENT_JSON).unwrap();
        let event = raw.to_event();
        assert!(event.is_tradeable());
        assert_eq!(event.market_ids.len(), 2);
        assert!(event.end_time.is_some());

        let markets = raw.to_markets();
        assert_eq!(markets.len(), 1);
        let market = &markets[0];
        assert_eq!(market.event_id, "903");
        assert_eq!(market.price_of("Yes"), Some(dec!(0.40)));
        assert_eq!(market.token_id("No"), Some("222"));
        assert_eq!(market.tick_size, dec!(0.01));
        assert_eq!(market.min_order_size, dec!(5));
        assert!(market.check_selectable(dec!(0.05)).is_ok());
    }

    #[test]
    fn test_missing_prices_are_unpriced() {
        let raw: GammaMarket = serde_json::from_str(
            r#"{"id": "m", "outcomes": "[\"Yes\", \"No\"]", "active": true, "closed": false}"#,
        )
        .unwrap();
        let market = raw.into_market("e").unwrap();
        assert_eq!(market.prices, vec![None, None]);
        assert_eq!(market.tick_size, dec!(0.01));
        assert!(market.check_selectable(dec!(0.05)).is_err());
    }

    #[test]
    fn test_book_top_picks_best_levels() {
        let book: BookResponse = serde_json::from_str(
            r#"{
                "bids": [{"price": "0.36", "size": "50"}, {"price": "0.38", "size": "20"}],
                "asks": [{"price": "0.45", "size": "10"}, {"price": "0.42", "size": "30"}]
            }"#,
        )
        .unwrap();
        let top = book.top();
        assert_eq!(top.best_bid, Some(dec!(0.38)));
        assert_eq!(top.bid_size, Some(dec!(20)));
        assert_eq!(top.best_ask, Some(dec!(0.42)));
        assert_eq!(top.ask_size, Some(dec!(30)));
    }
}
