use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BookTop, Event, Market};
use crate::error::Result;
use crate::signing::SignedOrder;

/// Tradeable events with their markets, taken at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub events: Vec<Event>,
    pub markets: Vec<Market>,
}

impl CatalogSnapshot {
    pub fn event(&self, event_id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn market(&self, market_id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.id == market_id)
    }
}

/// Read-only source of events, markets and live quotes.
///
/// Implementations must tolerate partial data: an outcome without a price
/// is reported as `None` and treated as an inactive market.
#[async_trait]
pub trait MarketCatalog: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>>;

    async fn list_markets(&self, event_id: &str) -> Result<Vec<Market>>;

    async fn get_price(&self, market_id: &str, outcome: &str) -> Result<Option<Decimal>>;

    /// Tradeable events and their markets. Catalogs that embed markets in
    /// the event listing should override this to avoid one call per event.
    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let events: Vec<Event> = self
            .list_events()
            .await?
            .into_iter()
            .filter(Event::is_tradeable)
            .collect();

        let mut markets = Vec::new();
        for event in &events {
            markets.extend(self.list_markets(&event.id).await?);
        }

        Ok(CatalogSnapshot { events, markets })
    }

    /// Top of book for an outcome. Venues without depth fall back to the
    /// last price with unknown sizes.
    async fn get_book(&self, market_id: &str, outcome: &str) -> Result<Option<BookTop>> {
        Ok(self
            .get_price(market_id, outcome)
            .await?
            .map(BookTop::from_price))
    }
}

/// Immediate venue response to a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenueAck {
    Accepted { nonce: u64, order_id: String },
    Rejected { reason: String },
}

/// Venue view of an order, looked up by nonce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenueOrderState {
    Unknown,
    Pending,
    Confirmed { order_id: String },
    Rejected { reason: String },
}

/// Order venue. `Err` from either call means a transport-level fault; an
/// explicit refusal is reported as `VenueAck::Rejected`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    fn is_dry_run(&self) -> bool;

    async fn submit(&self, order: &SignedOrder) -> Result<VenueAck>;

    async fn status(&self, nonce: u64) -> Result<VenueOrderState>;

    /// Spendable collateral, when the venue can report it
    async fn usdc_balance(&self) -> Result<Option<Decimal>> {
        Ok(None)
    }
}
