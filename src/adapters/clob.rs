//! Authenticated CLOB order venue.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{AugurError, Result};
use crate::exchange::{ExecutionVenue, VenueAck, VenueOrderState};
use crate::signing::{HmacAuth, SignedOrder};

/// Good-till-cancelled; expiration on the signed order still bounds it
const ORDER_TYPE: &str = "GTC";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(rename = "orderID", default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateOrderResponse {
    fn rejection(&self) -> Option<String> {
        match (&self.error_msg, self.success) {
            (Some(msg), _) if !msg.is_empty() => Some(msg.clone()),
            (_, Some(false)) => Some("venue reported success=false".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenOrderResponse {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceResponse {
    pub balance: String,
}

/// Map a CLOB order status onto the venue state machine
pub fn order_state(order: Option<OpenOrderResponse>) -> VenueOrderState {
    let Some(order) = order else {
        return VenueOrderState::Unknown;
    };

    match order.status.to_ascii_uppercase().as_str() {
        "LIVE" | "MATCHED" | "DELAYED" => VenueOrderState::Confirmed { order_id: order.id },
        "UNMATCHED" | "PENDING" => VenueOrderState::Pending,
        "CANCELED" | "CANCELLED" => VenueOrderState::Rejected {
            reason: format!("order {} cancelled", order.id),
        },
        other => {
            debug!(status = other, "unrecognised order status");
            VenueOrderState::Pending
        }
    }
}

/// Live order venue. Nonce to order-hash bookkeeping lets `status` look up
/// orders submitted by this process.
pub struct ClobVenue {
    base_url: String,
    http: Client,
    auth: HmacAuth,
    submitted: Mutex<HashMap<u64, String>>,
}

impl ClobVenue {
    pub fn new(base_url: &str, timeout: Duration, auth: HmacAuth) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AugurError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            auth,
            submitted: Mutex::new(HashMap::new()),
        })
    }

    fn remember(&self, nonce: u64, order_hash: &str) {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(nonce, order_hash.to_string());
    }

    fn order_hash(&self, nonce: u64) -> Option<String> {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&nonce)
            .cloned()
    }
}

#[async_trait]
impl ExecutionVenue for ClobVenue {
    fn is_dry_run(&self) -> bool {
        false
    }

    #[instrument(skip(self, order), fields(nonce = order.nonce()))]
    async fn submit(&self, order: &SignedOrder) -> Result<VenueAck> {
        let path = "/order";
        let body = order.to_json(self.auth.api_key(), ORDER_TYPE)?;
        let headers = self.auth.build_headers("POST", path, Some(&body))?;

        self.remember(order.nonce(), &order.order_hash);

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AugurError::RateLimited("POST /order".to_string()));
        }
        if status.is_server_error() {
            return Err(AugurError::OrderTimeout(format!("POST /order returned {}", status)));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AugurError::Auth(format!("POST /order returned {}", status)));
        }

        let text = response.text().await?;
        let parsed: Option<CreateOrderResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let reason = parsed
                .and_then(|p| p.rejection())
                .unwrap_or_else(|| format!("{}: {}", status, text));
            warn!(%reason, "order rejected by venue");
            return Ok(VenueAck::Rejected { reason });
        }

        let parsed = parsed.ok_or_else(|| {
            AugurError::OrderSubmission(format!("unreadable order response: {}", text))
        })?;
        if let Some(reason) = parsed.rejection() {
            warn!(%reason, "order rejected by venue");
            return Ok(VenueAck::Rejected { reason });
        }

        let order_id = parsed.order_id.unwrap_or_else(|| order.order_hash.clone());
        info!(%order_id, status = ?parsed.status, "order accepted");
        Ok(VenueAck::Accepted {
            nonce: order.nonce(),
            order_id,
        })
    }

    async fn status(&self, nonce: u64) -> Result<VenueOrderState> {
        let Some(hash) = self.order_hash(nonce) else {
            return Ok(VenueOrderState::Unknown);
        };

        let path = format!("/data/order/{}", hash);
        let headers = self.auth.build_headers("GET", &path, None)?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .headers(headers)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(VenueOrderState::Unknown),
            StatusCode::TOO_MANY_REQUESTS => Err(AugurError::RateLimited(path)),
            s if !s.is_success() => Err(AugurError::OrderTimeout(format!("GET {} returned {}", path, s))),
            _ => {
                let text = response.text().await?;
                Ok(order_state(
                    serde_json::from_str::<Option<OpenOrderResponse>>(&text).ok().flatten(),
                ))
            }
        }
    }

    async fn usdc_balance(&self) -> Result<Option<Decimal>> {
        let path = "/balance-allowance";
        let headers = self.auth.build_headers("GET", path, None)?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("asset_type", "COLLATERAL"), ("signature_type", "0")])
            .headers(headers)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("balance lookup failed: {}", response.status());
            return Ok(None);
        }

        let balance: BalanceResponse = response.json().await?;
        let micro: Decimal = balance
            .balance
            .parse()
            .map_err(|e| AugurError::Internal(format!("Failed to parse balance: {}", e)))?;
        Ok(Some(micro / Decimal::from(1_000_000u64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(status: &str) -> Option<OpenOrderResponse> {
        Some(OpenOrderResponse {
            id: "0xabc".to_string(),
            status: status.to_string(),
        })
    }

    #[test]
    fn test_order_state_mapping() {
        assert_eq!(order_state(None), VenueOrderState::Unknown);
        assert_eq!(
            order_state(open("live")),
            VenueOrderState::Confirmed {
                order_id: "0xabc".to_string()
            }
        );
        assert_eq!(order_state(open("UNMATCHED")), VenueOrderState::Pending);
        assert!(matches!(order_state(open("CANCELED")), VenueOrderState::Rejected { .. }));
    }

    #[test]
    fn test_create_response_rejection() {
        let ok: CreateOrderResponse =
            serde_json::from_str(r#"{"success": true, "errorMsg": "", "orderID": "0x1"}"#).unwrap();
        assert_eq!(ok.rejection(), None);

        let bad: CreateOrderResponse =
            serde_json::from_str(r#"{"success": false, "errorMsg": "not enough balance"}"#).unwrap();
        assert_eq!(bad.rejection().as_deref(), Some("not enough balance"));
    }
}
