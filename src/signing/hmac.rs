use crate::error::{AugurError, Result};
use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// CLOB API credentials for L2 authentication
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    secret: Zeroizing<String>,
    passphrase: Zeroizing<String>,
}

impl ApiCredentials {
    pub fn new(api_key: String, secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret: Zeroizing::new(secret),
            passphrase: Zeroizing::new(passphrase),
        }
    }

    /// Load from `POLYMARKET_API_KEY`, `POLYMARKET_SECRET`, `POLYMARKET_PASSPHRASE`
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| AugurError::Auth(format!("{} not set", name)))
        };

        Ok(Self::new(
            var("POLYMARKET_API_KEY")?,
            var("POLYMARKET_SECRET")?,
            var("POLYMARKET_PASSPHRASE")?,
        ))
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Builds the POLY_* headers for authenticated CLOB requests
#[derive(Debug, Clone)]
pub struct HmacAuth {
    credentials: ApiCredentials,
    address: String,
}

impl HmacAuth {
    pub fn new(credentials: ApiCredentials, address: String) -> Self {
        Self {
            credentials,
            address,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// HMAC-SHA256 over the message with the url-safe base64 secret
    fn sign(&self, message: &str) -> Result<String> {
        let secret_bytes = Zeroizing::new(
            BASE64_URL
                .decode(self.credentials.secret.as_bytes())
                .map_err(|e| AugurError::Auth(format!("invalid secret encoding: {}", e)))?,
        );

        let mut mac = HmacSha256::new_from_slice(&secret_bytes)
            .map_err(|e| AugurError::Auth(format!("HMAC init failed: {}", e)))?;
        mac.update(message.as_bytes());

        Ok(BASE64_URL.encode(mac.finalize().into_bytes()))
    }

    fn build_message(method: &str, path: &str, timestamp: i64, body: Option<&str>) -> String {
        match body {
            Some(b) if !b.is_empty() => {
                format!("{}{}{}{}", timestamp, method.to_uppercase(), path, b)
            }
            _ => format!("{}{}{}", timestamp, method.to_uppercase(), path),
        }
    }

    /// Build authentication headers for a request
    pub fn build_headers(&self, method: &str, path: &str, body: Option<&str>) -> Result<HeaderMap> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.sign(&Self::build_message(method, path, timestamp, body))?;

        let header = |name: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| AugurError::Auth(format!("invalid {} header: {}", name, e)))
        };

        let mut headers = HeaderMap::new();
        headers.insert("POLY_ADDRESS", header("address", &self.address)?);
        headers.insert("POLY_SIGNATURE", header("signature", &signature)?);
        headers.insert("POLY_TIMESTAMP", header("timestamp", &timestamp.to_string())?);
        headers.insert("POLY_API_KEY", header("api key", &self.credentials.api_key)?);
        headers.insert("POLY_PASSPHRASE", header("passphrase", &self.credentials.passphrase)?);

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> HmacAuth {
        let creds = ApiCredentials::new(
            "test-key".to_string(),
            BASE64_URL.encode(b"test-secret"),
            "test-pass".to_string(),
        );
        HmacAuth::new(creds, "0x1234".to_string())
    }

    #[test]
    fn test_build_message() {
        let msg = HmacAuth::build_message("post", "/order", 1704067200, Some(r#"{"a":1}"#));
        assert_eq!(msg, r#"1704067200POST/order{"a":1}"#);

        let msg = HmacAuth::build_message("GET", "/data/order/0xab", 1704067200, None);
        assert_eq!(msg, "1704067200GET/data/order/0xab");
    }

    #[test]
    fn test_headers_present_and_secret_redacted() {
        let auth = auth();
        let headers = auth.build_headers("GET", "/balance-allowance", None).unwrap();

        for name in ["POLY_ADDRESS", "POLY_SIGNATURE", "POLY_TIMESTAMP", "POLY_API_KEY", "POLY_PASSPHRASE"] {
            assert!(headers.contains_key(name), "missing {}", name);
        }
        assert!(!format!("{:?}", auth).contains("test-pass"));
    }

    #[test]
    fn test_bad_secret_is_auth_error() {
        let creds = ApiCredentials::new("k".into(), "%%%".into(), "p".into());
        let err = HmacAuth::new(creds, "0x1".into()).sign("msg").unwrap_err();
        assert!(err.is_fatal());
    }
}
