use crate::error::{AugurError, Result};
use zeroize::Zeroizing;

/// Environment variable holding the hex-encoded signing key
pub const PRIVATE_KEY_ENV: &str = "POLYMARKET_PRIVATE_KEY";

/// Hex private key held only for the duration of one signature.
///
/// The buffer is wiped when the guard drops.
pub struct KeyMaterial(Zeroizing<String>);

impl KeyMaterial {
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self(Zeroizing::new(hex_key.into()))
    }

    /// Key without the optional `0x` prefix
    pub fn hex(&self) -> &str {
        self.0.trim().trim_start_matches("0x")
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// Where signing keys come from. Loaded lazily, once per signature.
pub trait KeySource: Send + Sync {
    fn load(&self) -> Result<KeyMaterial>;
}

/// Reads the key from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvKeySource {
    var: String,
}

impl EnvKeySource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvKeySource {
    fn default() -> Self {
        Self::new(PRIVATE_KEY_ENV)
    }
}

impl KeySource for EnvKeySource {
    fn load(&self) -> Result<KeyMaterial> {
        let value = std::env::var(&self.var)
            .map_err(|_| AugurError::SigningUnavailable(format!("{} not set", self.var)))?;
        let key = KeyMaterial::new(value);
        if key.hex().is_empty() {
            return Err(AugurError::SigningUnavailable(format!("{} is empty", self.var)));
        }
        Ok(key)
    }
}

/// Fixed in-memory key, for tests and tooling
pub struct StaticKeySource(Zeroizing<String>);

impl StaticKeySource {
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self(Zeroizing::new(hex_key.into()))
    }
}

impl KeySource for StaticKeySource {
    fn load(&self) -> Result<KeyMaterial> {
        Ok(KeyMaterial::new(self.0.as_str()))
    }
}

/// Random throwaway key generated once per process, for paper trading
pub struct EphemeralKeySource(Zeroizing<String>);

impl EphemeralKeySource {
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(bytes.as_mut());
        Self(Zeroizing::new(hex::encode(bytes.as_ref())))
    }
}

impl KeySource for EphemeralKeySource {
    fn load(&self) -> Result<KeyMaterial> {
        Ok(KeyMaterial::new(self.0.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_key_is_signing_unavailable() {
        let source = EnvKeySource::new("AUGUR_TEST_KEY_THAT_IS_NEVER_SET");
        let err = source.load().unwrap_err();
        assert!(matches!(err, AugurError::SigningUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_key_material_strips_prefix_and_redacts() {
        let key = KeyMaterial::new("0xabc123");
        assert_eq!(key.hex(), "abc123");
        assert_eq!(format!("{:?}", key), "KeyMaterial(<redacted>)");
    }
}
