use crate::error::{AugurError, Result};
use crate::signing::keys::KeyMaterial;
use ethers::signers::{LocalWallet, Signer as EthersSigner};
use ethers::types::{Address, Signature, H256};

/// Short-lived wallet built from key material for one signing operation.
///
/// The hex key is never stored; only the derived signing key lives here and
/// it is dropped together with the wallet.
pub struct Wallet {
    inner: LocalWallet,
    chain_id: u64,
}

impl Wallet {
    pub fn from_key(key: &KeyMaterial, chain_id: u64) -> Result<Self> {
        let inner = key
            .hex()
            .parse::<LocalWallet>()
            .map_err(|e| AugurError::SigningUnavailable(format!("invalid private key: {}", e)))?
            .with_chain_id(chain_id);

        Ok(Self { inner, chain_id })
    }

    pub fn address(&self) -> Address {
        self.inner.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a 32-byte digest (RFC 6979 deterministic nonce)
    pub fn sign_hash(&self, hash: H256) -> Result<Signature> {
        self.inner
            .sign_hash(hash)
            .map_err(|e| AugurError::Signature(format!("failed to sign hash: {}", e)))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
