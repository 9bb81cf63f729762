pub mod hmac;
pub mod keys;
pub mod nonce;
pub mod order;
pub mod wallet;

pub use hmac::{ApiCredentials, HmacAuth};
pub use keys::{EnvKeySource, EphemeralKeySource, KeyMaterial, KeySource, StaticKeySource};
pub use nonce::NonceAllocator;
pub use order::{OrderData, OrderDomain, OrderSigner, SignedOrder};
pub use wallet::Wallet;
