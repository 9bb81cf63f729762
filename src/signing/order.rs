use crate::domain::{Order, OrderSide};
use crate::error::{AugurError, Result};
use crate::signing::keys::KeySource;
use crate::signing::Wallet;
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Exchange contract addresses for Polygon Mainnet
pub mod contracts {
    /// CTF Exchange contract on Polygon Mainnet
    pub const CTF_EXCHANGE: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";
    /// Neg Risk CTF Exchange contract on Polygon Mainnet
    pub const NEG_RISK_CTF_EXCHANGE: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";
}

pub const ORDER_DOMAIN_NAME: &str = "Polymarket CTF Exchange";
pub const ORDER_DOMAIN_VERSION: &str = "1";

/// USDC and outcome tokens both carry 6 decimals on the exchange
const UNIT_SCALE: u64 = 1_000_000;

/// EOA signature type (direct private key)
const SIGNATURE_TYPE_EOA: u8 = 0;

fn to_units(value: Decimal) -> Result<U256> {
    if value.is_sign_negative() {
        return Err(AugurError::InvalidOrder(format!("negative amount: {}", value)));
    }

    (value * Decimal::from(UNIT_SCALE))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u128()
        .map(U256::from)
        .ok_or_else(|| AugurError::InvalidOrder(format!("amount out of range: {}", value)))
}

/// EIP-712 `Order` struct as the exchange contract hashes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub salt: U256,
    pub maker: Address,
    pub signer: Address,
    /// Zero address: open to any counterparty
    pub taker: Address,
    pub token_id: U256,
    /// USDC in for buys, tokens in for sells
    pub maker_amount: U256,
    /// Tokens out for buys, USDC out for sells
    pub taker_amount: U256,
    pub expiration: U256,
    pub nonce: U256,
    pub fee_rate_bps: U256,
    /// 0 = buy, 1 = sell
    pub side: u8,
    pub signature_type: u8,
}

impl OrderData {
    /// Payload for a quantized order signed by `maker`
    pub fn from_order(order: &Order, maker: Address) -> Result<Self> {
        let token_id = U256::from_dec_str(&order.token_id)
            .map_err(|e| AugurError::InvalidOrder(format!("invalid token id: {}", e)))?;
        if order.expiration < 0 {
            return Err(AugurError::InvalidOrder("negative expiration".to_string()));
        }

        let shares = to_units(order.size())?;
        let collateral = to_units(order.notional())?;
        let (maker_amount, taker_amount, side) = match order.side {
            OrderSide::Buy => (collateral, shares, 0u8),
            OrderSide::Sell => (shares, collateral, 1u8),
        };

        Ok(Self {
            salt: U256::from(order.salt),
            maker,
            signer: maker,
            taker: Address::zero(),
            token_id,
            maker_amount,
            taker_amount,
            expiration: U256::from(order.expiration as u64),
            nonce: U256::from(order.nonce),
            fee_rate_bps: U256::zero(),
            side,
            signature_type: SIGNATURE_TYPE_EOA,
        })
    }

    /// Compute the EIP-712 struct hash
    pub fn struct_hash(&self) -> [u8; 32] {
        let type_hash = keccak256(
            b"Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)",
        );

        let tokens = vec![
            ethers::abi::Token::FixedBytes(type_hash.to_vec()),
            ethers::abi::Token::Uint(self.salt),
            ethers::abi::Token::Address(self.maker),
            ethers::abi::Token::Address(self.signer),
            ethers::abi::Token::Address(self.taker),
            ethers::abi::Token::Uint(self.token_id),
            ethers::abi::Token::Uint(self.maker_amount),
            ethers::abi::Token::Uint(self.taker_amount),
            ethers::abi::Token::Uint(self.expiration),
            ethers::abi::Token::Uint(self.nonce),
            ethers::abi::Token::Uint(self.fee_rate_bps),
            ethers::abi::Token::Uint(U256::from(self.side)),
            ethers::abi::Token::Uint(U256::from(self.signature_type)),
        ];

        keccak256(ethers::abi::encode(&tokens))
    }
}

/// EIP-712 domain for order signing
#[derive(Debug, Clone)]
pub struct OrderDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl OrderDomain {
    pub fn new(chain_id: u64, neg_risk: bool) -> Result<Self> {
        let contract = if neg_risk {
            contracts::NEG_RISK_CTF_EXCHANGE
        } else {
            contracts::CTF_EXCHANGE
        };
        let verifying_contract = contract
            .parse()
            .map_err(|e| AugurError::Internal(format!("bad exchange address: {}", e)))?;

        Ok(Self {
            name: ORDER_DOMAIN_NAME.to_string(),
            version: ORDER_DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        })
    }

    /// Compute the EIP-712 domain separator hash
    pub fn separator_hash(&self) -> [u8; 32] {
        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );

        let tokens = vec![
            ethers::abi::Token::FixedBytes(type_hash.to_vec()),
            ethers::abi::Token::FixedBytes(keccak256(self.name.as_bytes()).to_vec()),
            ethers::abi::Token::FixedBytes(keccak256(self.version.as_bytes()).to_vec()),
            ethers::abi::Token::Uint(U256::from(self.chain_id)),
            ethers::abi::Token::Address(self.verifying_contract),
        ];

        keccak256(ethers::abi::encode(&tokens))
    }

    /// `keccak256("\x19\x01" || domainSeparator || structHash)`
    pub fn digest(&self, data: &OrderData) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(66);
        encoded.extend_from_slice(b"\x19\x01");
        encoded.extend_from_slice(&self.separator_hash());
        encoded.extend_from_slice(&data.struct_hash());
        keccak256(&encoded)
    }
}

/// Order plus its EIP-712 payload and signature, ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedOrder {
    pub order: Order,
    pub data: OrderData,
    /// 0x-prefixed 65-byte signature
    pub signature: String,
    pub signer: Address,
    /// 0x-prefixed EIP-712 digest; the CLOB uses it as the order id
    pub order_hash: String,
}

impl SignedOrder {
    pub fn nonce(&self) -> u64 {
        self.order.nonce
    }

    /// CLOB `POST /order` body
    pub fn to_json(&self, owner: &str, order_type: &str) -> Result<String> {
        let json = serde_json::json!({
            "order": {
                "salt": self.data.salt.as_u64(),
                "maker": format!("{:?}", self.data.maker),
                "signer": format!("{:?}", self.data.signer),
                "taker": format!("{:?}", self.data.taker),
                "tokenId": self.data.token_id.to_string(),
                "makerAmount": self.data.maker_amount.to_string(),
                "takerAmount": self.data.taker_amount.to_string(),
                "expiration": self.data.expiration.to_string(),
                "nonce": self.data.nonce.to_string(),
                "feeRateBps": self.data.fee_rate_bps.to_string(),
                "side": self.order.side.to_string(),
                "signatureType": self.data.signature_type,
                "signature": &self.signature,
            },
            "owner": owner,
            "orderType": order_type,
        });

        Ok(serde_json::to_string(&json)?)
    }
}

/// Signs orders with a key acquired from a `KeySource` per signature.
pub struct OrderSigner {
    keys: Arc<dyn KeySource>,
    chain_id: u64,
}

impl OrderSigner {
    pub fn new(keys: Arc<dyn KeySource>, chain_id: u64) -> Self {
        Self { keys, chain_id }
    }

    /// Address of the configured key
    pub fn address(&self) -> Result<Address> {
        let key = self.keys.load()?;
        Ok(Wallet::from_key(&key, self.chain_id)?.address())
    }

    pub fn sign(&self, order: &Order) -> Result<SignedOrder> {
        let wallet = {
            let key = self.keys.load()?;
            Wallet::from_key(&key, self.chain_id)?
        };

        let data = OrderData::from_order(order, wallet.address())?;
        let digest = OrderDomain::new(wallet.chain_id(), order.neg_risk)?.digest(&data);
        let signature = wallet.sign_hash(H256::from(digest))?;

        debug!(
            nonce = order.nonce,
            signer = ?wallet.address(),
            "signed order {}/{}",
            order.market_id,
            order.outcome
        );

        Ok(SignedOrder {
            order: order.clone(),
            data,
            signature: format!("0x{}", hex::encode(signature.to_vec())),
            signer: wallet.address(),
            order_hash: format!("0x{}", hex::encode(digest)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::keys::{EnvKeySource, StaticKeySource};
    use rust_decimal_macros::dec;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn order(side: OrderSide) -> Order {
        Order {
            market_id: "m1".to_string(),
            outcome: "Yes".to_string(),
            token_id: "12345".to_string(),
            side,
            price_ticks: 40,
            tick_size: dec!(0.01),
            size_lots: 1250,
            lot_size: dec!(0.01),
            salt: 42,
            nonce: 7,
            expiration: 1_900_000_000,
            neg_risk: false,
        }
    }

    fn signer() -> OrderSigner {
        OrderSigner::new(Arc::new(StaticKeySource::new(TEST_KEY)), 137)
    }

    #[test]
    fn test_buy_amounts_in_exchange_units() {
        let maker: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        let data = OrderData::from_order(&order(OrderSide::Buy), maker).unwrap();

        // 12.50 shares at 0.40 = 5 USDC
        assert_eq!(data.maker_amount, U256::from(5_000_000u64));
        assert_eq!(data.taker_amount, U256::from(12_500_000u64));
        assert_eq!(data.side, 0);
        assert_eq!(data.token_id, U256::from(12345));
    }

    #[test]
    fn test_sell_swaps_amounts() {
        let maker: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        let data = OrderData::from_order(&order(OrderSide::Sell), maker).unwrap();

        assert_eq!(data.maker_amount, U256::from(12_500_000u64));
        assert_eq!(data.taker_amount, U256::from(5_000_000u64));
        assert_eq!(data.side, 1);
    }

    #[test]
    fn test_invalid_token_id_rejected() {
        let mut bad = order(OrderSide::Buy);
        bad.token_id = "not-a-number".to_string();
        assert!(OrderData::from_order(&bad, Address::zero()).is_err());
    }

    #[test]
    fn test_neg_risk_changes_domain() {
        let standard = OrderDomain::new(137, false).unwrap().separator_hash();
        let neg_risk = OrderDomain::new(137, true).unwrap().separator_hash();
        assert_ne!(standard, neg_risk);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = signer();
        let a = signer.sign(&order(OrderSide::Buy)).unwrap();
        let b = signer.sign(&order(OrderSide::Buy)).unwrap();

        assert_eq!(a.signature, b.signature);
        assert_eq!(a.order_hash, b.order_hash);
        // 0x + 65 bytes
        assert_eq!(a.signature.len(), 2 + 130);
        assert_eq!(
            format!("{:?}", a.signer),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_signature_recovers_signer() {
        let signed = signer().sign(&order(OrderSide::Buy)).unwrap();
        let bytes = hex::decode(signed.signature.trim_start_matches("0x")).unwrap();
        let signature = ethers::types::Signature::try_from(bytes.as_slice()).unwrap();
        let digest = hex::decode(signed.order_hash.trim_start_matches("0x")).unwrap();

        let recovered = signature.recover(H256::from_slice(&digest)).unwrap();
        assert_eq!(recovered, signed.signer);
    }

    #[test]
    fn test_missing_key_is_signing_unavailable() {
        let signer = OrderSigner::new(
            Arc::new(EnvKeySource::new("AUGUR_TEST_KEY_THAT_IS_NEVER_SET")),
            137,
        );
        let err = signer.sign(&order(OrderSide::Buy)).unwrap_err();
        assert!(matches!(err, AugurError::SigningUnavailable(_)));
    }

    #[test]
    fn test_submission_body_shape() {
        let signed = signer().sign(&order(OrderSide::Buy)).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&signed.to_json("api-key", "GTC").unwrap()).unwrap();

        assert_eq!(body["orderType"], "GTC");
        assert_eq!(body["owner"], "api-key");
        assert_eq!(body["order"]["side"], "BUY");
        assert_eq!(body["order"]["nonce"], "7");
        assert_eq!(body["order"]["makerAmount"], "5000000");
    }
}
