//! Shared ledger types.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Internal account identifier (`tbl_users.id`).
pub type AccountId = i64;

/// Fixed decimal scale of the token contract (2 decimals).
pub const TOKEN_SCALE: U256 = U256::from_limbs([100, 0, 0, 0]);

/// The designated burn address `0x000000000000000000000000000000000000dEaD`.
pub const BURN_ADDRESS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xde, 0xad,
]);

/// Lower-case hex without the `0x` prefix, as ledger rows store hashes.
pub fn hash_key(hash: &B256) -> String {
    hex::encode(hash)
}

/// Lower-case hex without the `0x` prefix, as the wallet registry stores addresses.
pub fn address_key(address: &Address) -> String {
    hex::encode(address)
}

// ─── TransactionType ─────────────────────────────────────────────────────────

/// Which contract a ledger entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Token,
    Nft,
}

impl TransactionType {
    /// Persisted `transaction_type` code (1: token, 2: nft).
    pub fn code(self) -> i16 {
        match self {
            Self::Token => 1,
            Self::Nft => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Token),
            2 => Some(Self::Nft),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token => write!(f, "TOKEN"),
            Self::Nft => write!(f, "NFT"),
        }
    }
}

// ─── TransferKind ────────────────────────────────────────────────────────────

/// Semantics of a `Transfer` log, derived from its `from`/`to` addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    Mint,
    Burn,
    Transfer,
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mint => write!(f, "mint"),
            Self::Burn => write!(f, "burn"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

// ─── LedgerEntry / LedgerRow ─────────────────────────────────────────────────

/// A classified on-chain transfer, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub tx_hash: B256,
    pub tx_type: TransactionType,
    pub block_number: u64,
    pub from: Address,
    pub to: Address,
    /// Scaled token amount, or `1` for NFT entries.
    pub amount: U256,
    pub nft_id: Option<U256>,
}

impl LedgerEntry {
    /// A token transfer; `raw_value` is the on-chain value before scaling.
    pub fn token(tx_hash: B256, block_number: u64, from: Address, to: Address, raw_value: U256) -> Self {
        Self {
            tx_hash,
            tx_type: TransactionType::Token,
            block_number,
            from,
            to,
            amount: raw_value / TOKEN_SCALE,
            nft_id: None,
        }
    }

    pub fn nft(tx_hash: B256, block_number: u64, from: Address, to: Address, token_id: U256) -> Self {
        Self {
            tx_hash,
            tx_type: TransactionType::Nft,
            block_number,
            from,
            to,
            amount: U256::from(1u64),
            nft_id: Some(token_id),
        }
    }

    pub fn hash_key(&self) -> String {
        hash_key(&self.tx_hash)
    }
}

/// A persisted ledger row (`tbl_transactions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub block_height: u64,
    /// Lower-case hex, no `0x`.
    pub transaction_hash: String,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: U256,
    pub transaction_type: TransactionType,
    pub nft_id: Option<U256>,
    pub created_date: chrono::DateTime<chrono::Utc>,
}

// ─── Orders / reports ────────────────────────────────────────────────────────

/// Lifecycle of a marketplace order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Cancelled,
    PendingPayment,
    Settled,
}

impl OrderStatus {
    /// Persisted `status` code (0: cancel, 1: pending payment, 2: payment success).
    pub fn code(self) -> i16 {
        match self {
            Self::Cancelled => 0,
            Self::PendingPayment => 1,
            Self::Settled => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Cancelled),
            1 => Some(Self::PendingPayment),
            2 => Some(Self::Settled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub amount: U256,
    pub status: OrderStatus,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub uuid: uuid::Uuid,
    pub nft_id: Option<U256>,
    pub transaction_hash: Option<String>,
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_entry_scales_value() {
        let entry = LedgerEntry::token(B256::ZERO, 7, Address::ZERO, BURN_ADDRESS, U256::from(1050u64));
        assert_eq!(entry.amount, U256::from(10u64)); // integer division drops the remainder
        assert_eq!(entry.nft_id, None);
        assert_eq!(entry.tx_type, TransactionType::Token);
    }

    #[test]
    fn nft_entry_has_unit_amount() {
        let entry = LedgerEntry::nft(B256::ZERO, 7, Address::ZERO, Address::ZERO, U256::from(42u64));
        assert_eq!(entry.amount, U256::from(1u64));
        assert_eq!(entry.nft_id, Some(U256::from(42u64)));
    }

    #[test]
    fn keys_are_lowercase_without_prefix() {
        let hash = B256::repeat_byte(0xab);
        assert_eq!(hash_key(&hash), "ab".repeat(32));
        assert_eq!(address_key(&BURN_ADDRESS), "000000000000000000000000000000000000dead");
    }

    #[test]
    fn status_codes_roundtrip() {
        for status in [OrderStatus::Cancelled, OrderStatus::PendingPayment, OrderStatus::Settled] {
            assert_eq!(OrderStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(TransactionType::from_code(3), None);
    }
}
