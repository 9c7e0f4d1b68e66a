//! Event classifier: decode `Transfer` logs and derive their semantics.
//!
//! Both contracts emit `Transfer(address indexed from, address indexed to, uint256 …)`.
//! For the fungible token the amount is non-indexed and lives in `data`; for
//! the NFT the token id is the third indexed argument (`topics[3]`).

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

use carbonsync_core::error::SyncError;
use carbonsync_core::types::{LedgerEntry, TransferKind, BURN_ADDRESS};

use crate::node::RawLog;

pub const TRANSFER_SIGNATURE: &str = "Transfer(address,address,uint256)";

/// `keccak256("Transfer(address,address,uint256)")`.
pub fn transfer_topic() -> B256 {
    keccak256(TRANSFER_SIGNATURE)
}

/// Which of the two watched contracts emitted a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    Token,
    Nft,
}

/// A decoded `Transfer` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub contract: ContractKind,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    pub from: Address,
    pub to: Address,
    /// Raw token amount for [`ContractKind::Token`], token id for [`ContractKind::Nft`].
    pub value: U256,
}

impl TransferEvent {
    pub fn decode(contract: ContractKind, log: &RawLog) -> Result<Self, SyncError> {
        let topic0 = log
            .topics
            .first()
            .ok_or_else(|| SyncError::Decode("log has no topics".into()))?;
        if *topic0 != transfer_topic() {
            return Err(SyncError::Decode(format!("unexpected topic0 {topic0}")));
        }

        let from = indexed_address(log, 1)?;
        let to = indexed_address(log, 2)?;

        let value = match contract {
            ContractKind::Token => {
                let word = log
                    .data
                    .get(..32)
                    .ok_or_else(|| SyncError::Decode("transfer value not found in data".into()))?;
                U256::try_from_be_slice(word)
                    .ok_or_else(|| SyncError::Decode("transfer value out of range".into()))?
            }
            ContractKind::Nft => {
                let topic = log
                    .topics
                    .get(3)
                    .ok_or_else(|| SyncError::Decode("token id not found in topics".into()))?;
                U256::from_be_bytes(topic.0)
            }
        };

        Ok(Self {
            contract,
            tx_hash: log.transaction_hash,
            block_number: log.block_number_u64()?,
            log_index: log.log_index_u64()?,
            from,
            to,
            value,
        })
    }

    pub fn kind(&self) -> TransferKind {
        classify(self.contract, &self.from, &self.to)
    }

    /// The ledger row this event produces (token amounts are scaled here).
    pub fn to_entry(&self) -> LedgerEntry {
        match self.contract {
            ContractKind::Token => {
                LedgerEntry::token(self.tx_hash, self.block_number, self.from, self.to, self.value)
            }
            ContractKind::Nft => {
                LedgerEntry::nft(self.tx_hash, self.block_number, self.from, self.to, self.value)
            }
        }
    }
}

fn indexed_address(log: &RawLog, index: usize) -> Result<Address, SyncError> {
    log.topics
        .get(index)
        .map(|t| Address::from_word(*t))
        .ok_or_else(|| SyncError::Decode(format!("missing indexed address at topic {index}")))
}

/// Mint/burn/transfer semantics of a log.
///
/// A token is burned by sending it to the burn address; an NFT is burned by
/// sending it to the zero address.
pub fn classify(contract: ContractKind, from: &Address, to: &Address) -> TransferKind {
    if *from == Address::ZERO {
        return TransferKind::Mint;
    }
    let burn_target = match contract {
        ContractKind::Token => BURN_ADDRESS,
        ContractKind::Nft => Address::ZERO,
    };
    if *to == burn_target {
        TransferKind::Burn
    } else {
        TransferKind::Transfer
    }
}
