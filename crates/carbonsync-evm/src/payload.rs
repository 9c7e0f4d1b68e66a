//! On-chain report payload reader (`tokenDataMap(uint256)`).

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, Bytes, U256};

use carbonsync_core::error::SyncError;

use crate::node::ChainNode;

pub const TOKEN_DATA_SIGNATURE: &str = "tokenDataMap(uint256)";

/// Default return tuple of `tokenDataMap`.
pub const DEFAULT_PAYLOAD_TYPES: &str = "(uint256,string)";

/// Position of the sealed payload string in the return tuple.
pub const PAYLOAD_FIELD: usize = 1;

/// Reads and decodes the sealed report payload of a minted NFT.
#[derive(Debug, Clone)]
pub struct PayloadReader {
    contract: Address,
    return_type: DynSolType,
}

impl PayloadReader {
    /// `return_types` is the Solidity tuple returned by `tokenDataMap`,
    /// e.g. `"(uint256,string)"`. Its second member must be a `string`.
    pub fn new(contract: Address, return_types: &str) -> Result<Self, SyncError> {
        let return_type = DynSolType::parse(return_types)
            .map_err(|e| SyncError::Config(format!("invalid payload types '{return_types}': {e}")))?;

        match &return_type {
            DynSolType::Tuple(members) if matches!(members.get(PAYLOAD_FIELD), Some(DynSolType::String)) => {}
            _ => {
                return Err(SyncError::Config(format!(
                    "payload types '{return_types}' must be a tuple with a string at index {PAYLOAD_FIELD}"
                )))
            }
        }

        Ok(Self { contract, return_type })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// ABI-encoded call to `tokenDataMap(token_id)`.
    pub fn calldata(token_id: U256) -> Bytes {
        let selector = &keccak256(TOKEN_DATA_SIGNATURE)[..4];
        let args = DynSolValue::Uint(token_id, 256).abi_encode();
        let mut data = Vec::with_capacity(4 + args.len());
        data.extend_from_slice(selector);
        data.extend_from_slice(&args);
        data.into()
    }

    /// Extract the payload string from the raw `eth_call` output.
    pub fn decode(&self, output: &[u8]) -> Result<String, SyncError> {
        let value = self
            .return_type
            .abi_decode_sequence(output)
            .map_err(|e| SyncError::Payload(format!("tokenDataMap output: {e}")))?;

        value
            .as_tuple()
            .and_then(|fields| fields.get(PAYLOAD_FIELD))
            .and_then(DynSolValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| SyncError::Payload("payload string missing from tokenDataMap output".into()))
    }

    pub async fn read<N: ChainNode + ?Sized>(&self, node: &N, token_id: U256) -> Result<String, SyncError> {
        let output = node.read_contract(self.contract, Self::calldata(token_id)).await?;
        self.decode(&output)
    }
}
