//! Error taxonomy for the synchronizer pipeline.

use alloy_primitives::Address;
use thiserror::Error;

/// Errors that can occur while syncing chain events into the ledger.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Node or network failure. Retried by the chain client, fatal once exhausted.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Database or checkpoint medium failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A non-sentinel address with no registered wallet.
    #[error("Account {address} not found")]
    UnresolvableAccount { address: Address },

    /// A log or node response that could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The NFT payload could not be split, decrypted or parsed.
    #[error("Payload error: {0}")]
    Payload(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns `true` if the error only affects the current event.
    ///
    /// Skippable errors are logged and the loop moves on to the next event;
    /// everything else stops the current iteration before the checkpoint
    /// is written.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableAccount { .. } | Self::Decode(_) | Self::Payload(_)
        )
    }

    /// Returns `true` for node/network failures.
    pub fn is_rpc(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skippable_classification() {
        assert!(SyncError::UnresolvableAccount { address: Address::ZERO }.is_skippable());
        assert!(SyncError::Decode("bad topic".into()).is_skippable());
        assert!(!SyncError::Storage("db down".into()).is_skippable());
        assert!(!SyncError::Rpc("timeout".into()).is_skippable());
    }

    #[test]
    fn display_unresolvable() {
        let err = SyncError::UnresolvableAccount { address: Address::repeat_byte(0x11) };
        assert!(err.to_string().contains("0x1111111111111111111111111111111111111111"));
    }
}
