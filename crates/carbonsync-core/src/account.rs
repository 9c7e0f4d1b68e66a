//! Address → account resolution.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::store::WalletRegistry;
use crate::types::{AccountId, BURN_ADDRESS};

/// Who is on one side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountRef {
    /// The zero address: token creation, or NFT destruction.
    Mint,
    /// The designated burn address.
    Burn,
    /// A wallet registered to an internal account.
    Registered(AccountId),
}

impl AccountRef {
    pub const MINT_ID: AccountId = 0;
    pub const BURN_ID: AccountId = -1;

    /// The id stored in `from_account` / `to_account`.
    pub fn account_id(&self) -> AccountId {
        match self {
            Self::Mint => Self::MINT_ID,
            Self::Burn => Self::BURN_ID,
            Self::Registered(id) => *id,
        }
    }

    pub fn registered(&self) -> Option<AccountId> {
        match self {
            Self::Registered(id) => Some(*id),
            _ => None,
        }
    }

    /// Sentinel for a reserved address, without touching the registry.
    pub fn sentinel(address: &Address) -> Option<Self> {
        if *address == Address::ZERO {
            Some(Self::Mint)
        } else if *address == BURN_ADDRESS {
            Some(Self::Burn)
        } else {
            None
        }
    }
}

/// Resolves addresses through the sentinels first, then the wallet registry.
#[derive(Clone)]
pub struct AccountResolver {
    wallets: Arc<dyn WalletRegistry>,
}

impl AccountResolver {
    pub fn new(wallets: Arc<dyn WalletRegistry>) -> Self {
        Self { wallets }
    }

    /// Resolve `address`, failing with `UnresolvableAccount` for unknown wallets.
    pub async fn resolve(&self, address: &Address) -> Result<AccountRef, SyncError> {
        if let Some(sentinel) = AccountRef::sentinel(address) {
            return Ok(sentinel);
        }
        match self.wallets.find_by_address(address).await? {
            Some(id) => Ok(AccountRef::Registered(id)),
            None => Err(SyncError::UnresolvableAccount { address: *address }),
        }
    }
}
