//! Process configuration from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};

use carbonsync_evm::{SyncConfig, SyncConfigBuilder, DEFAULT_CHECKPOINT_KEY, DEFAULT_PAYLOAD_TYPES};

use crate::logging::LogConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc_url: String,
    pub rpc_timeout: Duration,
    pub rpc_max_attempts: u32,
    pub database_url: String,
    pub db_max_connections: u32,
    pub sm2_private_key_path: PathBuf,
    pub sync: SyncConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let token_contract: Address = env.required_parsed("TOKEN_CONTRACT_ADDRESS")?;
        let nft_contract: Address = env.required_parsed("NFT_CONTRACT_ADDRESS")?;

        let sync = SyncConfigBuilder::new(token_contract, nft_contract)
            .start_block(env.parsed("START_BLOCK", 1)?)
            .concurrency(env.parsed("CHAIN_CONCURRENCY", 5)?)
            .poll_interval_ms(env.parsed("POLL_INTERVAL_MS", 500)?)
            .checkpoint_key(env.get("CHECKPOINT_KEY").unwrap_or_else(|| DEFAULT_CHECKPOINT_KEY.into()))
            .payload_types(env.get("NFT_PAYLOAD_TYPES").unwrap_or_else(|| DEFAULT_PAYLOAD_TYPES.into()))
            .max_block_range(env.optional_parsed("MAX_BLOCK_RANGE")?)
            .build();

        let rpc_max_attempts: u32 = env.parsed("RPC_MAX_ATTEMPTS", 3)?;
        if rpc_max_attempts == 0 {
            return Err(anyhow!("RPC_MAX_ATTEMPTS must be at least 1"));
        }

        Ok(Self {
            rpc_url: env.required("RPC_HTTP_URL")?,
            rpc_timeout: Duration::from_secs(env.parsed("RPC_TIMEOUT_SECS", 30)?),
            rpc_max_attempts,
            database_url: env.required("DATABASE_URL")?,
            db_max_connections: env.parsed("DB_MAX_CONNECTIONS", 10)?,
            sm2_private_key_path: env
                .get("SM2_PRIVATE_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./cert/privateKey")),
            sync,
            log: LogConfig {
                level: env.get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
                json: env.parsed("LOG_JSON", false)?,
            },
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Non-empty value of `name`.
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.get(name).ok_or_else(|| anyhow!("{name} must be set"))
    }

    fn required_parsed<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = self.required(name)?;
        raw.parse().with_context(|| format!("{name}='{raw}' is invalid"))
    }

    fn optional_parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(name)
            .map(|raw| raw.parse().with_context(|| format!("{name}='{raw}' is invalid")))
            .transpose()
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        Ok(self.optional_parsed(name)?.unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, String> {
        HashMap::from([
            ("RPC_HTTP_URL", "http://localhost:8545".to_string()),
            ("DATABASE_URL", "postgresql://localhost/carbon".to_string()),
            ("TOKEN_CONTRACT_ADDRESS", format!("0x{}", "a0".repeat(20))),
            ("NFT_CONTRACT_ADDRESS", format!("0x{}", "b0".repeat(20))),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<AppConfig> {
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&base()).unwrap();
        assert_eq!(cfg.rpc_timeout, Duration::from_secs(30));
        assert_eq!(cfg.rpc_max_attempts, 3);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.sm2_private_key_path, PathBuf::from("./cert/privateKey"));
        assert_eq!(cfg.sync.start_block, 1);
        assert_eq!(cfg.sync.concurrency, 5);
        assert_eq!(cfg.sync.poll_interval_ms, 500);
        assert_eq!(cfg.sync.checkpoint_key, DEFAULT_CHECKPOINT_KEY);
        assert_eq!(cfg.sync.token_contract, Address::repeat_byte(0xa0));
        assert_eq!(cfg.sync.max_block_range, None);
        assert_eq!(cfg.log.level, "info");
        assert!(!cfg.log.json);
    }

    #[test]
    fn overrides() {
        let mut vars = base();
        vars.insert("START_BLOCK", "4200000".into());
        vars.insert("CHAIN_CONCURRENCY", "8".into());
        vars.insert("MAX_BLOCK_RANGE", "5000".into());
        vars.insert("LOG_JSON", "true".into());
        vars.insert("CHECKPOINT_KEY", "staging:ph".into());

        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.sync.start_block, 4_200_000);
        assert_eq!(cfg.sync.concurrency, 8);
        assert_eq!(cfg.sync.max_block_range, Some(5_000));
        assert_eq!(cfg.sync.checkpoint_key, "staging:ph");
        assert!(cfg.log.json);
    }

    #[test]
    fn missing_required_value() {
        let mut vars = base();
        vars.remove("DATABASE_URL");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = base();
        vars.insert("TOKEN_CONTRACT_ADDRESS", "0x1234".into());
        assert!(load(&vars).is_err());

        let mut vars = base();
        vars.insert("START_BLOCK", "soon".into());
        assert!(load(&vars).unwrap_err().to_string().contains("START_BLOCK"));

        let mut vars = base();
        vars.insert("RPC_MAX_ATTEMPTS", "0".into());
        assert!(load(&vars).is_err());
    }
}
