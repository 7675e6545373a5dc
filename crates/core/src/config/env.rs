//! Environment variable overrides for the client configuration

use std::env;
use std::str::FromStr;

use tracing::warn;

use super::{ClientConfig, ConfigResult, Network};

/// Environment variable prefix for client configuration
pub const ENV_PREFIX: &str = "GASLESS_VOTING_";

/// Applies `GASLESS_VOTING_*` variables on top of a base configuration
pub struct EnvConfigProvider {
    base_config: ClientConfig,
}

impl EnvConfigProvider {
    /// Use the default configuration as the base
    pub fn new() -> Self {
        Self {
            base_config: ClientConfig::default(),
        }
    }

    /// Use a specific base configuration
    pub fn with_base_config(base_config: ClientConfig) -> Self {
        Self { base_config }
    }

    fn var(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn parse_env<T: FromStr>(&self, key: &str, default: T) -> T
    where
        T::Err: std::fmt::Display,
    {
        match self.var(key) {
            Some(value) => match value.parse::<T>() {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Ignoring {}{}: {}", ENV_PREFIX, key, e);
                    default
                }
            },
            None => default,
        }
    }

    fn parse_bool_env(&self, key: &str, default: bool) -> bool {
        match self.var(key).map(|v| v.to_lowercase()) {
            Some(v) if v == "true" || v == "1" || v == "yes" => true,
            Some(v) if v == "false" || v == "0" || v == "no" => false,
            Some(v) => {
                warn!("Ignoring {}{}: not a boolean: {}", ENV_PREFIX, key, v);
                default
            }
            None => default,
        }
    }

    /// Build the configuration and validate it
    pub fn load(&self) -> ConfigResult<ClientConfig> {
        let base = &self.base_config;
        let config = ClientConfig {
            network: self.parse_env::<Network>("NETWORK", base.network),
            deployment: base.deployment,
            indexer_url: self.var("INDEXER_URL").unwrap_or_else(|| base.indexer_url.clone()),
            voting_network_url: self
                .var("VOTING_NETWORK_URL")
                .unwrap_or_else(|| base.voting_network_url.clone()),
            census_url: self.var("CENSUS_URL").unwrap_or_else(|| base.census_url.clone()),
            request_timeout_secs: self.parse_env("REQUEST_TIMEOUT_SECS", base.request_timeout_secs),
            confirmation_timeout_secs: self
                .parse_env("CONFIRMATION_TIMEOUT_SECS", base.confirmation_timeout_secs),
            tx_confirmations: self.parse_env("TX_CONFIRMATIONS", base.tx_confirmations),
            protocol_variant: base.protocol_variant,
            serialize_writes: self.parse_bool_env("SERIALIZE_WRITES", base.serialize_writes),
            auto_execute: self.parse_bool_env("AUTO_EXECUTE", base.auto_execute),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only this test touches these variables
    #[test]
    fn test_env_overrides() {
        env::set_var("GASLESS_VOTING_NETWORK", "maticmum");
        env::set_var("GASLESS_VOTING_REQUEST_TIMEOUT_SECS", "5");
        env::set_var("GASLESS_VOTING_SERIALIZE_WRITES", "yes");
        env::set_var("GASLESS_VOTING_TX_CONFIRMATIONS", "many");

        let config = EnvConfigProvider::new().load().unwrap();
        assert_eq!(config.network, Network::Maticmum);
        assert_eq!(config.request_timeout_secs, 5);
        assert!(config.serialize_writes);
        assert_eq!(config.tx_confirmations, 1);

        env::remove_var("GASLESS_VOTING_NETWORK");
        env::remove_var("GASLESS_VOTING_REQUEST_TIMEOUT_SECS");
        env::remove_var("GASLESS_VOTING_SERIALIZE_WRITES");
        env::remove_var("GASLESS_VOTING_TX_CONFIRMATIONS");
    }
}
