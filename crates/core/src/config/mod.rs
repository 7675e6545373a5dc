//! Configuration for the gasless voting client
//!
//! Network deployments, collaborator endpoints, timeouts and the on-chain
//! struct layout are all injected here at construction time.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::address::Address;

/// Error types for configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parsing error
    #[error("Parsing error: {0}")]
    ParseError(String),

    /// Value error
    #[error("Invalid value for key {0}: {1}")]
    InvalidValue(String, String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Networks the plugin can be deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Network {
    Homestead,
    Goerli,
    Sepolia,
    Matic,
    Maticmum,
    Base,
    BaseGoerli,
    BaseSepolia,
    Arbitrum,
    ArbitrumGoerli,
    ArbitrumSepolia,
    Local,
}

impl Network {
    /// All supported networks
    pub const ALL: [Network; 12] = [
        Network::Homestead,
        Network::Goerli,
        Network::Sepolia,
        Network::Matic,
        Network::Maticmum,
        Network::Base,
        Network::BaseGoerli,
        Network::BaseSepolia,
        Network::Arbitrum,
        Network::ArbitrumGoerli,
        Network::ArbitrumSepolia,
        Network::Local,
    ];

    /// The canonical network name
    pub fn name(&self) -> &'static str {
        match self {
            Network::Homestead => "homestead",
            Network::Goerli => "goerli",
            Network::Sepolia => "sepolia",
            Network::Matic => "matic",
            Network::Maticmum => "maticmum",
            Network::Base => "base",
            Network::BaseGoerli => "baseGoerli",
            Network::BaseSepolia => "baseSepolia",
            Network::Arbitrum => "arbitrum",
            Network::ArbitrumGoerli => "arbitrumGoerli",
            Network::ArbitrumSepolia => "arbitrumSepolia",
            Network::Local => "local",
        }
    }

    /// Published plugin deployment for this network, if there is one
    pub fn default_deployment(&self) -> Option<DeploymentAddresses> {
        let (repo, setup) = match self {
            Network::Goerli => (
                "0x74057f3f3809a874f28e3ebe80a1f1a5a137b64e",
                "0xf8454f52f3eca6c1a9e5da0119173832f208ab18",
            ),
            Network::Maticmum => (
                "0x5bd8f8dc73476d24f37c4d885c4528d5abb8cbe6",
                "0x5a6e29875cca6eb7a9c39938720e6096468a8917",
            ),
            _ => return None,
        };
        Some(DeploymentAddresses {
            repo_address: repo.parse().ok()?,
            setup_address: setup.parse().ok()?,
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .iter()
            .find(|network| network.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ConfigError::InvalidValue("network".to_string(), s.to_string()))
    }
}

/// Addresses of the plugin repository and setup contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentAddresses {
    /// Plugin repository contract
    pub repo_address: Address,
    /// Plugin setup contract
    pub setup_address: Address,
}

/// On-chain struct layout spoken by the plugin contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolVariant {
    /// Settings without a tally duration, parameters without a security block
    Legacy,
    /// Settings with `minTallyDuration`, parameters with `securityBlock`
    #[default]
    Current,
}

/// Configuration of a gasless voting client.
///
/// The client itself only reads the deadlines and write behavior. The
/// endpoints and the deployment are settled here for the transport
/// implementations of the contract, voting network and indexer traits,
/// which are built from the same file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network the plugin lives on
    pub network: Network,
    /// Plugin deployment, falls back to the network's published one
    pub deployment: Option<DeploymentAddresses>,
    /// Indexing service endpoint, for the indexer transport
    pub indexer_url: String,
    /// Off-chain voting network endpoint, for the voting network transport
    pub voting_network_url: String,
    /// Census service endpoint, for the voting network transport
    pub census_url: String,
    /// Deadline for a single read or submission, in seconds
    pub request_timeout_secs: u64,
    /// Deadline for a transaction to be mined, in seconds
    pub confirmation_timeout_secs: u64,
    /// Confirmations to wait for before a write is reported done
    pub tx_confirmations: u32,
    /// Struct layout of the plugin contract
    pub protocol_variant: ProtocolVariant,
    /// Queue writes per proposal inside this client
    pub serialize_writes: bool,
    /// Ask the contract to execute when the approval reaches quorum
    pub auto_execute: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: Network::Goerli,
            deployment: None,
            indexer_url: "https://api.studio.thegraph.com/query/56700/gasless-voting/version/latest"
                .to_string(),
            voting_network_url: "https://api-stg.vocdoni.net/v2".to_string(),
            census_url: "https://census3-stg.vocdoni.net/api".to_string(),
            request_timeout_secs: 30,
            confirmation_timeout_secs: 600,
            tx_confirmations: 1,
            protocol_variant: ProtocolVariant::Current,
            serialize_writes: false,
            auto_execute: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).await?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content).await?;
        Ok(())
    }

    /// The deployment a contract transport should talk to, explicit or
    /// published
    pub fn deployment(&self) -> ConfigResult<DeploymentAddresses> {
        self.deployment
            .or_else(|| self.network.default_deployment())
            .ok_or_else(|| {
                ConfigError::InvalidConfig(format!("no plugin deployment known for {}", self.network))
            })
    }

    /// Per-call deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Deadline for mining
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, value) in [
            ("indexer_url", &self.indexer_url),
            ("voting_network_url", &self.voting_network_url),
            ("census_url", &self.census_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(key.to_string(), "must not be empty".to_string()));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "request_timeout_secs".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "confirmation_timeout_secs".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_names_roundtrip() {
        for network in Network::ALL {
            assert_eq!(network.name().parse::<Network>().unwrap(), network);
        }
        assert!("mainnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_deployment_falls_back_to_published() {
        let config = ClientConfig::default();
        let deployment = config.deployment().unwrap();
        assert_eq!(
            deployment.repo_address.to_string(),
            "0x74057f3f3809a874f28e3ebe80a1f1a5a137b64e"
        );

        let local = ClientConfig {
            network: Network::Local,
            ..ClientConfig::default()
        };
        assert!(local.deployment().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(key, _)) if key == "request_timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let config = ClientConfig {
            voting_network_url: "  ".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(key, _)) if key == "voting_network_url"));
    }

    #[test]
    fn test_missing_file() {
        let result = tokio_test::block_on(ClientConfig::from_file("/nonexistent/gasless-voting.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");

        let config = ClientConfig {
            network: Network::Local,
            deployment: Some(DeploymentAddresses {
                repo_address: Address::from_bytes([1; 20]),
                setup_address: Address::from_bytes([2; 20]),
            }),
            protocol_variant: ProtocolVariant::Legacy,
            serialize_writes: true,
            ..ClientConfig::default()
        };
        config.save_to_file(&path).await.unwrap();

        let loaded = ClientConfig::from_file(&path).await.unwrap();
        assert_eq!(loaded.network, Network::Local);
        assert_eq!(loaded.deployment, config.deployment);
        assert_eq!(loaded.protocol_variant, ProtocolVariant::Legacy);
        assert!(loaded.serialize_writes);
    }
}
