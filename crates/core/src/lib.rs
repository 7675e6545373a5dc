//! Core gasless voting types
//!
//! Addresses, 256-bit integers, proposal identifiers, fixed-point ratios and
//! the on-chain timestamp boundary shared by the governance logic and the
//! settlement client.

pub mod address;
pub mod config;
pub mod error;
pub mod proposal_id;
pub mod ratio;
pub mod time;
pub mod uint;

// Re-export key components
pub use address::{is_address, Address};
pub use config::{ClientConfig, ConfigError, ConfigResult, DeploymentAddresses, Network, ProtocolVariant};
pub use error::{CoreError, CoreResult};
pub use proposal_id::ProposalId;
pub use ratio::{format_units, ratio_decode, ratio_encode, RATIO_BASE, RATIO_PRECISION};
pub use time::{timestamp_from_chain, timestamp_to_chain, Timestamp};
pub use uint::{parse_u256, U256, U512};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a global tracing subscriber filtered by `RUST_LOG`.
///
/// Libraries never call this; binaries and test harnesses may.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    use tracing_subscriber::FmtSubscriber;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
