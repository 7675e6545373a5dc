//! Proposal identifiers binding a plugin instance to its local sequence number.
//!
//! The textual form is `<plugin address>_0x<local id in hex>`, the same key
//! the indexer uses for proposal entities. The separator never occurs in an
//! address, so splitting on the first `_` is unambiguous.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::error::{CoreError, CoreResult};
use crate::uint::{parse_hex_u256, U256};

const SEPARATOR: char = '_';

/// Identifier of a proposal across the contract, the indexer and the client
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalId {
    plugin_address: Address,
    local_id: U256,
}

impl ProposalId {
    /// Create an identifier from its parts
    pub fn new(plugin_address: Address, local_id: impl Into<U256>) -> Self {
        Self {
            plugin_address,
            local_id: local_id.into(),
        }
    }

    /// The plugin instance that owns the proposal
    pub fn plugin_address(&self) -> Address {
        self.plugin_address
    }

    /// The sequence number assigned by the plugin contract
    pub fn local_id(&self) -> U256 {
        self.local_id
    }

    /// Encode to the opaque string token
    pub fn encode(&self) -> String {
        format!("{}{}0x{:x}", self.plugin_address, SEPARATOR, self.local_id)
    }

    /// Decode the opaque string token.
    ///
    /// The numeric suffix may be `0x` hex or plain decimal.
    pub fn decode(value: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidProposalId(value.to_string());

        let (address, number) = value.split_once(SEPARATOR).ok_or_else(invalid)?;
        let plugin_address = Address::parse(address).map_err(|_| invalid())?;

        let local_id = match number.strip_prefix("0x") {
            Some(digits) => parse_hex_u256(digits),
            None if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
                U256::from_dec_str(number).ok()
            }
            None => None,
        }
        .ok_or_else(invalid)?;

        Ok(Self {
            plugin_address,
            local_id,
        })
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", self.encode())
    }
}

impl FromStr for ProposalId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalId::decode(s)
    }
}

impl Serialize for ProposalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ProposalId::decode(&value).map_err(serde::de::Error::custom)
    }
}
