//! Fixed-width unsigned integers for on-chain quantities.
//!
//! Vote weights, voting power and action values are `uint256` on chain.
//! `U512` holds the intermediate products of the participation and outcome
//! math so that no comparison ever truncates.

#![allow(clippy::assign_op_pattern)]
#![allow(clippy::ptr_offset_with_cast)]
#![allow(clippy::manual_range_contains)]

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uint::construct_uint;

use crate::error::{CoreError, CoreResult};

construct_uint! {
    /// 256-bit unsigned integer
    pub struct U256(4);
}

construct_uint! {
    /// 512-bit unsigned integer
    pub struct U512(8);
}

impl From<U256> for U512 {
    fn from(value: U256) -> Self {
        let mut words = [0u64; 8];
        words[..4].copy_from_slice(&value.0);
        U512(words)
    }
}

impl TryFrom<U512> for U256 {
    type Error = CoreError;

    fn try_from(value: U512) -> Result<Self, Self::Error> {
        if value.0[4..].iter().any(|word| *word != 0) {
            return Err(CoreError::Overflow(format!("{} does not fit in 256 bits", value)));
        }
        let mut words = [0u64; 4];
        words.copy_from_slice(&value.0[..4]);
        Ok(U256(words))
    }
}

/// Parse a `U256` from a decimal string or a `0x` prefixed hex string
pub fn parse_u256(value: &str) -> CoreResult<U256> {
    let trimmed = value.trim();
    if let Some(digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return parse_hex_u256(digits).ok_or_else(|| CoreError::Overflow(value.to_string()));
    }
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Overflow(format!("not an unsigned integer: {}", value)));
    }
    U256::from_dec_str(trimmed).map_err(|_| CoreError::Overflow(value.to_string()))
}

/// Parse bare hex digits, `None` on an empty string, a bad digit or overflow
pub(crate) fn parse_hex_u256(digits: &str) -> Option<U256> {
    if digits.is_empty() {
        return None;
    }
    let sixteen = U256::from(16u64);
    digits.chars().try_fold(U256::zero(), |acc, c| {
        let digit = c.to_digit(16)?;
        acc.checked_mul(sixteen)?.checked_add(U256::from(digit))
    })
}

struct U256Visitor;

impl<'de> serde::de::Visitor<'de> for U256Visitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal/hex string")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<U256, E> {
        parse_u256(v).map_err(E::custom)
    }
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(U256Visitor)
    }
}
