//! Hedera entity ids and mirror-node timestamps.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Error returned when parsing a `shard.realm.num` entity id fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity id: {0}")]
pub struct EntityIdParseError(pub String);

/// A Hedera entity id in `shard.realm.num` form.
///
/// Accounts, contracts, files and tokens all share this id space; which kind
/// an id refers to is determined by the query that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId {
    /// The shard the entity lives in.
    pub shard: u64,
    /// The realm within the shard.
    pub realm: u64,
    /// The entity number.
    pub num: u64,
}

// === impl EntityId ===

impl EntityId {
    /// Creates an id in the default shard and realm.
    pub const fn from_num(num: u64) -> Self {
        Self { shard: 0, realm: 0, num }
    }

    /// Returns the long-zero EVM address encoding of this id.
    ///
    /// Hedera entities without an aliased EVM address are addressed by packing
    /// `shard.realm.num` big-endian into the 20 address bytes.
    pub fn to_evm_address(&self) -> Address {
        let mut out = [0u8; 20];
        out[0..4].copy_from_slice(&(self.shard as u32).to_be_bytes());
        out[4..12].copy_from_slice(&self.realm.to_be_bytes());
        out[12..20].copy_from_slice(&self.num.to_be_bytes());
        Address::from(out)
    }

    /// Interprets a long-zero EVM address back into an entity id.
    ///
    /// Returns `None` for addresses that are not in long-zero form (i.e. real
    /// aliased EVM addresses).
    pub fn from_evm_address(address: &Address) -> Option<Self> {
        let bytes = address.as_slice();
        // an aliased address has entropy in the upper bytes; long-zero ids on
        // current networks have shard = realm = 0
        if bytes[0..12] != [0u8; 12] {
            return None
        }
        let num = u64::from_be_bytes(bytes[12..20].try_into().ok()?);
        Some(Self::from_num(num))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = EntityIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| EntityIdParseError(s.to_owned()))
        };
        let (shard, realm, num) = (next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(EntityIdParseError(s.to_owned()))
        }
        Ok(Self { shard, realm, num })
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when parsing a mirror-node timestamp fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid consensus timestamp: {0}")]
pub struct TimestampParseError(pub String);

/// A consensus timestamp in the mirror node's `seconds.nanoseconds` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MirrorTimestamp {
    /// Seconds since the unix epoch.
    pub seconds: u64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

// === impl MirrorTimestamp ===

impl MirrorTimestamp {
    /// Creates a timestamp from its parts.
    pub const fn new(seconds: u64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }
}

impl fmt::Display for MirrorTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

impl FromStr for MirrorTimestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimestampParseError(s.to_owned());
        match s.split_once('.') {
            Some((secs, frac)) => {
                let seconds = secs.parse().map_err(|_| err())?;
                if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err())
                }
                // right-pad to nanosecond precision
                let nanos =
                    frac.parse::<u32>().map_err(|_| err())? * 10u32.pow(9 - frac.len() as u32);
                Ok(Self { seconds, nanos })
            }
            None => Ok(Self { seconds: s.parse().map_err(|_| err())?, nanos: 0 }),
        }
    }
}

impl Serialize for MirrorTimestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MirrorTimestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
