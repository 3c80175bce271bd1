use core::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::ser::{Serialize, Serializer};
use serde::{Deserialize, Deserializer};
use solana_sdk::pubkey::{ParsePubkeyError, Pubkey};

/// A Solana public key that serializes as a base58 string.
#[derive(Default, Clone, PartialEq, Eq, Hash, Copy)]
pub struct SerializablePubkey(pub Pubkey);

impl SerializablePubkey {
    pub fn to_bytes_vec(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn new_unique() -> Self {
        SerializablePubkey(Pubkey::new_unique())
    }

    /// Token-2022 stores optional keys as 32 bytes where all zeros means "none".
    pub fn from_nonzero_bytes(bytes: [u8; 32]) -> Option<Self> {
        if bytes == [0u8; 32] {
            None
        } else {
            Some(SerializablePubkey::from(bytes))
        }
    }
}

impl TryFrom<&str> for SerializablePubkey {
    type Error = ParsePubkeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(SerializablePubkey(Pubkey::from_str(value)?))
    }
}

impl fmt::Display for SerializablePubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl fmt::Debug for SerializablePubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializablePubkey({})", self.0)
    }
}

impl From<Pubkey> for SerializablePubkey {
    fn from(pubkey: Pubkey) -> Self {
        SerializablePubkey(pubkey)
    }
}

impl From<&Pubkey> for SerializablePubkey {
    fn from(pubkey: &Pubkey) -> Self {
        SerializablePubkey(*pubkey)
    }
}

impl From<[u8; 32]> for SerializablePubkey {
    fn from(bytes: [u8; 32]) -> Self {
        SerializablePubkey(Pubkey::from(bytes))
    }
}

impl From<SerializablePubkey> for Pubkey {
    fn from(val: SerializablePubkey) -> Self {
        val.0
    }
}

impl From<SerializablePubkey> for String {
    fn from(val: SerializablePubkey) -> Self {
        val.0.to_string()
    }
}

struct Base58Visitor;

impl<'de> Visitor<'de> for Base58Visitor {
    type Value = SerializablePubkey;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a base58 encoded string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        SerializablePubkey::try_from(value).map_err(|e| E::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for SerializablePubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(Base58Visitor)
    }
}

impl Serialize for SerializablePubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let base58_string = bs58::encode(self.0).into_string();
        serializer.serialize_str(&base58_string)
    }
}

#[test]
fn test_serialization() {
    let key = SerializablePubkey(Pubkey::new_unique());
    let serialized = serde_json::to_string(&key).unwrap();
    let deserialized: SerializablePubkey = serde_json::from_str(&serialized).unwrap();
    assert_eq!(key, deserialized);
}

#[test]
fn test_zero_bytes_are_none() {
    assert_eq!(SerializablePubkey::from_nonzero_bytes([0u8; 32]), None);
    assert!(SerializablePubkey::from_nonzero_bytes([7u8; 32]).is_some());
}
