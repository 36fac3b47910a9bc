use crate::err::{ErrorKind, MonitorError};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

pub const PUBKEY_LEN: usize = 32;

/// A ledger address. The all-zero key is the ledger's "unset" value.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct Pubkey([u8; PUBKEY_LEN]);

impl Pubkey {
    pub const fn new(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBKEY_LEN] {
        self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0 == [0u8; PUBKEY_LEN]
    }

    /// `None` for the all-zero key.
    pub fn non_default(self) -> Option<Self> {
        if self.is_unset() { None } else { Some(self) }
    }
}

impl From<[u8; PUBKEY_LEN]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = MonitorError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; PUBKEY_LEN] = bytes.try_into().map_err(|_| {
            monitor_error!(
                ErrorKind::Decode,
                "expected {} address bytes, got {}",
                PUBKEY_LEN,
                bytes.len()
            )
        })?;
        Ok(Self(arr))
    }
}

impl FromStr for Pubkey {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s).into_vec().map_err(|e| {
            monitor_error_with_source!(ErrorKind::Decode, e, "invalid base58 address '{}'", s)
        })?;
        Pubkey::try_from(bytes.as_slice())
    }
}

impl Display for Pubkey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl Debug for Pubkey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_round_trip_of_a_known_program_id() {
        let id = "nosJhNRqr2bc9g1nfGDcXXTXvYUmxD4cVwy2pMWhrYM";
        let key = Pubkey::from_str(id).expect("valid program id");
        assert_eq!(key.to_string(), id);
        assert!(!key.is_unset());
    }

    #[test]
    fn zero_key_is_unset_and_renders_as_ones() {
        let key = Pubkey::default();
        assert!(key.is_unset());
        assert_eq!(key.non_default(), None);
        assert_eq!(key.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn rejects_wrong_length_and_bad_alphabet() {
        let short = Pubkey::from_str("3yZe7d").unwrap_err();
        assert_eq!(short.kind(), ErrorKind::Decode);
        let bad = Pubkey::from_str("0OIl").unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::Decode);
    }

    #[test]
    fn serde_uses_base58_strings() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            key: Pubkey,
        }
        let w = Wrapper {
            key: Pubkey::new([1u8; 32]),
        };
        let s = toml::to_string(&w).unwrap();
        assert!(s.contains("4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi"), "{}", s);
        let back: Wrapper = toml::from_str(&s).unwrap();
        assert_eq!(back.key, w.key);
    }
}
