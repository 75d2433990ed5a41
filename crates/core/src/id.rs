//! Strongly-typed identifiers used across the engine.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Stock keeping unit: the unique, immutable identity of an item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

/// Identifier of a warehouse (the partitioning/query dimension for items and logs).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WarehouseId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal, $max_len:expr) => {
        impl $t {
            /// Maximum accepted length (matches the persisted column width).
            pub const MAX_LEN: usize = $max_len;

            /// Validate and wrap an identifier. Surrounding whitespace is trimmed.
            pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: cannot be empty", $name)));
                }
                if trimmed.chars().count() > Self::MAX_LEN {
                    return Err(DomainError::invalid_id(format!(
                        "{}: longer than {} characters",
                        $name,
                        Self::MAX_LEN
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_newtype!(Sku, "Sku", 50);
impl_string_newtype!(WarehouseId, "WarehouseId", 20);

/// Sequence id of an audit log entry, assigned by the log on append.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntryId(u64);

impl LogEntryId {
    pub const MIN: LogEntryId = LogEntryId(0);
    pub const MAX: LogEntryId = LogEntryId(u64::MAX);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_is_trimmed() {
        let sku = Sku::new("  SKU-001 ").unwrap();
        assert_eq!(sku.as_str(), "SKU-001");
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert!(matches!(Sku::new("   "), Err(DomainError::InvalidId(_))));
        assert!(matches!("".parse::<WarehouseId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn overlong_warehouse_id_is_rejected() {
        let long = "W".repeat(WarehouseId::MAX_LEN + 1);
        assert!(WarehouseId::new(&long).is_err());
        assert!(WarehouseId::new(&long[1..]).is_ok());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: Sku = serde_json::from_str("\"SKU-002\"").unwrap();
        assert_eq!(ok.to_string(), "SKU-002");
        assert!(serde_json::from_str::<Sku>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"SKU-002\"");
    }
}
