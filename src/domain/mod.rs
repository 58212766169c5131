use std::error::Error;
use std::fmt;

/// Error returned by every `FromStr` impl of the domain enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} '{}': expected one of {}",
            self.kind,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl Error for ParseEnumError {}

pub(crate) fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Wires `Display`, `Serialize` and `Deserialize` through `as_str`/`FromStr`
/// so the database, JSON output and CLI all share one spelling.
macro_rules! string_enum_impls {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                <$ty as std::str::FromStr>::from_str(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use string_enum_impls;

pub mod account;
pub mod doping;
pub mod status;
pub mod vehicle;
