//! Record identifiers
//!
//! Sequential `u64` newtypes allocated by the store. They serialize as plain
//! integers so boundary payloads stay `{"id": 7}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw integer value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a registered dataset.
    DatasetId
);

record_id!(
    /// Identifier of a pipeline run.
    RunId
);

record_id!(
    /// Identifier of a run step.
    StepId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_integer() {
        assert_eq!(RunId(42).to_string(), "42");
        assert_eq!(format!("run_{}", RunId(7)), "run_7");
    }

    #[test]
    fn test_serializes_transparently() {
        let json = serde_json::to_string(&DatasetId(3)).unwrap();
        assert_eq!(json, "3");
        let back: DatasetId = serde_json::from_str("3").unwrap();
        assert_eq!(back, DatasetId(3));
    }

    #[test]
    fn test_parse() {
        assert_eq!(" 12 ".parse::<RunId>().unwrap(), RunId(12));
        assert!("abc".parse::<RunId>().is_err());
    }
}
