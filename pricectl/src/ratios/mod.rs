//! Group and model ratio state, and the algorithms that read and reset it.
//!
//! # Modules
//!
//! - [`tables`]: table types, JSON parsing, validation and canonical encoding
//! - [`defaults`]: compiled-in default tables
//! - [`store`]: [`RatioStore`], the owned in-memory mirror with snapshot reads
//! - [`visibility`]: [`GroupVisibilityPolicy`], which groups a requester may see
//! - [`resolver`]: [`RatioResolver`], the per-requester effective group ratios
//! - [`reset`]: resetting the model ratios to the compiled-in default
//! - [`sync`]: loading persisted options at startup and applying admin updates
//!
//! # Consistency
//!
//! The option store is the source of truth and [`RatioStore`] mirrors it. Every writer follows
//! the same order under [`RatioStore::lock_writes`]:
//!
//! 1. parse and validate the new value,
//! 2. persist it,
//! 3. swap the already-parsed value into the mirror.
//!
//! Step 3 cannot fail, so a successful persist is always followed by a matching mirror.

pub mod defaults;
pub mod reset;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod tables;
pub mod visibility;

pub use resolver::{RatioResolver, Resolution};
pub use store::RatioStore;
pub use visibility::{ConfiguredVisibilityPolicy, GroupVisibilityPolicy, UsableGroups};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Option keys this service owns in the option store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OptionKey {
    ModelRatio,
    GroupRatio,
    GroupGroupRatio,
    UserUsableGroups,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [
        OptionKey::ModelRatio,
        OptionKey::GroupRatio,
        OptionKey::GroupGroupRatio,
        OptionKey::UserUsableGroups,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::ModelRatio => "ModelRatio",
            OptionKey::GroupRatio => "GroupRatio",
            OptionKey::GroupGroupRatio => "GroupGroupRatio",
            OptionKey::UserUsableGroups => "UserUsableGroups",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OptionKey {
    type Err = RatioError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        OptionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| RatioError::UnknownKey(s.to_string()))
    }
}

/// Errors from parsing, validating or encoding ratio options
#[derive(Error, Debug)]
pub enum RatioError {
    #[error("{key} is not valid JSON of the expected shape: {source}")]
    InvalidJson {
        key: OptionKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("{key}: ratio for '{name}' must be a finite, non-negative number (got {value})")]
    InvalidRatio { key: OptionKey, name: String, value: f64 },

    #[error("{key}: group and model names must not be empty")]
    EmptyName { key: OptionKey },

    #[error("Unknown option key '{0}'")]
    UnknownKey(String),

    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: OptionKey,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RatioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_key_parses_known_keys_only() {
        for key in OptionKey::ALL {
            assert_eq!(key.as_str().parse::<OptionKey>().unwrap(), key);
        }
        let err = "CompletionRatio".parse::<OptionKey>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown option key 'CompletionRatio'");
    }
}
