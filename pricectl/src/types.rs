//! Common type definitions shared across layers.
//!
//! - [`UserId`]: gateway user identifier
//! - [`Role`]: coarse role used to gate administrative routes
//! - [`CurrentUser`]: a caller whose identity was resolved
//! - [`Identity`]: the explicit "known or anonymous" caller type that flows through resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

pub type UserId = i64;

/// Role of a gateway user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Common,
    Admin,
    Root,
}

impl Role {
    /// Whether this role may run administrative operations (resets, option updates)
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Root)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Common => "common",
            Role::Admin => "admin",
            Role::Root => "root",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Role::Common),
            "admin" => Ok(Role::Admin),
            "root" => Ok(Role::Root),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller whose identity was resolved against the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    /// Pricing group the user belongs to (may be empty)
    pub group: String,
    pub role: Role,
}

/// Who is asking.
///
/// Every failure to resolve a caller (missing header, malformed id, unknown user, directory
/// error) ends up as [`Identity::Anonymous`]. Resolution code matches on this type instead of
/// handling lookup errors itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Known(CurrentUser),
}

impl Identity {
    /// The requester group, if the caller is known and has one.
    ///
    /// An empty group counts as no group, so such users are priced like anonymous callers.
    pub fn group(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::Known(user) if user.group.is_empty() => None,
            Identity::Known(user) => Some(user.group.as_str()),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Anonymous => "anonymous",
            Identity::Known(_) => "known",
        }
    }
}
