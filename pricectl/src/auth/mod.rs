//! Caller identification.
//!
//! Authentication happens upstream: an auth proxy in front of this service sets a header
//! (default `x-pricectl-user-id`) to the numeric id of the logged-in user. This module turns
//! that header into an [`Identity`](crate::types::Identity):
//!
//! - extracting `Identity` never rejects; every failure resolves to `Anonymous`
//! - extracting [`AdminUser`](identity::AdminUser) rejects with 401 or 403 unless the caller is
//!   a known `admin` or `root` user
//!
//! User lookups go through [`CachedUserDirectory`](crate::db::users::CachedUserDirectory).

pub mod identity;

pub use identity::AdminUser;
