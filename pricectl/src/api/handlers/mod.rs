//! Axum route handlers.
//!
//! - [`pricing`]: the pricing page, recommendations and the model ratio reset
//! - [`options`]: administrative updates of the ratio options
//!
//! Callers are identified by the [`Identity`](crate::types::Identity) and
//! [`AdminUser`](crate::auth::AdminUser) extractors.

pub mod options;
pub mod pricing;
