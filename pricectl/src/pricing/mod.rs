//! The pricing page: a configured catalog combined with per-requester group ratios.

pub mod catalog;
pub mod view;

pub use catalog::{Catalog, Recommendation};
pub use view::{PricingEntry, PricingPage, PricingView};
