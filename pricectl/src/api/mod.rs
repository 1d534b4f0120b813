//! HTTP API: route handlers and their request/response models.
//!
//! - **Pricing** (`/pricing`, `/pricing/recommend`): public, resolved per caller
//! - **Administration** (`/pricing/reset-model-ratio`, `/option`): `admin` or `root` only
//!
//! Every endpoint is documented with `utoipa`; the rendered docs are served at `/docs`.

pub mod handlers;
pub mod models;
