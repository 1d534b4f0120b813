//! Request and response bodies.
//!
//! All responses carry a `success` flag. Declared failures of administrative writes (invalid
//! value, failed or timed-out persist) are reported as `200` with `success: false` and a
//! message, so clients must check the flag rather than the status alone.

pub mod options;
pub mod pricing;
pub mod responses;
