//! Service counters, recorded through the `metrics` facade.
//!
//! They are exported on `/internal/metrics` when `enable_metrics` is set. Without an installed
//! recorder every call here is a no-op.

use metrics::counter;

use crate::ratios::OptionKey;

/// One pricing response served, labelled by identity kind (`known` or `anonymous`)
pub fn record_pricing_request(identity: &'static str) {
    counter!("pricectl_pricing_requests_total", "identity" => identity).increment(1);
}

/// One model ratio reset attempt
pub fn record_model_ratio_reset(outcome: &'static str) {
    counter!("pricectl_model_ratio_resets_total", "outcome" => outcome).increment(1);
}

/// One administrative option update attempt
pub fn record_option_update(key: OptionKey, outcome: &'static str) {
    counter!("pricectl_option_updates_total", "key" => key.as_str(), "outcome" => outcome).increment(1);
}
