//! OpenAPI documentation, rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;
use crate::config::AuthConfig;
use crate::errors::ErrorBody;
use crate::pricing::catalog::{EndpointInfo, Vendor};
use crate::pricing::{PricingEntry, PricingPage, Recommendation};
use crate::ratios::OptionKey;

/// Documents the identity header set by the upstream auth proxy.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let header = AuthConfig::default().user_id_header;
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "UserIdHeader".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    header.clone(),
                    format!(
                        "Numeric id of the logged-in user, set by the auth proxy in front of this service:\n\n\
                        ```\n{header}: 42\n```\n\n\
                        The header name is configurable through `auth.user_id_header`."
                    ),
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pricectl",
        description = "Group ratios and model pricing for a multi-tenant LLM gateway."
    ),
    paths(
        api::handlers::pricing::get_pricing,
        api::handlers::pricing::reset_model_ratio,
        api::handlers::pricing::get_recommendations,
        api::handlers::options::update_option,
    ),
    components(schemas(
        api::models::pricing::PricingResponse,
        api::models::pricing::RecommendResponse,
        api::models::options::OptionUpdate,
        api::models::responses::MessageResponse,
        PricingPage,
        PricingEntry,
        Vendor,
        EndpointInfo,
        Recommendation,
        OptionKey,
        ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "pricing", description = "Pricing page and model ratio reset"),
        (name = "options", description = "Administrative ratio option updates"),
    )
)]
pub struct ApiDoc;
