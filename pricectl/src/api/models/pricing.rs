use serde::Serialize;
use utoipa::ToSchema;

use crate::pricing::{PricingPage, Recommendation};

/// `GET /pricing`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricingResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: PricingPage,
}

impl From<PricingPage> for PricingResponse {
    fn from(page: PricingPage) -> Self {
        Self { success: true, page }
    }
}

/// `GET /pricing/recommend`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendResponse {
    pub success: bool,
    pub data: Vec<Recommendation>,
}
