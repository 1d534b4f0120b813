use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `PUT /option`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OptionUpdate {
    /// One of `ModelRatio`, `GroupRatio`, `GroupGroupRatio`, `UserUsableGroups`
    #[schema(example = "GroupRatio")]
    pub key: String,
    /// JSON-encoded table for the key
    #[schema(example = r#"{"default":1,"vip":0.8}"#)]
    pub value: String,
}
