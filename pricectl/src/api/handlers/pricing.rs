//! HTTP handlers for the pricing page.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        pricing::{PricingResponse, RecommendResponse},
        responses::MessageResponse,
    },
    auth::AdminUser,
    errors::{ErrorBody, Result},
    metrics,
    types::Identity,
};

#[utoipa::path(
    get,
    path = "/pricing",
    tag = "pricing",
    summary = "Get pricing",
    description = "Catalog with model ratios, plus the group ratios and usable groups resolved for the caller. \
                   Callers without a valid identity see the anonymous view.",
    responses(
        (status = 200, description = "Pricing resolved for the caller", body = PricingResponse),
    ),
    security(
        (),
        ("UserIdHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(identity = identity.kind()))]
pub async fn get_pricing(State(state): State<AppState>, identity: Identity) -> Json<PricingResponse> {
    metrics::record_pricing_request(identity.kind());
    Json(state.pricing.assemble(&identity).into())
}

#[utoipa::path(
    post,
    path = "/pricing/reset-model-ratio",
    tag = "pricing",
    summary = "Reset model ratios",
    description = "Persist the compiled-in default model ratios, then make them live. \
                   If persisting fails or times out the live ratios are left unchanged and `success` is false.",
    responses(
        (status = 200, description = "Outcome of the reset; check `success`", body = MessageResponse),
        (status = 401, description = "No valid identity", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody),
    ),
    security(
        ("UserIdHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = admin.0.id))]
pub async fn reset_model_ratio(State(state): State<AppState>, admin: AdminUser) -> Result<Json<MessageResponse>> {
    state.reset.reset_model_ratio_to_default().await?;
    Ok(Json(MessageResponse::ok("Model ratios reset to default")))
}

#[utoipa::path(
    get,
    path = "/pricing/recommend",
    tag = "pricing",
    summary = "Get recommended models",
    responses(
        (status = 200, description = "Curated model suggestions", body = RecommendResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_recommendations(State(state): State<AppState>) -> Json<RecommendResponse> {
    Json(RecommendResponse {
        success: true,
        data: state.recommendations.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use crate::db::options::OptionStore;
    use crate::ratios::defaults;
    use crate::test_utils::{
        ADMIN_ID, COMMON_ID, FlakyOptionStore, IDENTITY_HEADER, VIP_ID, add_identity_header, create_test_app, create_test_app_with_options,
        create_test_config,
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_anonymous_pricing_shows_public_groups() {
        let app = create_test_app().await;

        let response = app.get("/pricing").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["group_ratio"], json!({"default": 1.0, "vip": 1.0}));
        assert_eq!(body["usable_group"]["default"], json!("Default group"));
        assert!(body["usable_group"].get("svip").is_none());
        assert_eq!(body["auto_groups"], json!(["default"]));

        let gpt = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["model_name"] == "gpt-4o")
            .unwrap();
        assert_eq!(gpt["quota_type"], json!(0));
        assert_eq!(gpt["model_ratio"], json!(1.25));
    }

    #[tokio::test]
    async fn test_known_caller_sees_overrides() {
        let app = create_test_app().await;

        let (name, value) = add_identity_header(VIP_ID);
        let response = app.get("/pricing").add_header(name, value).await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        // vip -> default is overridden in the test config
        assert_eq!(body["group_ratio"]["default"], json!(0.5));
        assert_eq!(body["group_ratio"]["vip"], json!(1.0));
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_identity_is_anonymous() {
        let app = create_test_app().await;
        let anonymous: Value = app.get("/pricing").await.json();

        for header in ["999", "not-a-number"] {
            let response = app.get("/pricing").add_header(IDENTITY_HEADER, header).await;
            response.assert_status(StatusCode::OK);
            let body: Value = response.json();
            assert_eq!(body["group_ratio"], anonymous["group_ratio"], "header {header}");
        }
    }

    #[tokio::test]
    async fn test_reset_requires_admin() {
        let app = create_test_app().await;

        app.post("/pricing/reset-model-ratio")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let (name, value) = add_identity_header(COMMON_ID);
        let response = app.post("/pricing/reset-model-ratio").add_header(name, value).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["success"], json!(false));
    }

    #[tokio::test]
    async fn test_reset_persists_and_applies_defaults() {
        let mut config = create_test_config();
        config.ratios.model_ratios = [("gpt-4o".to_string(), 9.0)].into_iter().collect();
        let options = Arc::new(FlakyOptionStore::new());
        let app = create_test_app_with_options(config, options.clone()).await;

        let before: Value = app.get("/pricing").await.json();
        assert_eq!(before["data"][0]["model_ratio"], json!(9.0));

        let (name, value) = add_identity_header(ADMIN_ID);
        let response = app.post("/pricing/reset-model-ratio").add_header(name, value).await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>()["success"], json!(true));

        let persisted = options.get("ModelRatio").await.unwrap().unwrap();
        assert_eq!(persisted, defaults::default_model_ratio_json().unwrap());

        let after: Value = app.get("/pricing").await.json();
        assert_eq!(after["data"][0]["model_ratio"], json!(1.25));
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_reset_reports_failure_and_keeps_ratios() {
        let mut config = create_test_config();
        config.ratios.model_ratios = [("gpt-4o".to_string(), 9.0)].into_iter().collect();
        let options = Arc::new(FlakyOptionStore::new());
        options.fail_writes(true);
        let app = create_test_app_with_options(config, options).await;

        let (name, value) = add_identity_header(ADMIN_ID);
        let response = app.post("/pricing/reset-model-ratio").add_header(name, value).await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("ModelRatio"));

        let after: Value = app.get("/pricing").await.json();
        assert_eq!(after["data"][0]["model_ratio"], json!(9.0));
    }

    #[tokio::test]
    async fn test_slow_reset_times_out() {
        let mut config = create_test_config();
        config.ratios.option_write_timeout = Duration::from_millis(50);
        let options = Arc::new(FlakyOptionStore::new());
        options.delay_writes(Duration::from_secs(5));
        let app = create_test_app_with_options(config, options).await;

        let (name, value) = add_identity_header(ADMIN_ID);
        let response = app.post("/pricing/reset-model-ratio").add_header(name, value).await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_recommendations() {
        let app = create_test_app().await;

        let response = app.get("/pricing/recommend").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"][0]["model"], json!("gemini-2.5-pro"));
        assert!(body["data"][0].get("modelLogo").is_some());
    }
}
