//! HTTP handlers for ratio option updates.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    AppState,
    api::models::{options::OptionUpdate, responses::MessageResponse},
    auth::AdminUser,
    errors::{ErrorBody, Result},
    ratios::OptionKey,
};

#[utoipa::path(
    put,
    path = "/option",
    tag = "options",
    summary = "Update a ratio option",
    description = "Validate the value, persist its canonical form, then make it live. \
                   A malformed body, an unknown key, an invalid value or a failed persist is reported with \
                   `success: false` and leaves the live tables unchanged.",
    request_body = OptionUpdate,
    responses(
        (status = 200, description = "Outcome of the update; check `success`", body = MessageResponse),
        (status = 401, description = "No valid identity", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody),
    ),
    security(
        ("UserIdHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = admin.0.id, key = tracing::field::Empty))]
pub async fn update_option(
    State(state): State<AppState>,
    admin: AdminUser,
    body: std::result::Result<Json<OptionUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(update) = body?;
    tracing::Span::current().record("key", update.key.as_str());
    let key: OptionKey = update.key.parse()?;
    state.options.update_option(key, &update.value).await?;
    Ok(Json(MessageResponse::ok(format!("{key} updated"))))
}

#[cfg(test)]
mod tests {
    use crate::db::options::OptionStore;
    use crate::test_utils::{ADMIN_ID, COMMON_ID, FlakyOptionStore, VIP_ID, add_identity_header, create_test_app, create_test_app_with_options, create_test_config};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn update(key: &str, value: &str) -> Value {
        json!({"key": key, "value": value})
    }

    #[tokio::test]
    async fn test_group_ratio_update_is_live() {
        let options = Arc::new(FlakyOptionStore::new());
        let app = create_test_app_with_options(create_test_config(), options.clone()).await;

        let (name, value) = add_identity_header(ADMIN_ID);
        let response = app
            .put("/option")
            .add_header(name, value)
            .json(&update("GroupRatio", r#"{ "vip": 0.8, "default": 2 }"#))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>()["success"], json!(true));

        // Canonical form is persisted, not the raw input
        let persisted = options.get("GroupRatio").await.unwrap().unwrap();
        assert_eq!(persisted, r#"{"default":2.0,"vip":0.8}"#);

        let body: Value = app.get("/pricing").await.json();
        assert_eq!(body["group_ratio"], json!({"default": 2.0, "vip": 0.8}));
    }

    #[tokio::test]
    async fn test_override_update_applies_to_requester_group() {
        let app = create_test_app().await;

        let (name, value) = add_identity_header(ADMIN_ID);
        app.put("/option")
            .add_header(name, value)
            .json(&update("GroupGroupRatio", r#"{"vip":{"vip":0.25}}"#))
            .await
            .assert_status(StatusCode::OK);

        let (name, value) = add_identity_header(VIP_ID);
        let body: Value = app.get("/pricing").add_header(name, value).await.json();
        assert_eq!(body["group_ratio"]["vip"], json!(0.25));
        // Replacing the matrix drops the old vip -> default override
        assert_eq!(body["group_ratio"]["default"], json!(1.0));
    }

    #[tokio::test]
    async fn test_usable_groups_update_changes_visibility() {
        let app = create_test_app().await;

        let (name, value) = add_identity_header(ADMIN_ID);
        app.put("/option")
            .add_header(name, value)
            .json(&update("UserUsableGroups", r#"{"svip":"Super VIP"}"#))
            .await
            .assert_status(StatusCode::OK);

        let body: Value = app.get("/pricing").await.json();
        assert_eq!(body["group_ratio"], json!({"default": 1.0, "svip": 1.0}));
    }

    #[tokio::test]
    async fn test_rejected_updates_report_failure() {
        let app = create_test_app().await;
        let before: Value = app.get("/pricing").await.json();

        for (key, value, expected) in [
            ("Theme", "{}", "Unknown option key 'Theme'"),
            ("GroupRatio", "not json", "GroupRatio is not valid JSON"),
            ("GroupRatio", r#"{"vip":-1}"#, "must be a finite, non-negative number"),
        ] {
            let (name, header) = add_identity_header(ADMIN_ID);
            let response = app.put("/option").add_header(name, header).json(&update(key, value)).await;

            response.assert_status(StatusCode::OK);
            let body: Value = response.json();
            assert_eq!(body["success"], json!(false));
            assert!(body["message"].as_str().unwrap().contains(expected), "{body}");
        }

        let after: Value = app.get("/pricing").await.json();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_malformed_body_reports_failure() {
        let app = create_test_app().await;

        let (name, header) = add_identity_header(ADMIN_ID);
        let response = app
            .put("/option")
            .add_header(name, header)
            .json(&json!({"key": "GroupRatio"}))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid request body"), "{message}");
        assert!(message.contains("value"), "{message}");

        let (name, header) = add_identity_header(ADMIN_ID);
        let response = app.put("/option").add_header(name, header).text("GroupRatio=3").await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>()["success"], json!(false));
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_persist_keeps_live_tables() {
        let options = Arc::new(FlakyOptionStore::new());
        options.fail_writes(true);
        let app = create_test_app_with_options(create_test_config(), options.clone()).await;

        let (name, value) = add_identity_header(ADMIN_ID);
        let response = app
            .put("/option")
            .add_header(name, value)
            .json(&update("GroupRatio", r#"{"default":3}"#))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>()["success"], json!(false));
        assert_eq!(options.get("GroupRatio").await.unwrap(), None);

        let body: Value = app.get("/pricing").await.json();
        assert_eq!(body["group_ratio"]["default"], json!(1.0));
    }

    #[tokio::test]
    async fn test_update_requires_admin() {
        let app = create_test_app().await;

        app.put("/option")
            .json(&update("GroupRatio", r#"{"default":3}"#))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let (name, value) = add_identity_header(COMMON_ID);
        app.put("/option")
            .add_header(name, value)
            .json(&update("GroupRatio", r#"{"default":3}"#))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
