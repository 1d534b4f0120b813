use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace, warn};

use crate::{
    AppState,
    db::users::UserDirectory,
    errors::{Error, Result},
    types::{CurrentUser, Identity, UserId},
};

/// Read the numeric user id from the identity header.
/// Returns:
/// - None: header not present
/// - Some(Ok(id)): header present and parsed
/// - Some(Err(reason)): header present but not a valid id
fn try_user_id_header(parts: &Parts, header_name: &str) -> Option<std::result::Result<UserId, String>> {
    let value = parts.headers.get(header_name)?;
    let parsed = value
        .to_str()
        .map_err(|e| format!("not valid UTF-8: {e}"))
        .and_then(|s| s.trim().parse::<UserId>().map_err(|e| format!("'{s}' is not a user id: {e}")));
    Some(parsed)
}

/// Resolve the caller behind a request.
///
/// Never fails: a missing or malformed header, an unknown user and a directory error all
/// resolve to [`Identity::Anonymous`].
#[instrument(skip(parts, users))]
pub async fn resolve_identity(parts: &Parts, header_name: &str, users: &dyn UserDirectory) -> Identity {
    let user_id = match try_user_id_header(parts, header_name) {
        None => {
            trace!("No identity header present");
            return Identity::Anonymous;
        }
        Some(Err(reason)) => {
            debug!("Ignoring malformed identity header: {reason}");
            return Identity::Anonymous;
        }
        Some(Ok(id)) => id,
    };

    match users.get_user_by_id(user_id).await {
        Ok(Some(user)) => {
            trace!(user_id, group = %user.group, "Resolved caller");
            Identity::Known(user)
        }
        Ok(None) => {
            debug!(user_id, "Unknown user, treating caller as anonymous");
            Identity::Anonymous
        }
        Err(e) => {
            warn!(user_id, "User lookup failed, treating caller as anonymous: {e}");
            Identity::Anonymous
        }
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        Ok(resolve_identity(parts, &state.config.auth.user_id_header, state.users.as_ref()).await)
    }
}

/// A caller with the `admin` or `root` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match resolve_identity(parts, &state.config.auth.user_id_header, state.users.as_ref()).await {
            Identity::Known(user) if user.role.is_admin() => Ok(AdminUser(user)),
            Identity::Known(user) => {
                debug!(user_id = user.id, role = %user.role, "Non-admin caller on an administrative route");
                Err(Error::InsufficientPermissions {
                    action: "perform administrative operations".to_string(),
                })
            }
            Identity::Anonymous => Err(Error::Unauthenticated { message: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::db::users::InMemoryUserDirectory;
    use crate::test_utils::{create_test_state, test_user};
    use crate::types::Role;
    use async_trait::async_trait;

    const HEADER: &str = "x-pricectl-user-id";

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("http://localhost/pricing");
        if let Some(value) = value {
            builder = builder.header(HEADER, value);
        }
        let (parts, _body) = builder.body(()).unwrap().into_parts();
        parts
    }

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectory for BrokenDirectory {
        async fn get_user_by_id(&self, _id: UserId) -> crate::db::errors::Result<Option<CurrentUser>> {
            Err(DbError::Other(anyhow::anyhow!("directory offline")))
        }
    }

    #[tokio::test]
    async fn test_known_user_is_resolved() {
        let users = InMemoryUserDirectory::with_users([test_user(42, "vip", Role::Common)]);
        let identity = resolve_identity(&parts_with_header(Some(" 42 ")), HEADER, &users).await;
        assert_eq!(identity.group(), Some("vip"));
    }

    #[tokio::test]
    async fn test_every_failure_degrades_to_anonymous() {
        let users = InMemoryUserDirectory::with_users([test_user(42, "vip", Role::Common)]);

        for header in [None, Some("forty-two"), Some(""), Some("7")] {
            let identity = resolve_identity(&parts_with_header(header), HEADER, &users).await;
            assert_eq!(identity, Identity::Anonymous, "header {header:?}");
        }

        let identity = resolve_identity(&parts_with_header(Some("42")), HEADER, &BrokenDirectory).await;
        assert_eq!(identity, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_non_utf8_header_is_anonymous() {
        let users = InMemoryUserDirectory::with_users([test_user(42, "vip", Role::Common)]);
        let mut parts = parts_with_header(None);
        parts
            .headers
            .insert(HEADER, axum::http::HeaderValue::from_bytes(&[0x34, 0xff]).unwrap());

        assert_eq!(resolve_identity(&parts, HEADER, &users).await, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_admin_extractor() {
        let state = create_test_state(vec![test_user(1, "default", Role::Admin), test_user(2, "default", Role::Common)]).await;

        let mut parts = parts_with_header(Some("1"));
        let admin = AdminUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(admin.0.id, 1);

        let mut parts = parts_with_header(Some("2"));
        let err = AdminUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let mut parts = parts_with_header(None);
        let err = AdminUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }
}
