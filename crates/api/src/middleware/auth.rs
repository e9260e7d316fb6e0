//! Admin bearer token extractor for the restart endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ttsd_core::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the caller presented the configured admin bearer token.
///
/// Use this as an extractor parameter in any handler on the restart admin
/// surface:
///
/// ```ignore
/// async fn my_handler(_admin: AdminToken) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
///
/// When no `ADMIN_TOKEN` is configured the extractor allows every request;
/// `main` warns about that at startup. The token authenticates the caller
/// for auditing, nothing more -- the coordinator takes `requesting_user`
/// from the request body at face value.
#[derive(Debug, Clone)]
pub struct AdminToken;

impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Ok(AdminToken);
        };

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        if token != expected {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid admin token".into(),
            )));
        }

        Ok(AdminToken)
    }
}
