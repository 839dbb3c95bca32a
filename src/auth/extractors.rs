use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Resolves the authenticated principal for a request: a signed, unexpired
/// session token whose value still matches the one stored on the user row.
/// Logout clears the stored value, so an otherwise-valid JWT stops working
/// the moment its owner logs out.
pub struct CurrentUser(pub User);

const NOT_AUTHORIZED: &str = "Not authorized";

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired session token");
            (StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string())
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %claims.sub, "principal lookup failed");
                (StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string())
            })?
            .ok_or((StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string()))?;

        if user.token.as_deref() != Some(token) {
            warn!(user_id = %user.id, "session token no longer current");
            return Err((StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string()));
        }

        Ok(CurrentUser(user))
    }
}
