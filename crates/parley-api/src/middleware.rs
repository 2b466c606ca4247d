use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use parley_types::api::Claims;

use crate::AppState;

/// Verify the bearer token and attach the caller's `UserId` to the request.
/// Handlers trust that id without further checks.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    let caller = token_data.claims.user_id().ok_or_else(|| {
        debug!("Token subject '{}' is not a user id", token_data.claims.sub);
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
