use axum::{
    Extension,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use placement_types::api::Claims;
use placement_types::models::Role;

use crate::{ApiError, AppState};

/// Validate the bearer JWT in `headers` and return its claims.
pub fn bearer_claims(secret: &str, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::unauthorized("invalid or expired token"))
}

/// Authenticate the request and expose its claims to handlers as an
/// `Extension<Claims>`. The account is re-read on every request so a block
/// or deletion takes effect without waiting for the token to expire.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state.jwt_secret, req.headers())?;

    let user_id = claims.sub;
    let user = state
        .run(move |db| Ok(db.get_user_by_id(user_id)?))
        .await?
        .ok_or_else(|| ApiError::unauthorized("account no longer exists"))?;
    if user.is_blocked || !user.is_active {
        return Err(ApiError::forbidden("your account has been blocked by an admin"));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn require_admin(
    Extension(claims): Extension<Claims>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(&claims, Role::Admin)?;
    Ok(next.run(req).await)
}

pub async fn require_student(
    Extension(claims): Extension<Claims>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(&claims, Role::Student)?;
    Ok(next.run(req).await)
}

fn require_role(claims: &Claims, role: Role) -> Result<(), ApiError> {
    if claims.role != role {
        return Err(ApiError::forbidden(format!("{} access required", role.as_str())));
    }
    Ok(())
}
