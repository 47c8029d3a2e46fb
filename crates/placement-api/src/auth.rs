use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};

use placement_db::Database;
use placement_db::queries::students;
use placement_engine::accounts;
use placement_types::api::{
    Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    RegisterResponse, ResetPasswordRequest,
};
use placement_types::models::Role;

use crate::middleware::bearer_claims;
use crate::{ApiError, AppState};

const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!("Password hashing failed: {}", e);
            ApiError::Internal
        })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn create_token(secret: &str, user_id: i64, role: Role, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Create the bootstrap admin unless that email is already registered.
/// Returns whether an account was created.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> Result<bool, ApiError> {
    check_password(password)?;
    let email = accounts::normalize_email(email);
    if db.get_user_by_email(&email).map_err(placement_engine::EngineError::from)?.is_some() {
        return Ok(false);
    }
    let hash = hash_password(password)?;
    let id = accounts::register_user(db, &email, &hash, Role::Admin)?;
    info!(user_id = id, email = %email, "Seeded bootstrap admin");
    Ok(true)
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// POST /api/auth/register
///
/// Open for student accounts. Creating an admin needs an admin's bearer token.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.role == Role::Admin {
        let caller = bearer_claims(&state.jwt_secret, &headers).ok();
        if !caller.is_some_and(|claims| claims.role == Role::Admin) {
            return Err(ApiError::forbidden(
                "admin accounts can only be created by an admin",
            ));
        }
    }
    check_password(&req.password)?;
    let password_hash = hash_password(&req.password)?;

    let user_id = state
        .run(move |db| accounts::register_user(db, &req.email, &password_hash, req.role))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user_id,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = accounts::normalize_email(&req.email);
    let user = state
        .run(move |db| Ok(db.get_user_by_email(&email)?))
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::unauthorized("invalid email or password"));
    }
    if user.is_blocked || !user.is_active {
        return Err(ApiError::forbidden("your account has been blocked by an admin"));
    }

    let user_id = user.id;
    if let Err(e) = state
        .run(move |db| Ok(db.with_conn(|conn| students::touch_last_login(conn, user_id))?))
        .await
    {
        warn!(user_id, "Failed to stamp last_login: {}", e);
    }

    let token = create_token(&state.jwt_secret, user.id, user.role, state.token_ttl).map_err(|e| {
        warn!("Token creation failed: {}", e);
        ApiError::Internal
    })?;

    info!(user_id = user.id, role = user.role.as_str(), "Login");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        role: user.role,
        email: user.email,
    }))
}

/// POST /api/auth/forgot-password
///
/// Stores a fresh code and hands delivery to the notification queue; the
/// response does not wait for delivery.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = accounts::normalize_email(&req.email);
    let ttl = state.reset_code_ttl;
    let address = email.clone();
    let code = state
        .run(move |db| accounts::issue_reset_code(db, &address, ttl))
        .await?;

    state.notifications.enqueue(&email, &code);
    Ok(Json(MessageResponse::new("OTP sent to your email")))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    check_password(&req.new_password)?;
    let password_hash = hash_password(&req.new_password)?;

    state
        .run(move |db| accounts::reset_password(db, &req.email, &req.otp, &password_hash))
        .await?;

    Ok(Json(MessageResponse::new(
        "Password updated successfully. Please login.",
    )))
}

/// POST /api/auth/logout. Tokens are stateless; the client discards its copy.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}
