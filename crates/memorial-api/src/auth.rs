use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::{SignedCookieJar, WithRejection};
use tracing::{error, info, warn};

use memorial_types::api::{LoginRequest, MessageResponse, StatusResponse};
use memorial_types::models::SessionData;

use crate::error::ApiError;
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Hashes a password with Argon2id and a random salt into a PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Checks a password against a PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        error!("Stored admin password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// POST /api/admin/login
///
/// Every attempt counts against the login limiter. Unknown usernames still
/// pay for a hash verification so both failure modes look the same.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: SignedCookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.login_limiter.allow(&ip) {
        warn!("Login rate limit hit for {}", ip);
        return Err(ApiError::RateLimited(
            "Too many login attempts from this IP, please try again after 15 minutes.",
        ));
    }

    let (Some(username), Some(password)) = (
        req.username.filter(|u| !u.is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Username and password are required".into()));
    };

    let username_ok = username == state.config.admin_username;
    let hash = state.config.admin_password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::storage("Login failed", e))?;

    if !(username_ok && password_ok) {
        warn!("Failed admin login from {}", ip);
        return Err(ApiError::InvalidCredentials);
    }

    // Never reuse a pre-login session id.
    state
        .sessions
        .destroy_from(&jar)
        .await
        .map_err(|e| ApiError::storage("Login failed", e))?;

    let (_, jar) = state
        .sessions
        .create(
            jar,
            SessionData {
                is_admin: true,
                username: Some(username),
            },
        )
        .await
        .map_err(|e| ApiError::storage("Login failed", e))?;

    info!("Admin logged in from {}", ip);
    Ok((jar, Json(MessageResponse::ok("Login successful"))))
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sessions
        .destroy_from(&jar)
        .await
        .map_err(|e| ApiError::storage("Logout failed", e))?;

    Ok((state.sessions.clear(jar), Json(MessageResponse::ok("Logged out"))))
}

/// GET /api/admin/status
pub async fn status(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<StatusResponse>, ApiError> {
    let session = state
        .sessions
        .load(&jar)
        .await
        .map_err(|e| ApiError::storage("Failed to check session", e))?;

    Ok(Json(StatusResponse {
        is_authenticated: session.is_some_and(|s| s.is_admin()),
    }))
}
