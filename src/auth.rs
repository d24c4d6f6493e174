use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError};

/// Fixed subject carried by every admin token.
pub const ADMIN_SUBJECT: &str = "admin";

/// Token validity window in seconds (one hour).
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claims
///
/// Payload of an admin session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): always `ADMIN_SUBJECT`.
    pub sub: String,
    pub username: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// check_credentials
///
/// Compares the submitted pair against the single configured admin identity.
/// Both fields must be present and non-empty.
pub fn check_credentials(
    config: &AppConfig,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<(), ApiError> {
    let (Some(username), Some(password)) = (
        username.filter(|u| !u.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("Username and password are required."));
    };

    if username == config.admin_username && password == config.admin_password {
        Ok(())
    } else {
        Err(ApiError::InvalidCredentials)
    }
}

/// issue_token
///
/// Signs a one-hour HS256 token for the admin.
pub fn issue_token(config: &AppConfig, username: &str) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        username: username.to_string(),
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// verify_token
///
/// Decodes and validates a raw token: signature, algorithm and expiry.
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // An expired token is rejected the second it expires.
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("token verification failed: {:?}", e.kind());
            ApiError::InvalidToken
        })
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::MissingToken)
}

/// AdminSession Extractor
///
/// The resolved claims of an authorized request. If the `require_admin`
/// layer already validated the token, the claims are read back from the
/// request extensions; otherwise the header is validated here.
///
/// Rejection: `ApiError::MissingToken` or `ApiError::InvalidToken` (401).
#[derive(Debug, Clone)]
pub struct AdminSession(pub Claims);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AdminSession(claims.clone()));
        }

        let config = AppConfig::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = verify_token(&config, token)?;
        Ok(AdminSession(claims))
    }
}

/// require_admin
///
/// Route layer for the admin router. Rejects the request before any path or
/// body parsing happens, and attaches the decoded claims to the request.
pub async fn require_admin(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let AdminSession(claims) = AdminSession::from_request_parts(&mut parts, &config).await?;
    tracing::debug!(user = %claims.username, "admin token accepted");

    parts.extensions.insert(claims);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
