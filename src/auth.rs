use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    error::{AppError, Result},
    models::{CreateUserRequest, LoginRequest, LoginResponse, Role, User},
    state::AppState,
};

/// Name of the cookie carrying the session token.
pub const AUTH_COOKIE: &str = "auth";

/// Tokens older than this are rejected.
const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

// ── Password hashing ───────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow::anyhow!("salt: {e}"))?;
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("hash_password: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("parse hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ── Session token ──────────────────────────────────────────────────────────────
// base64(user_id + ":" + timestamp + ":" + sig), sig = SHA256(secret ":" payload).

pub fn make_token(user_id: &str, secret: &str) -> String {
    make_token_at(user_id, secret, chrono::Utc::now().timestamp())
}

fn make_token_at(user_id: &str, secret: &str, issued_at: i64) -> String {
    let payload = format!("{user_id}:{issued_at}");
    let mac = keyed_sha256(secret, &payload);
    STANDARD.encode(format!("{payload}:{mac}"))
}

fn keyed_sha256(secret: &str, data: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(secret.as_bytes());
    h.update(b":");
    h.update(data.as_bytes());
    hex::encode(h.finalize())
}

/// Returns the user id if the token is well-formed, correctly signed and
/// not expired.
pub fn verify_token(token: &str, secret: &str) -> Option<String> {
    let decoded = STANDARD.decode(token).ok()?;
    let s = String::from_utf8(decoded).ok()?;
    let parts: Vec<&str> = s.splitn(3, ':').collect();
    if parts.len() != 3 {
        return None;
    }
    let (user_id, ts, sig) = (parts[0], parts[1], parts[2]);
    let payload = format!("{user_id}:{ts}");
    if !constant_time_eq(sig, &keyed_sha256(secret, &payload)) {
        return None;
    }
    let issued_at: i64 = ts.parse().ok()?;
    if chrono::Utc::now().timestamp() - issued_at > TOKEN_TTL_SECS {
        return None;
    }
    Some(user_id.to_string())
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// ── Handlers ───────────────────────────────────────────────────────────────────

/// POST /api/login
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    axum::Json(req): axum::Json<LoginRequest>,
) -> Result<(CookieJar, axum::Json<LoginResponse>)> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(req.username.trim())
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or(AppError::Unauthorized)?;

    let valid = verify_password(&req.password, &user.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        tracing::info!("Failed login for '{}'", req.username);
        return Err(AppError::Unauthorized);
    }
    if user.banned {
        return Err(AppError::Forbidden);
    }

    let token = make_token(&user.id, &state.config.secret);
    let jar = jar.add(auth_cookie(token.clone()));
    Ok((
        jar,
        axum::Json(LoginResponse {
            token,
            user_id: user.id,
            role: user.role,
            username: user.username,
        }),
    ))
}

/// POST /api/logout
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(AUTH_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

/// POST /api/register: only when self-service registration is enabled.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    axum::Json(req): axum::Json<CreateUserRequest>,
) -> Result<(StatusCode, CookieJar, axum::Json<LoginResponse>)> {
    if !state.config.enable_register {
        return Err(AppError::Forbidden);
    }
    let user = create_account(&state, &req.username, &req.password, Role::User).await?;
    let token = make_token(&user.id, &state.config.secret);
    let jar = jar.add(auth_cookie(token.clone()));
    Ok((
        StatusCode::CREATED,
        jar,
        axum::Json(LoginResponse {
            token,
            user_id: user.id,
            role: user.role,
            username: user.username,
        }),
    ))
}

pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("username cannot be empty".into()));
    }
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

/// Validate, check for duplicates and insert a new account.
pub async fn create_account(
    state: &AppState,
    username: &str,
    password: &str,
    role: Role,
) -> Result<User> {
    validate_credentials(username, password)?;
    let username = username.trim();

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username=?")
        .bind(username)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "username '{username}' already exists"
        )));
    }

    let id = User::new_id();
    let hash = hash_password(password).map_err(|e| AppError::Internal(e.to_string()))?;

    sqlx::query("INSERT INTO users (id, username, password, role) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(username)
        .bind(&hash)
        .bind(role.to_string())
        .execute(&state.db)
        .await?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(user)
}

// ── Extractors ────────────────────────────────────────────────────────────────

/// Any signed-in, non-banned user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Accept the token from Authorization: Bearer, X-Auth-Token, or the auth cookie.
        let token = extract_token(&parts.headers).ok_or(AuthRejection::Unauthorized)?;

        let user_id =
            verify_token(&token, &state.config.secret).ok_or(AuthRejection::Unauthorized)?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|_| AuthRejection::Unauthorized)?;

        let user = user.ok_or(AuthRejection::Unauthorized)?;
        if user.banned {
            return Err(AuthRejection::Forbidden);
        }
        Ok(AuthUser(user))
    }
}

/// An owner or admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer(headers)
        .or_else(|| {
            headers
                .get("x-auth-token")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(AUTH_COOKIE)
                .map(|c| c.value().to_string())
        })
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let v = headers.get("authorization")?.to_str().ok()?;
    v.strip_prefix("Bearer ").map(|s| s.to_string())
}

#[derive(Debug)]
pub enum AuthRejection {
    Unauthorized,
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthRejection::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
