use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use scholarify_db::models::NewUser;
use scholarify_db::{Database, is_constraint_violation};
use scholarify_types::api::{
    Claims, ListingResponse, LoginRequest, LoginResponse, SignupRequest, SignupResponse,
    UserResponse,
};

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::rate_limit::{ClientIp, RateLimiter};
use crate::run_db;
use crate::validate;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub media_dir: PathBuf,
    pub signup_limiter: RateLimiter,
    pub contact_limiter: RateLimiter,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, token_ttl_days: i64, media_dir: PathBuf) -> Self {
        Self {
            db,
            jwt_secret,
            token_ttl: chrono::Duration::days(token_ttl_days),
            media_dir,
            signup_limiter: RateLimiter::new(5, Duration::from_secs(60)),
            contact_limiter: RateLimiter::new(10, Duration::from_secs(60)),
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    CurrentUser(current): CurrentUser,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.signup_limiter.allow(&ip).await {
        warn!("Signup rate limit hit for {}", ip);
        return Err(ApiError::TooManyRequests);
    }
    if current.is_some() {
        return Err(ApiError::bad_request("Already signed in"));
    }

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    let phone = req.phone.trim().to_string();

    validate::username(&username)?;
    validate::email(&email)?;
    validate::password(&req.password, &req.password_confirm)?;
    validate::required("First name", &first_name)?;
    validate::max_len("First name", &first_name, validate::FIRST_NAME_MAX)?;
    validate::max_len("Last name", &last_name, validate::FIRST_NAME_MAX)?;
    validate::max_len("Phone", &phone, validate::PHONE_MAX)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let gender = req.gender;

    let created = {
        let username = username.clone();
        run_db(&state, move |db| {
            if db.get_user_by_username(&username)?.is_some() || db.email_taken(&email)? {
                return Ok(None);
            }
            let id = user_id.to_string();
            let new = NewUser {
                id: &id,
                username: &username,
                email: &email,
                password_hash: &password_hash,
                first_name: &first_name,
                last_name: &last_name,
                gender,
                phone: &phone,
            };
            match db.create_user(&new) {
                Ok(user) => Ok(Some(user)),
                Err(e) if is_constraint_violation(&e) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await?
    };

    if created.is_none() {
        return Err(ApiError::Conflict(
            "A user with that username or email already exists".into(),
        ));
    }
    info!("New account: {} ({})", username, user_id);

    let token = create_token(&state, user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id,
            token,
            redirect_to: validate::safe_redirect(req.next.as_deref()),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    const INVALID: ApiError = ApiError::Unauthorized("Invalid username or password");

    let username = req.username.trim().to_string();
    let user = run_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .filter(|u| u.is_active)
        .ok_or(INVALID)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| INVALID)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("bad user id {}: {}", user.id, e)))?;

    let token = create_token(&state, user_id, &user.username)?;
    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
        is_staff: user.is_staff,
    }))
}

/// Revokes the presented token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let jti = claims.jti.to_string();
    let expires_at = claims.exp as i64;
    run_db(&state, move |db| db.revoke_token(&jti, expires_at)).await?;
    info!("User {} logged out", claims.username);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    let (user, profile) = run_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(&user_id)? else {
            return Ok(None);
        };
        let profile = db.get_profile(&user_id)?;
        Ok(profile.map(|p| (user, p)))
    })
    .await?
    .ok_or(ApiError::Unauthorized("Account no longer exists"))?;

    Ok(Json(UserResponse {
        id: claims.sub,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_staff: user.is_staff,
        created_at: user.created_at,
        profile: profile.into(),
    }))
}

/// Listings the caller bookmarked, newest bookmark first.
pub async fn saved_listings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.saved_listings(&user_id)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

fn create_token(state: &AppStateInner, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        jti: Uuid::new_v4(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(token)
}
