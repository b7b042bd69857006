use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, Validation, decode};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, warn};

use scholarify_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{run_db, today};

pub const SESSION_COOKIE: &str = "scholarify_session";
const SESSION_KEY_LEN: usize = 32;

/// Anonymous visitor key carried in the session cookie.
#[derive(Debug, Clone)]
pub struct SessionKey(pub String);

/// Claims of the caller when a valid bearer token was presented.
pub struct CurrentUser(pub Option<Claims>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Claims>().cloned()))
    }
}

fn is_valid_session_key(key: &str) -> bool {
    key.len() == SESSION_KEY_LEN
        && key.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

fn new_session_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Assigns a session key to every request and counts one site visit per
/// session per day. `/admin` requests are not counted.
pub async fn session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> (CookieJar, Response) {
    let existing = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| is_valid_session_key(v));

    let (key, jar) = match existing {
        Some(key) => (key, jar),
        None => {
            let key = new_session_key();
            let cookie = Cookie::build((SESSION_COOKIE, key.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (key, jar.add(cookie))
        }
    };

    let count_visit = !req.uri().path().starts_with("/admin");
    req.extensions_mut().insert(SessionKey(key.clone()));
    let response = next.run(req).await;

    if count_visit {
        let date = today();
        if let Err(e) = run_db(&state, move |db| db.record_site_visit(&key, date)).await {
            warn!("Failed to record site visit: {}", e);
        }
    }

    (jar, response)
}

/// Attaches `Claims` to the request when the Authorization header carries a
/// valid, unrevoked token of an active user. Anonymous requests pass through untouched.
pub async fn resolve_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(token) = token {
        match decode::<Claims>(
            &token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => {
                let jti = data.claims.jti.to_string();
                let user_id = data.claims.sub.to_string();
                let (revoked, active) = run_db(&state, move |db| {
                    let revoked = db.is_token_revoked(&jti)?;
                    let active = db.get_user_by_id(&user_id)?.is_some_and(|u| u.is_active);
                    Ok((revoked, active))
                })
                .await?;
                if revoked {
                    debug!("Rejected revoked token {}", data.claims.jti);
                } else if !active {
                    debug!("Rejected token of inactive user {}", data.claims.sub);
                } else {
                    req.extensions_mut().insert(data.claims);
                }
            }
            Err(e) => debug!("Rejected bearer token: {}", e),
        }
    }

    Ok(next.run(req).await)
}

/// Rejects requests without resolved claims.
pub async fn require_auth(req: Request, next: Next) -> Result<Response, ApiError> {
    if req.extensions().get::<Claims>().is_none() {
        return Err(ApiError::Unauthorized("Authentication required"));
    }
    Ok(next.run(req).await)
}

/// Rejects callers that are not active staff. Runs after `require_auth`.
pub async fn require_staff(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.to_string())
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    let user = run_db(&state, move |db| db.get_user_by_id(&user_id)).await?;
    match user {
        Some(u) if u.is_active && u.is_staff => Ok(next.run(req).await),
        _ => Err(ApiError::Forbidden),
    }
}
