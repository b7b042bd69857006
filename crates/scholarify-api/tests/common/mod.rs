#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use scholarify_api::auth::{AppState, AppStateInner};
use scholarify_api::build_router;
use scholarify_api::middleware::SESSION_COOKIE;
use scholarify_db::Database;
use scholarify_db::models::ListingFields;
use scholarify_types::models::{ListingStatus, ListingType};

pub const PASSWORD: &str = "s3cret-pass";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestResponse {
    /// Value of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                let pair = v.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                (name == SESSION_COOKIE).then(|| value.to_string())
            })
    }
}

pub struct Call {
    method: Method,
    uri: String,
    body: Option<Body>,
    content_type: Option<String>,
    token: Option<String>,
    session: Option<String>,
}

impl Call {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            body: None,
            content_type: None,
            token: None,
            session: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str, body: Value) -> Self {
        Self::new(Method::POST, uri).json(body)
    }

    pub fn patch(uri: &str, body: Value) -> Self {
        Self::new(Method::PATCH, uri).json(body)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn post_raw(uri: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        let mut call = Self::new(Method::POST, uri);
        call.body = Some(Body::from(bytes));
        call.content_type = Some(content_type.to_string());
        call
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::from(body.to_string()));
        self.content_type = Some("application/json".to_string());
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn session(mut self, key: &str) -> Self {
        self.session = Some(key.to_string());
        self
    }

    fn into_request(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(ct) = self.content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        if let Some(token) = self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(key) = self.session {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={key}"));
        }
        builder.body(self.body.unwrap_or_else(Body::empty)).unwrap()
    }
}

pub async fn send_to(router: Router, call: Call) -> TestResponse {
    let res = router.oneshot(call.into_request()).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let raw = res.into_body().collect().await.unwrap().to_bytes().to_vec();
    let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);
    TestResponse { status, headers, body, raw }
}

pub struct Account {
    pub user_id: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let state: AppState = Arc::new(AppStateInner::new(
            db,
            "test-secret".to_string(),
            30,
            media.path().to_path_buf(),
        ));
        let router = build_router(state.clone());
        Self { state, router, media }
    }

    pub async fn send(&self, call: Call) -> TestResponse {
        send_to(self.router.clone(), call).await
    }

    pub fn signup_body(username: &str) -> Value {
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": PASSWORD,
            "password_confirm": PASSWORD,
            "first_name": "Test",
        })
    }

    pub async fn signup(&self, username: &str) -> Account {
        let res = self
            .send(Call::post("/accounts/signup", Self::signup_body(username)))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        Account {
            user_id: res.body["user_id"].as_str().unwrap().to_string(),
            token: res.body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn staff(&self, username: &str) -> Account {
        let account = self.signup(username).await;
        assert!(self.state.db.set_staff(username, true).unwrap());
        account
    }

    pub fn deactivate(&self, username: &str) {
        let updated = self
            .state
            .db
            .with_conn(|c| {
                Ok(c.execute("UPDATE users SET is_active = 0 WHERE username = ?1", [username])?)
            })
            .unwrap();
        assert_eq!(updated, 1);
    }

    pub fn listing(&self, title: &str, edit: impl FnOnce(&mut ListingFields)) -> i64 {
        let mut fields = ListingFields {
            listing_type: ListingType::Job,
            title: title.to_string(),
            image: None,
            organization: String::new(),
            country: String::new(),
            city: String::new(),
            deadline: None,
            remote: false,
            level: String::new(),
            description: String::new(),
            apply_url: String::new(),
            source_url: String::new(),
            tags: String::new(),
            is_verified: false,
            is_featured: false,
            status: ListingStatus::Active,
        };
        edit(&mut fields);
        self.state
            .db
            .insert_listing(&fields, scholarify_api::today())
            .unwrap()
            .id
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.state
            .db
            .with_conn(|c| Ok(c.query_row(sql, [], |r| r.get(0))?))
            .unwrap()
    }
}

pub fn session_key(n: u8) -> String {
    format!("{:0>32}", n)
}
