//! Common test utilities for HTTP integration tests

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use ride_dispatch_server::{
    AppState, Settings, Stores,
    config::SuperCredential,
    create_router,
    crypto::Argon2Hasher,
    error::AppError,
    geocoding::{Geocoder, Place},
    models::reservation::GeoPoint,
    notify::Notifier,
};
use tower::ServiceExt;

pub const SUPER_USER: &str = "root";
pub const SUPER_PASSWORD: &str = "toor";

/// Resolves every address except `"nowhere"`.
pub struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn forward(&self, address: &str) -> Result<Option<Place>, AppError> {
        if address == "nowhere" {
            return Ok(None);
        }
        Ok(Some(Place {
            location: GeoPoint { lon: 10.0, lat: 50.0 },
            address: format!("{address}, Springfield"),
        }))
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, AppError> {
        Ok(Some(format!("{lat}, {lon}")))
    }
}

/// Notifier that captures (recipient, message) pairs
#[derive(Default, Clone)]
pub struct MockNotifier {
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockNotifier {
    /// Last message delivered to `recipient`
    pub fn last_for(&self, recipient: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(r, _)| r == recipient)
            .map(|(_, m)| m.clone())
    }
}

impl Notifier for MockNotifier {
    fn send(&self, recipient: &str, message: &str) {
        self.sent
            .write()
            .unwrap()
            .push((recipient.to_string(), message.to_string()));
    }
}

/// Router over in-memory stores with cheap password hashing
pub fn spawn_app() -> (Router, MockNotifier) {
    let notifier = MockNotifier::default();
    let settings = Settings {
        super_users: vec![SuperCredential {
            username: SUPER_USER.to_string(),
            password: SUPER_PASSWORD.to_string(),
        }],
        ..Settings::default()
    };

    let state = AppState::new(
        Stores::in_memory(),
        Arc::new(Argon2Hasher::with_params(8, 1, 1).expect("valid argon2 params")),
        Arc::new(StubGeocoder),
        Arc::new(notifier.clone()),
        settings,
    );

    (create_router(state), notifier)
}

fn encode(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// POST a form, optionally with a `name=value` cookie
pub async fn post_form(
    app: &Router,
    uri: &str,
    pairs: &[(&str, &str)],
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(builder.body(Body::from(encode(pairs))).unwrap())
        .await
        .unwrap()
}

/// GET, optionally with a `name=value` cookie
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Value of a cookie set by the response, as `name=value`
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Join and log in, returning the session cookie (`token=...`)
pub async fn signup_and_login(app: &Router, username: &str, category: &str) -> String {
    let response = post_form(
        app,
        "/join",
        &[
            ("username", username),
            ("password", "password1"),
            ("confirm", "password1"),
            ("category", category),
        ],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = post_form(
        app,
        "/login",
        &[
            ("username", username),
            ("password", "password1"),
            ("category", category),
        ],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    set_cookie(&response, "token").expect("No session cookie")
}

/// Passenger reservation between two street addresses
pub async fn reserve(app: &Router, cookie: &str) -> Response<Body> {
    post_form(
        app,
        "/reserve",
        &[("curr_adr", "Main St 1"), ("dest_adr", "Harbour Rd 9")],
        Some(cookie),
    )
    .await
}
