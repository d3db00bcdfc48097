#![allow(dead_code)]

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use axum_test::TestServer;
use coffee_shop_server::{create_router, AppState, Authorizer, Database, KeySet};
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

pub const ISSUER: &str = "https://coffee-test.auth0.local/";
pub const AUDIENCE: &str = "drinks";
pub const KID: &str = "test-key-1";

pub const JWKS: &str = include_str!("../fixtures/jwks.json");
const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/signing_key.pem");
const FOREIGN_KEY: &[u8] = include_bytes!("../fixtures/foreign_key.pem");

pub const MANAGER: &[&str] = &[
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];
pub const BARISTA: &[&str] = &["get:drinks-detail"];

pub fn local_keys() -> JwkSet {
    serde_json::from_str(JWKS).unwrap()
}

pub fn authorizer(keys: KeySet) -> Authorizer {
    Authorizer::new(keys, ISSUER, AUDIENCE, &[Algorithm::RS256])
}

pub fn setup_test_server() -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).unwrap();
    let state = AppState {
        db: Arc::new(db),
        auth: Arc::new(authorizer(KeySet::local(local_keys()))),
    };
    let app = create_router(state);
    let server = TestServer::new(app).unwrap();
    (server, temp_dir)
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Claims the identity provider would issue for a user with `permissions`.
pub fn claims(permissions: &[&str]) -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|barista",
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    })
}

pub fn sign_with(claims: &Value, kid: Option<&str>, pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(String::from);
    encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with(claims, Some(KID), SIGNING_KEY)
}

pub fn sign_foreign(claims: &Value) -> String {
    sign_with(claims, Some(KID), FOREIGN_KEY)
}

pub fn token(permissions: &[&str]) -> String {
    sign(&claims(permissions))
}

pub fn auth_header() -> HeaderName {
    AUTHORIZATION
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

pub fn latte() -> Value {
    json!({
        "title": "latte",
        "recipe": [
            {"name": "espresso", "color": "brown", "parts": 1},
            {"name": "steamed milk", "color": "white", "parts": 3}
        ]
    })
}
