//! Bearer token authorization against an identity provider's JWK set.
//!
//! Every protected handler calls [`Authorizer::require`] before touching the
//! store. The call walks the full chain: header parsing, `kid` lookup in the
//! (cached) key set, signature and claim verification, and finally the
//! permission check. Each failure maps to its own [`AuthError`] variant with a
//! distinct status and message.

use std::time::{Duration, Instant};

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use jsonwebtoken::{
    decode, decode_header,
    errors::ErrorKind,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
pub const POST_DRINKS: &str = "post:drinks";
pub const PATCH_DRINKS: &str = "patch:drinks";
pub const DELETE_DRINKS: &str = "delete:drinks";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingHeader,

    #[error("Authorization header must start with \"Bearer\".")]
    InvalidScheme,

    #[error("Token not found.")]
    MissingToken,

    #[error("Authorization header must be bearer token.")]
    MalformedHeader,

    #[error("Authorization malformed.")]
    MalformedToken,

    #[error("Unable to find the appropriate key.")]
    UnknownKey,

    #[error("Token expired.")]
    Expired,

    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    #[error("Unable to parse authentication token.")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Permissions not included in JWT.")]
    MissingPermissions,

    #[error("Permission not found.")]
    Forbidden,

    #[error("Unable to fetch signing keys.")]
    KeyFetch(#[from] reqwest::Error),

    #[error("Unable to fetch signing keys.")]
    KeyDecode(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingHeader
            | Self::InvalidScheme
            | Self::MissingToken
            | Self::MalformedHeader
            | Self::MalformedToken
            | Self::Expired
            | Self::InvalidClaims => StatusCode::UNAUTHORIZED,
            Self::UnknownKey | Self::InvalidToken(_) | Self::MissingPermissions => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::KeyFetch(_) | Self::KeyDecode(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short machine-readable reason, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "authorization_header_missing",
            Self::InvalidScheme
            | Self::MissingToken
            | Self::MalformedHeader
            | Self::MalformedToken
            | Self::UnknownKey
            | Self::InvalidToken(_) => "invalid_header",
            Self::Expired => "token_expired",
            Self::InvalidClaims | Self::MissingPermissions => "invalid_claims",
            Self::Forbidden => "unauthorized",
            Self::KeyFetch(_) | Self::KeyDecode(_) => "jwks_unavailable",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::InvalidClaims,
            _ => Self::InvalidToken(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Verified token payload handed to protected handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub permissions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }
}

/// Pulls the raw token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [] => Err(AuthError::MissingHeader),
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => Err(AuthError::InvalidScheme),
        [_] => Err(AuthError::MissingToken),
        [_, token] => Ok(*token),
        _ => Err(AuthError::MalformedHeader),
    }
}

pub fn check_permission(claims: &Claims, permission: &str) -> Result<()> {
    if claims.permissions.is_none() {
        return Err(AuthError::MissingPermissions);
    }
    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Key type an algorithm verifies with. One validator can only accept
/// algorithms of a single family.
pub fn key_family(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => "HMAC",
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => "RSA",
        Algorithm::ES256 | Algorithm::ES384 => "EC",
        Algorithm::EdDSA => "OKP",
    }
}

// === Key sets ===

pub const DEFAULT_MIN_REFRESH: Duration = Duration::from_secs(30);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

pub struct RemoteKeySet {
    url: String,
    client: reqwest::Client,
    ttl: Duration,
    min_refresh: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl RemoteKeySet {
    async fn find(&self, kid: &str) -> Result<Option<Jwk>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            let age = cached.fetched_at.elapsed();
            if age < self.ttl {
                if let Some(jwk) = cached.keys.find(kid) {
                    return Ok(Some(jwk.clone()));
                }
                // Unknown key ids must not drive fetches faster than this.
                if age < self.min_refresh {
                    tracing::debug!(kid, "Key id not in recently fetched set");
                    return Ok(None);
                }
                tracing::debug!(kid, "Key id not in cached set, refreshing");
            }
        }

        let keys = self.refresh().await?;
        Ok(keys.find(kid).cloned())
    }

    async fn refresh(&self) -> Result<JwkSet> {
        tracing::info!(url = %self.url, "Fetching signing keys");
        let keys: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        *self.cache.write().await = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}

/// Source of the issuer's public signing keys.
pub enum KeySet {
    Local(JwkSet),
    Remote(RemoteKeySet),
}

impl KeySet {
    pub fn local(keys: JwkSet) -> Self {
        Self::Local(keys)
    }

    pub fn remote(url: impl Into<String>, client: reqwest::Client, ttl: Duration) -> Self {
        Self::Remote(RemoteKeySet {
            url: url.into(),
            client,
            ttl,
            min_refresh: DEFAULT_MIN_REFRESH,
            cache: RwLock::new(None),
        })
    }

    /// Shortest gap between two fetches triggered by an unknown key id.
    /// Has no effect on local key sets.
    pub fn with_min_refresh(mut self, interval: Duration) -> Self {
        if let Self::Remote(remote) = &mut self {
            remote.min_refresh = interval;
        }
        self
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let jwk = match self {
            Self::Local(keys) => keys.find(kid).cloned(),
            Self::Remote(remote) => remote.find(kid).await?,
        }
        .ok_or(AuthError::UnknownKey)?;

        DecodingKey::from_jwk(&jwk).map_err(AuthError::KeyDecode)
    }
}

// === Authorizer ===

pub struct Authorizer {
    keys: KeySet,
    validation: Validation,
}

impl Authorizer {
    /// `algorithms` must be non-empty and share one key family.
    pub fn new(keys: KeySet, issuer: &str, audience: &str, algorithms: &[Algorithm]) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        if !algorithms.is_empty() {
            validation.algorithms = algorithms.to_vec();
        }
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self { keys, validation }
    }

    /// Verifies the token's signature, expiry, audience and issuer.
    pub async fn verify(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = header.kid.ok_or(AuthError::MalformedToken)?;

        let key = self.keys.decoding_key(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation)?;
        Ok(data.claims)
    }

    /// Full guard for a protected route: token from headers, verified, and
    /// carrying `permission`.
    pub async fn require(&self, headers: &HeaderMap, permission: &str) -> Result<Claims> {
        let token = bearer_token(headers)?;
        let claims = self.verify(token).await?;
        check_permission(&claims, permission)?;
        Ok(claims)
    }
}
