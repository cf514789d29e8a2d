use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;

use super::keys::KeyStore;
use super::AuthError;

/// The verified content of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub expiry: u64,

    /// Union of the `permissions` array and the space separated `scope`
    /// claim.
    pub scope: BTreeSet<String>,
}

/// Registered claims as they appear in the token payload (RFC 7519), plus
/// the scope claims.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    iss: String,
    aud: Audience,
    exp: u64,

    #[serde(default)]
    nbf: Option<u64>,

    #[serde(default)]
    scope: Option<String>,

    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl From<RawClaims> for Claims {
    fn from(raw: RawClaims) -> Self {
        let mut scope: BTreeSet<String> = raw.permissions.into_iter().collect();
        if let Some(s) = raw.scope {
            scope.extend(s.split_whitespace().map(String::from));
        }

        let audience = match raw.aud {
            Audience::One(aud) => vec![aud],
            Audience::Many(aud) => aud,
        };

        Self {
            subject: raw.sub,
            issuer: raw.iss,
            audience,
            expiry: raw.exp,
            scope,
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Verifies RS256 JSON Web Tokens against the issuer's published keys.
/// See: https://datatracker.ietf.org/doc/html/rfc7519
pub struct JwtVerifier {
    keys: KeyStore,
    validation: Validation,
    leeway: u64,
}

impl JwtVerifier {
    pub fn new(keys: KeyStore, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Time based claims are checked in `verify_at` against the given
        // clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            keys,
            validation,
            leeway: 0,
        }
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = leeway_secs;
        self
    }

    /// Verifies `token` as if the current unix time were `now`.
    ///
    /// The signature is checked before any claim, so the claims of a forged
    /// token are never looked at.
    pub async fn verify_at(&self, token: &str, now: u64) -> Result<Claims, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let kid = match header.kid {
            Some(kid) => kid,
            None => {
                return Err(AuthError::MalformedToken(String::from(
                    "missing key id in token header",
                )))
            }
        };

        let key = self.keys.get(&kid).await?;
        let raw = decode::<RawClaims>(token, &key, &self.validation)?.claims;

        if now >= raw.exp.saturating_add(self.leeway) {
            return Err(AuthError::TokenExpired);
        }
        if let Some(nbf) = raw.nbf {
            if now.saturating_add(self.leeway) < nbf {
                return Err(AuthError::TokenNotYetValid);
            }
        }

        Ok(raw.into())
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let now = Utc::now().timestamp() as u64;
        self.verify_at(token, now).await
    }
}
