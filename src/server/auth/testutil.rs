use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use serde_json::{json, Value};

use super::keys::KeyFetcher;

pub const ISSUER: &str = "https://coffee.test.auth0.com/";
pub const AUDIENCE: &str = "Coffee";

/// Signs test tokens with a freshly generated RSA key.
pub struct TestSigner {
    pub kid: String,
    key: EncodingKey,
    jwk: Value,
}

pub static SIGNER: Lazy<TestSigner> = Lazy::new(|| TestSigner::generate("test-key-1"));

pub static ROTATED_SIGNER: Lazy<TestSigner> = Lazy::new(|| TestSigner::generate("test-key-2"));

/// Uses the key id of [`SIGNER`] with an unrelated private key.
pub static FORGER: Lazy<TestSigner> = Lazy::new(|| TestSigner::generate("test-key-1"));

impl TestSigner {
    pub fn generate(kid: &str) -> Self {
        let rsa = Rsa::generate(2048).unwrap();
        let jwk = json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": kid,
            "n": URL_SAFE_NO_PAD.encode(rsa.n().to_vec()),
            "e": URL_SAFE_NO_PAD.encode(rsa.e().to_vec()),
        });

        let pkey = PKey::from_rsa(rsa).unwrap();
        let private_key = pkey.private_key_to_pem_pkcs8().unwrap();
        let key = EncodingKey::from_rsa_pem(&private_key).unwrap();

        Self {
            kid: kid.to_string(),
            key,
            jwk,
        }
    }

    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.key).unwrap()
    }

    pub fn sign_without_kid(&self, claims: &Value) -> String {
        encode(&Header::new(Algorithm::RS256), claims, &self.key).unwrap()
    }

    /// A valid token for one hour carrying `permissions`.
    pub fn token(&self, permissions: &[&str]) -> String {
        self.sign(&claims(permissions))
    }
}

pub fn now() -> u64 {
    Utc::now().timestamp() as u64
}

pub fn claims(permissions: &[&str]) -> Value {
    let now = now();
    json!({
        "iss": ISSUER,
        "sub": "auth0|barista",
        "aud": [AUDIENCE, "https://coffee.test.auth0.com/userinfo"],
        "iat": now,
        "exp": now + 3600,
        "permissions": permissions,
    })
}

pub fn key_set(signers: &[&TestSigner]) -> JwkSet {
    let keys = signers.iter().map(|s| s.jwk.clone()).collect::<Vec<_>>();
    serde_json::from_value(json!({ "keys": keys })).unwrap()
}

/// Serves a fixed key set and counts how often it was asked.
pub struct StaticKeyFetcher {
    set: Mutex<Result<JwkSet, String>>,
    delay: Duration,
    count: AtomicUsize,
}

impl StaticKeyFetcher {
    pub fn new(set: JwkSet) -> Self {
        Self {
            set: Mutex::new(Ok(set)),
            delay: Duration::ZERO,
            count: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_keys(&self, set: JwkSet) {
        *self.set.lock().unwrap() = Ok(set);
    }

    pub fn set_failure(&self, message: &str) {
        *self.set.lock().unwrap() = Err(message.to_string());
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for StaticKeyFetcher {
    async fn fetch(&self) -> Result<JwkSet> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let set = self.set.lock().unwrap().clone();
        match set {
            Ok(set) => Ok(set),
            Err(message) => bail!("{message}"),
        }
    }
}
