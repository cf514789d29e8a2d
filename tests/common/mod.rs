#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use coffee_shop::server::auth::keys::{KeyFetcher, KeyStore};
use coffee_shop::server::auth::{AuthGate, JwtVerifier};
use coffee_shop::server::config::ServerConfig;
use coffee_shop::server::context::ServerContext;
use coffee_shop::server::db::Database;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use serde_json::{json, Value};

pub const ISSUER: &str = "https://coffee.test.auth0.com/";
pub const AUDIENCE: &str = "Coffee";

pub struct TestSigner {
    pub kid: String,
    key: EncodingKey,
    jwk: Value,
}

pub static SIGNER: Lazy<TestSigner> = Lazy::new(|| TestSigner::generate("api-key-1"));

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
        let pem = pkey.private_key_to_pem_pkcs8().unwrap();
        let key = EncodingKey::from_rsa_pem(&pem).unwrap();

        Self {
            kid: kid.to_string(),
            key,
            jwk,
        }
    }

    /// A bearer header value valid for one hour carrying `permissions`.
    pub fn bearer(&self, permissions: &[&str]) -> String {
        let now = Utc::now().timestamp() as u64;
        let claims = json!({
            "iss": ISSUER,
            "sub": "auth0|barista",
            "aud": AUDIENCE,
            "iat": now,
            "exp": now + 3600,
            "permissions": permissions,
        });
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        format!("Bearer {}", encode(&header, &claims, &self.key).unwrap())
    }

    pub fn key_set(&self) -> Value {
        json!({ "keys": [self.jwk.clone()] })
    }
}

pub struct StaticKeyFetcher {
    set: JwkSet,
    count: AtomicUsize,
}

impl StaticKeyFetcher {
    pub fn new(signer: &TestSigner) -> Self {
        Self {
            set: serde_json::from_value(signer.key_set()).unwrap(),
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for StaticKeyFetcher {
    async fn fetch(&self) -> Result<JwkSet> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(self.set.clone())
    }
}

/// Server state over a freshly seeded in-memory catalog.
pub fn context(fetcher: Arc<dyn KeyFetcher>) -> Arc<ServerContext> {
    let db = Database::memory().unwrap();
    db.with_transaction(|tx| tx.reset_drinks()).unwrap();

    let keys = KeyStore::new(fetcher, Duration::from_secs(5), Duration::from_secs(30));
    let verifier = JwtVerifier::new(keys, ISSUER, AUDIENCE);
    let gate = AuthGate::new(Arc::new(verifier));

    Arc::new(ServerContext::new(db, gate, ServerConfig::default()))
}

#[macro_export]
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(coffee_shop::server::restful::cors_headers("*"))
                .app_data(actix_web::web::Data::new($ctx))
                .configure(coffee_shop::server::restful::configure),
        )
        .await
    };
}
