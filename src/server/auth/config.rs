use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

use super::keys::{HttpKeyFetcher, KeyStore};
use super::verifier::JwtVerifier;

/// Where tokens come from and how they are checked.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Identity provider domain, e.g. `example.us.auth0.com`.
    #[serde(default = "AuthConfig::default_domain")]
    pub domain: String,

    /// Expected `aud` claim.
    #[serde(default = "AuthConfig::default_audience")]
    pub audience: String,

    /// Expected `iss` claim, default is `https://<domain>/`.
    #[serde(default)]
    pub issuer: String,

    /// Signing key set endpoint, default is
    /// `https://<domain>/.well-known/jwks.json`.
    #[serde(default)]
    pub jwks_url: String,

    #[serde(default = "AuthConfig::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Minimum interval between two key set fetches.
    #[serde(default = "AuthConfig::default_refresh_cooldown_secs")]
    pub refresh_cooldown_secs: u64,

    /// Clock skew tolerated when checking `exp` and `nbf`.
    #[serde(default)]
    pub leeway_secs: u64,

    /// Fetch the key set at startup instead of on the first request.
    #[serde(default)]
    pub preload_keys: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: Self::default_domain(),
            audience: Self::default_audience(),
            issuer: String::new(),
            jwks_url: String::new(),
            fetch_timeout_secs: Self::default_fetch_timeout_secs(),
            refresh_cooldown_secs: Self::default_refresh_cooldown_secs(),
            leeway_secs: 0,
            preload_keys: false,
        }
    }
}

impl CommonConfig for AuthConfig {
    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        self.domain = expandenv("domain", &self.domain)?;
        self.audience = expandenv("audience", &self.audience)?;
        self.issuer = expandenv("issuer", &self.issuer)?;
        self.jwks_url = expandenv("jwks_url", &self.jwks_url)?;

        let domain = self.domain.trim_end_matches('/');
        if domain.is_empty() {
            bail!("domain is required");
        }
        if self.audience.is_empty() {
            bail!("audience is required");
        }

        if self.issuer.is_empty() {
            self.issuer = format!("https://{domain}/");
        }
        if self.jwks_url.is_empty() {
            self.jwks_url = format!("https://{domain}/.well-known/jwks.json");
        }
        if !self.jwks_url.starts_with("https://") {
            warn!(
                "Signing keys are fetched without TLS from '{}', DO NOT USE IN PRODUCTION",
                self.jwks_url
            );
        }

        if self.fetch_timeout_secs < Self::MIN_FETCH_TIMEOUT_SECS
            || self.fetch_timeout_secs > Self::MAX_FETCH_TIMEOUT_SECS
        {
            bail!(
                "fetch_timeout_secs must be in range [{}, {}]",
                Self::MIN_FETCH_TIMEOUT_SECS,
                Self::MAX_FETCH_TIMEOUT_SECS
            );
        }

        if self.leeway_secs > Self::MAX_LEEWAY_SECS {
            bail!("leeway_secs must be at most {}", Self::MAX_LEEWAY_SECS);
        }

        Ok(())
    }
}

impl AuthConfig {
    const MIN_FETCH_TIMEOUT_SECS: u64 = 1;
    const MAX_FETCH_TIMEOUT_SECS: u64 = 60;

    const MAX_LEEWAY_SECS: u64 = 300;

    pub fn build_key_store(&self) -> Result<KeyStore> {
        let timeout = Duration::from_secs(self.fetch_timeout_secs);
        let fetcher =
            HttpKeyFetcher::new(&self.jwks_url, timeout).context("init signing key fetcher")?;
        Ok(KeyStore::new(
            Arc::new(fetcher),
            timeout,
            Duration::from_secs(self.refresh_cooldown_secs),
        ))
    }

    pub fn build_verifier(&self, keys: KeyStore) -> JwtVerifier {
        JwtVerifier::new(keys, &self.issuer, &self.audience).with_leeway(self.leeway_secs)
    }

    fn default_domain() -> String {
        String::from("dev-ylgtuvd3.us.auth0.com")
    }

    fn default_audience() -> String {
        String::from("Coffee")
    }

    fn default_fetch_timeout_secs() -> u64 {
        5
    }

    fn default_refresh_cooldown_secs() -> u64 {
        30
    }
}
