use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::jwk::{JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};
use tokio::time;

use super::AuthError;

/// Source of the issuer's published signing keys.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet>;
}

/// Downloads the key set from the issuer's JWKS endpoint.
pub struct HttpKeyFetcher {
    url: String,
    client: reqwest::Client,
}

impl HttpKeyFetcher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self) -> Result<JwkSet> {
        debug!("Fetching signing keys from '{}'", self.url);
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request '{}'", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("unexpected status {status} from '{}'", self.url);
        }

        let set = resp.json::<JwkSet>().await.context("decode key set")?;
        Ok(set)
    }
}

/// Process-wide cache of decoding keys, indexed by key id.
///
/// Keys are loaded lazily: a lookup for an unknown key id triggers one
/// refresh of the whole set. Concurrent refreshes collapse into a single
/// fetch, and keys are only ever added, so a token signed with a retired
/// key stays verifiable until the process restarts.
#[derive(Clone)]
pub struct KeyStore {
    inner: Arc<KeyStoreInner>,
}

struct KeyStoreInner {
    fetcher: Arc<dyn KeyFetcher>,

    keys: RwLock<HashMap<String, DecodingKey>>,

    /// Bumped after every fetch attempt, successful or not.
    attempts: AtomicU64,

    /// Held for the whole duration of a fetch.
    state: Mutex<FetchState>,

    timeout: Duration,
    cooldown: Duration,
}

/// Outcome of the latest fetch, handed to the requests that queued behind
/// it.
#[derive(Default)]
struct FetchState {
    last_success: Option<Instant>,
    last_error: Option<AuthError>,
}

impl KeyStore {
    pub fn new(fetcher: Arc<dyn KeyFetcher>, timeout: Duration, cooldown: Duration) -> Self {
        Self {
            inner: Arc::new(KeyStoreInner {
                fetcher,
                keys: RwLock::new(HashMap::new()),
                attempts: AtomicU64::new(0),
                state: Mutex::new(FetchState::default()),
                timeout,
                cooldown,
            }),
        }
    }

    /// Returns the key for `kid`, refreshing the set once if it is not
    /// cached yet.
    pub async fn get(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        // Read the attempt counter before the lookup, so a fetch that lands
        // in between is not repeated.
        let seen = self.inner.attempts.load(Ordering::Acquire);
        if let Some(key) = self.lookup(kid).await {
            return Ok(key);
        }

        debug!("Signing key '{kid}' is not cached, refreshing key set");
        self.refresh(seen).await?;

        match self.lookup(kid).await {
            Some(key) => Ok(key),
            None => Err(AuthError::KeyNotFound(kid.to_string())),
        }
    }

    /// Loads the key set now instead of on the first request.
    pub async fn preload(&self) -> Result<usize, AuthError> {
        let seen = self.inner.attempts.load(Ordering::Acquire);
        self.refresh(seen).await?;
        Ok(self.key_count().await)
    }

    pub async fn key_count(&self) -> usize {
        self.inner.keys.read().await.len()
    }

    async fn lookup(&self, kid: &str) -> Option<DecodingKey> {
        self.inner.keys.read().await.get(kid).cloned()
    }

    async fn refresh(&self, seen: u64) -> Result<(), AuthError> {
        let inner = Arc::clone(&self.inner);
        // Detached, so the result still lands in the cache when the waiting
        // request goes away.
        let handle = tokio::spawn(async move { inner.refresh(seen).await });
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(AuthError::KeyFetchFailed(format!("refresh task failed: {e}"))),
        }
    }
}

impl KeyStoreInner {
    async fn refresh(&self, seen: u64) -> Result<(), AuthError> {
        let mut state = match time::timeout(self.timeout, self.state.lock()).await {
            Ok(state) => state,
            Err(_) => {
                warn!("Waiting for signing key fetch timed out after {:?}", self.timeout);
                return Err(AuthError::KeyFetchTimeout);
            }
        };

        // Someone else fetched while we were queued, share their outcome.
        if self.attempts.load(Ordering::Acquire) != seen {
            debug!("Signing keys were fetched while waiting, skip fetching");
            return match state.last_error.as_ref() {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            };
        }

        if let Some(at) = state.last_success {
            if at.elapsed() < self.cooldown {
                debug!("Signing keys were fetched {:?} ago, skip fetching", at.elapsed());
                return Ok(());
            }
        }

        let result = self.load_keys().await;
        match result {
            Ok(()) => {
                state.last_success = Some(Instant::now());
                state.last_error = None;
            }
            Err(ref err) => state.last_error = Some(err.clone()),
        }
        self.attempts.fetch_add(1, Ordering::AcqRel);

        result
    }

    async fn load_keys(&self) -> Result<(), AuthError> {
        let set = match time::timeout(self.timeout, self.fetcher.fetch()).await {
            Ok(Ok(set)) => set,
            Ok(Err(e)) => {
                warn!("Fetch signing keys failed: {e:#}");
                return Err(AuthError::KeyFetchFailed(format!("{e:#}")));
            }
            Err(_) => {
                warn!("Fetch signing keys timed out after {:?}", self.timeout);
                return Err(AuthError::KeyFetchTimeout);
            }
        };

        let mut added = 0;
        let mut keys = self.keys.write().await;
        for jwk in set.keys.iter() {
            let kid = match jwk.common.key_id.as_ref() {
                Some(kid) => kid,
                None => {
                    warn!("Ignore signing key without key id");
                    continue;
                }
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                debug!("Ignore encryption key '{kid}'");
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    if keys.insert(kid.clone(), key).is_none() {
                        added += 1;
                    }
                }
                Err(e) => warn!("Ignore invalid signing key '{kid}': {e}"),
            }
        }

        info!("Refreshed signing keys, {added} added, {} cached", keys.len());
        Ok(())
    }
}
