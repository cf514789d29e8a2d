use std::path::PathBuf;
use std::sync::Arc;

use actix_web::http::header::HeaderValue;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslFiletype, SslMethod};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};
use crate::logs::LogsConfig;

use super::auth::config::AuthConfig;
use super::auth::AuthGate;
use super::context::ServerContext;
use super::db::config::DbConfig;
use super::restful::RestfulServer;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default)]
    pub ssl: bool,

    pub keep_alive_secs: Option<u64>,

    pub workers: Option<u64>,

    pub payload_limit_mib: Option<u64>,

    /// Value of `Access-Control-Allow-Origin` on every response.
    #[serde(default = "ServerConfig::default_cors_allow_origin")]
    pub cors_allow_origin: String,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub db: DbConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(skip)]
    pki_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: Self::default_bind(),
            ssl: false,
            keep_alive_secs: None,
            workers: None,
            payload_limit_mib: None,
            cors_allow_origin: Self::default_cors_allow_origin(),
            auth: AuthConfig::default(),
            db: DbConfig::default(),
            logs: LogsConfig::default(),
            pki_dir: PathBuf::new(),
        }
    }
}

impl CommonConfig for ServerConfig {
    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind is required");
        }

        if let Some(keep_alive_secs) = self.keep_alive_secs {
            if keep_alive_secs == 0 {
                bail!("keep_alive_secs must be greater than 0");
            }
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                bail!("workers must be greater than 0");
            }
        }

        if let Some(payload_limit_mib) = self.payload_limit_mib {
            if payload_limit_mib == 0 || payload_limit_mib > Self::MAX_PAYLOAD_LIMIT_MIB {
                bail!(
                    "payload_limit_mib must be in range [1, {}]",
                    Self::MAX_PAYLOAD_LIMIT_MIB
                );
            }
        }

        self.cors_allow_origin = expandenv("cors_allow_origin", &self.cors_allow_origin)?;
        if self.cors_allow_origin.is_empty() {
            bail!("cors_allow_origin is required");
        }
        HeaderValue::from_str(&self.cors_allow_origin)
            .context("cors_allow_origin is not a valid header value")?;

        self.auth.complete(ps).context("auth")?;
        self.db.complete(ps).context("db")?;
        self.logs.complete(ps).context("logs")?;

        self.pki_dir = ps.pki_dir.clone();

        Ok(())
    }
}

impl ServerConfig {
    const MAX_PAYLOAD_LIMIT_MIB: u64 = 1024;

    pub async fn build_ctx(&self) -> Result<Arc<ServerContext>> {
        let db = self.db.build().context("init database")?;

        let keys = self.auth.build_key_store()?;
        if self.auth.preload_keys {
            match keys.preload().await {
                Ok(count) => info!("Preloaded {count} signing key(s)"),
                // Keys are fetched again on the first request.
                Err(e) => warn!("Preload signing keys failed: {e}"),
            }
        }

        let verifier = self.auth.build_verifier(keys);
        let gate = AuthGate::new(Arc::new(verifier));

        Ok(Arc::new(ServerContext::new(db, gate, self.clone())))
    }

    pub fn build_restful_server(&self, ctx: Arc<ServerContext>) -> Result<RestfulServer> {
        let mut srv = RestfulServer::new(self.bind.clone(), ctx);
        if self.ssl {
            let ssl = self.build_ssl()?;
            srv.set_ssl(ssl);
        }

        if let Some(keep_alive_secs) = self.keep_alive_secs {
            srv.set_keep_alive_secs(keep_alive_secs);
        }

        if let Some(workers) = self.workers {
            srv.set_workers(workers);
        }

        if let Some(payload_limit_mib) = self.payload_limit_mib {
            srv.set_payload_limit_mib(payload_limit_mib);
        }

        Ok(srv)
    }

    fn build_ssl(&self) -> Result<SslAcceptorBuilder> {
        let key_path = self.pki_dir.join("key.pem");
        if !key_path.exists() {
            bail!("ssl key file not exists: {:?}", key_path);
        }

        let cert_path = self.pki_dir.join("cert.pem");
        if !cert_path.exists() {
            bail!("ssl cert file not exists: {:?}", cert_path);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&key_path, SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&cert_path)
            .context("load ssl cert file")?;

        Ok(builder)
    }

    fn default_bind() -> String {
        String::from("127.0.0.1:5000")
    }

    fn default_cors_allow_origin() -> String {
        String::from("*")
    }
}
