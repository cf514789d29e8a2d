use std::sync::Arc;
use std::time::Duration;

use actix_web::http::Method;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::{self, Data, PayloadConfig};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use crate::api::{ErrorResponse, CODE_RESOURCE_NOT_FOUND};

use super::context::ServerContext;
use super::handlers::drinks;
use super::handlers::healthz;

pub struct RestfulServer {
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<ServerContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,

    payload_limit_mib: u64,
}

impl RestfulServer {
    const DEFAULT_PAYLOAD_LIMIT_MIB: u64 = 1;

    pub fn new(bind: String, ctx: Arc<ServerContext>) -> Self {
        Self {
            ssl: None,
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
            payload_limit_mib: Self::DEFAULT_PAYLOAD_LIMIT_MIB,
        }
    }

    pub fn set_ssl(&mut self, ssl: SslAcceptorBuilder) {
        self.ssl = Some(ssl);
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub fn set_payload_limit_mib(&mut self, payload_limit_mib: u64) {
        self.payload_limit_mib = payload_limit_mib;
    }

    pub async fn run(mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let payload_limit = self.payload_limit_mib.saturating_mul(1024 * 1024) as usize;
        let mut srv = HttpServer::new(move || {
            let origin = ctx.cfg.cors_allow_origin.clone();
            App::new()
                .wrap(cors_headers(&origin))
                .wrap(Logger::default())
                .app_data(Data::new(ctx.clone()))
                .app_data(PayloadConfig::new(payload_limit))
                .configure(configure)
        });

        if let Some(ssl) = self.ssl.take() {
            info!("Binding to https://{}", self.bind);
            srv = srv.bind_openssl(&self.bind, ssl).context("bind with ssl")?
        } else {
            warn!("Using HTTP (without SSL). THIS IS DANGEROUS, DO NOT USE IN PRODUCTION");
            info!("Binding to http://{}", self.bind);
            srv = srv.bind(&self.bind).context("bind without ssl")?
        };

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }
}

/// Registers every route of the coffee shop. Expects a
/// `Data<Arc<ServerContext>>` in the app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/drinks")
            .route(web::get().to(drinks::get_drinks))
            .route(web::post().to(drinks::post_drink))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::route().to(default_handler)),
    )
    .service(
        web::resource("/drinks-detail")
            .route(web::get().to(drinks::get_drinks_detail))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::route().to(default_handler)),
    )
    .service(
        web::resource("/drinks/{id}")
            .route(web::patch().to(drinks::patch_drink))
            .route(web::delete().to(drinks::delete_drink))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::route().to(default_handler)),
    )
    .service(
        web::resource("/healthz")
            .route(web::get().to(healthz::get_healthz))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::route().to(default_handler)),
    )
    .default_service(web::route().to(default_handler));
}

/// Headers attached to every response so browser clients on another origin
/// can call the API.
pub fn cors_headers(origin: &str) -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", origin.to_string()))
        .add(("Access-Control-Allow-Headers", "Content-Type, Authorization"))
        .add((
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, DELETE, OPTIONS",
        ))
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn default_handler(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return preflight().await;
    }

    let path = req.uri().path();
    let method = req.method().as_str();
    let ret = ErrorResponse {
        success: false,
        error: 404,
        code: CODE_RESOURCE_NOT_FOUND.to_string(),
        message: format!("No route to {method} {path}"),
    };
    HttpResponse::NotFound().json(ret)
}
