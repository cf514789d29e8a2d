use actix_web::HttpResponse;
use chrono::Utc;

use crate::api::HealthResponse;
use crate::server::response::Response;

/// `GET /healthz`
pub async fn get_healthz() -> HttpResponse {
    let now = Utc::now().timestamp() as u64;
    Response::json(HealthResponse {
        success: true,
        version: env!("COFFEE_SHOP_VERSION").to_string(),
        timestamp: now,
    })
    .into()
}
