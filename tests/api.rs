mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{Method, StatusCode};
use actix_web::web::Data;
use actix_web::{test, web, App, HttpResponse, HttpServer};
use coffee_shop::server::auth::keys::HttpKeyFetcher;
use common::{context, StaticKeyFetcher, SIGNER};
use serde_json::{json, Value};

async fn error_code(resp: actix_web::dev::ServiceResponse) -> String {
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    body["code"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn test_public_list() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher.clone()));

    let req = test::TestRequest::get().uri("/drinks").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "drinks": [{"id": 1, "title": "water", "recipe": [{"color": "blue", "parts": 1}]}],
        })
    );
    assert_eq!(fetcher.count(), 0);
}

#[actix_web::test]
async fn test_detail_requires_header() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher.clone()));

    let req = test::TestRequest::get().uri("/drinks-detail").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "missing_header");

    let req = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(("Authorization", "Token abc"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "malformed_header");

    assert_eq!(fetcher.count(), 0);
}

#[actix_web::test]
async fn test_detail_scope() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher));

    let req = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(("Authorization", SIGNER.bearer(&["post:drinks"])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, "insufficient_scope");

    let req = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(("Authorization", SIGNER.bearer(&["get:drinks-detail"])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["drinks"][0]["recipe"][0],
        json!({"name": "water", "color": "blue", "parts": 1})
    );
}

#[actix_web::test]
async fn test_patch_missing_drink() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher));

    let req = test::TestRequest::patch()
        .uri("/drinks/5")
        .insert_header(("Authorization", SIGNER.bearer(&["patch:drinks"])))
        .set_json(json!({"title": "ristretto"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, "resource_not_found");

    // The missing drink is reported even when the body is unusable.
    let req = test::TestRequest::patch()
        .uri("/drinks/5")
        .insert_header(("Authorization", SIGNER.bearer(&["patch:drinks"])))
        .set_payload("not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::patch()
        .uri("/drinks/abc")
        .insert_header(("Authorization", SIGNER.bearer(&["patch:drinks"])))
        .set_json(json!({"title": "ristretto"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_drink_lifecycle() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher.clone()));
    let manager = SIGNER.bearer(&["get:drinks-detail", "post:drinks", "patch:drinks"]);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", manager.clone()))
        .set_json(json!({
            "title": "latte",
            "recipe": [
                {"name": "espresso", "color": "brown", "parts": 1},
                {"name": "milk", "color": "white", "parts": 3},
            ],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["id"], 2);
    assert_eq!(body["drinks"][0]["recipe"][1]["name"], "milk");

    // Duplicate title.
    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", manager.clone()))
        .set_json(json!({
            "title": "latte",
            "recipe": {"name": "milk", "color": "white", "parts": 1},
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(resp).await, "validation_failed");

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", manager.clone()))
        .set_json(json!({"title": "empty", "recipe": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::patch()
        .uri("/drinks/2")
        .insert_header(("Authorization", manager.clone()))
        .set_json(json!({"title": "flat white"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["drinks"][0]["title"], "flat white");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "espresso");

    let req = test::TestRequest::patch()
        .uri("/drinks/2")
        .insert_header(("Authorization", manager.clone()))
        .set_json(json!({"title": "water"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::delete()
        .uri("/drinks/2")
        .insert_header(("Authorization", SIGNER.bearer(&["post:drinks"])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/drinks/2")
        .insert_header(("Authorization", manager.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"success": true, "delete": 2}));

    let req = test::TestRequest::delete()
        .uri("/drinks/2")
        .insert_header(("Authorization", manager))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/drinks").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["drinks"].as_array().unwrap().len(), 1);

    // Every token above shares one key, fetched once.
    assert_eq!(fetcher.count(), 1);
}

#[actix_web::test]
async fn test_routes() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher));

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/drinks-detail")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization"
    );
    assert_eq!(
        resp.headers().get("access-control-allow-methods").unwrap(),
        "GET, POST, PATCH, DELETE, OPTIONS"
    );

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/anywhere")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/coffee-beans").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, "resource_not_found");

    let req = test::TestRequest::get().uri("/healthz").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert!(body["version"].as_str().is_some());
    assert!(body["timestamp"].as_u64().unwrap() > 0);
}

#[actix_web::test]
async fn test_single_flight_key_fetch() {
    let hits = Data::new(AtomicUsize::new(0));
    let server_hits = hits.clone();
    let srv = HttpServer::new(move || {
        App::new().app_data(server_hits.clone()).route(
            "/.well-known/jwks.json",
            web::get().to(|hits: Data<AtomicUsize>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                HttpResponse::Ok().json(SIGNER.key_set())
            }),
        )
    })
    .workers(1)
    .bind("127.0.0.1:0")
    .unwrap();
    let addr = srv.addrs()[0];
    let srv = srv.run();
    let handle = srv.handle();
    actix_web::rt::spawn(srv);

    let url = format!("http://{addr}/.well-known/jwks.json");
    let fetcher = HttpKeyFetcher::new(&url, Duration::from_secs(5)).unwrap();
    let app = init_app!(context(Arc::new(fetcher)));

    let token = SIGNER.bearer(&["get:drinks-detail"]);
    let first = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let second = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(("Authorization", token))
        .to_request();

    let (first, second) = tokio::join!(
        test::call_service(&app, first),
        test::call_service(&app, second)
    );
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_oversized_body() {
    let fetcher = Arc::new(StaticKeyFetcher::new(&SIGNER));
    let app = init_app!(context(fetcher));
    let body = format!(
        r#"{{"title": "{}", "recipe": []}}"#,
        "x".repeat(300 * 1024)
    );

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", SIGNER.bearer(&["post:drinks"])))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(
        json,
        json!({
            "success": false,
            "error": 413,
            "code": "payload_too_large",
            "message": "payload too large",
        })
    );

    let req = test::TestRequest::patch()
        .uri("/drinks/1")
        .insert_header(("Authorization", SIGNER.bearer(&["patch:drinks"])))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_code(resp).await, "payload_too_large");

    // Authorization is still decided first
    let req = test::TestRequest::post()
        .uri("/drinks")
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "missing_header");
}
