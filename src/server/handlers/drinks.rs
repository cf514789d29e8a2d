use std::sync::Arc;

use actix_web::web::{Bytes, Data};
use actix_web::{HttpRequest, HttpResponse};
use anyhow::{Context, Result};
use log::{debug, error, info};

use crate::api::drink::{CreateDrinkRequest, Drink, Ingredient, PatchDrinkRequest};
use crate::auth_request;
use crate::server::auth::Permission;
use crate::server::context::ServerContext;
use crate::server::db::types::{CreateDrinkParams, PatchDrinkParams};
use crate::server::response::Response;

enum CreateResult {
    Created(Drink),
    Conflict(String),
}

enum PatchResult {
    Updated(Drink),
    NotFound,
    Rejected(String),
}

macro_rules! read_body {
    ($body:expr) => {
        match $body {
            Ok(body) => body,
            Err(err) => {
                debug!("Reject request body: {err}");
                return Response::payload_error(&err).into();
            }
        }
    };
}

/// `GET /drinks`, public short view of the catalog.
pub async fn get_drinks(sc: Data<Arc<ServerContext>>) -> HttpResponse {
    match sc.db.with_transaction(|tx| tx.list_drinks()) {
        Ok(drinks) => Response::drinks(drinks.iter().map(Drink::short).collect()).into(),
        Err(e) => {
            error!("List drinks error: {e:#}");
            Response::database_error().into()
        }
    }
}

/// `GET /drinks-detail`
pub async fn get_drinks_detail(req: HttpRequest, sc: Data<Arc<ServerContext>>) -> HttpResponse {
    let claims = auth_request!(sc, req, Permission::GET_DRINKS_DETAIL);
    debug!("List drinks detail for '{}'", claims.subject);

    match sc.db.with_transaction(|tx| tx.list_drinks()) {
        Ok(drinks) => Response::drinks(drinks.iter().map(Drink::long).collect()).into(),
        Err(e) => {
            error!("List drinks detail error: {e:#}");
            Response::database_error().into()
        }
    }
}

/// `POST /drinks`
pub async fn post_drink(
    req: HttpRequest,
    body: Result<Bytes, actix_web::Error>,
    sc: Data<Arc<ServerContext>>,
) -> HttpResponse {
    let claims = auth_request!(sc, req, Permission::POST_DRINKS);
    let body = read_body!(body);

    let params = match parse_create(&body) {
        Ok(params) => params,
        Err(e) => {
            debug!("Reject create drink: {e:#}");
            return Response::unprocessable().into();
        }
    };

    let result = sc.db.with_transaction(|tx| {
        if tx.has_drink_title(&params.title, None)? {
            return Ok(CreateResult::Conflict(format!(
                "title '{}' already exists",
                params.title
            )));
        }
        let id = tx.create_drink(params)?;
        Ok(CreateResult::Created(tx.get_drink(id)?))
    });

    match result {
        Ok(CreateResult::Created(drink)) => {
            info!(
                "Drink {} '{}' created by '{}'",
                drink.id, drink.title, claims.subject
            );
            Response::drinks(vec![drink.long()]).into()
        }
        Ok(CreateResult::Conflict(reason)) => {
            debug!("Reject create drink: {reason}");
            Response::unprocessable().into()
        }
        Err(e) => {
            error!("Create drink error: {e:#}");
            Response::database_error().into()
        }
    }
}

/// `PATCH /drinks/{id}`, only the fields present in the body change.
pub async fn patch_drink(
    req: HttpRequest,
    body: Result<Bytes, actix_web::Error>,
    sc: Data<Arc<ServerContext>>,
) -> HttpResponse {
    let claims = auth_request!(sc, req, Permission::PATCH_DRINKS);
    let body = read_body!(body);

    let id = match parse_id(&req) {
        Some(id) => id,
        None => return Response::not_found().into(),
    };
    // A missing drink wins over a bad body, so parsing is checked inside the
    // transaction.
    let patch = parse_patch(id, &body);

    let result = sc.db.with_transaction(|tx| {
        if !tx.has_drink(id)? {
            return Ok(PatchResult::NotFound);
        }
        let params = match patch {
            Ok(params) => params,
            Err(e) => return Ok(PatchResult::Rejected(format!("{e:#}"))),
        };
        if let Some(title) = params.title.as_ref() {
            if tx.has_drink_title(title, Some(id))? {
                return Ok(PatchResult::Rejected(format!("title '{title}' already exists")));
            }
        }
        tx.update_drink(params)?;
        Ok(PatchResult::Updated(tx.get_drink(id)?))
    });

    match result {
        Ok(PatchResult::Updated(drink)) => {
            info!("Drink {} updated by '{}'", drink.id, claims.subject);
            Response::drinks(vec![drink.long()]).into()
        }
        Ok(PatchResult::NotFound) => Response::not_found().into(),
        Ok(PatchResult::Rejected(reason)) => {
            debug!("Reject patch drink {id}: {reason}");
            Response::unprocessable().into()
        }
        Err(e) => {
            error!("Patch drink {id} error: {e:#}");
            Response::database_error().into()
        }
    }
}

/// `DELETE /drinks/{id}`, guarded by the same permission as updates.
pub async fn delete_drink(req: HttpRequest, sc: Data<Arc<ServerContext>>) -> HttpResponse {
    let claims = auth_request!(sc, req, Permission::PATCH_DRINKS);

    let id = match parse_id(&req) {
        Some(id) => id,
        None => return Response::not_found().into(),
    };

    let result = sc.db.with_transaction(|tx| {
        if !tx.has_drink(id)? {
            return Ok(false);
        }
        tx.delete_drink(id)?;
        Ok(true)
    });

    match result {
        Ok(true) => {
            info!("Drink {id} deleted by '{}'", claims.subject);
            Response::deleted(id).into()
        }
        Ok(false) => Response::not_found().into(),
        Err(e) => {
            error!("Delete drink {id} error: {e:#}");
            Response::database_error().into()
        }
    }
}

fn parse_id(req: &HttpRequest) -> Option<u64> {
    req.match_info().get("id")?.parse().ok()
}

fn parse_create(body: &[u8]) -> Result<CreateDrinkParams> {
    let req: CreateDrinkRequest = serde_json::from_slice(body).context("decode body")?;

    let title = req.title.trim().to_string();
    Drink::validate_title(&title)?;

    let recipe: Vec<Ingredient> = req.recipe.into();
    Drink::validate_recipe(&recipe)?;

    Ok(CreateDrinkParams { title, recipe })
}

fn parse_patch(id: u64, body: &[u8]) -> Result<PatchDrinkParams> {
    let mut req: PatchDrinkRequest = serde_json::from_slice(body).context("decode body")?;
    req.id = id;

    let title = match req.title {
        Some(title) => {
            let title = title.trim().to_string();
            Drink::validate_title(&title)?;
            Some(title)
        }
        None => None,
    };

    let recipe = match req.recipe {
        Some(recipe) => {
            let recipe: Vec<Ingredient> = recipe.into();
            Drink::validate_recipe(&recipe)?;
            Some(recipe)
        }
        None => None,
    };

    Ok(PatchDrinkParams {
        id: req.id,
        title,
        recipe,
    })
}
