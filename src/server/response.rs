use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;

use crate::api::{
    DeleteResponse, DrinksResponse, ErrorResponse, CODE_INTERNAL_ERROR, CODE_PAYLOAD_TOO_LARGE,
    CODE_RESOURCE_NOT_FOUND, CODE_VALIDATION_FAILED, MESSAGE_INTERNAL_ERROR,
    MESSAGE_PAYLOAD_TOO_LARGE, MESSAGE_RESOURCE_NOT_FOUND, MESSAGE_VALIDATION_FAILED,
};

use super::auth::AuthError;

/// A wrapper around [`HttpResponse`] that keeps every body in the JSON
/// shapes of [`crate::api`].
pub struct Response {
    http_response: HttpResponse,
}

impl Response {
    pub fn drinks<T: Serialize>(drinks: Vec<T>) -> Self {
        Self::json(DrinksResponse::new(drinks))
    }

    pub fn deleted(id: u64) -> Self {
        Self::json(DeleteResponse {
            success: true,
            delete: id,
        })
    }

    pub fn json<T: Serialize>(data: T) -> Self {
        Self {
            http_response: HttpResponse::Ok().json(data),
        }
    }

    pub fn auth_error(err: &AuthError) -> Self {
        Self::err_response(err.status(), err.code(), err.to_string())
    }

    pub fn not_found() -> Self {
        Self::err_response(
            StatusCode::NOT_FOUND,
            CODE_RESOURCE_NOT_FOUND,
            MESSAGE_RESOURCE_NOT_FOUND.to_string(),
        )
    }

    pub fn unprocessable() -> Self {
        Self::err_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            CODE_VALIDATION_FAILED,
            MESSAGE_VALIDATION_FAILED.to_string(),
        )
    }

    /// Maps a failure to read the request body. Oversized bodies answer 413,
    /// anything else is treated as an unusable payload.
    pub fn payload_error(err: &actix_web::Error) -> Self {
        if err.as_response_error().status_code() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::err_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                CODE_PAYLOAD_TOO_LARGE,
                MESSAGE_PAYLOAD_TOO_LARGE.to_string(),
            );
        }
        Self::unprocessable()
    }

    pub fn database_error() -> Self {
        Self::err_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            CODE_INTERNAL_ERROR,
            MESSAGE_INTERNAL_ERROR.to_string(),
        )
    }

    fn err_response(status: StatusCode, code: &str, message: String) -> Self {
        let resp = ErrorResponse {
            success: false,
            error: status.as_u16(),
            code: code.to_string(),
            message,
        };
        Self {
            http_response: HttpResponseBuilder::new(status).json(resp),
        }
    }
}

impl From<Response> for HttpResponse {
    fn from(val: Response) -> Self {
        val.http_response
    }
}
