use std::sync::Arc;

use actix_web::http::header::{HeaderValue, AUTHORIZATION};
use actix_web::HttpRequest;
use log::debug;

use super::scope::{self, Permission};
use super::verifier::{Claims, TokenVerifier};
use super::AuthError;

/// Guards protected handlers.
///
/// A request moves through these states, and the first failure ends it:
///
/// ```text
/// NoToken --header ok--> TokenPresent --verified--> Verified --in scope--> Authorized
///    |                        |                        |
///    +---------------------> Rejected <----------------+
/// ```
///
/// Only an authorized request reaches the handler body; a request without a
/// usable header never reaches the verifier.
pub struct AuthGate {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    pub async fn authorize_request(
        &self,
        req: &HttpRequest,
        required: Permission,
    ) -> Result<Claims, AuthError> {
        let result = self
            .authorize_header(req.headers().get(AUTHORIZATION), required)
            .await;
        if let Err(ref err) = result {
            debug!(
                "Reject {} {} requiring '{required}': {err}",
                req.method(),
                req.path()
            );
        }
        result
    }

    pub async fn authorize_header(
        &self,
        header: Option<&HeaderValue>,
        required: Permission,
    ) -> Result<Claims, AuthError> {
        let token = extract_token(header)?;
        let claims = self.verifier.verify(token).await?;
        scope::authorize(&claims, required)?;
        Ok(claims)
    }
}

/// Takes the token out of an `Authorization: Bearer <token>` header.
pub fn extract_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let header = match header {
        Some(header) if !header.is_empty() => header,
        _ => return Err(AuthError::MissingHeader),
    };
    let value = header.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let parts = value.split(' ').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0] != "Bearer" || parts[1].is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(parts[1])
}
