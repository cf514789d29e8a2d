mod error;

pub mod config;
pub mod gate;
pub mod keys;
pub mod scope;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::AuthError;
pub use gate::AuthGate;
pub use scope::{authorize, Permission};
pub use verifier::{Claims, JwtVerifier, TokenVerifier};

/// Runs the authorization gate for `$permission`. Evaluates to the verified
/// [`Claims`]; on failure, returns the error response from the enclosing
/// handler.
#[macro_export]
macro_rules! auth_request {
    ($sc:expr, $req:expr, $permission:expr) => {
        match $sc.gate.authorize_request(&$req, $permission).await {
            Ok(claims) => claims,
            Err(err) => return $crate::server::response::Response::auth_error(&err).into(),
        }
    };
}
