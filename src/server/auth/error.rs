use actix_web::http::StatusCode;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use thiserror::Error;

/// Why a request was refused by the authorization gate.
///
/// Every variant except [`AuthError::InsufficientScope`] means the caller
/// could not be authenticated (401); missing scope means the caller is known
/// but not allowed (403).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is expected")]
    MissingHeader,

    #[error("authorization header must be in the form 'Bearer <token>'")]
    MalformedHeader,

    #[error("unable to parse authentication token: {0}")]
    MalformedToken(String),

    #[error("unable to find the signing key '{0}'")]
    KeyNotFound(String),

    #[error("fetching signing keys timed out")]
    KeyFetchTimeout,

    #[error("fetching signing keys failed: {0}")]
    KeyFetchFailed(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token expired")]
    TokenExpired,

    #[error("token is not valid yet")]
    TokenNotYetValid,

    #[error("incorrect issuer, please check the issuer")]
    InvalidIssuer,

    #[error("incorrect audience, please check the audience")]
    InvalidAudience,

    #[error("permission '{0}' not found")]
    InsufficientScope(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader => "malformed_header",
            Self::MalformedToken(_) => "malformed_token",
            Self::KeyNotFound(_) => "key_not_found",
            Self::KeyFetchTimeout => "key_fetch_timeout",
            Self::KeyFetchFailed(_) => "key_fetch_failed",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::InsufficientScope(_) => "insufficient_scope",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InsufficientScope(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::Crypto(_) => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::ImmatureSignature => Self::TokenNotYetValid,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            _ => Self::MalformedToken(err.to_string()),
        }
    }
}
