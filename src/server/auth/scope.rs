use std::fmt;

use super::verifier::Claims;
use super::AuthError;

/// A capability a route requires, matched literally against the token's
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission(&'static str);

impl Permission {
    pub const GET_DRINKS_DETAIL: Permission = Permission("get:drinks-detail");
    pub const POST_DRINKS: Permission = Permission("post:drinks");
    pub const PATCH_DRINKS: Permission = Permission("patch:drinks");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Allows the request iff `required` is in the token's scope. There is no
/// wildcard, an empty scope allows nothing.
pub fn authorize(claims: &Claims, required: Permission) -> Result<(), AuthError> {
    if claims.scope.contains(required.as_str()) {
        return Ok(());
    }
    Err(AuthError::InsufficientScope(required.to_string()))
}
