use super::auth::AuthGate;
use super::config::ServerConfig;
use super::db::Database;

/// State shared by all request handlers.
pub struct ServerContext {
    pub db: Database,

    pub gate: AuthGate,

    pub cfg: ServerConfig,
}

impl ServerContext {
    pub fn new(db: Database, gate: AuthGate, cfg: ServerConfig) -> Self {
        Self { db, gate, cfg }
    }
}
