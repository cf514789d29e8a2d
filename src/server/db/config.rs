use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::sqlite::config::SqliteConfig;
use super::{Database, UnionConnection};

/// Database configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DbConfig {
    /// Database type to use
    #[serde(default)]
    pub name: DbType,

    /// SQLite configuration, only valid when database type is sqlite
    #[serde(default)]
    pub sqlite: SqliteConfig,

    /// Drop all drinks and seed the catalog when the server starts.
    #[serde(default)]
    pub reset: bool,
}

/// Database type
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub enum DbType {
    /// Use SQLite database
    #[serde(rename = "sqlite")]
    #[default]
    Sqlite,
}

impl CommonConfig for DbConfig {
    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.sqlite.complete(ps).context("sqlite")?;
        Ok(())
    }
}

impl DbConfig {
    pub fn build(&self) -> Result<Database> {
        let conn = match self.name {
            DbType::Sqlite => UnionConnection::Sqlite(self.sqlite.build().context("open sqlite")?),
        };
        let db = Database::new(conn);

        if self.reset {
            info!("Resetting drinks in database");
            db.with_transaction(|tx| tx.reset_drinks())
                .context("reset drinks")?;
        }

        Ok(db)
    }
}
