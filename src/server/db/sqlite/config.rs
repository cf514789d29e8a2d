use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::SqliteConnection;

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct SqliteConfig {
    #[serde(default)]
    pub memory: bool,

    /// Database file, default is `coffee.db` under the data directory.
    #[serde(default)]
    pub path: PathBuf,
}

impl CommonConfig for SqliteConfig {
    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        if self.memory {
            return Ok(());
        }

        if self.path.as_os_str().is_empty() {
            self.path = ps.data_dir.join("coffee.db");
        }

        Ok(())
    }
}

impl SqliteConfig {
    pub fn build(&self) -> Result<SqliteConnection> {
        if self.memory {
            SqliteConnection::memory()
        } else {
            SqliteConnection::open(&self.path)
        }
    }
}
