mod drink;

pub mod config;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;

use crate::api::drink::Drink;

use super::types::{Connection, CreateDrinkParams, PatchDrinkParams, Transaction};

/// SQLite-backed storage, either a database file or an in-memory database.
pub struct SqliteConnection {
    conn: RawConnection,
}

pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl SqliteConnection {
    /// Opens a SQLite database file, creating it and its tables if they don't
    /// exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Content is lost when the process exits.
    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    fn init_tables(conn: &RawConnection) -> Result<()> {
        drink::create_table(conn)?;
        Ok(())
    }
}

impl<'a> Connection<'a, SqliteTransaction<'a>> for SqliteConnection {
    fn transaction(&'a mut self) -> Result<SqliteTransaction<'a>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_drink(&self, params: CreateDrinkParams) -> Result<u64> {
        drink::create(&self.tx, params)
    }

    fn update_drink(&self, params: PatchDrinkParams) -> Result<()> {
        drink::update(&self.tx, params)
    }

    fn delete_drink(&self, id: u64) -> Result<()> {
        drink::delete(&self.tx, id)
    }

    fn get_drink(&self, id: u64) -> Result<Drink> {
        drink::get(&self.tx, id)
    }

    fn has_drink(&self, id: u64) -> Result<bool> {
        drink::has(&self.tx, id)
    }

    fn has_drink_title(&self, title: &str, exclude_id: Option<u64>) -> Result<bool> {
        drink::has_title(&self.tx, title, exclude_id)
    }

    fn list_drinks(&self) -> Result<Vec<Drink>> {
        drink::list(&self.tx)
    }

    fn reset_drinks(&self) -> Result<()> {
        drink::reset(&self.tx)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
