mod sql;
mod sqlite;

#[cfg(test)]
mod tests;

pub mod config;
pub mod types;

use std::cell::RefCell;
use std::sync::Mutex;

use anyhow::{bail, Result};
use sqlite::{SqliteConnection, SqliteTransaction};
use types::{Connection, CreateDrinkParams, PatchDrinkParams, Transaction};

use crate::api::drink::Drink;

pub struct Database {
    conn: Mutex<RefCell<UnionConnection>>,
}

impl Database {
    pub fn new(conn: UnionConnection) -> Self {
        Self {
            conn: Mutex::new(RefCell::new(conn)),
        }
    }

    /// An empty in-memory database.
    pub fn memory() -> Result<Self> {
        let conn = SqliteConnection::memory()?;
        Ok(Self::new(UnionConnection::Sqlite(conn)))
    }

    /// Runs `f` inside one transaction: committed when `f` succeeds, rolled
    /// back otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock connection: {:#}", e),
        };
        let mut conn = conn.borrow_mut();
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }
}

pub enum UnionConnection {
    Sqlite(SqliteConnection),
}

pub enum UnionTransaction<'a> {
    Sqlite(SqliteTransaction<'a>),
}

impl<'a> Connection<'a, UnionTransaction<'a>> for UnionConnection {
    fn transaction(&'a mut self) -> Result<UnionTransaction<'a>> {
        match self {
            UnionConnection::Sqlite(conn) => conn.transaction().map(UnionTransaction::Sqlite),
        }
    }
}

impl Transaction for UnionTransaction<'_> {
    fn create_drink(&self, params: CreateDrinkParams) -> Result<u64> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_drink(params),
        }
    }

    fn update_drink(&self, params: PatchDrinkParams) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_drink(params),
        }
    }

    fn delete_drink(&self, id: u64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_drink(id),
        }
    }

    fn get_drink(&self, id: u64) -> Result<Drink> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_drink(id),
        }
    }

    fn has_drink(&self, id: u64) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.has_drink(id),
        }
    }

    fn has_drink_title(&self, title: &str, exclude_id: Option<u64>) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.has_drink_title(title, exclude_id),
        }
    }

    fn list_drinks(&self) -> Result<Vec<Drink>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_drinks(),
        }
    }

    fn reset_drinks(&self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.reset_drinks(),
        }
    }

    fn commit(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.rollback(),
        }
    }
}
