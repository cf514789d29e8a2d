use anyhow::Result;

use crate::api::drink::{Drink, Ingredient};

pub trait Connection<'a, T>
where
    T: Transaction + 'a,
{
    fn transaction(&'a mut self) -> Result<T>;
}

pub trait Transaction {
    fn create_drink(&self, params: CreateDrinkParams) -> Result<u64>;
    fn update_drink(&self, params: PatchDrinkParams) -> Result<()>;
    fn delete_drink(&self, id: u64) -> Result<()>;
    fn get_drink(&self, id: u64) -> Result<Drink>;
    fn has_drink(&self, id: u64) -> Result<bool>;
    fn has_drink_title(&self, title: &str, exclude_id: Option<u64>) -> Result<bool>;
    fn list_drinks(&self) -> Result<Vec<Drink>>;

    /// Drops every drink and seeds the catalog with its starter entry.
    fn reset_drinks(&self) -> Result<()>;

    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct CreateDrinkParams {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

#[derive(Debug, Default, Clone)]
pub struct PatchDrinkParams {
    pub id: u64,
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}
