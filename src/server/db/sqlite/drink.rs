use anyhow::{bail, Context, Result};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction};

use crate::api::drink::{Drink, Ingredient};
use crate::server::db::sql::{Select, Update};
use crate::server::db::types::{CreateDrinkParams, PatchDrinkParams};

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS drink (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    recipe TEXT NOT NULL
);
"#;

const DROP_TABLE_SQL: &str = "DROP TABLE IF EXISTS drink";

pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLE_SQL)?;
    Ok(())
}

pub fn create(tx: &Transaction, params: CreateDrinkParams) -> Result<u64> {
    let sql = "INSERT INTO drink (title, recipe) VALUES (?, ?)";
    let recipe = encode_recipe(&params.recipe)?;
    debug!("Database create_drink: {sql}, {}, {recipe}", params.title);

    tx.execute(sql, params![params.title, recipe])?;
    let id = tx.last_insert_rowid() as u64;

    Ok(id)
}

pub fn update(tx: &Transaction, params: PatchDrinkParams) -> Result<()> {
    let mut update = Update::new("drink");

    if let Some(title) = params.title {
        update.add_field("title", Value::Text(title));
    }

    if let Some(recipe) = params.recipe {
        update.add_field("recipe", Value::Text(encode_recipe(&recipe)?));
    }

    update.add_where("id = ?", Value::Integer(params.id as i64));

    let (sql, values) = update.build();
    if sql.is_empty() {
        return Ok(());
    }

    debug!("Database update_drink: {sql}, {values:?}");
    tx.execute(&sql, params_from_iter(values.iter()))?;

    Ok(())
}

pub fn delete(tx: &Transaction, id: u64) -> Result<()> {
    let sql = "DELETE FROM drink WHERE id = ?";
    debug!("Database delete_drink: {sql}, {id}");
    tx.execute(sql, params![id])?;
    Ok(())
}

pub fn get(tx: &Transaction, id: u64) -> Result<Drink> {
    let mut select = Select::new(vec!["id", "title", "recipe"], "drink");
    select.add_where("id = ?", Value::Integer(id as i64));

    let mut drinks = query_drinks(tx, select, "get_drink")?;
    match drinks.pop() {
        Some(drink) => Ok(drink),
        None => bail!("drink {id} not found"),
    }
}

pub fn has(tx: &Transaction, id: u64) -> Result<bool> {
    let mut select = Select::count("drink");
    select.add_where("id = ?", Value::Integer(id as i64));
    count(tx, select, "has_drink").map(|count| count > 0)
}

pub fn has_title(tx: &Transaction, title: &str, exclude_id: Option<u64>) -> Result<bool> {
    let mut select = Select::count("drink");
    select.add_where("title = ?", Value::Text(title.to_string()));
    if let Some(id) = exclude_id {
        select.add_where("id != ?", Value::Integer(id as i64));
    }
    count(tx, select, "has_drink_title").map(|count| count > 0)
}

pub fn list(tx: &Transaction) -> Result<Vec<Drink>> {
    let mut select = Select::new(vec!["id", "title", "recipe"], "drink");
    select.add_order_by("id ASC");
    query_drinks(tx, select, "list_drinks")
}

/// Recreates the table with a single starter drink.
pub fn reset(tx: &Transaction) -> Result<()> {
    debug!("Database reset_drinks: {DROP_TABLE_SQL}");
    tx.execute_batch(DROP_TABLE_SQL)?;
    tx.execute_batch(CREATE_TABLE_SQL)?;

    create(
        tx,
        CreateDrinkParams {
            title: String::from("water"),
            recipe: vec![Ingredient {
                name: String::from("water"),
                color: String::from("blue"),
                parts: 1,
            }],
        },
    )?;

    Ok(())
}

fn count(tx: &Transaction, select: Select, op: &str) -> Result<u64> {
    let (sql, values) = select.build();
    debug!("Database {op}: {sql}, {values:?}");

    let mut stmt = tx.prepare(&sql)?;
    let count: i64 = stmt.query_row(params_from_iter(values.iter()), |row| row.get(0))?;

    Ok(count as u64)
}

fn query_drinks(tx: &Transaction, select: Select, op: &str) -> Result<Vec<Drink>> {
    let (sql, values) = select.build();
    debug!("Database {op}: {sql}, {values:?}");

    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            let id: u64 = row.get(0)?;
            let title: String = row.get(1)?;
            let recipe: String = row.get(2)?;
            Ok((id, title, recipe))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut drinks = Vec::with_capacity(rows.len());
    for (id, title, recipe) in rows {
        let recipe: Vec<Ingredient> = serde_json::from_str(&recipe)
            .with_context(|| format!("decode recipe of drink {id}"))?;
        drinks.push(Drink { id, title, recipe });
    }

    Ok(drinks)
}

fn encode_recipe(recipe: &[Ingredient]) -> Result<String> {
    serde_json::to_string(recipe).context("encode recipe")
}
