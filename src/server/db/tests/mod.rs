
use anyhow::{bail, Result};

use crate::api::drink::Ingredient;

use super::types::CreateDrinkParams;
use super::Database;

pub fn run_tests(db: &Database) {
    drink::run_drink_tests(db);

    test_rollback(db);
}

fn test_rollback(db: &Database) {
    let result: Result<()> = db.with_transaction(|tx| {
        tx.create_drink(CreateDrinkParams {
            title: String::from("none"),
            recipe: vec![Ingredient {
                name: String::from("air"),
                color: String::from("clear"),
                parts: 1,
            }],
        })
        .unwrap();

        bail!("rollback");
    });
    assert!(result.is_err());

    db.with_transaction(|tx| {
        assert!(!tx.has_drink_title("none", None)?);
        Ok(())
    })
    .unwrap();
}
