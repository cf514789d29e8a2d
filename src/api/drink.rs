use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A catalog entry. Serialized as is, this is the long (detail) view.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Drink {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// Public view of a drink: ingredient names are hidden, only colors and
/// proportions are shown.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShortDrink {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

impl Drink {
    pub const MAX_TITLE_LENGTH: usize = 80;
    pub const MAX_INGREDIENTS: usize = 20;

    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|ingredient| ShortIngredient {
                    color: ingredient.color.clone(),
                    parts: ingredient.parts,
                })
                .collect(),
        }
    }

    pub fn long(&self) -> Drink {
        self.clone()
    }

    pub fn validate_title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            bail!("title is required");
        }
        if title.chars().count() > Self::MAX_TITLE_LENGTH {
            bail!("title is too long, max is {}", Self::MAX_TITLE_LENGTH);
        }
        Ok(())
    }

    pub fn validate_recipe(recipe: &[Ingredient]) -> Result<()> {
        if recipe.is_empty() {
            bail!("recipe requires at least one ingredient");
        }
        if recipe.len() > Self::MAX_INGREDIENTS {
            bail!("recipe has too many ingredients, max is {}", Self::MAX_INGREDIENTS);
        }
        for ingredient in recipe {
            if ingredient.name.trim().is_empty() {
                bail!("ingredient name is required");
            }
            if ingredient.color.trim().is_empty() {
                bail!("color of ingredient '{}' is required", ingredient.name);
            }
            if ingredient.parts == 0 {
                bail!("parts of ingredient '{}' must be positive", ingredient.name);
            }
        }
        Ok(())
    }
}

/// The recipe as clients send it: a list of ingredients, or a single
/// ingredient object.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum RecipePayload {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl From<RecipePayload> for Vec<Ingredient> {
    fn from(payload: RecipePayload) -> Self {
        match payload {
            RecipePayload::Many(recipe) => recipe,
            RecipePayload::One(ingredient) => vec![ingredient],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: RecipePayload,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PatchDrinkRequest {
    #[serde(skip)]
    pub id: u64,

    pub title: Option<String>,
    pub recipe: Option<RecipePayload>,
}
