use serde::{Deserialize, Serialize};

// === Drinks ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// Ingredient as shown to unauthenticated callers: no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientShort {
    pub color: String,
    pub parts: u32,
}

impl From<Ingredient> for IngredientShort {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            color: ingredient.color,
            parts: ingredient.parts,
        }
    }
}

/// Stored drink row. `recipe` holds the serialized ingredient list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drink {
    pub id: u64,
    pub title: String,
    pub recipe: String,
}

impl Drink {
    pub fn ingredients(&self) -> serde_json::Result<Vec<Ingredient>> {
        serde_json::from_str(&self.recipe)
    }

    pub fn short(&self) -> serde_json::Result<DrinkShort> {
        Ok(DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self.ingredients()?.into_iter().map(Into::into).collect(),
        })
    }

    pub fn long(&self) -> serde_json::Result<DrinkLong> {
        Ok(DrinkLong {
            id: self.id,
            title: self.title.clone(),
            recipe: self.ingredients()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DrinkShort {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<IngredientShort>,
}

#[derive(Debug, Serialize)]
pub struct DrinkLong {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Clients send either one ingredient or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl RecipeInput {
    pub fn into_ingredients(self) -> Vec<Ingredient> {
        match self {
            Self::Many(ingredients) => ingredients,
            Self::One(ingredient) => vec![ingredient],
        }
    }
}

// === Requests ===

#[derive(Debug, Default, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
}

// === Responses ===

#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct DrinkResponse {
    pub success: bool,
    pub drink: Vec<DrinkLong>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub state: &'static str,
}

// === Errors ===

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error,
            message: message.into(),
        }
    }
}
