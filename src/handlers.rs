use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::de::DeserializeOwned;

use crate::auth::{DELETE_DRINKS, GET_DRINKS_DETAIL, PATCH_DRINKS, POST_DRINKS};
use crate::db::DbError;
use crate::error::{AppError, Result};
use crate::models::*;
use crate::AppState;

// === Helpers ===

/// Ids that are not integers cannot match any drink.
fn parse_id(raw: &str) -> Result<u64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// An empty body reads as a request with no fields set.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        tracing::info!(error = %err, "Unreadable request body");
        AppError::Invalid("malformed body")
    })
}

fn long_view(drink: &Drink) -> Result<DrinkLong> {
    drink
        .long()
        .map_err(|err| AppError::Unprocessable(DbError::Serialization(err)))
}

// === Public endpoints ===

pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkShort>>> {
    let drinks = state.db.list_drinks().map_err(AppError::Lookup)?;
    if drinks.is_empty() {
        return Err(AppError::NotFound);
    }

    let drinks = drinks
        .iter()
        .map(Drink::short)
        .collect::<serde_json::Result<Vec<_>>>()
        .map_err(|err| AppError::Lookup(err.into()))?;

    Ok(Json(DrinksResponse {
        success: true,
        drinks,
    }))
}

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        state: "OK",
    })
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

// === Protected endpoints ===

pub async fn list_drinks_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DrinksResponse<DrinkLong>>> {
    state.auth.require(&headers, GET_DRINKS_DETAIL).await?;

    let drinks = state.db.list_drinks().map_err(AppError::Lookup)?;
    if drinks.is_empty() {
        return Err(AppError::NotFound);
    }

    let drinks = drinks
        .iter()
        .map(Drink::long)
        .collect::<serde_json::Result<Vec<_>>>()
        .map_err(|err| AppError::Lookup(err.into()))?;

    Ok(Json(DrinksResponse {
        success: true,
        drinks,
    }))
}

pub async fn create_drink(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DrinkResponse>> {
    let claims = state.auth.require(&headers, POST_DRINKS).await?;

    let req: CreateDrinkRequest = parse_body(&body)?;
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::Invalid("title is required"))?;
    let recipe = req
        .recipe
        .map(RecipeInput::into_ingredients)
        .ok_or(AppError::Invalid("recipe is required"))?;

    let drink = state
        .db
        .create_drink(&title, &recipe)
        .map_err(AppError::Unprocessable)?;
    tracing::info!(id = drink.id, title = %drink.title, sub = ?claims.sub, "Drink created");

    Ok(Json(DrinkResponse {
        success: true,
        drink: vec![long_view(&drink)?],
    }))
}

pub async fn update_drink(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DrinkResponse>> {
    let claims = state.auth.require(&headers, PATCH_DRINKS).await?;
    let id = parse_id(&id)?;

    if state.db.get_drink(id).map_err(AppError::Lookup)?.is_none() {
        return Err(AppError::NotFound);
    }

    // Only the title is updatable.
    let req: UpdateDrinkRequest = parse_body(&body)?;
    let title = req.title.ok_or(AppError::BadRequest)?;
    if title.trim().is_empty() {
        return Err(AppError::Invalid("title must not be empty"));
    }

    let drink = state
        .db
        .rename_drink(id, &title)
        .map_err(AppError::Unprocessable)?
        .ok_or(AppError::NotFound)?;
    tracing::info!(id, title = %drink.title, sub = ?claims.sub, "Drink updated");

    Ok(Json(DrinkResponse {
        success: true,
        drink: vec![long_view(&drink)?],
    }))
}

pub async fn delete_drink(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let claims = state.auth.require(&headers, DELETE_DRINKS).await?;
    let id = parse_id(&id)?;

    if !state.db.delete_drink(id).map_err(AppError::Unprocessable)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(id, sub = ?claims.sub, "Drink deleted");

    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
