use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use color_eyre::eyre::eyre;
use db::recipes::{Recipe, RecipeInput, RecipeWithDetails};
use uuid::Uuid;

use crate::{
    http_server::{
        current_user::CurrentUser, errors::WithStatus as _, extract::ApiJson, Data,
        ResponseResult,
    },
    AppState,
};

pub(crate) async fn index(State(state): State<AppState>) -> ResponseResult {
    let recipes = RecipeWithDetails::list_all(&state.db).await?;

    Ok(Json(Data { data: recipes }).into_response())
}

pub(crate) async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> ResponseResult {
    let recipe = RecipeWithDetails::get(&state.db, id)
        .await?
        .ok_or_else(|| eyre!("Recipe {id} not found"))
        .with_status(StatusCode::NOT_FOUND)?;

    Ok(Json(Data { data: recipe }).into_response())
}

#[axum_macros::debug_handler]
pub(crate) async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<RecipeInput>,
) -> ResponseResult {
    input.validate()?;

    let recipe = Recipe::create(&state.db, user.user_id, &input).await?;

    Ok((StatusCode::CREATED, Json(Data { data: recipe })).into_response())
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<RecipeInput>,
) -> ResponseResult {
    input.validate()?;

    let recipe = Recipe::update(&state.db, id, &input)
        .await?
        .ok_or_else(|| eyre!("Recipe {id} not found"))
        .with_status(StatusCode::NOT_FOUND)?;

    Ok(Json(Data { data: recipe }).into_response())
}

pub(crate) async fn destroy(State(state): State<AppState>, Path(id): Path<Uuid>) -> ResponseResult {
    if !Recipe::delete(&state.db, id).await? {
        return Err(eyre!("Recipe {id} not found")).with_status(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}
