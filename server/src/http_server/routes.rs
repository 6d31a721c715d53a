use axum::{
    http::{StatusCode, Uri},
    routing::{get, patch, post},
    Router,
};
use color_eyre::eyre::eyre;

use super::{
    api::{cookbooks, grocery_lists, health, meal_plans, menu, recipes},
    errors::ServerError,
};
use crate::AppState;

pub(crate) fn make_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_routes())
        .fallback(fallback)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/menu/recommend", post(menu::recommend))
        .route(
            "/grocery-lists",
            get(grocery_lists::index).post(grocery_lists::generate),
        )
        .route(
            "/grocery-lists/items/{item_id}",
            patch(grocery_lists::update_item_status),
        )
        .route(
            "/grocery-lists/{id}",
            get(grocery_lists::show).delete(grocery_lists::destroy),
        )
        .route("/grocery-lists/{id}/items", post(grocery_lists::add_item))
        .route("/recipes", get(recipes::index).post(recipes::create))
        .route(
            "/recipes/{id}",
            get(recipes::show)
                .put(recipes::update)
                .delete(recipes::destroy),
        )
        .route("/cookbooks", get(cookbooks::index).post(cookbooks::create))
        .route(
            "/cookbooks/{id}",
            get(cookbooks::show)
                .put(cookbooks::update)
                .delete(cookbooks::destroy),
        )
        .route(
            "/cookbooks/{id}/recipes/{recipe_id}",
            post(cookbooks::add_recipe).delete(cookbooks::remove_recipe),
        )
        .route("/meal-plans", get(meal_plans::index))
        .route(
            "/meal-plans/date",
            get(meal_plans::show).put(meal_plans::replace),
        )
}

async fn fallback(uri: Uri) -> ServerError {
    ServerError(eyre!("No route for {}", uri.path()), StatusCode::NOT_FOUND)
}
