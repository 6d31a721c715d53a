use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use db::{recipes::RecipeWithDetails, PgPool};
use kitchen::{Normalizer, RecipeRecommendation};
use serde::{Deserialize, Serialize};

use crate::http_server::{extract::ApiJson, DataWithMeta, ResponseResult};

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendRequest {
    #[serde(default)]
    ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Recommendation<'a> {
    #[serde(flatten)]
    scored: &'a RecipeRecommendation<'a, RecipeWithDetails>,
    /// `match_score` rounded for display.
    display_score: u8,
}

#[derive(Debug, Serialize)]
struct RecommendMeta<'a> {
    provided_ingredients: &'a [String],
    total_recipes_found: usize,
}

#[axum_macros::debug_handler(state = crate::AppState)]
pub(crate) async fn recommend(
    State(db): State<PgPool>,
    State(normalizer): State<Arc<Normalizer>>,
    ApiJson(request): ApiJson<RecommendRequest>,
) -> ResponseResult {
    let recipes = RecipeWithDetails::list_all(&db).await?;

    let ranked = kitchen::recommend(&request.ingredients, &recipes, &normalizer)?;

    let data = ranked
        .iter()
        .map(|scored| Recommendation {
            scored,
            display_score: scored.display_score(),
        })
        .collect::<Vec<_>>();

    Ok(Json(DataWithMeta {
        data,
        meta: RecommendMeta {
            provided_ingredients: &request.ingredients,
            total_recipes_found: ranked.len(),
        },
    })
    .into_response())
}
