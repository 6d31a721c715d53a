use axum::{extract::State, response::IntoResponse, Json};
use chrono::NaiveDate;
use db::{
    meal_plans::{MealInput, MealPlan, MAX_RANGE_DAYS},
    recipes::Recipe,
};
use kitchen::DateRange;
use serde::Deserialize;

use crate::{
    http_server::{
        extract::{ApiJson, ApiQuery},
        Data, ResponseResult,
    },
    AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct RangeQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateQuery {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplaceDayRequest {
    #[serde(default)]
    meals: Vec<MealInput>,
}

pub(crate) async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ResponseResult {
    let range = DateRange::new(query.start_date, query.end_date)?;
    if range.span_days() > MAX_RANGE_DAYS {
        return Err(kitchen::Error::invalid(format!(
            "date range cannot exceed {MAX_RANGE_DAYS} days"
        ))
        .into());
    }

    let days = MealPlan::days_in_range(&state.db, range).await?;

    Ok(Json(Data { data: days }).into_response())
}

pub(crate) async fn show(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ResponseResult {
    let plan = MealPlan::day(&state.db, query.date).await?;

    Ok(Json(Data { data: plan }).into_response())
}

/// Replace everything planned for one day. Every entry is checked before
/// anything is written.
#[axum_macros::debug_handler]
pub(crate) async fn replace(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateQuery>,
    ApiJson(request): ApiJson<ReplaceDayRequest>,
) -> ResponseResult {
    for meal in &request.meals {
        meal.validate()?;
    }

    let mut recipe_ids = request
        .meals
        .iter()
        .filter_map(|meal| meal.recipe_id)
        .collect::<Vec<_>>();
    recipe_ids.sort_unstable();
    recipe_ids.dedup();

    let existing = Recipe::existing_ids(&state.db, &recipe_ids).await?;
    if let Some(missing) = recipe_ids.iter().find(|id| !existing.contains(id)) {
        return Err(kitchen::Error::not_found(format!("Recipe {missing} not found")).into());
    }

    let plan = MealPlan::replace_day(&state.db, query.date, &request.meals).await?;

    Ok(Json(Data { data: plan }).into_response())
}
