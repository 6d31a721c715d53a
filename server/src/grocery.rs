use axum::http::StatusCode;
use color_eyre::eyre::eyre;
use db::{
    grocery_lists::{GroceryList, GroceryListWithItems},
    meal_plans::MealPlan,
    recipes::RecipeWithDetails,
};
use kitchen::{Anomaly, DateRange, PlannedMeal};
use uuid::Uuid;

use crate::{
    http_server::errors::{ServerError, WithStatus as _},
    AppState,
};

#[derive(Debug)]
pub(crate) struct Regenerated {
    pub list: GroceryListWithItems,
    pub anomalies: Vec<Anomaly>,
    /// True when this call inserted the list rather than regenerating one.
    pub created: bool,
}

/// Rebuild the user's grocery list for `range` from the current meal plan.
///
/// Statuses and manual items already on the list are carried over. The
/// write only lands if nobody touched the list since it was read; otherwise
/// the whole read-merge-write cycle runs again, up to
/// `regenerate_attempts` times.
#[tracing::instrument(skip(state), err(Debug))]
pub(crate) async fn regenerate(
    state: &AppState,
    user_id: Uuid,
    range: DateRange,
) -> Result<Regenerated, ServerError> {
    let attempts = state.app.regenerate_attempts;
    let mut created = false;

    for attempt in 1..=attempts {
        let current = GroceryList::find_for_range(&state.db, user_id, range).await?;
        let existing = match &current {
            Some(list) => list.items(&state.db).await?,
            None => vec![],
        };

        let meals = MealPlan::planned_meals(&state.db, range).await?;
        let mut recipe_ids = meals
            .iter()
            .filter_map(PlannedMeal::home_recipe_id)
            .collect::<Vec<_>>();
        recipe_ids.sort_unstable();
        recipe_ids.dedup();
        let recipes = RecipeWithDetails::load_many(&state.db, &recipe_ids).await?;

        let generated = kitchen::generate(range, &meals, &recipes, &existing, &state.normalizer)?;

        let list = match current {
            Some(list) => list,
            None => match GroceryList::create(&state.db, user_id, range).await? {
                Some(list) => {
                    created = true;
                    list
                }
                None => {
                    tracing::info!(attempt, "Grocery list was created concurrently, retrying");
                    continue;
                }
            },
        };

        if let Some(list) = list.commit_generation(&state.db, &generated.items).await? {
            tracing::info!(
                attempt,
                items = generated.items.len(),
                anomalies = generated.anomalies.len(),
                "Grocery list generated"
            );

            return Ok(Regenerated {
                list: list.with_items(&state.db).await?,
                anomalies: generated.anomalies,
                created,
            });
        }

        tracing::warn!(attempt, "Grocery list changed while regenerating, retrying");
    }

    Err(eyre!(
        "Grocery list for {} to {} kept changing, gave up after {attempts} attempts",
        range.start(),
        range.end()
    ))
    .with_status(StatusCode::CONFLICT)
}
