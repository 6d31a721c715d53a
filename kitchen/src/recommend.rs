use serde::Serialize;
use std::{cmp::Ordering, collections::HashSet};

use crate::{
    normalize::{NormalizedName, Normalizer},
    recipe::RecipeSource,
    Error, Result,
};

/// How well the pantry covers one recipe.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRecommendation<'r, R> {
    pub recipe: &'r R,
    /// Unrounded percentage in `0.0..=100.0`.
    pub match_score: f64,
    pub matched_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
}

impl<R> RecipeRecommendation<'_, R> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn display_score(&self) -> u8 {
        self.match_score.round().clamp(0.0, 100.0) as u8
    }
}

/// Rank `recipes` by how much of each one the pantry already covers.
///
/// Recipes without ingredients are left out. Ordering is by score, then number
/// of matched ingredients, then title, then id.
#[tracing::instrument(skip_all, fields(pantry = pantry.len(), recipes = recipes.len()), err)]
pub fn recommend<'r, R, S>(
    pantry: &[S],
    recipes: &'r [R],
    normalizer: &Normalizer,
) -> Result<Vec<RecipeRecommendation<'r, R>>>
where
    R: RecipeSource,
    S: AsRef<str>,
{
    if pantry.is_empty() {
        return Err(Error::invalid("pantry must list at least one ingredient"));
    }

    let pantry = pantry
        .iter()
        .map(|entry| {
            let normalized = normalizer.normalize(entry.as_ref());
            if normalized.is_empty() {
                Err(Error::invalid("pantry entries must not be blank"))
            } else {
                Ok(normalized)
            }
        })
        .collect::<Result<HashSet<_>>>()?;

    let mut recommendations = recipes
        .iter()
        .filter_map(|recipe| score(recipe, &pantry, normalizer))
        .collect::<Vec<_>>();

    recommendations.sort_by(rank);

    tracing::debug!(
        scored = recommendations.len(),
        "Ranked recipes against pantry"
    );

    Ok(recommendations)
}

fn score<'r, R: RecipeSource>(
    recipe: &'r R,
    pantry: &HashSet<NormalizedName>,
    normalizer: &Normalizer,
) -> Option<RecipeRecommendation<'r, R>> {
    let mut seen = HashSet::new();
    let mut matched_ingredients = vec![];
    let mut missing_ingredients = vec![];

    for line in recipe.ingredient_lines() {
        let normalized = normalizer.normalize(line.name);
        if normalized.is_empty() || !seen.insert(normalized.clone()) {
            continue;
        }

        if pantry.contains(&normalized) {
            matched_ingredients.push(line.name.to_string());
        } else {
            missing_ingredients.push(line.name.to_string());
        }
    }

    let total = matched_ingredients.len() + missing_ingredients.len();
    if total == 0 {
        return None;
    }

    Some(RecipeRecommendation {
        recipe,
        match_score: percentage(matched_ingredients.len(), total),
        matched_ingredients,
        missing_ingredients,
    })
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, whole: usize) -> f64 {
    100.0 * part as f64 / whole as f64
}

fn rank<R: RecipeSource>(a: &RecipeRecommendation<'_, R>, b: &RecipeRecommendation<'_, R>) -> Ordering {
    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| {
            b.matched_ingredients
                .len()
                .cmp(&a.matched_ingredients.len())
        })
        .then_with(|| a.recipe.title().cmp(b.recipe.title()))
        .then_with(|| a.recipe.recipe_id().cmp(&b.recipe.recipe_id()))
}
