use kitchen::Department;
use sqlx::PgPool;
use uuid::Uuid;

use crate::recipes::{IngredientInput, Recipe, RecipeInput, RecipeWithDetails};

pub fn recipe_input(
    title: &str,
    servings: i32,
    ingredients: &[(&str, f64, &str, Department)],
) -> RecipeInput {
    RecipeInput {
        title: title.to_string(),
        servings,
        serving_size: None,
        prep_minutes: None,
        cook_minutes: None,
        storage_notes: None,
        source: None,
        notes: None,
        ingredients: ingredients
            .iter()
            .map(|(name, quantity, unit, department)| IngredientInput {
                ingredient_name: (*name).to_string(),
                quantity: *quantity,
                unit: (*unit).to_string(),
                department: *department,
                nutrition_id: None,
            })
            .collect(),
        instructions: vec![],
        tags: vec![],
    }
}

pub async fn insert_recipe(
    pool: &PgPool,
    title: &str,
    servings: i32,
    ingredients: &[(&str, f64, &str, Department)],
) -> RecipeWithDetails {
    Recipe::create(pool, Uuid::new_v4(), &recipe_input(title, servings, ingredients))
        .await
        .expect("Failed to insert test recipe")
}
