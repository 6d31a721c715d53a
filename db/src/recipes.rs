use std::collections::HashMap;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::WrapErr, Result};
use kitchen::{Department, IngredientLine, RecipeSource};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub created_by_user_id: Option<Uuid>,
    pub title: String,
    pub servings: i32,
    pub serving_size: Option<String>,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub storage_notes: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_name: String,
    pub quantity: f64,
    pub unit: String,
    pub department: Department,
    pub nutrition_id: Option<String>,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeInstruction {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_number: i32,
    pub instruction: String,
}

/// A recipe with everything hanging off it, as served by the API and read by
/// the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeWithDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub total_minutes: Option<i32>,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<RecipeInstruction>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientInput {
    pub ingredient_name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub department: Department,
    #[serde(default)]
    pub nutrition_id: Option<String>,
}

/// Body of a recipe create or update. Child rows are replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInput {
    pub title: String,
    pub servings: i32,
    #[serde(default)]
    pub serving_size: Option<String>,
    #[serde(default)]
    pub prep_minutes: Option<i32>,
    #[serde(default)]
    pub cook_minutes: Option<i32>,
    #[serde(default)]
    pub storage_notes: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Upper bound on each of prep and cook time: one week.
pub const MAX_MINUTES: i32 = 7 * 24 * 60;

impl RecipeInput {
    pub fn validate(&self) -> kitchen::Result<()> {
        if self.title.trim().is_empty() {
            return Err(kitchen::Error::invalid("title is required"));
        }
        if self.servings < 0 {
            return Err(kitchen::Error::invalid("servings must not be negative"));
        }
        if self.prep_minutes.is_some_and(|m| m < 0) || self.cook_minutes.is_some_and(|m| m < 0) {
            return Err(kitchen::Error::invalid("times must not be negative"));
        }
        if self.prep_minutes.is_some_and(|m| m > MAX_MINUTES)
            || self.cook_minutes.is_some_and(|m| m > MAX_MINUTES)
        {
            return Err(kitchen::Error::invalid(format!(
                "times must not exceed {MAX_MINUTES} minutes"
            )));
        }

        for (i, ingredient) in self.ingredients.iter().enumerate() {
            if ingredient.ingredient_name.trim().is_empty() {
                return Err(kitchen::Error::invalid(format!(
                    "ingredient {} needs a name",
                    i + 1
                )));
            }
            if !ingredient.quantity.is_finite() || ingredient.quantity < 0.0 {
                return Err(kitchen::Error::invalid(format!(
                    "quantity for {} must be a non-negative number",
                    ingredient.ingredient_name.trim()
                )));
            }
        }

        if self.instructions.iter().any(|step| step.trim().is_empty()) {
            return Err(kitchen::Error::invalid("instructions must not be blank"));
        }

        Ok(())
    }
}

const RECIPE_COLUMNS: &str = r"
    id, created_by_user_id, title, servings, serving_size, prep_minutes,
    cook_minutes, storage_notes, source, notes, created_at, updated_at
";

impl Recipe {
    pub fn total_minutes(&self) -> Option<i32> {
        match (self.prep_minutes, self.cook_minutes) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0).saturating_add(cook.unwrap_or(0))),
        }
    }

    #[tracing::instrument(skip(pool, input), fields(title = %input.title), err)]
    pub async fn create(
        pool: &PgPool,
        created_by_user_id: Uuid,
        input: &RecipeInput,
    ) -> Result<RecipeWithDetails> {
        let mut tx = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r"
            INSERT INTO recipes (
                created_by_user_id, title, servings, serving_size, prep_minutes,
                cook_minutes, storage_notes, source, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RECIPE_COLUMNS}
            "
        ))
        .bind(created_by_user_id)
        .bind(input.title.trim())
        .bind(input.servings)
        .bind(&input.serving_size)
        .bind(input.prep_minutes)
        .bind(input.cook_minutes)
        .bind(&input.storage_notes)
        .bind(&input.source)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .wrap_err("Failed to insert recipe")?;

        insert_children(&mut tx, recipe.id, input).await?;
        tx.commit().await?;

        RecipeWithDetails::get(pool, recipe.id)
            .await?
            .ok_or_else(|| color_eyre::eyre::eyre!("Recipe {} vanished after insert", recipe.id))
    }

    /// Returns `None` when no recipe has this id.
    #[tracing::instrument(skip(pool, input), err)]
    pub async fn update(
        pool: &PgPool,
        recipe_id: Uuid,
        input: &RecipeInput,
    ) -> Result<Option<RecipeWithDetails>> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query_scalar::<_, Uuid>(
            r"
            UPDATE recipes
            SET title = $2,
                servings = $3,
                serving_size = $4,
                prep_minutes = $5,
                cook_minutes = $6,
                storage_notes = $7,
                source = $8,
                notes = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(recipe_id)
        .bind(input.title.trim())
        .bind(input.servings)
        .bind(&input.serving_size)
        .bind(input.prep_minutes)
        .bind(input.cook_minutes)
        .bind(&input.storage_notes)
        .bind(&input.source)
        .bind(&input.notes)
        .fetch_optional(&mut *tx)
        .await
        .wrap_err("Failed to update recipe")?;

        if updated.is_none() {
            return Ok(None);
        }

        for table in ["recipe_ingredients", "recipe_instructions", "recipe_tags"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
                .bind(recipe_id)
                .execute(&mut *tx)
                .await?;
        }
        insert_children(&mut tx, recipe_id, input).await?;
        tx.commit().await?;

        RecipeWithDetails::get(pool, recipe_id).await
    }

    /// Meal-plan entries pointing at the recipe are detached, not deleted.
    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(pool: &PgPool, recipe_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The subset of `ids` that exist.
    pub async fn existing_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM recipes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(found)
    }
}

async fn insert_children(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    input: &RecipeInput,
) -> Result<()> {
    for (i, ingredient) in input.ingredients.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO recipe_ingredients (
                recipe_id, ingredient_name, quantity, unit, department, nutrition_id, order_index
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(recipe_id)
        .bind(ingredient.ingredient_name.trim())
        .bind(ingredient.quantity)
        .bind(ingredient.unit.trim())
        .bind(ingredient.department)
        .bind(&ingredient.nutrition_id)
        .bind(i32::try_from(i)?)
        .execute(&mut **tx)
        .await
        .wrap_err("Failed to insert recipe ingredient")?;
    }

    for (i, instruction) in input.instructions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO recipe_instructions (recipe_id, step_number, instruction) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(i32::try_from(i + 1)?)
        .bind(instruction.trim())
        .execute(&mut **tx)
        .await
        .wrap_err("Failed to insert recipe instruction")?;
    }

    for tag in &input.tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }

        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(tag)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

impl RecipeWithDetails {
    #[tracing::instrument(skip(pool), err)]
    pub async fn get(pool: &PgPool, recipe_id: Uuid) -> Result<Option<Self>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };

        Ok(Self::attach_details(pool, vec![recipe]).await?.pop())
    }

    /// Whole catalog, ordered by title.
    #[tracing::instrument(skip(pool), err)]
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY title, id"
        ))
        .fetch_all(pool)
        .await?;

        Self::attach_details(pool, recipes).await
    }

    /// Missing ids are skipped rather than reported.
    #[tracing::instrument(skip(pool, ids), fields(count = ids.len()), err)]
    pub async fn load_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ANY($1) ORDER BY title, id"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Self::attach_details(pool, recipes).await
    }

    async fn attach_details(pool: &PgPool, recipes: Vec<Recipe>) -> Result<Vec<Self>> {
        let ids = recipes.iter().map(|r| r.id).collect::<Vec<_>>();

        let mut ingredients = group_by_recipe(
            sqlx::query_as::<_, RecipeIngredient>(
                r"
                SELECT id, recipe_id, ingredient_name, quantity, unit, department, nutrition_id, order_index
                FROM recipe_ingredients
                WHERE recipe_id = ANY($1)
                ORDER BY recipe_id, order_index
                ",
            )
            .bind(&ids)
            .fetch_all(pool)
            .await
            .wrap_err("Failed to load recipe ingredients")?,
            |i| i.recipe_id,
        );

        let mut instructions = group_by_recipe(
            sqlx::query_as::<_, RecipeInstruction>(
                r"
                SELECT id, recipe_id, step_number, instruction
                FROM recipe_instructions
                WHERE recipe_id = ANY($1)
                ORDER BY recipe_id, step_number
                ",
            )
            .bind(&ids)
            .fetch_all(pool)
            .await
            .wrap_err("Failed to load recipe instructions")?,
            |i| i.recipe_id,
        );

        let mut tags = group_by_recipe(
            sqlx::query_as::<_, (Uuid, String)>(
                "SELECT recipe_id, tag_name FROM recipe_tags WHERE recipe_id = ANY($1) ORDER BY recipe_id, tag_name",
            )
            .bind(&ids)
            .fetch_all(pool)
            .await?,
            |(recipe_id, _)| *recipe_id,
        );

        Ok(recipes
            .into_iter()
            .map(|recipe| Self {
                total_minutes: recipe.total_minutes(),
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                instructions: instructions.remove(&recipe.id).unwrap_or_default(),
                tags: tags
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(_, tag)| tag)
                    .collect(),
                recipe,
            })
            .collect())
    }
}

fn group_by_recipe<T>(rows: Vec<T>, recipe_id: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut grouped = HashMap::<Uuid, Vec<T>>::new();
    for row in rows {
        grouped.entry(recipe_id(&row)).or_default().push(row);
    }
    grouped
}

impl RecipeSource for RecipeWithDetails {
    fn recipe_id(&self) -> Uuid {
        self.recipe.id
    }

    fn title(&self) -> &str {
        &self.recipe.title
    }

    fn servings(&self) -> i32 {
        self.recipe.servings
    }

    fn ingredient_lines(&self) -> Vec<IngredientLine<'_>> {
        self.ingredients
            .iter()
            .map(|i| IngredientLine {
                name: &i.ingredient_name,
                quantity: i.quantity,
                unit: &i.unit,
                department: i.department,
            })
            .collect()
    }
}
