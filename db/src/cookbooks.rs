use chrono::{DateTime, Utc};
use color_eyre::{eyre::WrapErr, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::recipes::RecipeWithDetails;

pub const MAX_NAME_CHARS: usize = 200;

/// A user's named collection of recipes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cookbook {
    pub id: Uuid,
    pub created_by_user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub recipe_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CookbookWithRecipes {
    #[serde(flatten)]
    pub cookbook: Cookbook,
    pub recipes: Vec<RecipeWithDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookbookInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CookbookInput {
    pub fn validate(&self) -> kitchen::Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(kitchen::Error::invalid("name is required"));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(kitchen::Error::invalid(format!(
                "name must be {MAX_NAME_CHARS} characters or less"
            )));
        }

        Ok(())
    }

    fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

const COOKBOOK_COLUMNS: &str = r"
    c.id, c.created_by_user_id, c.name, c.description,
    (SELECT COUNT(*) FROM cookbook_recipes cr WHERE cr.cookbook_id = c.id) AS recipe_count,
    c.created_at, c.updated_at
";

impl Cookbook {
    #[tracing::instrument(skip(pool, input), fields(name = %input.name), err)]
    pub async fn create(pool: &PgPool, user_id: Uuid, input: &CookbookInput) -> Result<Self> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO cookbooks (created_by_user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.description())
        .fetch_one(pool)
        .await
        .wrap_err("Failed to insert cookbook")?;

        Self::get_for_user(pool, user_id, id)
            .await?
            .ok_or_else(|| color_eyre::eyre::eyre!("Cookbook {id} vanished after insert"))
    }

    /// Cookbooks owned by someone else are reported as missing.
    #[tracing::instrument(skip(pool), err)]
    pub async fn get_for_user(
        pool: &PgPool,
        user_id: Uuid,
        cookbook_id: Uuid,
    ) -> Result<Option<Self>> {
        let cookbook = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COOKBOOK_COLUMNS} FROM cookbooks c WHERE c.id = $1 AND c.created_by_user_id = $2"
        ))
        .bind(cookbook_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(cookbook)
    }

    /// Newest first.
    #[tracing::instrument(skip(pool), err)]
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>> {
        let cookbooks = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COOKBOOK_COLUMNS} FROM cookbooks c WHERE c.created_by_user_id = $1 ORDER BY c.created_at DESC, c.id"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(cookbooks)
    }

    #[tracing::instrument(skip(pool, input), err)]
    pub async fn update_for_user(
        pool: &PgPool,
        user_id: Uuid,
        cookbook_id: Uuid,
        input: &CookbookInput,
    ) -> Result<Option<Self>> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            r"
            UPDATE cookbooks
            SET name = $3, description = $4, updated_at = NOW()
            WHERE id = $1 AND created_by_user_id = $2
            RETURNING id
            ",
        )
        .bind(cookbook_id)
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.description())
        .fetch_optional(pool)
        .await
        .wrap_err("Failed to update cookbook")?;

        if updated.is_none() {
            return Ok(None);
        }

        Self::get_for_user(pool, user_id, cookbook_id).await
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn delete_for_user(pool: &PgPool, user_id: Uuid, cookbook_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cookbooks WHERE id = $1 AND created_by_user_id = $2")
            .bind(cookbook_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recipes in the cookbook, most recently added first.
    #[tracing::instrument(skip_all, fields(cookbook_id = %self.id), err)]
    pub async fn recipes(&self, pool: &PgPool) -> Result<Vec<RecipeWithDetails>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT recipe_id FROM cookbook_recipes WHERE cookbook_id = $1 ORDER BY added_at DESC, id",
        )
        .bind(self.id)
        .fetch_all(pool)
        .await
        .wrap_err("Failed to load cookbook recipes")?;

        let mut recipes = RecipeWithDetails::load_many(pool, &ids).await?;
        recipes.sort_by_key(|r| ids.iter().position(|id| *id == r.recipe.id));

        Ok(recipes)
    }

    pub async fn with_recipes(self, pool: &PgPool) -> Result<CookbookWithRecipes> {
        let recipes = self.recipes(pool).await?;

        Ok(CookbookWithRecipes {
            cookbook: self,
            recipes,
        })
    }

    /// Adding a recipe that is already there changes nothing.
    #[tracing::instrument(skip_all, fields(cookbook_id = %self.id, %recipe_id), err)]
    pub async fn add_recipe(&self, pool: &PgPool, recipe_id: Uuid) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO cookbook_recipes (cookbook_id, recipe_id)
            VALUES ($1, $2)
            ON CONFLICT (cookbook_id, recipe_id) DO NOTHING
            ",
        )
        .bind(self.id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .wrap_err("Failed to add recipe to cookbook")?;

        Ok(())
    }

    /// `false` when the recipe was not in the cookbook.
    #[tracing::instrument(skip_all, fields(cookbook_id = %self.id, %recipe_id), err)]
    pub async fn remove_recipe(&self, pool: &PgPool, recipe_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM cookbook_recipes WHERE cookbook_id = $1 AND recipe_id = $2")
                .bind(self.id)
                .bind(recipe_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[cfg(feature = "db-tests")]
    use crate::{recipes::Recipe, test_utils::insert_recipe};
    #[cfg(feature = "db-tests")]
    use kitchen::Department;

    fn input(name: &str) -> CookbookInput {
        CookbookInput {
            name: name.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_input_validation() {
        assert!(input("Weeknights").validate().is_ok());
        assert!(matches!(
            input("   ").validate(),
            Err(kitchen::Error::InvalidArgument(_))
        ));

        assert!(input(&"a".repeat(MAX_NAME_CHARS)).validate().is_ok());
        assert!(input(&"a".repeat(MAX_NAME_CHARS + 1)).validate().is_err());
        assert!(input(&"é".repeat(MAX_NAME_CHARS)).validate().is_ok());
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let mut cookbook = input("Soups");
        cookbook.description = Some("  ".to_string());
        assert_eq!(cookbook.description(), None);

        cookbook.description = Some(" Winter ".to_string());
        assert_eq!(cookbook.description(), Some("Winter"));
    }

    #[cfg(feature = "db-tests")]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_cookbooks_are_scoped_to_their_owner(pool: PgPool) {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let created = Cookbook::create(&pool, owner, &input("  Weeknights "))
            .await
            .unwrap();
        assert_eq!(created.name, "Weeknights");
        assert_eq!(created.recipe_count, 0);

        assert!(Cookbook::get_for_user(&pool, stranger, created.id)
            .await
            .unwrap()
            .is_none());
        assert!(Cookbook::list_for_user(&pool, stranger)
            .await
            .unwrap()
            .is_empty());
        assert!(Cookbook::update_for_user(&pool, stranger, created.id, &input("Mine now"))
            .await
            .unwrap()
            .is_none());
        assert!(!Cookbook::delete_for_user(&pool, stranger, created.id)
            .await
            .unwrap());

        let renamed = Cookbook::update_for_user(&pool, owner, created.id, &input("Fridays"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Fridays");

        let second = Cookbook::create(&pool, owner, &input("Sundays")).await.unwrap();
        let listed = Cookbook::list_for_user(&pool, owner).await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![second.id, created.id]
        );

        assert!(Cookbook::delete_for_user(&pool, owner, created.id)
            .await
            .unwrap());
        assert!(Cookbook::get_for_user(&pool, owner, created.id)
            .await
            .unwrap()
            .is_none());
    }

    #[cfg(feature = "db-tests")]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_recipe_membership(pool: PgPool) {
        let owner = Uuid::new_v4();
        let toast = insert_recipe(&pool, "Toast", 1, &[("bread", 2.0, "slice", Department::Bakery)]).await;
        let soup = insert_recipe(&pool, "Soup", 4, &[("leek", 2.0, "", Department::Produce)]).await;

        let cookbook = Cookbook::create(&pool, owner, &input("Lunches")).await.unwrap();
        cookbook.add_recipe(&pool, toast.recipe.id).await.unwrap();
        cookbook.add_recipe(&pool, soup.recipe.id).await.unwrap();
        cookbook.add_recipe(&pool, toast.recipe.id).await.unwrap();

        let cookbook = Cookbook::get_for_user(&pool, owner, cookbook.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cookbook.recipe_count, 2);

        let with_recipes = cookbook.clone().with_recipes(&pool).await.unwrap();
        let titles = with_recipes
            .recipes
            .iter()
            .map(|r| r.recipe.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"Toast") && titles.contains(&"Soup"));

        assert!(cookbook.remove_recipe(&pool, soup.recipe.id).await.unwrap());
        assert!(!cookbook.remove_recipe(&pool, soup.recipe.id).await.unwrap());

        Recipe::delete(&pool, toast.recipe.id).await.unwrap();
        let cookbook = Cookbook::get_for_user(&pool, owner, cookbook.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cookbook.recipe_count, 0);
        assert!(cookbook.recipes(&pool).await.unwrap().is_empty());
    }
}
