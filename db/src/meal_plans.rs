use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::{eyre::WrapErr, Result};
use kitchen::{DateRange, MealType, PlannedMeal};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub plan_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MealPlanRecipe {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub meal_type: MealType,
    pub recipe_id: Option<Uuid>,
    pub servings: Option<i32>,
    pub out_of_kitchen: bool,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanWithMeals {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub meals: Vec<MealPlanRecipe>,
}

/// One calendar day of the plan. Days nothing was planned for have no `id`
/// and no meals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub id: Option<Uuid>,
    pub plan_date: NaiveDate,
    pub meals: Vec<MealPlanRecipe>,
}

impl DayPlan {
    fn empty(plan_date: NaiveDate) -> Self {
        Self {
            id: None,
            plan_date,
            meals: vec![],
        }
    }
}

impl From<MealPlanWithMeals> for DayPlan {
    fn from(plan: MealPlanWithMeals) -> Self {
        Self {
            id: Some(plan.plan.id),
            plan_date: plan.plan.plan_date,
            meals: plan.meals,
        }
    }
}

/// Longest span, in days, a single range read may cover.
pub const MAX_RANGE_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealInput {
    pub meal_type: MealType,
    #[serde(default)]
    pub recipe_id: Option<Uuid>,
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default)]
    pub out_of_kitchen: bool,
}

impl MealInput {
    pub fn validate(&self) -> kitchen::Result<()> {
        if self.out_of_kitchen {
            if self.recipe_id.is_some() || self.servings.is_some() {
                return Err(kitchen::Error::invalid(format!(
                    "{} is out of kitchen and cannot have a recipe_id or servings",
                    self.meal_type
                )));
            }
            return Ok(());
        }
        if self.recipe_id.is_none() {
            return Err(kitchen::Error::invalid(format!(
                "{} needs a recipe_id unless it is out of kitchen",
                self.meal_type
            )));
        }
        if self.servings.is_some_and(|s| s <= 0) {
            return Err(kitchen::Error::invalid("servings must be positive"));
        }

        Ok(())
    }
}

const MEAL_COLUMNS: &str =
    "id, meal_plan_id, meal_type, recipe_id, servings, out_of_kitchen, order_index";

impl MealPlan {
    #[tracing::instrument(skip(pool), err)]
    pub async fn get_by_date(pool: &PgPool, date: NaiveDate) -> Result<Option<MealPlanWithMeals>> {
        let plan = sqlx::query_as::<_, MealPlan>(
            "SELECT id, plan_date, created_at, updated_at FROM meal_plans WHERE plan_date = $1",
        )
        .bind(date)
        .fetch_optional(pool)
        .await?;

        let Some(plan) = plan else {
            return Ok(None);
        };

        Ok(Self::attach_meals(pool, vec![plan]).await?.pop())
    }

    /// The plan for `date`, or an empty day when nothing is planned.
    pub async fn day(pool: &PgPool, date: NaiveDate) -> Result<DayPlan> {
        Ok(Self::get_by_date(pool, date)
            .await?
            .map_or_else(|| DayPlan::empty(date), DayPlan::from))
    }

    /// Every day in `range` in date order, including the empty ones.
    #[tracing::instrument(skip(pool), err)]
    pub async fn days_in_range(pool: &PgPool, range: DateRange) -> Result<Vec<DayPlan>> {
        let mut by_date = Self::list_range(pool, range)
            .await?
            .into_iter()
            .map(|plan| (plan.plan.plan_date, DayPlan::from(plan)))
            .collect::<HashMap<_, _>>();

        Ok(range
            .days()
            .map(|date| by_date.remove(&date).unwrap_or_else(|| DayPlan::empty(date)))
            .collect())
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn list_range(pool: &PgPool, range: DateRange) -> Result<Vec<MealPlanWithMeals>> {
        let plans = sqlx::query_as::<_, MealPlan>(
            r"
            SELECT id, plan_date, created_at, updated_at
            FROM meal_plans
            WHERE plan_date BETWEEN $1 AND $2
            ORDER BY plan_date
            ",
        )
        .bind(range.start())
        .bind(range.end())
        .fetch_all(pool)
        .await?;

        Self::attach_meals(pool, plans).await
    }

    /// Replace the meals planned for `date`, keeping the given order. The day's
    /// plan is created on first use.
    #[tracing::instrument(skip(pool, meals), fields(meals = meals.len()), err)]
    pub async fn replace_day(
        pool: &PgPool,
        date: NaiveDate,
        meals: &[MealInput],
    ) -> Result<MealPlanWithMeals> {
        let mut tx = pool.begin().await?;

        let plan = sqlx::query_as::<_, MealPlan>(
            r"
            INSERT INTO meal_plans (plan_date)
            VALUES ($1)
            ON CONFLICT (plan_date) DO UPDATE SET updated_at = NOW()
            RETURNING id, plan_date, created_at, updated_at
            ",
        )
        .bind(date)
        .fetch_one(&mut *tx)
        .await
        .wrap_err("Failed to upsert meal plan")?;

        sqlx::query("DELETE FROM meal_plan_recipes WHERE meal_plan_id = $1")
            .bind(plan.id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(meals.len());
        for (i, meal) in meals.iter().enumerate() {
            let row = sqlx::query_as::<_, MealPlanRecipe>(&format!(
                r"
                INSERT INTO meal_plan_recipes (
                    meal_plan_id, meal_type, recipe_id, servings, out_of_kitchen, order_index
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {MEAL_COLUMNS}
                "
            ))
            .bind(plan.id)
            .bind(meal.meal_type)
            .bind(meal.recipe_id)
            .bind(meal.servings)
            .bind(meal.out_of_kitchen)
            .bind(i32::try_from(i)?)
            .fetch_one(&mut *tx)
            .await
            .wrap_err("Failed to insert planned meal")?;

            inserted.push(row);
        }

        tx.commit().await?;

        Ok(MealPlanWithMeals {
            plan,
            meals: inserted,
        })
    }

    /// Every meal in `range`, flattened into the shape the grocery aggregator
    /// reads. Ordered by date, then position within the day.
    #[tracing::instrument(skip(pool), err)]
    pub async fn planned_meals(pool: &PgPool, range: DateRange) -> Result<Vec<PlannedMeal>> {
        let rows = sqlx::query_as::<_, (NaiveDate, MealType, Option<Uuid>, Option<i32>, bool)>(
            r"
            SELECT mp.plan_date, mpr.meal_type, mpr.recipe_id, mpr.servings, mpr.out_of_kitchen
            FROM meal_plan_recipes mpr
            JOIN meal_plans mp ON mp.id = mpr.meal_plan_id
            WHERE mp.plan_date BETWEEN $1 AND $2
            ORDER BY mp.plan_date, mpr.order_index
            ",
        )
        .bind(range.start())
        .bind(range.end())
        .fetch_all(pool)
        .await
        .wrap_err("Failed to load planned meals")?;

        Ok(rows
            .into_iter()
            .map(
                |(date, meal_type, recipe_id, servings, out_of_kitchen)| PlannedMeal {
                    date,
                    meal_type,
                    recipe_id,
                    servings,
                    out_of_kitchen,
                },
            )
            .collect())
    }

    async fn attach_meals(pool: &PgPool, plans: Vec<MealPlan>) -> Result<Vec<MealPlanWithMeals>> {
        let ids = plans.iter().map(|p| p.id).collect::<Vec<_>>();

        let rows = sqlx::query_as::<_, MealPlanRecipe>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meal_plan_recipes WHERE meal_plan_id = ANY($1) ORDER BY meal_plan_id, order_index"
        ))
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_plan = HashMap::<Uuid, Vec<MealPlanRecipe>>::new();
        for row in rows {
            by_plan.entry(row.meal_plan_id).or_default().push(row);
        }

        Ok(plans
            .into_iter()
            .map(|plan| MealPlanWithMeals {
                meals: by_plan.remove(&plan.id).unwrap_or_default(),
                plan,
            })
            .collect())
    }
}
