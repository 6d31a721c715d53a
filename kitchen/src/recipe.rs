use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Department, MealType};

/// One ingredient as the engines see it, borrowed from whatever recipe type
/// the caller has loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngredientLine<'a> {
    pub name: &'a str,
    pub quantity: f64,
    pub unit: &'a str,
    pub department: Department,
}

/// Read-only view of a recipe. The engines never mutate a recipe, so anything
/// that can hand out its id, title, base servings and ingredient lines can be
/// scored or aggregated.
pub trait RecipeSource {
    fn recipe_id(&self) -> Uuid;

    fn title(&self) -> &str;

    fn servings(&self) -> i32;

    fn ingredient_lines(&self) -> Vec<IngredientLine<'_>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub department: Department,
}

/// Owned recipe snapshot, for callers that don't carry their own recipe type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSnapshot {
    pub id: Uuid,
    pub title: String,
    pub servings: i32,
    pub ingredients: Vec<Ingredient>,
}

impl RecipeSnapshot {
    pub fn new(title: impl Into<String>, servings: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            servings,
            ingredients: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ingredient(
        mut self,
        name: &str,
        quantity: f64,
        unit: &str,
        department: Department,
    ) -> Self {
        self.ingredients.push(Ingredient {
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            department,
        });
        self
    }
}

impl RecipeSource for RecipeSnapshot {
    fn recipe_id(&self) -> Uuid {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn servings(&self) -> i32 {
        self.servings
    }

    fn ingredient_lines(&self) -> Vec<IngredientLine<'_>> {
        self.ingredients
            .iter()
            .map(|i| IngredientLine {
                name: &i.name,
                quantity: i.quantity,
                unit: &i.unit,
                department: i.department,
            })
            .collect()
    }
}

/// One entry of a day's meal plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: Option<Uuid>,
    pub servings: Option<i32>,
    #[serde(default)]
    pub out_of_kitchen: bool,
}

impl PlannedMeal {
    /// The recipe to shop for, if this meal is cooked at home.
    pub fn home_recipe_id(&self) -> Option<Uuid> {
        if self.out_of_kitchen {
            None
        } else {
            self.recipe_id
        }
    }
}
