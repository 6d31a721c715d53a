//! Ingredient matching and grocery-list consolidation.
//!
//! Everything in this crate is a pure function over in-memory snapshots. The
//! store and the HTTP service live in the `db` and `server` crates.

pub mod error;
pub mod grocery;
pub mod normalize;
pub mod recipe;
pub mod recommend;
pub mod tables;
pub mod types;

pub use error::{Error, Result};
pub use grocery::{generate, sort_items, Anomaly, GeneratedList, GroceryItem, ItemKey};
pub use normalize::{NormalizedName, NormalizedUnit, Normalizer, UnitFamily};
pub use recipe::{Ingredient, IngredientLine, PlannedMeal, RecipeSnapshot, RecipeSource};
pub use recommend::{recommend, RecipeRecommendation};
pub use tables::IngredientTables;
pub use types::{DateRange, Department, ItemStatus, MealType};
