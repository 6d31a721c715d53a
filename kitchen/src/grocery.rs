use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    normalize::{NormalizedName, NormalizedUnit, Normalizer, UnitFamily},
    recipe::{PlannedMeal, RecipeSource},
    types::{DateRange, Department, ItemStatus},
    Error, Result,
};

/// A shopping-list line, either derived from planned meals or entered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GroceryItem {
    /// `None` until the item has been stored.
    pub id: Option<Uuid>,
    pub item_name: String,
    pub normalized_name: NormalizedName,
    pub quantity: Option<f64>,
    pub unit: String,
    pub unit_family: UnitFamily,
    pub department: Department,
    pub status: ItemStatus,
    pub is_manual: bool,
    pub source_recipe_id: Option<Uuid>,
}

/// Identity of a derived item across regenerations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub normalized_name: NormalizedName,
    pub unit: NormalizedUnit,
    pub department: Department,
}

impl GroceryItem {
    /// A user-entered item. It is never touched by regeneration.
    pub fn manual(
        normalizer: &Normalizer,
        item_name: &str,
        quantity: Option<f64>,
        unit: Option<&str>,
        department: Option<Department>,
    ) -> Result<Self> {
        let item_name = item_name.trim();
        if item_name.is_empty() {
            return Err(Error::invalid("item_name is required"));
        }
        if quantity.is_some_and(|q| !q.is_finite() || q < 0.0) {
            return Err(Error::invalid("quantity must be a non-negative number"));
        }

        let unit = unit.map(str::trim).unwrap_or_default();

        Ok(Self {
            id: None,
            item_name: item_name.to_string(),
            normalized_name: normalizer.normalize(item_name),
            quantity,
            unit: unit.to_string(),
            unit_family: normalizer.normalize_unit(unit).family,
            department: department.unwrap_or_default(),
            status: ItemStatus::Pending,
            is_manual: true,
            source_recipe_id: None,
        })
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            normalized_name: self.normalized_name.clone(),
            unit: NormalizedUnit {
                family: self.unit_family,
                canonical: self.unit.clone(),
            },
            department: self.department,
        }
    }
}

/// Something aggregation had to work around rather than fail on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The recipe declares zero servings, so its ingredients were not scaled.
    ZeroServings { recipe_id: Uuid, title: String },
    /// The ingredient appears under units that can't be summed.
    SplitUnits {
        ingredient: NormalizedName,
        units: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GeneratedList {
    pub items: Vec<GroceryItem>,
    pub anomalies: Vec<Anomaly>,
}

struct ScaledLine<'a> {
    name: NormalizedName,
    display: &'a str,
    quantity: f64,
    unit: NormalizedUnit,
    department: Department,
    recipe_id: Uuid,
}

struct Group<'a> {
    key: ItemKey,
    display: &'a str,
    quantity: f64,
    recipe_id: Uuid,
}

/// Build the grocery list for `range` from the planned meals, merged with the
/// items of the list previously generated for the same range.
///
/// Derived items whose key survives keep their id and status. Manual items
/// are carried over untouched. Everything else in `existing` is dropped.
#[tracing::instrument(
    skip_all,
    fields(start = %range.start(), end = %range.end(), meals = meals.len(), existing = existing.len()),
    err
)]
pub fn generate<R: RecipeSource>(
    range: DateRange,
    meals: &[PlannedMeal],
    recipes: &[R],
    existing: &[GroceryItem],
    normalizer: &Normalizer,
) -> Result<GeneratedList> {
    let recipes_by_id = recipes
        .iter()
        .map(|r| (r.recipe_id(), r))
        .collect::<HashMap<_, _>>();

    let mut meals = meals
        .iter()
        .filter(|meal| range.contains(meal.date))
        .collect::<Vec<_>>();
    meals.sort_by_key(|meal| meal.date);

    let mut anomalies = vec![];
    let mut zero_serving_recipes = HashSet::new();
    let mut lines = vec![];

    for meal in meals {
        let Some(recipe_id) = meal.home_recipe_id() else {
            continue;
        };
        let recipe = recipes_by_id
            .get(&recipe_id)
            .ok_or_else(|| Error::not_found(format!("Recipe {recipe_id} not found")))?;

        let factor = if recipe.servings() <= 0 {
            if zero_serving_recipes.insert(recipe_id) {
                anomalies.push(Anomaly::ZeroServings {
                    recipe_id,
                    title: recipe.title().to_string(),
                });
            }
            1.0
        } else {
            meal.servings
                .filter(|servings| *servings > 0)
                .map_or(1.0, |servings| {
                    f64::from(servings) / f64::from(recipe.servings())
                })
        };

        for line in recipe.ingredient_lines() {
            let name = normalizer.normalize(line.name);
            if name.is_empty() {
                continue;
            }

            lines.push(ScaledLine {
                name,
                display: line.name,
                quantity: line.quantity * factor,
                unit: normalizer.normalize_unit(line.unit),
                department: line.department,
                recipe_id,
            });
        }
    }

    let departments = vote_departments(&lines);
    let groups = group_lines(&lines, &departments);
    anomalies.extend(split_units(&groups));

    let prior = existing
        .iter()
        .filter(|item| !item.is_manual)
        .map(|item| (item.key(), item))
        .collect::<HashMap<_, _>>();

    let mut items = groups
        .into_iter()
        .map(|group| {
            let previous = prior.get(&group.key);

            GroceryItem {
                id: previous.and_then(|p| p.id),
                item_name: group.display.to_string(),
                quantity: Some(group.quantity),
                unit: group.key.unit.canonical.clone(),
                unit_family: group.key.unit.family,
                department: group.key.department,
                status: previous.map(|p| p.status).unwrap_or_default(),
                is_manual: false,
                source_recipe_id: Some(group.recipe_id),
                normalized_name: group.key.normalized_name,
            }
        })
        .collect::<Vec<_>>();

    items.extend(existing.iter().filter(|item| item.is_manual).cloned());
    sort_items(&mut items);

    for anomaly in &anomalies {
        tracing::warn!(?anomaly, "Grocery aggregation anomaly");
    }

    Ok(GeneratedList { items, anomalies })
}

/// Department aisle order, then name. Derived items sort ahead of manual ones
/// with the same name.
pub fn sort_items(items: &mut [GroceryItem]) {
    items.sort_by(|a, b| {
        a.department
            .rank()
            .cmp(&b.department.rank())
            .then_with(|| a.normalized_name.cmp(&b.normalized_name))
            .then_with(|| a.is_manual.cmp(&b.is_manual))
            .then_with(|| a.unit.cmp(&b.unit))
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
}

/// Majority department per ingredient; ties go to the one seen first.
fn vote_departments(lines: &[ScaledLine<'_>]) -> HashMap<NormalizedName, Department> {
    let mut tallies = HashMap::<&NormalizedName, Vec<(Department, usize)>>::new();

    for line in lines {
        let tally = tallies.entry(&line.name).or_default();
        match tally.iter_mut().find(|(d, _)| *d == line.department) {
            Some((_, count)) => *count += 1,
            None => tally.push((line.department, 1)),
        }
    }

    tallies
        .into_iter()
        .map(|(name, tally)| {
            let mut winner = (Department::default(), 0);
            for (department, count) in tally {
                if count > winner.1 {
                    winner = (department, count);
                }
            }
            (name.clone(), winner.0)
        })
        .collect()
}

fn group_lines<'a>(
    lines: &[ScaledLine<'a>],
    departments: &HashMap<NormalizedName, Department>,
) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = vec![];
    let mut index = HashMap::<ItemKey, usize>::new();

    for line in lines {
        let key = ItemKey {
            normalized_name: line.name.clone(),
            unit: line.unit.clone(),
            department: departments
                .get(&line.name)
                .copied()
                .unwrap_or(line.department),
        };

        if let Some(&i) = index.get(&key) {
            groups[i].quantity += line.quantity;
        } else {
            index.insert(key.clone(), groups.len());
            groups.push(Group {
                key,
                display: line.display,
                quantity: line.quantity,
                recipe_id: line.recipe_id,
            });
        }
    }

    groups
}

fn split_units(groups: &[Group<'_>]) -> Vec<Anomaly> {
    let mut units_by_name = Vec::<(&NormalizedName, Vec<&NormalizedUnit>)>::new();

    for group in groups {
        let name = &group.key.normalized_name;
        let unit = &group.key.unit;
        match units_by_name.iter_mut().find(|(n, _)| *n == name) {
            Some((_, units)) => {
                if !units.contains(&unit) {
                    units.push(unit);
                }
            }
            None => units_by_name.push((name, vec![unit])),
        }
    }

    units_by_name
        .into_iter()
        .filter(|(_, units)| units.len() > 1)
        .map(|(name, units)| Anomaly::SplitUnits {
            ingredient: name.clone(),
            units: units.iter().map(ToString::to_string).collect(),
        })
        .collect()
}
