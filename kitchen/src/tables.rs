use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, Result};

const BUILTIN_TABLES: &str = include_str!("../tables/default.yaml");

/// Loadable configuration behind the [`Normalizer`](crate::Normalizer).
///
/// New synonyms or unit spellings are added here, never in the scoring or
/// aggregation code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientTables {
    #[serde(default)]
    pub irregular_plurals: BTreeMap<String, String>,
    #[serde(default)]
    pub invariant: BTreeSet<String>,
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    #[serde(default)]
    pub units: UnitTables,
}

/// Canonical unit name to the spellings that mean it, per family.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitTables {
    #[serde(default)]
    pub volume: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub weight: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub count: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub other: BTreeMap<String, Vec<String>>,
}

impl IngredientTables {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Tables(e.to_string()))
    }

    /// The tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_TABLES)
    }
}
