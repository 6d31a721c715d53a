use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{tables::IngredientTables, Error, Result};

/// Canonical form of an ingredient name. Two names are the same ingredient iff
/// their normalized forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct NormalizedName(String);

impl NormalizedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text"))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum UnitFamily {
    #[serde(rename = "volume")]
    Volume,
    #[serde(rename = "weight")]
    Weight,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "other")]
    Other,
    #[serde(rename = "unrecognized")]
    Unrecognized,
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitFamily::Volume => write!(f, "volume"),
            UnitFamily::Weight => write!(f, "weight"),
            UnitFamily::Count => write!(f, "count"),
            UnitFamily::Other => write!(f, "other"),
            UnitFamily::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

impl std::str::FromStr for UnitFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volume" => Ok(UnitFamily::Volume),
            "weight" => Ok(UnitFamily::Weight),
            "count" => Ok(UnitFamily::Count),
            "other" => Ok(UnitFamily::Other),
            "unrecognized" => Ok(UnitFamily::Unrecognized),
            _ => Err(format!("Unknown unit family: {s}")),
        }
    }
}

/// A unit reduced to its family and the canonical spelling within it.
///
/// Quantities may only be summed when both parts are equal; summing `cup` with
/// `tbsp` would need a conversion factor nobody supplied. An unrecognized unit
/// keeps its folded raw spelling as `canonical`, so it still aggregates with
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NormalizedUnit {
    pub family: UnitFamily,
    pub canonical: String,
}

impl NormalizedUnit {
    pub fn is_recognized(&self) -> bool {
        self.family != UnitFamily::Unrecognized
    }
}

impl fmt::Display for NormalizedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.canonical.is_empty() {
            write!(f, "({})", self.family)
        } else {
            f.write_str(&self.canonical)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    irregular_plurals: HashMap<String, String>,
    invariant: HashSet<String>,
    synonyms: HashMap<String, String>,
    units: HashMap<String, NormalizedUnit>,
    /// Spellings with capitals, where case carries meaning (`T` vs `t`).
    cased_units: HashMap<String, NormalizedUnit>,
}

impl Normalizer {
    #[tracing::instrument(name = "Normalizer::new", skip_all, err)]
    pub fn new(tables: &IngredientTables) -> Result<Self> {
        let mut normalizer = Self {
            irregular_plurals: tables
                .irregular_plurals
                .iter()
                .map(|(plural, singular)| (fold(plural), fold(singular)))
                .collect(),
            invariant: tables.invariant.iter().map(|w| fold(w)).collect(),
            synonyms: HashMap::new(),
            units: HashMap::new(),
            cased_units: HashMap::new(),
        };

        normalizer.synonyms = normalizer.resolve_synonyms(tables)?;
        (normalizer.units, normalizer.cased_units) = build_units(tables)?;

        tracing::debug!(
            synonyms = normalizer.synonyms.len(),
            units = normalizer.units.len(),
            "Built ingredient normalizer"
        );

        Ok(normalizer)
    }

    pub fn builtin() -> Result<Self> {
        Self::new(&IngredientTables::builtin()?)
    }

    pub fn normalize(&self, name: &str) -> NormalizedName {
        let singular = self.singularize(&fold(name));

        match self.synonyms.get(&singular) {
            Some(canonical) => NormalizedName(canonical.clone()),
            None => NormalizedName(singular),
        }
    }

    pub fn normalize_unit(&self, unit: &str) -> NormalizedUnit {
        if let Some(unit) = self.cased_units.get(&squash_unit(unit)) {
            return unit.clone();
        }

        let key = fold_unit(unit);

        if key.is_empty() {
            return NormalizedUnit {
                family: UnitFamily::Count,
                canonical: String::new(),
            };
        }

        self.units
            .get(&key)
            .cloned()
            .unwrap_or(NormalizedUnit {
                family: UnitFamily::Unrecognized,
                canonical: key,
            })
    }

    pub fn same_ingredient(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    pub fn synonym_count(&self) -> usize {
        self.synonyms.len()
    }

    pub fn unit_spelling_count(&self) -> usize {
        self.units.len() + self.cased_units.len()
    }

    fn singularize(&self, folded: &str) -> String {
        if let Some(singular) = self.irregular_plurals.get(folded) {
            return singular.clone();
        }

        match folded.rsplit_once(' ') {
            Some((head, last)) => format!("{head} {}", self.singularize_word(last)),
            None => self.singularize_word(folded),
        }
    }

    fn singularize_word(&self, word: &str) -> String {
        if let Some(singular) = self.irregular_plurals.get(word) {
            return singular.clone();
        }
        if self.invariant.contains(word) || word.len() <= 3 {
            return word.to_string();
        }

        if word.len() > 4 {
            if let Some(stem) = word.strip_suffix("ies") {
                return format!("{stem}y");
            }
        }

        const ES_ENDINGS: [&str; 5] = ["ches", "shes", "sses", "xes", "zes"];
        if ES_ENDINGS.iter().any(|ending| word.ends_with(ending)) {
            return word[..word.len() - 2].to_string();
        }

        const KEEP_S: [&str; 3] = ["ss", "us", "is"];
        if word.ends_with('s') && !KEEP_S.iter().any(|ending| word.ends_with(ending)) {
            return word[..word.len() - 1].to_string();
        }

        word.to_string()
    }

    /// Map every alias straight to the end of its chain, so lookups are a
    /// single hop.
    fn resolve_synonyms(&self, tables: &IngredientTables) -> Result<HashMap<String, String>> {
        let mut direct = HashMap::<String, String>::new();

        for (alias, canonical) in &tables.synonyms {
            let alias = self.singularize(&fold(alias));
            let canonical = self.singularize(&fold(canonical));

            if alias.is_empty() || canonical.is_empty() {
                return Err(Error::Tables("synonym entries must not be blank".into()));
            }
            if alias == canonical {
                continue;
            }

            if let Some(previous) = direct.insert(alias.clone(), canonical.clone()) {
                if previous != canonical {
                    return Err(Error::Tables(format!(
                        "synonym '{alias}' maps to both '{previous}' and '{canonical}'"
                    )));
                }
            }
        }

        let mut resolved = HashMap::with_capacity(direct.len());
        for (alias, first) in &direct {
            let mut visited = HashSet::from([alias.as_str()]);
            let mut current = first.as_str();

            loop {
                if !visited.insert(current) {
                    return Err(Error::Tables(format!(
                        "synonym cycle through '{alias}'"
                    )));
                }
                match direct.get(current) {
                    Some(next) => current = next.as_str(),
                    None => break,
                }
            }

            resolved.insert(alias.clone(), current.to_string());
        }

        Ok(resolved)
    }
}

type UnitMap = HashMap<String, NormalizedUnit>;

/// Spellings are folded to lower case unless they contain a capital, in which
/// case they only match that exact spelling.
fn build_units(tables: &IngredientTables) -> Result<(UnitMap, UnitMap)> {
    let families = [
        (UnitFamily::Volume, &tables.units.volume),
        (UnitFamily::Weight, &tables.units.weight),
        (UnitFamily::Count, &tables.units.count),
        (UnitFamily::Other, &tables.units.other),
    ];

    let mut units = HashMap::new();
    let mut cased_units = HashMap::new();
    for (family, table) in families {
        for (canonical, spellings) in table {
            let unit = NormalizedUnit {
                family,
                canonical: fold_unit(canonical),
            };

            for spelling in spellings.iter().chain(std::iter::once(canonical)) {
                let (map, key) = if spelling.chars().any(char::is_uppercase) {
                    (&mut cased_units, squash_unit(spelling))
                } else {
                    (&mut units, fold_unit(spelling))
                };
                if let Some(existing) = map.insert(key.clone(), unit.clone()) {
                    if existing != unit {
                        return Err(Error::Tables(format!(
                            "unit spelling '{key}' is listed as both '{existing}' ({}) and '{unit}' ({})",
                            existing.family, unit.family
                        )));
                    }
                }
            }
        }
    }

    Ok((units, cased_units))
}

fn fold(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_unit(raw: &str) -> String {
    fold(&raw.replace('.', " "))
}

fn squash_unit(raw: &str) -> String {
    raw.replace('.', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
