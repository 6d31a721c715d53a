use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use color_eyre::{
    eyre::{bail, WrapErr},
    Result,
};
use db::setup_db_pool;
use kitchen::{IngredientTables, Normalizer};
use sqlx::PgPool;
use tracing::instrument;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REGENERATE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub ingredient_tables_path: Option<PathBuf>,
    /// How many read-merge-write cycles a grocery list regeneration gets
    /// before it gives up with a conflict.
    pub regenerate_attempts: u32,
}

impl AppConfig {
    #[instrument(name = "AppConfig::from_env")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .wrap_err_with(|| format!("Invalid PORT {port:?}, expected a port number"))?,
            None => DEFAULT_PORT,
        };

        let regenerate_attempts = match lookup("GROCERY_REGENERATE_ATTEMPTS") {
            Some(attempts) => attempts.trim().parse().wrap_err_with(|| {
                format!("Invalid GROCERY_REGENERATE_ATTEMPTS {attempts:?}, expected a whole number")
            })?,
            None => DEFAULT_REGENERATE_ATTEMPTS,
        };
        if regenerate_attempts == 0 {
            bail!("GROCERY_REGENERATE_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            port,
            ingredient_tables_path: lookup("INGREDIENT_TABLES_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            regenerate_attempts,
        })
    }
}

pub(crate) fn tables_path_from_env() -> Option<PathBuf> {
    std::env::var_os("INGREDIENT_TABLES_PATH")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Build the normalizer from a YAML tables file, or from the tables compiled
/// into `kitchen` when no path is given.
#[instrument(err)]
pub(crate) fn load_normalizer(path: Option<&Path>) -> Result<Normalizer> {
    let tables = match path {
        Some(path) => {
            let yaml = std::fs::read_to_string(path).wrap_err_with(|| {
                format!("Couldn't read INGREDIENT_TABLES_PATH {}", path.display())
            })?;
            IngredientTables::from_yaml(&yaml)
                .wrap_err_with(|| format!("Couldn't parse ingredient tables {}", path.display()))?
        }
        None => IngredientTables::builtin().wrap_err("Builtin ingredient tables are invalid")?,
    };

    Normalizer::new(&tables).wrap_err("Ingredient tables failed validation")
}

#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: &'static str,
}

impl VersionInfo {
    #[instrument(name = "VersionInfo::from_env")]
    pub(crate) fn from_env() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub app: AppConfig,
    pub versions: VersionInfo,
    pub db: PgPool,
    pub normalizer: Arc<Normalizer>,
}

impl AppState {
    #[instrument(name = "AppState::from_env", err)]
    pub async fn from_env() -> Result<Self> {
        let app = AppConfig::from_env()?;

        let database_url =
            std::env::var("DATABASE_URL").wrap_err("Missing DATABASE_URL, needed for app launch")?;

        let normalizer = load_normalizer(app.ingredient_tables_path.as_deref())?;
        tracing::info!(
            synonyms = normalizer.synonym_count(),
            unit_spellings = normalizer.unit_spelling_count(),
            "Ingredient tables loaded"
        );

        Ok(AppState {
            versions: VersionInfo::from_env(),
            db: setup_db_pool(&database_url).await?,
            normalizer: Arc::new(normalizer),
            app,
        })
    }
}
