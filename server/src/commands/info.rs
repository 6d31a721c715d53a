use color_eyre::Result;

use crate::{state::VersionInfo, AppConfig};

pub(crate) fn print_info() -> Result<()> {
    let versions = VersionInfo::from_env();
    println!("server {}", versions.version);
    println!();

    let config = AppConfig::from_env()?;
    println!("Port: {}", config.port);
    println!(
        "Ingredient tables: {}",
        config
            .ingredient_tables_path
            .as_ref()
            .map_or_else(|| "builtin".to_string(), |p| p.display().to_string())
    );
    println!("Regenerate attempts: {}", config.regenerate_attempts);

    for var in ["DATABASE_URL", "SENTRY_DSN", "HONEYCOMB_API_KEY"] {
        let set = std::env::var_os(var).is_some();
        println!("{var}: {}", if set { "set" } else { "not set" });
    }

    Ok(())
}
