use std::path::PathBuf;

use color_eyre::Result;

use crate::state::{load_normalizer, tables_path_from_env};

pub(crate) fn validate(tables: Option<PathBuf>) -> Result<()> {
    let path = tables.or_else(tables_path_from_env);

    match &path {
        Some(path) => println!("Validating ingredient tables at {}...", path.display()),
        None => println!("Validating builtin ingredient tables..."),
    }

    let normalizer = load_normalizer(path.as_deref())?;

    println!("Synonyms: {}", normalizer.synonym_count());
    println!("Unit spellings: {}", normalizer.unit_spelling_count());
    println!("Ingredient tables valid! ✅");

    Ok(())
}
