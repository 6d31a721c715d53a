use std::path::PathBuf;

use clap::Subcommand;
use color_eyre::Result;

pub(crate) mod info;
pub(crate) mod validate;

#[derive(Subcommand, Default)]
pub(crate) enum Command {
    /// Run the HTTP API
    #[default]
    Serve,
    /// Print the version and the configuration read from the environment
    Info,
    /// Load the ingredient tables and check them for cycles and clashes
    Validate {
        /// YAML file to check instead of `INGREDIENT_TABLES_PATH` or the builtin tables
        #[arg(long)]
        tables: Option<PathBuf>,
    },
}

impl Command {
    pub(crate) async fn run(&self) -> Result<()> {
        match &self {
            Command::Serve => crate::http_server::cmd::serve().await,
            Command::Info => info::print_info(),
            Command::Validate { tables } => validate::validate(tables.clone()),
        }
    }
}
