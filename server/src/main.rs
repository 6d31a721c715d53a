use clap::Parser;
use color_eyre::Result;
use commands::Command;
use tracing_common::{setup_sentry, setup_tracing};

mod commands;
mod grocery;
mod http_server;
pub mod state;

pub(crate) use state::{AppConfig, AppState};

#[derive(Parser)]
#[command(author, version, about)]
struct CliArgs {
    #[clap(subcommand)]
    command: Option<Command>,
}

fn main() -> Result<()> {
    let _sentry_guard = setup_sentry();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { _main().await })
}

async fn _main() -> Result<()> {
    setup_tracing("server")?;

    let cli = CliArgs::parse();
    let command = cli.command.unwrap_or_default();

    command.run().await
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn validate_builtin_tables() -> Result<()> {
        crate::commands::validate::validate(None)
    }

    #[test]
    fn cli_is_well_formed() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = CliArgs::parse_from(["server"]);
        assert!(matches!(cli.command.unwrap_or_default(), Command::Serve));
    }

    #[test]
    fn validate_takes_a_tables_path() {
        let cli = CliArgs::parse_from(["server", "validate", "--tables", "tables.yaml"]);
        let Some(Command::Validate { tables }) = cli.command else {
            panic!("expected the validate command");
        };
        assert_eq!(tables.unwrap().to_str(), Some("tables.yaml"));
    }
}
