use color_eyre::Result;
use tracing::info;

use crate::{http_server::routes, AppState};

pub(crate) async fn serve() -> Result<()> {
    let app_state = AppState::from_env().await?;
    let port = app_state.app.port;

    info!(version = app_state.versions.version, "Starting server");

    super::serve::run_server(routes::make_router().with_state(app_state), port).await?;

    info!("Main Returning");

    Ok(())
}
