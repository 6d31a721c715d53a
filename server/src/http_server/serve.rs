use std::net::SocketAddr;

use axum::Router;
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::trace::Tracer;

pub(crate) async fn run_server(routes: Router, port: u16) -> color_eyre::Result<()> {
    let tracer = Tracer;
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    let app = routes.layer(trace_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to open port {port}"))?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to run server")
}
