use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Level;

/// Request spans named after the matched route, so `/recipes/{id}` groups
/// together instead of producing one span name per recipe.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tracer;

impl<Body> MakeSpan<Body> for Tracer {
    fn make_span(&mut self, request: &Request<Body>) -> tracing::Span {
        let route = matched_route(request);
        let header = |name: &str| request.headers().get(name).and_then(|h| h.to_str().ok());

        tracing::span!(
            Level::INFO,
            "server.request",
            otel.name = format!("{} {}", request.method(), route),
            kind = "server",
            url.path = %request.uri().path(),
            url.query = request.uri().query(),
            http.route = route,
            http.request.method = %request.method(),
            user_agent.original = header("user-agent"),
            http.request.header.forwarded_for = header("x-forwarded-for"),
            http.request.header.user_id = header("x-user-id"),

            http.response.status_code = tracing::field::Empty,
        )
    }
}

impl<Body> OnResponse<Body> for Tracer {
    fn on_response(
        self,
        response: &Response<Body>,
        latency: std::time::Duration,
        span: &tracing::Span,
    ) {
        let status_code = response.status().as_u16();
        span.record("http.response.status_code", status_code);

        tracing::event!(
            Level::INFO,
            status = status_code,
            latency = format_args!("{} ms", latency.as_millis()),
            "finished processing request"
        );
    }
}

fn matched_route<B>(request: &Request<B>) -> &str {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or("", MatchedPath::as_str)
}
