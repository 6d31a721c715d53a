use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use color_eyre::Report;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ServerError(pub(crate) Report, pub(crate) StatusCode);

impl ServerError {
    /// What the caller gets to read. Server side failures stay in the logs.
    fn public_message(&self) -> String {
        if self.1.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        if self.1.is_server_error() {
            sentry::capture_error(&self);
        }

        tracing::error!(error = ?self.0, status = %self.1, "ServerError");

        let body = json!({ "error": { "message": self.public_message() } });

        (self.1, Json(body)).into_response()
    }
}

impl From<Report> for ServerError {
    fn from(err: Report) -> Self {
        ServerError(err, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<kitchen::Error> for ServerError {
    fn from(err: kitchen::Error) -> Self {
        let status = match &err {
            kitchen::Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            kitchen::Error::NotFound(_) => StatusCode::NOT_FOUND,
            kitchen::Error::Tables(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ServerError(err.into(), status)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };

        ServerError(Report::msg(rejection.body_text()), status)
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError(Report::msg(rejection.body_text()), StatusCode::BAD_REQUEST)
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T, E> WithStatus<T> for Result<T, E>
where
    E: Into<Report>,
{
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|err| ServerError(err.into(), status))
    }
}
