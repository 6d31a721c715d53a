use axum_macros::{FromRequest, FromRequestParts};

use super::errors::ServerError;

/// `Json` whose rejections render as our JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub(crate) struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServerError))]
pub(crate) struct ApiQuery<T>(pub T);
