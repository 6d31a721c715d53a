use axum::response::Response;
use serde::Serialize;

use errors::ServerError;

pub(crate) mod cmd;

mod api {
    pub mod cookbooks;
    pub mod grocery_lists;
    pub mod health;
    pub mod meal_plans;
    pub mod menu;
    pub mod recipes;
}

mod config;
mod current_user;
pub mod errors;
mod extract;
pub(crate) mod routes;
mod serve;
mod trace;

#[cfg(all(test, feature = "db-tests"))]
pub(crate) mod test_helpers;

type ResponseResult<T = Response> = Result<T, ServerError>;

/// Envelope every successful API response is wrapped in.
#[derive(Debug, Serialize)]
pub(crate) struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub(crate) struct DataWithMeta<T, M> {
    pub data: T,
    pub meta: M,
}
