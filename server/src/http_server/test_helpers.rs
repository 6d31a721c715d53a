use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, Response},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    http_server::current_user::USER_ID_HEADER,
    state::{load_normalizer, VersionInfo},
    AppConfig, AppState,
};

pub fn test_state(pool: PgPool, regenerate_attempts: u32) -> AppState {
    AppState {
        app: AppConfig {
            port: 0,
            ingredient_tables_path: None,
            regenerate_attempts,
        },
        versions: VersionInfo {
            version: "test-version",
        },
        db: pool,
        normalizer: Arc::new(load_normalizer(None).unwrap()),
    }
}

pub fn create_test_app(pool: PgPool) -> Router {
    crate::http_server::routes::make_router().with_state(test_state(pool, 3))
}

/// A request as the gateway would forward it. `Value::Null` sends no body.
pub fn json_request(method: &str, uri: &str, user: Option<Uuid>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }

    if body.is_null() {
        builder.body(Body::empty()).unwrap()
    } else {
        builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }
}

pub async fn response_body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}
