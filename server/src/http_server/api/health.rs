use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    status: &'static str,
    version: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: state.versions.version,
    })
}

#[cfg(all(test, feature = "db-tests"))]
mod test {
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use crate::http_server::test_helpers::{create_test_app, json_request, response_body_json};

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_health(pool: PgPool) {
        let app = create_test_app(pool);

        let response = app
            .clone()
            .oneshot(json_request("GET", "/api/v1/health", None, &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response_body_json(response).await;
        assert_eq!(body, json!({ "status": "ok", "version": "test-version" }));

        let response = app
            .oneshot(json_request("GET", "/api/v1/nope", None, &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response_body_json(response).await;
        assert!(body["error"]["message"].is_string());
    }
}
