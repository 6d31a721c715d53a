use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use color_eyre::eyre::eyre;
use db::{
    cookbooks::{Cookbook, CookbookInput},
    recipes::Recipe,
};
use uuid::Uuid;

use crate::{
    http_server::{
        current_user::CurrentUser, errors::WithStatus as _, extract::ApiJson, Data,
        ResponseResult,
    },
    AppState,
};

async fn find_cookbook(state: &AppState, user: CurrentUser, id: Uuid) -> ResponseResult<Cookbook> {
    Cookbook::get_for_user(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| eyre!("Cookbook {id} not found"))
        .with_status(StatusCode::NOT_FOUND)
}

pub(crate) async fn index(State(state): State<AppState>, user: CurrentUser) -> ResponseResult {
    let cookbooks = Cookbook::list_for_user(&state.db, user.user_id).await?;

    Ok(Json(Data { data: cookbooks }).into_response())
}

#[axum_macros::debug_handler]
pub(crate) async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CookbookInput>,
) -> ResponseResult {
    input.validate()?;

    let cookbook = Cookbook::create(&state.db, user.user_id, &input).await?;

    Ok((StatusCode::CREATED, Json(Data { data: cookbook })).into_response())
}

pub(crate) async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ResponseResult {
    let cookbook = find_cookbook(&state, user, id).await?;

    Ok(Json(Data {
        data: cookbook.with_recipes(&state.db).await?,
    })
    .into_response())
}

pub(crate) async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<CookbookInput>,
) -> ResponseResult {
    input.validate()?;

    let cookbook = Cookbook::update_for_user(&state.db, user.user_id, id, &input)
        .await?
        .ok_or_else(|| eyre!("Cookbook {id} not found"))
        .with_status(StatusCode::NOT_FOUND)?;

    Ok(Json(Data { data: cookbook }).into_response())
}

pub(crate) async fn destroy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ResponseResult {
    if !Cookbook::delete_for_user(&state.db, user.user_id, id).await? {
        return Err(eyre!("Cookbook {id} not found")).with_status(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn add_recipe(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, recipe_id)): Path<(Uuid, Uuid)>,
) -> ResponseResult {
    let cookbook = find_cookbook(&state, user, id).await?;

    if Recipe::existing_ids(&state.db, &[recipe_id]).await?.is_empty() {
        return Err(kitchen::Error::not_found(format!("Recipe {recipe_id} not found")).into());
    }

    cookbook.add_recipe(&state.db, recipe_id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn remove_recipe(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, recipe_id)): Path<(Uuid, Uuid)>,
) -> ResponseResult {
    let cookbook = find_cookbook(&state, user, id).await?;

    cookbook.remove_recipe(&state.db, recipe_id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(all(test, feature = "db-tests"))]
mod test {
    use axum::http::StatusCode;
    use db::test_utils::insert_recipe;
    use kitchen::Department;
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::http_server::test_helpers::{create_test_app, json_request, response_body_json};

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_cookbook_crud(pool: PgPool) {
        let app = create_test_app(pool);
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/cookbooks",
                Some(user),
                &json!({ "name": "Weeknights", "description": "Under 30 minutes" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response_body_json(response).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["recipe_count"], 0);
        assert_eq!(body["data"]["description"], "Under 30 minutes");

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/cookbooks/{id}"),
                Some(user),
                &json!({ "name": "Fridays" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"]["name"], "Fridays");
        assert_eq!(body["data"]["description"], Value::Null);

        let response = app
            .clone()
            .oneshot(json_request("GET", "/api/v1/cookbooks", Some(user), &Value::Null))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(json_request(
                "DELETE",
                &format!("/api/v1/cookbooks/{id}"),
                Some(user),
                &Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request(
                "GET",
                &format!("/api/v1/cookbooks/{id}"),
                Some(user),
                &Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_cookbook_validation_and_ownership(pool: PgPool) {
        let app = create_test_app(pool);
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        for name in [json!("  "), json!("x".repeat(201))] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/api/v1/cookbooks", Some(owner), &json!({ "name": name })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/cookbooks", None, &json!({ "name": "Soups" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/cookbooks", Some(owner), &json!({ "name": "Soups" })))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        for (method, body) in [
            ("GET", Value::Null),
            ("PUT", json!({ "name": "Stolen" })),
            ("DELETE", Value::Null),
        ] {
            let response = app
                .clone()
                .oneshot(json_request(method, &format!("/api/v1/cookbooks/{id}"), Some(stranger), &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
        }

        let response = app
            .oneshot(json_request("GET", "/api/v1/cookbooks", Some(stranger), &Value::Null))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"], json!([]));
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_adding_and_removing_recipes(pool: PgPool) {
        let toast = insert_recipe(&pool, "Toast", 1, &[("bread", 2.0, "slice", Department::Bakery)]).await;
        let app = create_test_app(pool);
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/cookbooks", Some(user), &json!({ "name": "Breakfasts" })))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let toast_uri = format!("/api/v1/cookbooks/{id}/recipes/{}", toast.recipe.id);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(json_request("POST", &toast_uri, Some(user), &Value::Null))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/cookbooks/{id}/recipes/{}", Uuid::new_v4()),
                Some(user),
                &Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request("POST", &toast_uri, Some(Uuid::new_v4()), &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request("GET", &format!("/api/v1/cookbooks/{id}"), Some(user), &Value::Null))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"]["recipe_count"], 1);
        assert_eq!(body["data"]["recipes"][0]["title"], "Toast");
        assert_eq!(body["data"]["recipes"][0]["ingredients"][0]["ingredient_name"], "bread");

        let response = app
            .clone()
            .oneshot(json_request("DELETE", &toast_uri, Some(user), &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request("GET", &format!("/api/v1/cookbooks/{id}"), Some(user), &Value::Null))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"]["recipes"], json!([]));
    }
}
