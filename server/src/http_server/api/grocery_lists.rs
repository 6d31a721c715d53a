use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use color_eyre::eyre::eyre;
use db::grocery_lists::{self, GroceryList};
use kitchen::{Anomaly, DateRange, Department, GroceryItem, ItemStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    grocery,
    http_server::{
        current_user::CurrentUser, errors::WithStatus as _, extract::ApiJson, Data, DataWithMeta,
        ResponseResult,
    },
    AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct GenerateMeta {
    anomalies: Vec<Anomaly>,
}

/// Generate the list for a date range, or regenerate it if the user already
/// has one for exactly that range.
#[axum_macros::debug_handler]
pub(crate) async fn generate(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> ResponseResult {
    let range = DateRange::new(request.start_date, request.end_date)?;

    let regenerated = grocery::regenerate(&state, user.user_id, range).await?;

    let status = if regenerated.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(DataWithMeta {
            data: regenerated.list,
            meta: GenerateMeta {
                anomalies: regenerated.anomalies,
            },
        }),
    )
        .into_response())
}

pub(crate) async fn index(State(state): State<AppState>, user: CurrentUser) -> ResponseResult {
    let lists = GroceryList::list_for_user(&state.db, user.user_id).await?;

    Ok(Json(Data { data: lists }).into_response())
}

async fn find_list(state: &AppState, user: CurrentUser, id: Uuid) -> ResponseResult<GroceryList> {
    GroceryList::get_for_user(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| eyre!("Grocery list {id} not found"))
        .with_status(StatusCode::NOT_FOUND)
}

pub(crate) async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ResponseResult {
    let list = find_list(&state, user, id).await?;

    Ok(Json(Data {
        data: list.with_items(&state.db).await?,
    })
    .into_response())
}

pub(crate) async fn destroy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ResponseResult {
    if !GroceryList::delete_for_user(&state.db, user.user_id, id).await? {
        return Err(eyre!("Grocery list {id} not found")).with_status(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManualItemRequest {
    #[serde(default)]
    item_name: String,
    quantity: Option<f64>,
    unit: Option<String>,
    department: Option<Department>,
}

/// Add an item by hand. It skips aggregation and survives regeneration as is.
pub(crate) async fn add_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<ManualItemRequest>,
) -> ResponseResult {
    let list = find_list(&state, user, id).await?;

    let item = GroceryItem::manual(
        &state.normalizer,
        &request.item_name,
        request.quantity,
        request.unit.as_deref(),
        request.department,
    )?;

    let inserted = list.add_manual_item(&state.db, &item).await?;

    Ok((StatusCode::CREATED, Json(Data { data: inserted })).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    status: ItemStatus,
}

pub(crate) async fn update_item_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ResponseResult {
    let item = grocery_lists::update_item_status(&state.db, user.user_id, item_id, request.status)
        .await?
        .ok_or_else(|| eyre!("Grocery item {item_id} not found"))
        .with_status(StatusCode::NOT_FOUND)?;

    Ok(Json(Data { data: item }).into_response())
}

#[cfg(all(test, feature = "db-tests"))]
mod test {
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use db::{
        meal_plans::{MealInput, MealPlan},
        test_utils::insert_recipe,
    };
    use kitchen::{Department, MealType};
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::http_server::test_helpers::{create_test_app, json_request, response_body_json};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn plan_flour_dinners(pool: &PgPool) {
        let bread = insert_recipe(
            pool,
            "Bread",
            1,
            &[("Flour", 2.0, "cups", Department::Pantry)],
        )
        .await;
        let dinner = MealInput {
            meal_type: MealType::Dinner,
            recipe_id: Some(bread.recipe.id),
            servings: None,
            out_of_kitchen: false,
        };
        let eating_out = MealInput {
            meal_type: MealType::Dinner,
            recipe_id: None,
            servings: None,
            out_of_kitchen: true,
        };

        MealPlan::replace_day(pool, date("2024-01-01"), std::slice::from_ref(&dinner))
            .await
            .unwrap();
        MealPlan::replace_day(pool, date("2024-01-03"), &[eating_out])
            .await
            .unwrap();
        MealPlan::replace_day(pool, date("2024-01-05"), &[dinner])
            .await
            .unwrap();
    }

    fn week() -> Value {
        json!({ "start_date": "2024-01-01", "end_date": "2024-01-07" })
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_generate_aggregates_the_week(pool: PgPool) {
        plan_flour_dinners(&pool).await;
        let app = create_test_app(pool);
        let user = Uuid::new_v4();

        let response = app
            .oneshot(json_request("POST", "/api/v1/grocery-lists", Some(user), &week()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = response_body_json(response).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["normalized_name"], "flour");
        assert_eq!(items[0]["quantity"], 4.0);
        assert_eq!(items[0]["unit"], "cup");
        assert_eq!(items[0]["department"], "pantry");
        assert_eq!(items[0]["status"], "pending");
        assert_eq!(body["meta"]["anomalies"], json!([]));
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_bought_survives_regeneration(pool: PgPool) {
        plan_flour_dinners(&pool).await;
        let app = create_test_app(pool);
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/grocery-lists", Some(user), &week()))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        let list_id = body["data"]["id"].as_str().unwrap().to_string();
        let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/grocery-lists/items/{item_id}"),
                Some(user),
                &json!({ "status": "bought" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/grocery-lists/{list_id}/items"),
                Some(user),
                &json!({ "item_name": "Paper towels" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let manual: Value = response_body_json(response).await;
        assert_eq!(manual["data"]["department"], "other");
        assert_eq!(manual["data"]["is_manual"], true);

        let response = app
            .oneshot(json_request("POST", "/api/v1/grocery-lists", Some(user), &week()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"]["id"], list_id.as_str());
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);

        let flour = items.iter().find(|i| i["normalized_name"] == "flour").unwrap();
        assert_eq!(flour["id"], item_id.as_str());
        assert_eq!(flour["status"], "bought");

        let towels = items.iter().find(|i| i["is_manual"] == true).unwrap();
        assert_eq!(towels["item_name"], "Paper towels");
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_lists_are_scoped_to_the_caller(pool: PgPool) {
        plan_flour_dinners(&pool).await;
        let app = create_test_app(pool);
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/grocery-lists", Some(owner), &week()))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        let list_id = body["data"]["id"].as_str().unwrap().to_string();
        let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/grocery-lists/{list_id}");
        let response = app
            .clone()
            .oneshot(json_request("GET", &uri, Some(stranger), &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/grocery-lists/items/{item_id}"),
                Some(stranger),
                &json!({ "status": "bought" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request("GET", "/api/v1/grocery-lists", Some(stranger), &Value::Null))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        assert_eq!(body["data"], json!([]));

        let response = app
            .clone()
            .oneshot(json_request("DELETE", &uri, Some(owner), &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request("GET", &uri, Some(owner), &Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_generate_rejects_bad_requests(pool: PgPool) {
        let app = create_test_app(pool);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/grocery-lists", None, &week()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let backwards = json!({ "start_date": "2024-01-07", "end_date": "2024-01-01" });
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/grocery-lists",
                Some(Uuid::new_v4()),
                &backwards,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response_body_json(response).await;
        assert!(body["error"]["message"].is_string());

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/grocery-lists",
                Some(Uuid::new_v4()),
                &json!({ "start_date": "not a date" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_manual_item_needs_a_name(pool: PgPool) {
        let app = create_test_app(pool);
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/grocery-lists", Some(user), &week()))
            .await
            .unwrap();
        let body: Value = response_body_json(response).await;
        let list_id = body["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/grocery-lists/{list_id}/items"),
                Some(user),
                &json!({ "item_name": "  " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
