//! Category routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::CategoryRepo;
use crate::error::Result;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(rename).delete(delete_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryPayload {
    name: String,
    #[serde(default)]
    owner_id: Option<String>,
}

async fn list(State(state): State<AppState>) -> Result<Response> {
    let categories = CategoryRepo::new(state.db()).list().await?;
    Ok(Json(json!({ "categories": categories })).into_response())
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let category = CategoryRepo::new(state.db()).get(&id).await?;
    Ok(Json(category).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response> {
    let category = CategoryRepo::new(state.db())
        .create(&payload.name, payload.owner_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response> {
    let category = CategoryRepo::new(state.db())
        .rename(&id, &payload.name)
        .await?;
    Ok(Json(category).into_response())
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    CategoryRepo::new(state.db()).delete(&id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let state = test_state().await;
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"name": "Đề thi"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["slug"], "thi");

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["categories"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::put(format!("/{}", id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"name": "Exams"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let renamed = body_json(response).await;
        assert_eq!(renamed["slug"], "exams");

        let response = app
            .oneshot(
                Request::delete(format!("/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_422() {
        let state = test_state().await;
        let app = router().with_state(state);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::post("/")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(json!({"name": "Math"}).to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            if response.status() == StatusCode::CREATED {
                continue;
            }
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            return;
        }
        panic!("second create should have been rejected");
    }
}
