//! Lesson routes

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::db::filter::PageInfo;
use crate::db::lessons::{LessonRepo, LessonUpdate, NewLesson};
use crate::error::Result;
use crate::routes::FilterForm;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/filter", post(filter))
        .route("/owner/:owner_id", get(by_owner))
        .route("/:id", get(get_one).put(update).delete(delete_one))
}

async fn run_filter(state: &AppState, form: FilterForm) -> Response {
    let (filter, page) = form.into_filter();
    match LessonRepo::new(state.db()).find_filtered(&filter, page).await {
        Ok(result) => Json(json!({
            "lessons": result.items,
            "total": result.total,
            "filters": filter,
            "pagination": PageInfo::new(page, result.total),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "lesson filter failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "lessons": [],
                    "total": 0,
                })),
            )
                .into_response()
        }
    }
}

async fn list(State(state): State<AppState>, Query(form): Query<FilterForm>) -> Response {
    run_filter(&state, form).await
}

async fn filter(State(state): State<AppState>, Form(form): Form<FilterForm>) -> Response {
    run_filter(&state, form).await
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let lesson = LessonRepo::new(state.db()).get(&id).await?;
    Ok(Json(lesson).into_response())
}

async fn by_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Response> {
    let lessons = LessonRepo::new(state.db()).find_by_owner(&owner_id).await?;
    Ok(Json(json!({ "lessons": lessons })).into_response())
}

async fn create(State(state): State<AppState>, Json(new): Json<NewLesson>) -> Result<Response> {
    let lesson = LessonRepo::new(state.db()).create(new).await?;
    Ok((StatusCode::CREATED, Json(lesson)).into_response())
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<LessonUpdate>,
) -> Result<Response> {
    let lesson = LessonRepo::new(state.db()).update(&id, changes).await?;
    Ok(Json(lesson).into_response())
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    LessonRepo::new(state.db()).delete(&id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}
