//! Document routes
//!
//! CRUD, the form-encoded filter endpoint, statistics, and the two export
//! downloads. The filter endpoint keeps the historical envelope: failures
//! answer 500 with an empty `documents` array rather than the plain error
//! body, because the web client always reads `documents` off the response.

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::documents::{DocumentRepo, DocumentUpdate, NewDocument};
use crate::db::filter::PageInfo;
use crate::error::Result;
use crate::export::{self, ChromiumExporter};
use crate::routes::{attachment_response, FilterForm};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/filter", post(filter))
        .route("/stats", get(stats))
        .route("/tags/popular", get(popular_tags))
        .route("/:id", get(get_one).put(update).delete(delete_one))
        .route("/:id/export/pdf", get(export_pdf))
        .route("/:id/export/docx", get(export_docx))
}

async fn run_filter(state: &AppState, form: FilterForm) -> Response {
    let (filter, page) = form.into_filter();
    match DocumentRepo::new(state.db()).find_filtered(&filter, page).await {
        Ok(result) => Json(json!({
            "documents": result.items,
            "total": result.total,
            "filters": filter,
            "pagination": PageInfo::new(page, result.total),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "document filter failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "documents": [],
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
    let doc = DocumentRepo::new(state.db()).get(&id).await?;
    Ok(Json(doc).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewDocument>,
) -> Result<Response> {
    let doc = DocumentRepo::new(state.db()).create(new).await?;
    Ok((StatusCode::CREATED, Json(doc)).into_response())
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<DocumentUpdate>,
) -> Result<Response> {
    let doc = DocumentRepo::new(state.db()).update(&id, changes).await?;
    Ok(Json(doc).into_response())
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    DocumentRepo::new(state.db()).delete(&id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsQuery {
    category_id: Option<String>,
    limit: Option<usize>,
}

async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Response> {
    let stats = DocumentRepo::new(state.db())
        .statistics(query.category_id.as_deref())
        .await?;
    Ok(Json(stats).into_response())
}

async fn popular_tags(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Response> {
    let tags = DocumentRepo::new(state.db())
        .popular_tags(query.limit.unwrap_or(20), query.category_id.as_deref())
        .await?;
    Ok(Json(json!({ "tags": tags })).into_response())
}

async fn export_pdf(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let engine = ChromiumExporter::new(state.config().export.clone());
    let bytes = export::export_pdf(state.db(), &engine, &id).await?;
    attachment_response(bytes, "application/pdf", &format!("document-{}.pdf", id))
}

async fn export_docx(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let bytes = export::export_docx(state.db(), &id).await?;
    attachment_response(
        bytes,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &format!("document-{}.docx", id),
    )
}
