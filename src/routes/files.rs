//! File routes
//!
//! Multipart upload, the filter endpoint, and deletion. Uploads accept one
//! `file` field plus optional metadata fields; the whole request is bounded
//! by a raised body limit since media files routinely exceed the default.

use axum::extract::{DefaultBodyLimit, Form, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::db::files::FileRepo;
use crate::db::filter::PageInfo;
use crate::error::{AppError, Result};
use crate::media::{MediaUploader, UploadExtra, UploadedFile};
use crate::routes::FilterForm;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/", get(list))
        .route("/filter", post(filter))
        .route("/:id", get(get_one).delete(delete_one))
}

async fn run_filter(state: &AppState, form: FilterForm) -> Response {
    let (filter, page) = form.into_filter();
    match FileRepo::new(state.db()).find_filtered(&filter, page).await {
        Ok(result) => Json(json!({
            "files": result.items,
            "total": result.total,
            "filters": filter,
            "pagination": PageInfo::new(page, result.total),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "file filter failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "files": [],
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
    let file = FileRepo::new(state.db()).get(&id).await?;
    Ok(Json(file).into_response())
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let mut file: Option<UploadedFile> = None;
    let mut extra = UploadExtra::default();
    let mut name_override: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?
                    .to_vec();
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "name" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                if !value.is_empty() {
                    name_override = Some(value);
                }
            }
            "folder" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                if !value.is_empty() {
                    extra.folder = Some(value);
                }
            }
            "classes" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                extra.classes = serde_json::from_str(&value).unwrap_or_default();
            }
            "categoryId" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                if !value.is_empty() {
                    extra.category_id = Some(value);
                }
            }
            "ownerId" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                if !value.is_empty() {
                    extra.owner_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let mut file = file.ok_or_else(|| AppError::InvalidInput("missing file field".to_string()))?;
    if let Some(name) = name_override {
        file.filename = name;
    }

    let uploader = MediaUploader::new(
        state.s3_client(),
        state.db(),
        state.config().upload.audio_classification,
    );
    let record = uploader.upload(file, extra).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "file": record })),
    )
        .into_response())
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let uploader = MediaUploader::new(
        state.s3_client(),
        state.db(),
        state.config().upload.audio_classification,
    );
    uploader.remove(&id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}
