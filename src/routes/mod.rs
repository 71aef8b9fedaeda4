//! HTTP route handlers
//!
//! One module per entity under `/api/v1`. The filter endpoints accept the
//! form-encoded filter object the web client posts; `FilterForm` is its
//! wire shape and converts into the typed [`FilterConfig`] the repositories
//! consume. Blank fields arrive as empty strings and mean "not filtered".

pub mod categories;
pub mod documents;
pub mod files;
pub mod lessons;

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::filter::{DateRange, FilterConfig, OwnerFilter, PageRequest, SortSpec};
use crate::error::{AppError, Result};
use crate::media::MediaKind;

/// Form-encoded filter payload shared by the document, lesson and file
/// filter endpoints. `tags` arrives as a JSON array string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterForm {
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    non_empty(value)?.parse::<DateTime<Utc>>().ok()
}

impl FilterForm {
    pub fn into_filter(self) -> (FilterConfig, PageRequest) {
        let page = PageRequest::new(self.page.unwrap_or(1), self.limit.unwrap_or(20));

        // An explicit owner id beats a name fragment when both are sent.
        let owner = if let Some(id) = non_empty(self.owner_id) {
            Some(OwnerFilter::Id(id))
        } else {
            non_empty(self.owner).map(OwnerFilter::NameContains)
        };

        let tags = non_empty(self.tags)
            .map(|raw| serde_json::from_str::<Vec<String>>(&raw).unwrap_or_default())
            .unwrap_or_default();

        let filter = FilterConfig {
            search_text: self.search_text.unwrap_or_default(),
            category_id: non_empty(self.category_id),
            owner,
            date_range: self
                .date_range
                .as_deref()
                .map(DateRange::parse)
                .unwrap_or_default(),
            date_from: parse_timestamp(self.date_from),
            date_to: parse_timestamp(self.date_to),
            tags,
            class_id: self.class_id,
            file_type: non_empty(self.file_type).and_then(|t| MediaKind::parse(&t)),
            sort: self
                .sort_by
                .as_deref()
                .map(SortSpec::parse)
                .unwrap_or_default(),
        };
        (filter, page)
    }
}

/// Binary download response with an attachment disposition.
pub(crate) fn attachment_response(
    bytes: Vec<u8>,
    content_type: &str,
    filename: &str,
) -> Result<Response<Body>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
