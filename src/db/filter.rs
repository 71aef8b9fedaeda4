//! Shared filter/query builder
//!
//! Translates a caller-supplied [`FilterConfig`] into one SQL predicate plus
//! its bind list. Every entity's filter endpoint goes through this single
//! builder; per-entity differences (which text columns exist, whether the
//! class set is a JSON array or a scalar) are described by [`EntityColumns`].
//!
//! Combination rule: base equality fields AND one OR-clause for the search
//! text AND one OR-clause for the tag set. No active field means no WHERE
//! clause at all.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// A single bound value in the generated predicate.
#[derive(Debug, Clone)]
pub enum Bind {
    Text(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

/// Named date buckets for the `dateRange` filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    Year,
}

impl DateRange {
    pub fn parse(value: &str) -> Self {
        match value {
            "today" => DateRange::Today,
            "week" => DateRange::Week,
            "month" => DateRange::Month,
            "3months" => DateRange::ThreeMonths,
            "year" => DateRange::Year,
            _ => DateRange::All,
        }
    }

    /// Lower bound for `created_at`, computed from `now`. `All` has none.
    pub fn threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateRange::All => None,
            DateRange::Today => Some(
                now.date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is a valid time")
                    .and_utc(),
            ),
            DateRange::Week => Some(now - Duration::days(7)),
            DateRange::Month => Some(now - Duration::days(30)),
            DateRange::ThreeMonths => Some(now - Duration::days(90)),
            DateRange::Year => Some(now - Duration::days(365)),
        }
    }
}

/// Owner filtering has two divergent historical semantics; the caller picks
/// one explicitly instead of the builder guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerFilter {
    /// Case-insensitive substring match against the denormalized owner name.
    NameContains(String),
    /// Exact match against the owner id.
    Id(String),
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Whitelisted sortable columns. Anything unrecognized falls back to
/// `created_at` rather than reaching the SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Size,
}

impl SortField {
    fn as_column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Size => "size",
        }
    }
}

/// Parsed `"field-direction"` sort pair, e.g. `createdAt-desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn parse(value: &str) -> Self {
        let (field, direction) = value.rsplit_once('-').unwrap_or((value, "desc"));
        let field = match field {
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "size" => SortField::Size,
            _ => SortField::CreatedAt,
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        SortSpec { field, direction }
    }

    pub fn as_order_by(&self) -> String {
        format!("{} {}", self.field.as_column(), self.direction.as_sql())
    }
}

/// The filter object shared by the document, lesson and file endpoints.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub search_text: String,
    pub category_id: Option<String>,
    pub owner: Option<OwnerFilter>,
    pub date_range: DateRange,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub class_id: Option<i64>,
    pub file_type: Option<MediaKind>,
    pub sort: SortSpec,
}

/// Shape of the class-set column for an entity.
#[derive(Debug, Clone, Copy)]
pub enum ClassColumn {
    /// JSON integer array, membership via json_each.
    JsonArray(&'static str),
    /// Plain integer column, exact match.
    Scalar(&'static str),
    None,
}

/// Per-entity column descriptor consumed by the builder.
#[derive(Debug, Clone, Copy)]
pub struct EntityColumns {
    /// Columns the search text is OR-matched against.
    pub search: &'static [&'static str],
    pub has_category: bool,
    pub has_tags: bool,
    pub has_type: bool,
    pub classes: ClassColumn,
}

pub const DOCUMENT_COLUMNS: EntityColumns = EntityColumns {
    search: &["title", "description", "content"],
    has_category: true,
    has_tags: true,
    has_type: false,
    classes: ClassColumn::JsonArray("classes"),
};

pub const LESSON_COLUMNS: EntityColumns = EntityColumns {
    search: &["title", "description"],
    has_category: false,
    has_tags: false,
    has_type: false,
    classes: ClassColumn::Scalar("class_id"),
};

pub const FILE_COLUMNS: EntityColumns = EntityColumns {
    search: &["filename"],
    has_category: true,
    has_tags: false,
    has_type: true,
    classes: ClassColumn::JsonArray("classes"),
};

/// Build the WHERE fragment (without the `WHERE` keyword) and its binds.
///
/// Returns an empty string when no filter field is active.
pub fn build_predicate(
    filter: &FilterConfig,
    columns: &EntityColumns,
    now: DateTime<Utc>,
) -> (String, Vec<Bind>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();

    // Category: exact match, sentinel "all" means unrestricted.
    if columns.has_category {
        if let Some(category_id) = filter.category_id.as_deref() {
            if !category_id.is_empty() && category_id != "all" {
                conditions.push("category_id = ?".to_string());
                binds.push(Bind::Text(category_id.to_string()));
            }
        }
    }

    match &filter.owner {
        Some(OwnerFilter::NameContains(name)) if !name.trim().is_empty() => {
            conditions.push("LOWER(owner_name) LIKE ?".to_string());
            binds.push(Bind::Text(format!("%{}%", name.trim().to_lowercase())));
        }
        Some(OwnerFilter::Id(id)) if !id.is_empty() => {
            conditions.push("owner_id = ?".to_string());
            binds.push(Bind::Text(id.clone()));
        }
        _ => {}
    }

    // Explicit bounds take priority over the named bucket.
    if filter.date_from.is_some() || filter.date_to.is_some() {
        if let Some(from) = filter.date_from {
            conditions.push("created_at >= ?".to_string());
            binds.push(Bind::Timestamp(from));
        }
        if let Some(to) = filter.date_to {
            conditions.push("created_at <= ?".to_string());
            binds.push(Bind::Timestamp(to));
        }
    } else if let Some(threshold) = filter.date_range.threshold(now) {
        conditions.push("created_at >= ?".to_string());
        binds.push(Bind::Timestamp(threshold));
    }

    // Search text: one OR-clause across the entity's text columns.
    let term = filter.search_text.trim();
    if !term.is_empty() && !columns.search.is_empty() {
        let pattern = format!("%{}%", term.to_lowercase());
        let clause = columns
            .search
            .iter()
            .map(|col| format!("LOWER({}) LIKE ?", col))
            .collect::<Vec<_>>()
            .join(" OR ");
        conditions.push(format!("({})", clause));
        for _ in columns.search {
            binds.push(Bind::Text(pattern.clone()));
        }
    }

    // Tags: set-intersection-non-empty, one OR-clause via json_each.
    if columns.has_tags && !filter.tags.is_empty() {
        let placeholders = filter
            .tags
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM json_each(tags) WHERE json_each.value IN ({}))",
            placeholders
        ));
        for tag in &filter.tags {
            binds.push(Bind::Text(tag.clone()));
        }
    }

    if let Some(class_id) = filter.class_id {
        match columns.classes {
            ClassColumn::JsonArray(col) => {
                conditions.push(format!(
                    "EXISTS (SELECT 1 FROM json_each({}) WHERE json_each.value = ?)",
                    col
                ));
                binds.push(Bind::Int(class_id));
            }
            ClassColumn::Scalar(col) => {
                conditions.push(format!("{} = ?", col));
                binds.push(Bind::Int(class_id));
            }
            ClassColumn::None => {}
        }
    }

    if columns.has_type {
        if let Some(kind) = filter.file_type {
            conditions.push("type = ?".to_string());
            binds.push(Bind::Text(kind.as_str().to_string()));
        }
    }

    (conditions.join(" AND "), binds)
}

/// Pagination request; offset is zero-based `(page - 1) * limit`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, 200),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Pagination window derived from a page request and the result total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub start_index: i64,
    pub end_index: i64,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + request.limit - 1) / request.limit
        };
        let start_index = if total == 0 {
            0
        } else {
            (request.page - 1) * request.limit + 1
        };
        let end_index = (request.page * request.limit).min(total);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            start_index,
            end_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().expect("valid timestamp")
    }

    #[test]
    fn test_empty_filter_emits_no_predicate() {
        let (sql, binds) = build_predicate(&FilterConfig::default(), &DOCUMENT_COLUMNS, now());
        assert!(sql.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn test_category_sentinel_all_is_skipped() {
        let filter = FilterConfig {
            category_id: Some("all".to_string()),
            ..Default::default()
        };
        let (sql, _) = build_predicate(&filter, &DOCUMENT_COLUMNS, now());
        assert!(sql.is_empty());
    }

    #[test]
    fn test_search_and_tags_compose_with_and() {
        let filter = FilterConfig {
            search_text: "toán".to_string(),
            tags: vec!["math".to_string()],
            category_id: Some("c1".to_string()),
            ..Default::default()
        };
        let (sql, binds) = build_predicate(&filter, &DOCUMENT_COLUMNS, now());
        assert!(sql.starts_with("category_id = ? AND "));
        assert!(sql.contains("(LOWER(title) LIKE ? OR LOWER(description) LIKE ? OR LOWER(content) LIKE ?)"));
        assert!(sql.contains("json_each(tags)"));
        // category + 3 search columns + 1 tag
        assert_eq!(binds.len(), 5);
    }

    #[test]
    fn test_explicit_bounds_override_named_range() {
        let from: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().expect("valid");
        let filter = FilterConfig {
            date_range: DateRange::Week,
            date_from: Some(from),
            ..Default::default()
        };
        let (sql, binds) = build_predicate(&filter, &DOCUMENT_COLUMNS, now());
        assert_eq!(sql, "created_at >= ?");
        assert_eq!(binds.len(), 1);
        match &binds[0] {
            Bind::Timestamp(t) => assert_eq!(*t, from),
            other => panic!("expected timestamp bind, got {:?}", other),
        }
    }

    #[test]
    fn test_date_range_thresholds() {
        let n = now();
        assert_eq!(DateRange::All.threshold(n), None);
        assert_eq!(
            DateRange::Today.threshold(n),
            Some("2026-03-01T00:00:00Z".parse().expect("valid"))
        );
        assert_eq!(DateRange::Week.threshold(n), Some(n - Duration::days(7)));
    }

    #[test]
    fn test_class_membership_shapes() {
        let filter = FilterConfig {
            class_id: Some(5),
            ..Default::default()
        };
        let (doc_sql, _) = build_predicate(&filter, &DOCUMENT_COLUMNS, now());
        assert!(doc_sql.contains("json_each(classes)"));

        let (lesson_sql, _) = build_predicate(&filter, &LESSON_COLUMNS, now());
        assert_eq!(lesson_sql, "class_id = ?");
    }

    #[test]
    fn test_sort_spec_parsing() {
        let spec = SortSpec::parse("createdAt-desc");
        assert_eq!(spec.as_order_by(), "created_at DESC");
        assert_eq!(SortSpec::parse("title-asc").as_order_by(), "title ASC");
        // Unknown fields fall back to created_at rather than reaching SQL.
        assert_eq!(
            SortSpec::parse("evil; DROP TABLE--").as_order_by(),
            "created_at DESC"
        );
    }

    #[test]
    fn test_pagination_math() {
        let info = PageInfo::new(PageRequest::new(1, 20), 45);
        assert_eq!(info.start_index, 1);
        assert_eq!(info.end_index, 20);
        assert_eq!(info.total_pages, 3);

        let info = PageInfo::new(PageRequest::new(3, 20), 45);
        assert_eq!(info.start_index, 41);
        assert_eq!(info.end_index, 45);

        let info = PageInfo::new(PageRequest::new(1, 20), 0);
        assert_eq!(info.total_pages, 0);
        assert_eq!(info.start_index, 0);
        assert_eq!(info.end_index, 0);
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
        // Page floor is 1.
        assert_eq!(PageRequest::new(0, 20).offset(), 0);
    }
}
