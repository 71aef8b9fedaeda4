//! Document export pipeline
//!
//! Both formats share one path: fetch the document, sanitize its content,
//! render the print template, then hand off to the format backend. The
//! document lookup happens first so a missing id never spins up a browser.

pub mod docx;
pub mod pdf;
pub mod template;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::documents::{DocumentRecord, DocumentRepo};
use crate::error::{AppError, Result};
use crate::html::sanitize_html;

pub use pdf::{ChromiumExporter, ExportError, RenderSession};
pub use template::render_document_html;

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        AppError::ExportFailure(e.to_string())
    }
}

/// Format-agnostic PDF backend seam.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn render(&self, html: &str) -> std::result::Result<Vec<u8>, ExportError>;
}

#[async_trait]
impl PdfEngine for ChromiumExporter {
    async fn render(&self, html: &str) -> std::result::Result<Vec<u8>, ExportError> {
        ChromiumExporter::render(self, html).await
    }
}

async fn printable_document(pool: &SqlitePool, id: &str) -> Result<(DocumentRecord, String)> {
    let doc = DocumentRepo::new(pool).get(id).await?;
    let safe = sanitize_html(&doc.content);
    Ok((doc, safe))
}

pub async fn export_pdf(pool: &SqlitePool, engine: &dyn PdfEngine, id: &str) -> Result<Vec<u8>> {
    let (doc, safe) = printable_document(pool, id).await?;
    let html = render_document_html(
        &doc.title,
        doc.description.as_deref().unwrap_or(""),
        &safe,
    );
    Ok(engine.render(&html).await?)
}

pub async fn export_docx(pool: &SqlitePool, id: &str) -> Result<Vec<u8>> {
    let (doc, safe) = printable_document(pool, id).await?;
    Ok(docx::render_docx(
        &doc.title,
        doc.description.as_deref().unwrap_or(""),
        &safe,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::documents::NewDocument;
    use crate::db::{test_pool, UserRepo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingEngine {
        calls: AtomicUsize,
        last_html: Mutex<String>,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_html: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl PdfEngine for CountingEngine {
        async fn render(&self, html: &str) -> std::result::Result<Vec<u8>, ExportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_html.lock().unwrap() = html.to_string();
            Ok(b"%PDF-1.7 stub".to_vec())
        }
    }

    async fn seed_document(pool: &SqlitePool, content: &str) -> String {
        let owner = UserRepo::new(pool)
            .create("Chi Pham", "chi@school.vn", "teacher")
            .await
            .unwrap();
        DocumentRepo::new(pool)
            .create(NewDocument {
                title: "Đề thi thử".to_string(),
                description: Some("Lớp 9".to_string()),
                content: content.to_string(),
                category_id: None,
                classes: vec![9],
                tags: vec!["math".to_string()],
                owner_id: owner.id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_missing_document_never_reaches_engine() {
        let pool = test_pool().await;
        let engine = CountingEngine::new();

        let err = export_pdf(&pool, &engine, "no-such-id").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pdf_export_sanitizes_before_rendering() {
        let pool = test_pool().await;
        let id = seed_document(&pool, "<script>x()</script><p>Câu 1</p>").await;
        let engine = CountingEngine::new();

        let bytes = export_pdf(&pool, &engine, &id).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);

        let html = engine.last_html.lock().unwrap().clone();
        assert!(!html.contains("<script>"));
        assert!(html.contains("<p>Câu 1</p>"));
        assert!(html.contains("Đề thi thử"));
    }

    #[tokio::test]
    async fn test_docx_export_roundtrip() {
        let pool = test_pool().await;
        let id = seed_document(&pool, "<h2>Phần 1</h2><p>Nội dung</p>").await;

        let bytes = export_docx(&pool, &id).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_docx_missing_document_is_not_found() {
        let pool = test_pool().await;
        let err = export_docx(&pool, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
