//! MCollection Server Library
//!
//! School content server: teachers upload and organize lessons, documents
//! and media files into categorized collections, with rich-text document
//! export to PDF and DOCX.
//!
//! # Modules
//!
//! - `db`: SQLite persistence and the shared filter/query builder
//! - `export`: document export pipeline (sanitize -> template -> PDF/DOCX)
//! - `media`: upload classification and the media upload adapter
//! - `storage`: S3-compatible object storage client
//! - `routes`: HTTP API

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod html;
pub mod media;
pub mod routes;
pub mod state;
pub mod storage;
