//! Media classification and upload handling
//!
//! Incoming files are classified by MIME type prefix into the four storage
//! buckets and pushed to S3 by the upload adapter, which then persists the
//! resulting reference as a file entity.

mod upload;

pub use upload::{MediaUploader, ObjectStore, UploadExtra, UploadedFile};

use serde::{Deserialize, Serialize};

use crate::config::AudioClassification;

/// Storage bucket for an uploaded file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Raw,
}

impl MediaKind {
    /// Classify a MIME type. The `audio/*` mapping is a deployment choice;
    /// `Auto` sends audio to the generic `raw` bucket.
    pub fn from_mime(mime: &str, audio: AudioClassification) -> Self {
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else if mime.starts_with("audio/") {
            match audio {
                AudioClassification::Distinct => MediaKind::Audio,
                AudioClassification::Auto => MediaKind::Raw,
            }
        } else {
            MediaKind::Raw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Raw => "raw",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "raw" => Some(MediaKind::Raw),
            _ => None,
        }
    }
}

/// Normalize an original filename for use inside a storage key: strip
/// diacritics, collapse whitespace to underscores, drop anything outside
/// word characters, dots and dashes.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_whitespace() {
            out.push('_');
        } else if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            out.push(ch);
        } else if let Some(base) = strip_diacritic(ch) {
            out.push(base);
        }
        // Everything else is dropped.
    }
    out
}

/// Map common Latin letters with diacritics (including the Vietnamese set)
/// to their ASCII base letter.
fn strip_diacritic(ch: char) -> Option<char> {
    const TABLE: &[(&str, char)] = &[
        ("àáảãạăằắẳẵặâầấẩẫậ", 'a'),
        ("èéẻẽẹêềếểễệ", 'e'),
        ("ìíỉĩị", 'i'),
        ("òóỏõọôồốổỗộơờớởỡợ", 'o'),
        ("ùúủũụưừứửữự", 'u'),
        ("ỳýỷỹỵ", 'y'),
        ("đ", 'd'),
        ("ÀÁẢÃẠĂẰẮẲẴẶÂẦẤẨẪẬ", 'A'),
        ("ÈÉẺẼẸÊỀẾỂỄỆ", 'E'),
        ("ÌÍỈĨỊ", 'I'),
        ("ÒÓỎÕỌÔỒỐỔỖỘƠỜỚỞỠỢ", 'O'),
        ("ÙÚỦŨỤƯỪỨỬỮỰ", 'U'),
        ("ỲÝỶỸỴ", 'Y'),
        ("Đ", 'D'),
    ];
    for (variants, base) in TABLE {
        if variants.contains(ch) {
            return Some(*base);
        }
    }
    None
}

/// Strip the final extension from a filename; used for raw storage keys so
/// repeated uploads of the same logical document overwrite in place.
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
