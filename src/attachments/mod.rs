//! Attachment ingestion: validation, classification, and encoding.
//!
//! Uploaded files are screened against count and size limits, classified
//! by kind, and encoded for the model. Images travel as base64 data URLs,
//! textual files are decoded and inlined, and opaque binaries are named so
//! the model at least knows they exist. Large pasted text is diverted into
//! a pasted-content record instead of an attachment.

use base64::prelude::{Engine, BASE64_STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::message::Attachment;

/// Most files accepted per message.
pub const MAX_FILES: usize = 10;

/// Per-file size ceiling.
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Aggregate size ceiling across one message's accepted files.
pub const MAX_TOTAL_SIZE: usize = 100 * 1024 * 1024;

/// Pasted text at or above this many characters becomes pasted content
/// rather than staying inline in the message body.
pub const PASTE_THRESHOLD: usize = 200;

const TEXTUAL_MIME_PREFIXES: &[&str] = &[
    "text/",
    "application/json",
    "application/xml",
    "application/javascript",
    "application/typescript",
];

const TEXTUAL_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "ts", "jsx", "tsx", "html", "htm", "css", "scss", "sass", "json",
    "xml", "yaml", "yml", "csv", "sql", "sh", "bash", "php", "rb", "go", "java", "c", "cpp", "h",
    "hpp", "cs", "rs", "swift", "kt", "scala", "r", "vue", "svelte", "astro", "config", "conf",
    "ini", "toml", "log", "gitignore", "dockerfile", "makefile", "readme",
];

/// Shown in place of file content that could not be decoded as UTF-8.
const UNREADABLE_PLACEHOLDER: &str = "Error reading file content";

/// A raw upload before ingestion.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Broad classification driving how a file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Textual,
    Binary,
}

/// Classify by MIME type first, falling back to the filename.
pub fn classify(content_type: &str, name: &str) -> FileKind {
    if content_type.starts_with("image/") {
        return FileKind::Image;
    }
    if TEXTUAL_MIME_PREFIXES
        .iter()
        .any(|p| content_type.starts_with(p))
    {
        return FileKind::Textual;
    }

    let lower = name.to_lowercase();
    let extension = lower.rsplit('.').next().unwrap_or_default();
    if TEXTUAL_EXTENSIONS.contains(&extension)
        || lower.contains("readme")
        || lower.contains("dockerfile")
        || lower.contains("makefile")
    {
        return FileKind::Textual;
    }
    FileKind::Binary
}

/// Text pasted into the composer that crossed the word threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastedContent {
    pub id: String,
    pub content: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A file refused during ingestion, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

/// Everything produced by ingesting one message's input.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub attachments: Vec<Attachment>,
    pub pasted: Vec<PastedContent>,
    pub rejected: Vec<RejectedFile>,
}

impl IngestOutcome {
    /// Bracketed one-line descriptions of each attachment, for display.
    pub fn descriptions(&self) -> String {
        self.attachments
            .iter()
            .map(|a| {
                if a.content_type.starts_with("image/") {
                    format!("[Image: {}]", a.name)
                } else {
                    format!("[File: {}]", a.name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Ingest uploads for one message. Rejections are per-file; one bad file
/// never blocks the rest.
pub fn ingest(uploads: Vec<FileUpload>) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    let mut total: usize = 0;

    for upload in uploads {
        if outcome.attachments.len() >= MAX_FILES {
            outcome.rejected.push(RejectedFile {
                name: upload.name,
                reason: format!("Too many files, maximum is {MAX_FILES}"),
            });
            continue;
        }
        if upload.bytes.len() > MAX_FILE_SIZE {
            outcome.rejected.push(RejectedFile {
                name: upload.name,
                reason: "File exceeds the 50MB size limit".into(),
            });
            continue;
        }
        if total + upload.bytes.len() > MAX_TOTAL_SIZE {
            outcome.rejected.push(RejectedFile {
                name: upload.name,
                reason: "Combined attachments exceed the 100MB limit".into(),
            });
            continue;
        }

        total += upload.bytes.len();
        outcome.attachments.push(encode(upload));
    }

    debug!(
        accepted = outcome.attachments.len(),
        rejected = outcome.rejected.len(),
        "ingested uploads"
    );
    outcome
}

/// Divert pasted text into a record if it crosses the length threshold.
/// Returns `None` when the text should stay inline.
pub fn capture_paste(text: &str) -> Option<PastedContent> {
    if text.chars().count() < PASTE_THRESHOLD {
        return None;
    }
    let word_count = text.split_whitespace().count();
    Some(PastedContent {
        id: uuid::Uuid::new_v4().to_string(),
        content: text.to_string(),
        word_count,
        created_at: Utc::now(),
    })
}

fn encode(upload: FileUpload) -> Attachment {
    let size = upload.bytes.len() as u64;
    match classify(&upload.content_type, &upload.name) {
        FileKind::Image => Attachment {
            url: data_url(&upload.content_type, &upload.bytes),
            name: upload.name,
            content_type: upload.content_type,
            size,
            text_content: None,
        },
        FileKind::Textual => {
            let text = match String::from_utf8(upload.bytes.clone()) {
                Ok(text) => text,
                Err(_) => UNREADABLE_PLACEHOLDER.to_string(),
            };
            Attachment {
                url: data_url(&upload.content_type, &upload.bytes),
                name: upload.name,
                content_type: upload.content_type,
                size,
                text_content: Some(text),
            }
        }
        FileKind::Binary => Attachment {
            url: format!("ladle-attachment://{}", upload.name),
            name: upload.name,
            content_type: upload.content_type,
            size,
            text_content: None,
        },
    }
}

fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Decode a `data:` URL back to its bytes. Used when re-reading stored
/// attachments.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, payload) = url.strip_prefix("data:")?.split_once(";base64,")?;
    BASE64_STANDARD.decode(payload).ok()
}
