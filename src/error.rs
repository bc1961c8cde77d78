//! Error types for the editing core.

use thiserror::Error;

/// Errors raised by the editing core.
///
/// Only [`EditorError::InvalidOperation`] ever reaches the caller of an edit.
/// The other kinds are absorbed by the render path: an unknown language tag
/// falls back to plain code and a failed render keeps the previous content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// An edit referenced offsets outside the buffer, or its recorded text
    /// no longer matches the buffer contents.
    #[error("invalid edit at offset {offset}: {reason}")]
    InvalidOperation { offset: usize, reason: String },
    /// A fenced code block named a language the highlighter does not know.
    #[error("unsupported language tag: {0}")]
    UnsupportedLanguageTag(String),
    /// The renderer failed to produce content for a text snapshot.
    #[error("render of version {version} failed: {reason}")]
    RenderFailure { version: u64, reason: String },
}

impl EditorError {
    pub(crate) fn out_of_range(offset: usize, end: usize, len: usize) -> Self {
        Self::InvalidOperation {
            offset,
            reason: format!("range {offset}..{end} exceeds document length {len}"),
        }
    }

    pub(crate) fn text_mismatch(offset: usize) -> Self {
        Self::InvalidOperation {
            offset,
            reason: "recorded text does not match the buffer".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
