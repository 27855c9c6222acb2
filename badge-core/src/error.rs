//! Error types for badge editor operations.

use thiserror::Error;

use crate::ElementId;

/// Result type for badge editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors that can occur in badge editor operations.
///
/// Rejected geometry edits (deleting the background, shrinking an element
/// below the minimum size, non-positive layout dimensions) are not errors:
/// those operations report `false` and leave the document untouched.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Element not found in the document.
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    /// Operation is not valid in the current editor state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Builder data serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collaborating service (fetch, upsert, clone) failed.
    #[error("Network error: {0}")]
    Network(String),

    /// An asset could not be loaded or probed.
    #[error("Failed to load resource: {0}")]
    ResourceLoad(String),

    /// Editing is blocked while the live-data preview is showing.
    #[error("Preview is active; leave preview mode before editing")]
    PreviewActive,

    /// No sample record exists for the preview context.
    #[error("No sample data available for preview")]
    NoSampleData,

    /// An async response arrived for a document that is no longer open.
    #[error("Response for document {received} discarded; current document is {current}")]
    StaleResponse {
        /// Document the response belongs to.
        received: String,
        /// Document currently open in the editor.
        current: String,
    },

    /// An asset reference could not be turned into a URI.
    #[error("Invalid asset URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Editor configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
