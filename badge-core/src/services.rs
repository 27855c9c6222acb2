//! Collaborating services the editor talks to.
//!
//! The editor never performs I/O itself. Hosts implement these traits over
//! their HTTP client (or an in-memory fake in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::persistence::{BadgeFields, BadgeRecord, BadgeType};
use crate::preview::SampleRecord;
use crate::EditorResult;

/// A file staged for upload with the next save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    /// Original file name.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Transient `blob:` reference shown until the upload completes.
    pub transient_uri: String,
}

impl AssetUpload {
    /// Stage a file under a fresh transient reference.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            transient_uri: format!("blob:badge-editor/{}", uuid::Uuid::new_v4()),
        }
    }
}

/// Native pixel size of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Badge record storage.
#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// Fetch a badge record.
    async fn fetch_by_id(&self, id: &str) -> EditorResult<BadgeRecord>;

    /// Create or update a badge record, optionally uploading a new background.
    async fn upsert(
        &self,
        fields: BadgeFields,
        file: Option<AssetUpload>,
    ) -> EditorResult<BadgeRecord>;

    /// Copy the design of `source_id` onto `target_id`.
    async fn clone_from(&self, source_id: &str, target_id: &str) -> EditorResult<BadgeRecord>;
}

/// Source of representative attendee data for preview.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch one sample record for the event (and ticket, if given).
    async fn fetch_sample_record(
        &self,
        event_id: &str,
        ticket_id: Option<&str>,
    ) -> EditorResult<Option<SampleRecord>>;
}

/// Measures image assets.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// Native pixel size of the image at `uri`.
    async fn probe_dimensions(&self, uri: &str) -> EditorResult<PixelSize>;
}

/// Serialized design applied to other tickets.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedDesign {
    /// JSON array of elements.
    pub builder_data: String,
    /// Layout width in centimetres.
    pub layout_width: f64,
    /// Layout height in centimetres.
    pub layout_height: f64,
    /// Background artwork URI.
    pub background_image: Option<String>,
    /// Owning event.
    pub event: Option<String>,
}

/// Result of applying a design to one ticket.
#[derive(Debug)]
pub struct ApplyOutcome {
    /// Ticket the design was applied to.
    pub target_id: String,
    /// Stored record, or the failure for this target.
    pub result: EditorResult<BadgeRecord>,
}

impl ApplyOutcome {
    /// Whether this target was updated.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Apply one design to several tickets.
///
/// Issues one sequential upsert per target, each carrying identical builder
/// data and layout. A failure for one target does not stop the others and
/// nothing is rolled back: every target's outcome is reported so the caller
/// can retry just the failed ids.
pub async fn apply_to_many(
    repository: &dyn BadgeRepository,
    design: &SharedDesign,
    target_ids: &[String],
) -> Vec<ApplyOutcome> {
    let mut outcomes = Vec::with_capacity(target_ids.len());
    for target in target_ids {
        let fields = BadgeFields {
            id: None,
            background_image: design.background_image.clone(),
            background_color: None,
            layout_width: design.layout_width,
            layout_height: design.layout_height,
            builder_data: design.builder_data.clone(),
            badge_type: BadgeType::SpecificTicket,
            tickets: vec![target.clone()],
            event: design.event.clone(),
        };
        let result = repository.upsert(fields, None).await;
        if let Err(e) = &result {
            tracing::warn!(target = %target, "Failed to apply badge design: {e}");
        }
        outcomes.push(ApplyOutcome {
            target_id: target.clone(),
            result,
        });
    }
    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    tracing::info!(
        targets = target_ids.len(),
        failed,
        "Applied badge design to tickets"
    );
    outcomes
}
