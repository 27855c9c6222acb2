//! Editor session state.
//!
//! An [`Editor`] owns one open badge: the document, its undo history, the
//! preview state, the selection and the viewport. Every edit goes through it
//! so that history is recorded, the background stays locked and nothing
//! changes while the preview is showing.
//!
//! Async boundaries (initial load, artwork probe, preview sample fetch, save)
//! are split into a request and a completion where a response could arrive
//! after the user has switched documents. Completions carry the document id
//! they were issued for and are discarded when it no longer matches.

use serde::{Deserialize, Serialize};

use crate::document::{DocumentSnapshot, PosterData, PosterDocument};
use crate::element::{Element, ElementId, ElementType, Geometry};
use crate::factory::{create_element, NewElement};
use crate::history::History;
use crate::patch::{ElementPatch, PatchOutcome};
use crate::persistence::{self, BadgeMeta, BadgeRecord};
use crate::preview::{PreviewState, SampleRecord};
use crate::services::{
    apply_to_many, ApplyOutcome, AssetProbe, AssetUpload, BadgeRepository, PixelSize,
    SampleSource, SharedDesign,
};
use crate::template::{import_template, BadgeTemplate};
use crate::units::{px_to_cm, Viewport, ViewportSize, ZoomMode};
use crate::{EditorConfig, EditorError, EditorResult};

/// Offset applied to duplicated elements, in centimetres.
const DUPLICATE_OFFSET_CM: f64 = 0.5;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Operation succeeded.
    Success,
    /// Something degraded but editing continues.
    Warning,
    /// An operation failed.
    Error,
}

/// A message for the host UI's notification area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable text.
    pub message: String,
}

/// Context for a preview sample fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    /// Document the request was issued for.
    pub document_id: String,
    /// Event to sample attendees from.
    pub event_id: String,
    /// Ticket to narrow the sample to.
    pub ticket_id: Option<String>,
}

/// What a preview toggle needs next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStep {
    /// Preview was showing and has been closed.
    Exited,
    /// Fetch a sample record, then call [`Editor::complete_preview`].
    Fetch(PreviewRequest),
}

/// One open badge being edited.
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    record_id: Option<String>,
    meta: BadgeMeta,
    document: PosterDocument,
    persisted: DocumentSnapshot,
    history: History,
    preview: PreviewState,
    selected: Option<ElementId>,
    viewport: Viewport,
    pending_upload: Option<AssetUpload>,
    interaction_open: bool,
    interaction_start: Option<DocumentSnapshot>,
    layout_defaulted: bool,
    notices: Vec<Notice>,
}

impl Editor {
    /// Create an editor for a new, unsaved badge with the default layout.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let poster = PosterData::new(
            config.default_layout_width_cm,
            config.default_layout_height_cm,
        );
        Self::with_document(config, None, BadgeMeta::default(), PosterDocument::new(poster))
    }

    /// Create an editor from a persisted record.
    #[must_use]
    pub fn from_record(record: &BadgeRecord, config: EditorConfig) -> Self {
        let loaded = persistence::load_record(record, &config);
        let mut editor = Self::with_document(
            config,
            Some(record.id.clone()),
            loaded.meta,
            loaded.document,
        );
        editor.layout_defaulted = loaded.layout_defaulted;
        editor
    }

    fn with_document(
        config: EditorConfig,
        record_id: Option<String>,
        meta: BadgeMeta,
        document: PosterDocument,
    ) -> Self {
        let viewport = Viewport::new(1280.0, 800.0, config.viewport_margin_px);
        let history = History::new(config.history_limit);
        let persisted = document.snapshot();
        Self {
            config,
            record_id,
            meta,
            document,
            persisted,
            history,
            preview: PreviewState::Idle,
            selected: None,
            viewport,
            pending_upload: None,
            interaction_open: false,
            interaction_start: None,
            layout_defaulted: false,
            notices: Vec::new(),
        }
    }

    /// Fetch a record and open it.
    ///
    /// When the record has no layout dimensions, the background artwork is
    /// probed (bounded by the configured timeout) to size the layout; probe
    /// failures fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the record cannot be fetched. This is
    /// the only failure that blocks editing.
    pub async fn open(
        repository: &dyn BadgeRepository,
        probe: Option<&dyn AssetProbe>,
        id: &str,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        let record = repository.fetch_by_id(id).await.map_err(|e| {
            tracing::error!(record = id, "Initial badge load failed: {e}");
            e
        })?;
        let mut editor = Self::from_record(&record, config);
        if let Some(probe) = probe {
            editor.probe_layout(probe).await;
        }
        Ok(editor)
    }

    async fn probe_layout(&mut self, probe: &dyn AssetProbe) {
        if !self.layout_defaulted {
            return;
        }
        let (Some(document_id), Some(uri)) = (
            self.record_id.clone(),
            self.document.poster().background_image.clone(),
        ) else {
            return;
        };
        let result =
            tokio::time::timeout(self.config.probe_timeout(), probe.probe_dimensions(&uri)).await;
        match result {
            Ok(Ok(size)) => {
                if let Err(e) = self.apply_probed_size(&document_id, size) {
                    tracing::debug!("Discarded probe result: {e}");
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Background probe failed, keeping default layout: {e}");
            }
            Err(_) => {
                tracing::warn!(%uri, "Background probe timed out, keeping default layout");
            }
        }
    }

    /// Apply an artwork probe result to a defaulted layout.
    ///
    /// Does not record history; the probe completes the load.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::StaleResponse`] if `document_id` is not the open
    /// document.
    pub fn apply_probed_size(&mut self, document_id: &str, size: PixelSize) -> EditorResult<bool> {
        self.ensure_current(document_id)?;
        if !self.layout_defaulted || self.preview.is_active() {
            return Ok(false);
        }
        let changed = self
            .document
            .set_layout_size(px_to_cm(f64::from(size.width)), px_to_cm(f64::from(size.height)));
        if changed {
            self.layout_defaulted = false;
            self.persisted = self.document.snapshot();
            tracing::info!(
                width = self.document.layout_width(),
                height = self.document.layout_height(),
                "Sized layout from background artwork"
            );
        }
        Ok(changed)
    }

    fn ensure_current(&self, document_id: &str) -> EditorResult<()> {
        match &self.record_id {
            Some(current) if current == document_id => Ok(()),
            current => {
                let current = current.clone().unwrap_or_default();
                tracing::debug!(received = document_id, %current, "Discarding stale response");
                Err(EditorError::StaleResponse {
                    received: document_id.to_string(),
                    current,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Id of the open record, `None` for an unsaved badge.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// The document.
    #[must_use]
    pub fn document(&self) -> &PosterDocument {
        &self.document
    }

    /// Elements in paint order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.document.elements()
    }

    /// Record fields carried alongside the document.
    #[must_use]
    pub fn meta(&self) -> &BadgeMeta {
        &self.meta
    }

    /// Undo history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Editor configuration.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Selected element.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// Viewport state.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable viewport state, for pan and zoom-step controls.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Whether sample data is showing.
    #[must_use]
    pub fn is_previewing(&self) -> bool {
        self.preview.is_active()
    }

    /// Whether the layout size came from defaults rather than the record.
    #[must_use]
    pub fn layout_defaulted(&self) -> bool {
        self.layout_defaulted
    }

    /// Whether the document differs from what was last loaded or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.pending_upload.is_some() || self.document.snapshot() != self.persisted
    }

    /// Background file staged for the next save.
    #[must_use]
    pub fn pending_upload(&self) -> Option<&AssetUpload> {
        self.pending_upload.as_ref()
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    fn ensure_editable(&self) -> EditorResult<()> {
        if self.preview.is_active() {
            Err(EditorError::PreviewActive)
        } else {
            Ok(())
        }
    }

    /// Run `op` against the document, recording the pre-mutation state when
    /// it reports a change. Inside an interaction the snapshot taken at
    /// [`Editor::begin_interaction`] is recorded on the first change and
    /// stands in for every later step. Only element updates join a gesture:
    /// every other mutator ends it first and records its own entry.
    fn mutate<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut PosterDocument) -> bool,
    {
        let before = (!self.interaction_open).then(|| self.document.snapshot());
        let changed = op(&mut self.document);
        if changed {
            if let Some(before) = before.or_else(|| self.interaction_start.take()) {
                self.history.record(before);
            }
        }
        changed
    }

    /// Start a drag or resize gesture.
    ///
    /// The whole gesture becomes one history entry, so each pointer-move
    /// update only touches the moving element.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn begin_interaction(&mut self) -> EditorResult<()> {
        self.ensure_editable()?;
        if !self.interaction_open {
            self.interaction_start = Some(self.document.snapshot());
            self.interaction_open = true;
        }
        Ok(())
    }

    /// Finish a drag or resize gesture.
    pub fn end_interaction(&mut self) {
        self.interaction_open = false;
        self.interaction_start = None;
    }

    /// Create an element and add it on top of the paint order.
    ///
    /// Returns `None` for a second background request.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn add_element(&mut self, request: &NewElement) -> EditorResult<Option<ElementId>> {
        self.ensure_editable()?;
        self.end_interaction();
        if request.element_type == ElementType::Background && self.document.background().is_some()
        {
            tracing::debug!("Ignoring request for a second background");
            return Ok(None);
        }
        let mut added = None;
        self.mutate(|doc| {
            let element = create_element(doc, request);
            added = doc.push(element);
            added.is_some()
        });
        if let Some(id) = added {
            self.selected = Some(id);
        }
        Ok(added)
    }

    /// Apply a partial update to an element.
    ///
    /// Returns `false` when nothing changed, including rejected updates that
    /// would shrink an element below the minimum size.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or
    /// [`EditorError::ElementNotFound`] for an unknown id.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> EditorResult<bool> {
        self.ensure_editable()?;
        let Some(target) = self.document.get(id) else {
            return Err(EditorError::ElementNotFound(id));
        };
        if target.is_background() {
            // Geometry is locked, so only new artwork can change it.
            return match patch.src.as_deref() {
                Some(src) => self.set_background_image(Some(src)),
                None => Ok(false),
            };
        }

        if !self.interaction_open {
            // Trial run on a copy so a no-op patch costs no full snapshot.
            let mut trial = self
                .document
                .get(id)
                .cloned()
                .ok_or(EditorError::ElementNotFound(id))?;
            if patch.apply(&mut trial, self.document.poster()) != PatchOutcome::Applied {
                return Ok(false);
            }
        }
        Ok(self.mutate(|doc| doc.update(id, patch).changed()))
    }

    /// Remove an element. The background is never removed.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn remove_element(&mut self, id: ElementId) -> EditorResult<bool> {
        self.ensure_editable()?;
        self.end_interaction();
        let removed = self.mutate(|doc| doc.remove(id).is_some());
        if removed && self.selected == Some(id) {
            self.selected = None;
        }
        Ok(removed)
    }

    /// Copy an element under a fresh id, slightly offset, on top of the
    /// paint order. The background cannot be duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or
    /// [`EditorError::ElementNotFound`] for an unknown id.
    pub fn duplicate_element(&mut self, id: ElementId) -> EditorResult<Option<ElementId>> {
        self.ensure_editable()?;
        self.end_interaction();
        let source = self
            .document
            .get(id)
            .cloned()
            .ok_or(EditorError::ElementNotFound(id))?;
        if source.is_background() {
            return Ok(None);
        }
        let mut added = None;
        self.mutate(|doc| {
            let geometry = Geometry {
                position_x: source.geometry.position_x + DUPLICATE_OFFSET_CM,
                position_y: source.geometry.position_y + DUPLICATE_OFFSET_CM,
                ..source.geometry
            };
            let copy = Element::new(doc.next_element_id(), source.kind, geometry);
            added = doc.push(copy);
            added.is_some()
        });
        if added.is_some() {
            self.selected = added;
        }
        Ok(added)
    }

    /// Move an element from one paint-order index to another.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn reorder(&mut self, from: usize, to: usize) -> EditorResult<bool> {
        self.ensure_editable()?;
        self.end_interaction();
        Ok(self.mutate(|doc| doc.reorder(from, to)))
    }

    /// Move an element to the top of the paint order.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or
    /// [`EditorError::ElementNotFound`] for an unknown id.
    pub fn bring_to_front(&mut self, id: ElementId) -> EditorResult<bool> {
        let from = self
            .document
            .index_of(id)
            .ok_or(EditorError::ElementNotFound(id))?;
        let top = self.document.len().saturating_sub(1);
        self.reorder(from, top)
    }

    /// Move an element to the bottom of the paint order.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or
    /// [`EditorError::ElementNotFound`] for an unknown id.
    pub fn send_to_back(&mut self, id: ElementId) -> EditorResult<bool> {
        let from = self
            .document
            .index_of(id)
            .ok_or(EditorError::ElementNotFound(id))?;
        self.reorder(from, 0)
    }

    /// Resize the layout; the background follows.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn set_layout_size(&mut self, width: f64, height: f64) -> EditorResult<bool> {
        self.ensure_editable()?;
        self.end_interaction();
        let changed = self.mutate(|doc| doc.set_layout_size(width, height));
        if changed {
            self.layout_defaulted = false;
        }
        Ok(changed)
    }

    /// Point the background at existing artwork, resolving relative paths.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or
    /// [`EditorError::InvalidUri`] if the path cannot be resolved.
    pub fn set_background_image(&mut self, reference: Option<&str>) -> EditorResult<bool> {
        self.ensure_editable()?;
        self.end_interaction();
        let uri = reference
            .filter(|r| !r.trim().is_empty())
            .map(|r| persistence::resolve_asset_uri(r.trim(), &self.config.asset_base_url))
            .transpose()?;
        let changed = self.mutate(|doc| doc.set_background_image(uri));
        if changed {
            self.pending_upload = None;
        }
        Ok(changed)
    }

    /// Stage a new background file for upload on the next save.
    ///
    /// The background shows a transient `blob:` reference until then, which
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn attach_background(
        &mut self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> EditorResult<String> {
        self.ensure_editable()?;
        self.end_interaction();
        let upload = AssetUpload::new(file_name, bytes);
        let uri = upload.transient_uri.clone();
        self.mutate(|doc| doc.set_background_image(Some(uri.clone())));
        self.pending_upload = Some(upload);
        Ok(uri)
    }

    /// Replace all non-background elements with a template's fields.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn import_template(&mut self, template: &BadgeTemplate) -> EditorResult<usize> {
        self.ensure_editable()?;
        self.end_interaction();
        let mut count = 0;
        self.mutate(|doc| {
            count = import_template(doc, template);
            true
        });
        self.drop_stale_selection();
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Selection and viewport
    // -----------------------------------------------------------------------

    /// Select an element.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for an unknown id.
    pub fn select(&mut self, id: ElementId) -> EditorResult<()> {
        if self.document.get(id).is_none() {
            return Err(EditorError::ElementNotFound(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Select the topmost element under a point in centimetres.
    pub fn select_at(&mut self, x: f64, y: f64) -> Option<ElementId> {
        self.selected = self.document.element_at(x, y);
        self.selected
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.selected {
            if self.document.get(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// Fit, fill or show the badge at native size.
    pub fn set_zoom_mode(&mut self, mode: ZoomMode, dims: Option<ViewportSize>) -> bool {
        self.viewport.set_zoom_mode(
            mode,
            self.document.layout_width(),
            self.document.layout_height(),
            dims,
        )
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Step back one edit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn undo(&mut self) -> EditorResult<bool> {
        self.ensure_editable()?;
        self.end_interaction();
        let live = self.document.snapshot();
        let Some(snapshot) = self.history.undo(live) else {
            return Ok(false);
        };
        self.replay(snapshot);
        Ok(true)
    }

    /// Step forward one edit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing.
    pub fn redo(&mut self) -> EditorResult<bool> {
        self.ensure_editable()?;
        self.end_interaction();
        let Some(snapshot) = self.history.redo() else {
            return Ok(false);
        };
        self.replay(snapshot);
        Ok(true)
    }

    fn replay(&mut self, snapshot: DocumentSnapshot) {
        self.document.restore(snapshot);
        self.document.lock_background();
        self.drop_stale_selection();
        self.history.finish_replay();
    }

    // -----------------------------------------------------------------------
    // Preview
    // -----------------------------------------------------------------------

    /// Start or stop the live-data preview.
    ///
    /// Leaving preview happens immediately. Entering needs a sample record:
    /// the returned request says what to fetch.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoSampleData`] when the badge has no event to
    /// sample from.
    pub fn begin_preview(&mut self) -> EditorResult<PreviewStep> {
        if let Some(snapshot) = self.preview.exit() {
            self.document.replace_elements(snapshot);
            return Ok(PreviewStep::Exited);
        }
        let Some(event_id) = self.meta.event.clone() else {
            self.notify(NoticeLevel::Warning, "No event data available for preview");
            return Err(EditorError::NoSampleData);
        };
        Ok(PreviewStep::Fetch(PreviewRequest {
            document_id: self.record_id.clone().unwrap_or_default(),
            event_id,
            ticket_id: self.meta.tickets.first().cloned(),
        }))
    }

    /// Enter preview with a fetched sample record.
    ///
    /// With no record the editor stays idle and posts a notice.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::StaleResponse`] if the request was issued for
    /// another document.
    pub fn complete_preview(
        &mut self,
        request: &PreviewRequest,
        record: Option<&SampleRecord>,
    ) -> EditorResult<bool> {
        if self.record_id.is_some() || !request.document_id.is_empty() {
            self.ensure_current(&request.document_id)?;
        }
        let Some(record) = record else {
            self.notify(NoticeLevel::Warning, "No attendee data found to preview");
            return Ok(false);
        };
        self.end_interaction();
        let elements = self.document.elements().to_vec();
        match self
            .preview
            .enter(&elements, record, &self.config.asset_base_url)
        {
            Some(substituted) => {
                self.document.replace_elements(substituted);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Leave preview, restoring the exact pre-preview elements.
    pub fn exit_preview(&mut self) -> bool {
        match self.preview.exit() {
            Some(snapshot) => {
                self.document.replace_elements(snapshot);
                true
            }
            None => false,
        }
    }

    /// Toggle preview, fetching the sample from `source` when entering.
    ///
    /// Returns whether the preview is showing afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoSampleData`] without an event context, or the
    /// source's error if the fetch fails. The document is unchanged on error.
    pub async fn toggle_preview(&mut self, source: &dyn SampleSource) -> EditorResult<bool> {
        let request = match self.begin_preview()? {
            PreviewStep::Exited => return Ok(false),
            PreviewStep::Fetch(request) => request,
        };
        let record = match source
            .fetch_sample_record(&request.event_id, request.ticket_id.as_deref())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.notify(NoticeLevel::Error, format!("Could not load preview data: {e}"));
                return Err(e);
            }
        };
        self.complete_preview(&request, record.as_ref())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serialize the document into the fields a save submits.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, since the
    /// elements then hold sample data, or an error if serialization fails.
    pub fn to_fields(&self) -> EditorResult<persistence::BadgeFields> {
        self.ensure_editable()?;
        persistence::to_fields(
            &self.document,
            self.record_id.as_deref(),
            &self.meta,
            self.pending_upload.is_some(),
        )
    }

    /// Persist the document.
    ///
    /// On success the stored record becomes the new baseline and history is
    /// cleared. On failure the document is left exactly as it was so the save
    /// can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or the
    /// repository's error.
    pub async fn save(&mut self, repository: &dyn BadgeRepository) -> EditorResult<BadgeRecord> {
        self.ensure_editable()?;
        self.document.lock_background();
        let fields = self.to_fields()?;
        let upload = self.pending_upload.clone();

        match repository.upsert(fields, upload).await {
            Ok(record) => {
                self.mark_saved(&record);
                Ok(record)
            }
            Err(e) => {
                tracing::warn!("Saving badge failed: {e}");
                self.notify(NoticeLevel::Error, format!("Could not save badge: {e}"));
                Err(e)
            }
        }
    }

    /// Adopt `record` as the stored state after a successful save.
    ///
    /// A new badge takes the record's id, a staged upload gives way to the
    /// stored artwork path, the current document becomes the clean baseline
    /// and history is cleared so undo cannot cross the save.
    pub fn mark_saved(&mut self, record: &BadgeRecord) {
        if self.record_id.is_none() {
            self.record_id = Some(record.id.clone());
        }
        if self.pending_upload.take().is_some() {
            if let Some(stored) = record.background_image.as_deref() {
                let uri = persistence::resolve_asset_uri(stored, &self.config.asset_base_url)
                    .unwrap_or_else(|_| stored.to_string());
                self.document.set_background_image(Some(uri));
            }
        }
        self.persisted = self.document.snapshot();
        self.history.clear();
        self.notify(NoticeLevel::Success, "Badge saved");
        tracing::info!(record = %record.id, "Saved badge");
    }

    /// Discard unsaved edits, returning to the last loaded or saved state.
    pub fn revert(&mut self) {
        self.exit_preview();
        self.end_interaction();
        self.document.restore(self.persisted.clone());
        self.pending_upload = None;
        self.history.clear();
        self.drop_stale_selection();
    }

    /// Apply the current design to several tickets.
    ///
    /// Every target is attempted; failures are reported per target and in a
    /// notice, and successful targets are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PreviewActive`] while previewing, or a
    /// serialization error.
    pub async fn apply_to_tickets(
        &mut self,
        repository: &dyn BadgeRepository,
        ticket_ids: &[String],
    ) -> EditorResult<Vec<ApplyOutcome>> {
        self.ensure_editable()?;
        let fields = self.to_fields()?;
        let design = SharedDesign {
            builder_data: fields.builder_data,
            layout_width: fields.layout_width,
            layout_height: fields.layout_height,
            background_image: fields.background_image,
            event: fields.event,
        };
        let outcomes = apply_to_many(repository, &design, ticket_ids).await;
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.target_id.as_str())
            .collect();
        if failed.is_empty() {
            self.notify(
                NoticeLevel::Success,
                format!("Design applied to {} tickets", outcomes.len()),
            );
        } else {
            let message = format!("Could not apply design to: {}", failed.join(", "));
            self.notify(NoticeLevel::Error, message);
        }
        Ok(outcomes)
    }

    /// Copy another badge's design onto this one and reload it.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidOperation`] for an unsaved badge,
    /// [`EditorError::PreviewActive`] while previewing, or the repository's
    /// error (leaving the document unchanged).
    pub async fn clone_from(
        &mut self,
        repository: &dyn BadgeRepository,
        source_id: &str,
    ) -> EditorResult<()> {
        self.ensure_editable()?;
        let Some(target) = self.record_id.clone() else {
            return Err(EditorError::InvalidOperation(
                "save the badge before cloning into it".into(),
            ));
        };
        match repository.clone_from(source_id, &target).await {
            Ok(record) => self.reload(&record),
            Err(e) => {
                self.notify(NoticeLevel::Error, format!("Could not clone badge: {e}"));
                Err(e)
            }
        }
    }

    /// Replace the open document with a freshly fetched record.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::StaleResponse`] if the record is not the open
    /// document.
    pub fn reload(&mut self, record: &BadgeRecord) -> EditorResult<()> {
        self.ensure_current(&record.id)?;
        let loaded = persistence::load_record(record, &self.config);
        self.preview = PreviewState::Idle;
        self.end_interaction();
        self.meta = loaded.meta;
        self.document = loaded.document;
        self.layout_defaulted = loaded.layout_defaulted;
        self.persisted = self.document.snapshot();
        self.pending_upload = None;
        self.history.clear();
        self.drop_stale_selection();
        Ok(())
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;

    fn editor() -> Editor {
        let mut editor = Editor::default();
        editor.set_layout_size(21.0, 29.7).expect("layout");
        editor
    }

    fn text_content(editor: &Editor, id: ElementId) -> String {
        match &editor.document().get(id).expect("element").kind {
            ElementKind::Text(p) => p.content.clone(),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn test_add_selects_and_records() {
        let mut editor = editor();
        let before = editor.history().len();
        let id = editor
            .add_element(&NewElement::of(ElementType::Text).with_preset("name"))
            .expect("add")
            .expect("id");
        assert_eq!(editor.selected(), Some(id));
        assert_eq!(editor.history().len(), before + 1);
    }

    #[test]
    fn test_second_background_ignored() {
        let mut editor = editor();
        let added = editor
            .add_element(&NewElement::of(ElementType::Background))
            .expect("add");
        assert!(added.is_none());
    }

    #[test]
    fn test_noop_update_records_nothing() {
        let mut editor = editor();
        let id = editor
            .add_element(&NewElement::of(ElementType::Text))
            .expect("add")
            .expect("id");
        let len = editor.history().len();
        assert!(!editor.update_element(id, &ElementPatch::default()).expect("update"));
        assert!(!editor.update_element(id, &ElementPatch::size(0.01, 1.0)).expect("update"));
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn test_interaction_records_once() {
        let mut editor = editor();
        let id = editor
            .add_element(&NewElement::of(ElementType::Text))
            .expect("add")
            .expect("id");
        let start = editor.document().get(id).expect("element").geometry;
        let len = editor.history().len();
        editor.begin_interaction().expect("begin");
        for step in 1..=20 {
            editor
                .update_element(id, &ElementPatch::position(f64::from(step) * 0.1, 1.0))
                .expect("drag");
        }
        editor.end_interaction();
        assert_eq!(editor.history().len(), len + 1);

        assert!(editor.undo().expect("undo"));
        assert_eq!(editor.document().get(id).expect("element").geometry, start);
    }

    #[test]
    fn test_idle_interaction_records_nothing() {
        let mut editor = editor();
        let len = editor.history().len();
        editor.begin_interaction().expect("begin");
        editor.end_interaction();
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut editor = editor();
        let id = editor
            .add_element(&NewElement::of(ElementType::Video))
            .expect("add")
            .expect("id");
        assert!(editor.remove_element(id).expect("remove"));
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_duplicate_offsets_copy() {
        let mut editor = editor();
        let id = editor
            .add_element(&NewElement::of(ElementType::Text).with_label("Hello"))
            .expect("add")
            .expect("id");
        let copy = editor.duplicate_element(id).expect("dup").expect("copy id");
        assert_ne!(copy, id);
        assert_eq!(text_content(&editor, copy), "Hello");
        let a = editor.document().get(id).expect("a").geometry;
        let b = editor.document().get(copy).expect("b").geometry;
        assert!((b.position_x - a.position_x - DUPLICATE_OFFSET_CM).abs() < 1e-9);

        let bg = editor.document().background_id().expect("bg");
        assert_eq!(editor.duplicate_element(bg).expect("dup"), None);
    }

    #[test]
    fn test_layer_helpers() {
        let mut editor = editor();
        let a = editor
            .add_element(&NewElement::of(ElementType::Text))
            .expect("add")
            .expect("id");
        let b = editor
            .add_element(&NewElement::of(ElementType::Text))
            .expect("add")
            .expect("id");
        assert!(editor.bring_to_front(a).expect("front"));
        assert_eq!(editor.document().index_of(a), Some(2));
        assert!(!editor.bring_to_front(a).expect("front"));

        assert!(editor.send_to_back(a).expect("back"));
        assert_eq!(editor.document().index_of(a), Some(0));
        assert!(!editor.send_to_back(a).expect("back"));

        let bg = editor.document().background_id().expect("bg");
        assert_eq!(editor.document().index_of(bg), Some(1));
        assert!(editor.bring_to_front(bg).expect("front"));
        assert_eq!(editor.document().index_of(b), Some(1));
        assert_eq!(editor.document().index_of(bg), Some(2));
    }

    #[test]
    fn test_attach_background_marks_dirty() {
        let mut editor = editor();
        let uri = editor
            .attach_background("art.png", vec![1, 2, 3])
            .expect("attach");
        assert!(uri.starts_with("blob:"));
        assert!(editor.is_dirty());
        let fields = editor.to_fields().expect("fields");
        assert_eq!(fields.background_image, None);
    }

    #[test]
    fn test_structural_edit_ends_gesture() {
        let mut editor = editor();
        let id = editor
            .add_element(&NewElement::of(ElementType::Text))
            .expect("add")
            .expect("id");
        let before = editor.history().len();

        editor.begin_interaction().expect("begin");
        editor
            .update_element(id, &ElementPatch::position(1.0, 1.0))
            .expect("move");
        editor
            .add_element(&NewElement::of(ElementType::QrCode))
            .expect("add");
        editor
            .update_element(id, &ElementPatch::position(2.0, 2.0))
            .expect("move");
        assert_eq!(editor.history().len(), before + 3);

        assert!(editor.undo().expect("undo"));
        assert!(editor.undo().expect("undo"));
        assert_eq!(editor.document().len(), 2);
        let g = editor.document().get(id).expect("text").geometry;
        assert!((g.position_x - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mark_saved_adopts_stored_record() {
        let mut editor = editor();
        editor
            .attach_background("art.png", vec![1, 2, 3])
            .expect("attach");
        editor
            .add_element(&NewElement::of(ElementType::Text))
            .expect("add");
        let record = BadgeRecord {
            id: "badge-9".into(),
            background_image: Some("uploads/art.png".into()),
            builder_data: "[]".into(),
            ..BadgeRecord::default()
        };

        editor.mark_saved(&record);
        assert_eq!(editor.record_id(), Some("badge-9"));
        assert!(editor.pending_upload().is_none());
        assert_eq!(
            editor.document().poster().background_image.as_deref(),
            Some("http://localhost:3000/uploads/uploads/art.png")
        );
        assert!(!editor.is_dirty());
        assert!(!editor.history().can_undo());
        assert!(editor
            .take_notices()
            .iter()
            .any(|n| n.level == NoticeLevel::Success));
    }

    #[test]
    fn test_revert_restores_persisted() {
        let mut editor = editor();
        editor
            .add_element(&NewElement::of(ElementType::QrCode))
            .expect("add");
        editor.revert();
        assert_eq!(editor.document().len(), 1);
        assert!(!editor.is_dirty());
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_preview_without_event_posts_notice() {
        let mut editor = editor();
        assert!(matches!(editor.begin_preview(), Err(EditorError::NoSampleData)));
        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(!editor.is_previewing());
    }

    #[test]
    fn test_stale_preview_response_discarded() {
        let record = BadgeRecord {
            id: "badge-1".into(),
            event: Some("event-1".into()),
            builder_data: "[]".into(),
            layout_width: Some(10.0),
            layout_height: Some(14.0),
            ..BadgeRecord::default()
        };
        let mut editor = Editor::from_record(&record, EditorConfig::default());
        let PreviewStep::Fetch(mut request) = editor.begin_preview().expect("begin") else {
            panic!("expected fetch");
        };
        request.document_id = "badge-2".into();
        let sample = SampleRecord::new();
        assert!(matches!(
            editor.complete_preview(&request, Some(&sample)),
            Err(EditorError::StaleResponse { .. })
        ));
        assert!(!editor.is_previewing());
    }

    #[test]
    fn test_probe_applies_only_to_defaulted_layout() {
        let record = BadgeRecord {
            id: "badge-1".into(),
            background_image: Some("art.png".into()),
            ..BadgeRecord::default()
        };
        let mut editor = Editor::from_record(&record, EditorConfig::default());
        assert!(editor.layout_defaulted());
        let size = PixelSize {
            width: 756,
            height: 1134,
        };
        assert!(editor.apply_probed_size("other", size).is_err());
        assert!(editor.apply_probed_size("badge-1", size).expect("apply"));
        assert!((editor.document().layout_width() - px_to_cm(756.0)).abs() < 1e-9);
        assert!(!editor.is_dirty());
        assert!(!editor.apply_probed_size("badge-1", size).expect("apply"));
    }
}
