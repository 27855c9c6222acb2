//! WebAssembly bindings for badge-core.
//!
//! This module exposes the editor to JavaScript when compiled to WASM. Values
//! cross the boundary as JSON strings; failures come back as error strings.
//! Network calls stay on the JavaScript side: the host fetches records and
//! sample data, then hands them to the editor.

use wasm_bindgen::prelude::*;

use crate::editor::{Editor, PreviewRequest, PreviewStep};
use crate::element::ElementId;
use crate::factory::NewElement;
use crate::patch::ElementPatch;
use crate::persistence::BadgeRecord;
use crate::preview::SampleRecord;
use crate::template::BadgeTemplate;
use crate::units::{ViewportSize, ZoomMode};
use crate::EditorConfig;

/// Initialize the badge editor WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
    web_sys::console::debug_1(&JsValue::from_str(&format!(
        "badge-core {} ready",
        crate::VERSION
    )));
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// Badge editor instance for WASM.
#[wasm_bindgen]
pub struct WasmBadgeEditor {
    editor: Editor,
    pending_preview: Option<PreviewRequest>,
}

#[wasm_bindgen]
impl WasmBadgeEditor {
    /// Create an editor for a new badge with default settings.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            editor: Editor::default(),
            pending_preview: None,
        }
    }

    /// Create an editor with a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is malformed or invalid.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<WasmBadgeEditor, String> {
        let config: EditorConfig = serde_json::from_str(json).map_err(|e| e.to_string())?;
        config.validate().map_err(|e| e.to_string())?;
        Ok(Self {
            editor: Editor::new(config),
            pending_preview: None,
        })
    }

    /// Load a badge record fetched by the host.
    ///
    /// # Errors
    ///
    /// Returns an error string if the record JSON is malformed.
    #[wasm_bindgen(js_name = loadRecord)]
    pub fn load_record(&mut self, json: &str) -> Result<(), String> {
        let record: BadgeRecord = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.editor = Editor::from_record(&record, self.editor.config().clone());
        self.pending_preview = None;
        Ok(())
    }

    /// Get the element list as JSON.
    #[wasm_bindgen(js_name = getElementsJson)]
    #[must_use]
    pub fn get_elements_json(&self) -> String {
        serde_json::to_string(self.editor.elements()).unwrap_or_default()
    }

    /// Get the element list as a JavaScript array.
    ///
    /// # Errors
    ///
    /// Returns the JavaScript parse error if the JSON cannot be parsed.
    #[wasm_bindgen(js_name = getElements)]
    pub fn get_elements(&self) -> Result<JsValue, JsValue> {
        js_sys::JSON::parse(&self.get_elements_json())
    }

    /// Get the layout and background as JSON.
    #[wasm_bindgen(js_name = getPosterJson)]
    #[must_use]
    pub fn get_poster_json(&self) -> String {
        serde_json::to_string(self.editor.document().poster()).unwrap_or_default()
    }

    /// Get the viewport (zoom, pan, mode) as JSON.
    #[wasm_bindgen(js_name = getViewportJson)]
    #[must_use]
    pub fn get_viewport_json(&self) -> String {
        serde_json::to_string(self.editor.viewport()).unwrap_or_default()
    }

    /// Add an element described by a JSON creation request.
    ///
    /// Returns the new id, or `undefined` if nothing was added.
    ///
    /// # Errors
    ///
    /// Returns an error string for malformed JSON or while previewing.
    #[wasm_bindgen(js_name = addElement)]
    pub fn add_element(&mut self, json: &str) -> Result<Option<u64>, String> {
        let request: NewElement = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let id = self.editor.add_element(&request).map_err(|e| e.to_string())?;
        Ok(id.map(ElementId::as_u64))
    }

    /// Apply a JSON partial update to an element.
    ///
    /// # Errors
    ///
    /// Returns an error string for malformed JSON, an unknown id or while
    /// previewing.
    #[wasm_bindgen(js_name = updateElement)]
    pub fn update_element(&mut self, id: u64, json: &str) -> Result<bool, String> {
        let patch: ElementPatch = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.editor
            .update_element(ElementId::from_raw(id), &patch)
            .map_err(|e| e.to_string())
    }

    /// Remove an element.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing.
    #[wasm_bindgen(js_name = removeElement)]
    pub fn remove_element(&mut self, id: u64) -> Result<bool, String> {
        self.editor
            .remove_element(ElementId::from_raw(id))
            .map_err(|e| e.to_string())
    }

    /// Move an element within the paint order.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<bool, String> {
        self.editor.reorder(from, to).map_err(|e| e.to_string())
    }

    /// Start a drag or resize gesture.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing.
    #[wasm_bindgen(js_name = beginInteraction)]
    pub fn begin_interaction(&mut self) -> Result<(), String> {
        self.editor.begin_interaction().map_err(|e| e.to_string())
    }

    /// Finish a drag or resize gesture.
    #[wasm_bindgen(js_name = endInteraction)]
    pub fn end_interaction(&mut self) {
        self.editor.end_interaction();
    }

    /// Step back one edit.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing.
    pub fn undo(&mut self) -> Result<bool, String> {
        self.editor.undo().map_err(|e| e.to_string())
    }

    /// Step forward one edit.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing.
    pub fn redo(&mut self) -> Result<bool, String> {
        self.editor.redo().map_err(|e| e.to_string())
    }

    /// Whether undo is available.
    #[wasm_bindgen(js_name = canUndo)]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.editor.history().can_undo()
    }

    /// Whether redo is available.
    #[wasm_bindgen(js_name = canRedo)]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.editor.history().can_redo()
    }

    /// Resize the layout in centimetres.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing.
    #[wasm_bindgen(js_name = setLayoutSize)]
    pub fn set_layout_size(&mut self, width: f64, height: f64) -> Result<bool, String> {
        self.editor
            .set_layout_size(width, height)
            .map_err(|e| e.to_string())
    }

    /// Set the zoom mode (`"fit"`, `"fill"` or `"original"`) for a viewport.
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown mode.
    #[wasm_bindgen(js_name = setZoomMode)]
    pub fn set_zoom_mode(&mut self, mode: &str, width: f64, height: f64) -> Result<bool, String> {
        let mode: ZoomMode =
            serde_json::from_value(serde_json::Value::String(mode.to_string()))
                .map_err(|e| e.to_string())?;
        Ok(self
            .editor
            .set_zoom_mode(mode, Some(ViewportSize { width, height })))
    }

    /// Replace the foreground with a JSON template.
    ///
    /// # Errors
    ///
    /// Returns an error string for malformed JSON or while previewing.
    #[wasm_bindgen(js_name = importTemplate)]
    pub fn import_template(&mut self, json: &str) -> Result<usize, String> {
        let template: BadgeTemplate = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.editor
            .import_template(&template)
            .map_err(|e| e.to_string())
    }

    /// Toggle preview.
    ///
    /// Returns `null` when preview was closed, otherwise the JSON fetch
    /// request the host should resolve and pass to `completePreview`.
    ///
    /// # Errors
    ///
    /// Returns an error string when there is no event to sample from.
    #[wasm_bindgen(js_name = togglePreview)]
    pub fn toggle_preview(&mut self) -> Result<Option<String>, String> {
        match self.editor.begin_preview().map_err(|e| e.to_string())? {
            PreviewStep::Exited => {
                self.pending_preview = None;
                Ok(None)
            }
            PreviewStep::Fetch(request) => {
                let json = to_json(&serde_json::json!({
                    "documentId": request.document_id,
                    "eventId": request.event_id,
                    "ticketId": request.ticket_id,
                }))?;
                self.pending_preview = Some(request);
                Ok(Some(json))
            }
        }
    }

    /// Enter preview with the sample record JSON (`null` for none found).
    ///
    /// # Errors
    ///
    /// Returns an error string for malformed JSON, a missing request or a
    /// response for another document.
    #[wasm_bindgen(js_name = completePreview)]
    pub fn complete_preview(&mut self, json: &str) -> Result<bool, String> {
        let request = self
            .pending_preview
            .take()
            .ok_or_else(|| "no preview request pending".to_string())?;
        let record: Option<SampleRecord> =
            serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.editor
            .complete_preview(&request, record.as_ref())
            .map_err(|e| e.to_string())
    }

    /// Whether sample data is showing.
    #[wasm_bindgen(js_name = isPreviewing)]
    #[must_use]
    pub fn is_previewing(&self) -> bool {
        self.editor.is_previewing()
    }

    /// Whether there are unsaved changes.
    #[wasm_bindgen(js_name = isDirty)]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.editor.is_dirty()
    }

    /// Fields for the host to submit on save, as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string while previewing or if serialization fails.
    #[wasm_bindgen(js_name = getSaveFieldsJson)]
    pub fn get_save_fields_json(&self) -> Result<String, String> {
        let fields = self.editor.to_fields().map_err(|e| e.to_string())?;
        to_json(&fields)
    }

    /// Confirm a save the host submitted, passing the stored record JSON.
    ///
    /// Clears the dirty flag and the undo history.
    ///
    /// # Errors
    ///
    /// Returns an error string if the record JSON is malformed.
    #[wasm_bindgen(js_name = confirmSaved)]
    pub fn confirm_saved(&mut self, json: &str) -> Result<(), String> {
        let record: BadgeRecord = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.editor.mark_saved(&record);
        Ok(())
    }

    /// Drain queued notices as a JSON array.
    #[wasm_bindgen(js_name = takeNoticesJson)]
    pub fn take_notices_json(&mut self) -> String {
        serde_json::to_string(&self.editor.take_notices()).unwrap_or_default()
    }
}

impl Default for WasmBadgeEditor {
    fn default() -> Self {
        Self::new()
    }
}
