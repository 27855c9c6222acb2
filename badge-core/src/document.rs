//! Poster document: layout metadata plus the ordered element list.
//!
//! The element vector is the single source of truth for paint order (index 0
//! is painted first). An id→index map gives constant-time lookup for the
//! stream of updates a drag or resize produces; it is rebuilt only when the
//! order changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{BackgroundProps, Element, ElementId, ElementKind, Geometry};
use crate::patch::{ElementPatch, PatchOutcome};

/// Layout metadata of a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterData {
    /// Canvas width in centimetres.
    pub layout_width: f64,
    /// Canvas height in centimetres.
    pub layout_height: f64,
    /// Absolute URI of the background artwork.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

impl PosterData {
    /// Layout of the given size without artwork.
    #[must_use]
    pub fn new(layout_width: f64, layout_height: f64) -> Self {
        Self {
            layout_width,
            layout_height,
            background_image: None,
        }
    }

    /// Geometry the background element must always have.
    #[must_use]
    pub const fn background_geometry(&self) -> Geometry {
        Geometry::sized(self.layout_width, self.layout_height)
    }
}

/// Independent deep copy of a document's elements and layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Elements in paint order.
    pub elements: Vec<Element>,
    /// Layout metadata.
    pub poster: PosterData,
}

/// The in-memory badge document.
#[derive(Debug, Clone)]
pub struct PosterDocument {
    poster: PosterData,
    elements: Vec<Element>,
    index: HashMap<ElementId, usize>,
    next_id: u64,
}

impl PosterDocument {
    /// Create an empty document holding only a placeholder background.
    #[must_use]
    pub fn new(poster: PosterData) -> Self {
        Self::from_parts(poster, Vec::new())
    }

    /// Build a document from loaded parts.
    ///
    /// Guarantees exactly one background element: a placeholder is synthesized
    /// at the bottom when none is present and extra backgrounds are dropped.
    /// The stored paint order is kept as is. The background's geometry is
    /// locked to the layout.
    #[must_use]
    pub fn from_parts(poster: PosterData, elements: Vec<Element>) -> Self {
        let next_id = elements
            .iter()
            .map(|e| e.id.as_u64())
            .max()
            .map_or(1, |max| max.saturating_add(1));

        let mut doc = Self {
            poster,
            elements: Vec::with_capacity(elements.len() + 1),
            index: HashMap::new(),
            next_id,
        };

        let mut seen_background = false;
        for element in elements {
            if doc.index.contains_key(&element.id) {
                tracing::warn!(id = %element.id, "Dropping element with duplicate id");
                continue;
            }
            if element.is_background() {
                if seen_background {
                    tracing::warn!(id = %element.id, "Dropping duplicate background element");
                    continue;
                }
                seen_background = true;
            }
            doc.index.insert(element.id, doc.elements.len());
            doc.elements.push(element);
        }

        if !seen_background {
            let id = doc.next_element_id();
            let src = doc.poster.background_image.clone().unwrap_or_default();
            tracing::debug!(%id, "Synthesizing placeholder background");
            doc.elements.insert(
                0,
                Element::new(
                    id,
                    ElementKind::Background(BackgroundProps { src }),
                    doc.poster.background_geometry(),
                ),
            );
        }

        // The record's artwork wins over whatever src the stored background had.
        if let Some(uri) = doc.poster.background_image.clone() {
            if let Some(bg) = doc.elements.iter_mut().find(|e| e.is_background()) {
                bg.kind = ElementKind::Background(BackgroundProps { src: uri });
            }
        }

        doc.rebuild_index();
        doc.lock_background();
        doc
    }

    /// Layout metadata.
    #[must_use]
    pub fn poster(&self) -> &PosterData {
        &self.poster
    }

    /// Canvas width in centimetres.
    #[must_use]
    pub fn layout_width(&self) -> f64 {
        self.poster.layout_width
    }

    /// Canvas height in centimetres.
    #[must_use]
    pub fn layout_height(&self) -> f64 {
        self.poster.layout_height
    }

    /// Elements in paint order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of elements, background included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document holds no elements at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get an element by id.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.index.get(&id).map(|&i| &self.elements[i])
    }

    /// Paint-order index of an element.
    #[must_use]
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The background element.
    #[must_use]
    pub fn background(&self) -> Option<&Element> {
        self.elements.iter().find(|e| e.is_background())
    }

    /// Id of the background element.
    #[must_use]
    pub fn background_id(&self) -> Option<ElementId> {
        self.background().map(|e| e.id)
    }

    /// Issue a fresh element id. Ids are never handed out twice.
    pub fn next_element_id(&mut self) -> ElementId {
        let id = ElementId::from_raw(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Append an element at the top of the paint order.
    ///
    /// A second background is refused and `None` is returned.
    pub fn push(&mut self, element: Element) -> Option<ElementId> {
        if element.is_background() && self.background().is_some() {
            tracing::debug!("Refusing to add a second background element");
            return None;
        }
        if self.index.contains_key(&element.id) {
            tracing::warn!(id = %element.id, "Refusing to add element with duplicate id");
            return None;
        }
        let id = element.id;
        self.next_id = self.next_id.max(id.as_u64().saturating_add(1));
        self.index.insert(id, self.elements.len());
        self.elements.push(element);
        Some(id)
    }

    /// Remove an element. The background cannot be removed.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let idx = *self.index.get(&id)?;
        if self.elements[idx].is_background() {
            tracing::debug!(%id, "Ignoring removal of background element");
            return None;
        }
        let removed = self.elements.remove(idx);
        self.rebuild_index();
        Some(removed)
    }

    /// Move the element at `from` to position `to` in the paint order.
    ///
    /// The background moves like any other element; only its geometry is
    /// locked. Returns `false` for out-of-range or identical indices.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.elements.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let element = self.elements.remove(from);
        self.elements.insert(to, element);
        self.rebuild_index();
        true
    }

    /// Apply a partial update to one element.
    ///
    /// Only the targeted element is touched. A new background `src` is also
    /// written to the layout's artwork so it is saved with the record.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> PatchOutcome {
        let Some(&idx) = self.index.get(&id) else {
            return PatchOutcome::NotFound;
        };
        let outcome = patch.apply(&mut self.elements[idx], &self.poster);
        if outcome.changed() {
            if let ElementKind::Background(props) = &self.elements[idx].kind {
                let src = props.src.clone();
                self.poster.background_image = (!src.is_empty()).then_some(src);
            }
        }
        outcome
    }

    /// Resize the layout. Non-positive or non-finite sizes are refused.
    pub fn set_layout_size(&mut self, width: f64, height: f64) -> bool {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            tracing::debug!(width, height, "Ignoring invalid layout size");
            return false;
        }
        if (self.poster.layout_width - width).abs() < f64::EPSILON
            && (self.poster.layout_height - height).abs() < f64::EPSILON
        {
            return false;
        }
        self.poster.layout_width = width;
        self.poster.layout_height = height;
        self.lock_background();
        true
    }

    /// Point the background at new artwork.
    pub fn set_background_image(&mut self, uri: Option<String>) -> bool {
        if self.poster.background_image == uri {
            return false;
        }
        let src = uri.clone().unwrap_or_default();
        self.poster.background_image = uri;
        if let Some(bg) = self.elements.iter_mut().find(|e| e.is_background()) {
            bg.kind = ElementKind::Background(BackgroundProps { src });
        }
        true
    }

    /// Force the background to the origin and the full layout size.
    pub fn lock_background(&mut self) {
        let geometry = self.poster.background_geometry();
        for element in self.elements.iter_mut().filter(|e| e.is_background()) {
            element.geometry = geometry;
        }
    }

    /// Replace every non-background element, keeping the background untouched
    /// at the bottom of the paint order.
    pub fn replace_foreground(&mut self, elements: Vec<Element>) {
        let background = self.elements.iter().find(|e| e.is_background()).cloned();
        self.elements = background
            .into_iter()
            .chain(elements.into_iter().filter(|e| !e.is_background()))
            .collect();
        for element in &self.elements {
            self.next_id = self.next_id.max(element.id.as_u64().saturating_add(1));
        }
        self.rebuild_index();
    }

    /// Replace the element list wholesale, e.g. with preview substitutions.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.rebuild_index();
    }

    /// Topmost element containing the point (in centimetres).
    #[must_use]
    pub fn element_at(&self, x: f64, y: f64) -> Option<ElementId> {
        self.elements
            .iter()
            .rev()
            .find(|e| !e.is_background() && e.contains_point(x, y))
            .map(|e| e.id)
    }

    /// Deep copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            elements: self.elements.clone(),
            poster: self.poster.clone(),
        }
    }

    /// Replace the current state with a snapshot.
    ///
    /// The id counter is not rewound, so ids issued after the snapshot was
    /// taken stay retired.
    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.poster = snapshot.poster;
        self.elements = snapshot.elements;
        for element in &self.elements {
            self.next_id = self.next_id.max(element.id.as_u64().saturating_add(1));
        }
        self.rebuild_index();
    }

    /// Serialize the element list (the badge's builder data) to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.elements)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, element) in self.elements.iter().enumerate() {
            self.index.insert(element.id, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{TextProps, MIN_ELEMENT_SIZE_CM};

    fn text(id: u64, x: f64, y: f64) -> Element {
        Element::new(
            ElementId::from_raw(id),
            ElementKind::Text(TextProps::default()),
            Geometry {
                position_x: x,
                position_y: y,
                width: 2.0,
                height: 1.0,
            },
        )
    }

    fn assert_background_locked(doc: &PosterDocument) {
        let bg = doc.background().expect("background");
        assert_eq!(bg.geometry, doc.poster().background_geometry());
        assert_eq!(doc.elements().iter().filter(|e| e.is_background()).count(), 1);
    }

    #[test]
    fn test_new_document_has_placeholder_background() {
        let doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        assert_eq!(doc.len(), 1);
        assert_background_locked(&doc);
    }

    #[test]
    fn test_from_parts_dedupes_backgrounds_and_continues_ids() {
        let bg = |id| {
            Element::new(
                ElementId::from_raw(id),
                ElementKind::Background(BackgroundProps::default()),
                Geometry::sized(3.0, 3.0),
            )
        };
        let doc = PosterDocument::from_parts(
            PosterData::new(10.0, 14.0),
            vec![bg(1), text(9, 0.0, 0.0), bg(4)],
        );
        assert_eq!(doc.len(), 2);
        assert_background_locked(&doc);

        let mut doc = doc;
        assert_eq!(doc.next_element_id(), ElementId::from_raw(10));
    }

    #[test]
    fn test_from_parts_keeps_stored_order_and_drops_duplicate_ids() {
        let background = Element::new(
            ElementId::from_raw(3),
            ElementKind::Background(BackgroundProps::default()),
            Geometry::default(),
        );
        let doc = PosterDocument::from_parts(
            PosterData::new(10.0, 14.0),
            vec![text(1, 0.0, 0.0), background, text(1, 5.0, 5.0), text(2, 0.0, 0.0)],
        );
        let ids: Vec<u64> = doc.elements().iter().map(|e| e.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        let kept = doc.get(ElementId::from_raw(1)).expect("kept");
        assert!(kept.geometry.position_x.abs() < f64::EPSILON);
    }

    #[test]
    fn test_remove_background_is_refused() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.push(text(50, 1.0, 1.0));
        let before = doc.elements().to_vec();
        let bg_id = doc.background_id().expect("background");
        assert!(doc.remove(bg_id).is_none());
        assert_eq!(doc.elements(), before.as_slice());
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        let id = doc.next_element_id();
        doc.push(text(id.as_u64(), 0.0, 0.0));
        doc.remove(id);
        assert_ne!(doc.next_element_id(), id);
    }

    #[test]
    fn test_reorder_moves_and_reindexes() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.push(text(10, 0.0, 0.0));
        doc.push(text(11, 0.0, 0.0));
        doc.push(text(12, 0.0, 0.0));
        assert!(doc.reorder(3, 1));
        assert_eq!(doc.index_of(ElementId::from_raw(12)), Some(1));
        assert_eq!(doc.index_of(ElementId::from_raw(10)), Some(2));
        assert!(!doc.reorder(1, 1));
        assert!(!doc.reorder(1, 7));
    }

    #[test]
    fn test_background_reorders_but_stays_locked() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.push(text(10, 0.0, 0.0));
        assert!(doc.reorder(0, 1));
        assert_eq!(doc.elements()[0].id, ElementId::from_raw(10));
        assert!(doc.elements()[1].is_background());
        assert_eq!(doc.index_of(ElementId::from_raw(10)), Some(0));
        assert_background_locked(&doc);

        assert!(doc.set_layout_size(8.0, 12.0));
        assert_background_locked(&doc);

        let reloaded = PosterDocument::from_parts(doc.poster().clone(), doc.elements().to_vec());
        assert_eq!(reloaded.elements(), doc.elements());
    }

    #[test]
    fn test_layout_resize_relocks_background() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        assert!(doc.set_layout_size(21.0, 29.7));
        assert_background_locked(&doc);
        assert!(!doc.set_layout_size(0.0, 5.0));
        assert!(!doc.set_layout_size(f64::NAN, 5.0));
        assert!((doc.layout_width() - 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_sub_minimum_is_rejected() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.push(text(20, 1.0, 1.0));
        let patch = ElementPatch {
            width: Some(MIN_ELEMENT_SIZE_CM / 2.0),
            ..ElementPatch::default()
        };
        assert_eq!(doc.update(ElementId::from_raw(20), &patch), PatchOutcome::Rejected);
        assert!((doc.get(ElementId::from_raw(20)).expect("el").geometry.width - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_background_src_update_moves_artwork() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        let bg = doc.background_id().expect("background");
        let patch = ElementPatch {
            src: Some("https://cdn.example/new.png".to_string()),
            ..ElementPatch::default()
        };
        assert_eq!(doc.update(bg, &patch), PatchOutcome::Applied);
        assert_eq!(
            doc.poster().background_image.as_deref(),
            Some("https://cdn.example/new.png")
        );

        let reloaded = PosterDocument::from_parts(doc.poster().clone(), doc.elements().to_vec());
        let ElementKind::Background(props) = &reloaded.background().expect("background").kind else {
            panic!("expected background");
        };
        assert_eq!(props.src, "https://cdn.example/new.png");
    }

    #[test]
    fn test_element_at_prefers_topmost() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.push(text(30, 1.0, 1.0));
        doc.push(text(31, 1.5, 1.0));
        assert_eq!(doc.element_at(2.0, 1.5), Some(ElementId::from_raw(31)));
        assert_eq!(doc.element_at(9.0, 13.0), None);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.push(text(40, 1.0, 1.0));
        let snap = doc.snapshot();
        doc.update(
            ElementId::from_raw(40),
            &ElementPatch {
                position_x: Some(5.0),
                ..ElementPatch::default()
            },
        );
        assert!((snap.elements[1].geometry.position_x - 1.0).abs() < f64::EPSILON);
        doc.restore(snap.clone());
        assert_eq!(doc.snapshot(), snap);
    }

    #[test]
    fn test_replace_foreground_keeps_background() {
        let mut doc = PosterDocument::new(PosterData::new(10.0, 14.0));
        doc.set_background_image(Some("https://cdn.example/art.png".to_string()));
        doc.push(text(60, 0.0, 0.0));
        let bg_before = doc.background().cloned();
        doc.replace_foreground(vec![text(70, 1.0, 1.0), text(71, 2.0, 2.0)]);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.background().cloned(), bg_before);
        assert!(doc.get(ElementId::from_raw(60)).is_none());
        assert_eq!(doc.index_of(ElementId::from_raw(71)), Some(2));
    }
}
