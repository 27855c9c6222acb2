//! Mapping between persisted badge records and the in-memory document.
//!
//! Older records stored geometry in pixels; newer ones in centimetres. Loading
//! detects legacy pixel values by threshold and canonicalizes everything to
//! centimetres before the document is built. Saving always writes centimetres.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::document::{PosterData, PosterDocument};
use crate::element::{Element, Geometry, MIN_ELEMENT_SIZE_CM};
use crate::units::{px_to_cm, PX_PER_CM};
use crate::{EditorConfig, EditorResult};

/// Layout dimensions above this are legacy pixels.
pub const LEGACY_LAYOUT_THRESHOLD: f64 = 50.0;

/// Element sizes above this are legacy pixels.
pub const LEGACY_SIZE_THRESHOLD: f64 = 100.0;

/// Element positions above this are legacy pixels.
pub const LEGACY_POSITION_THRESHOLD: f64 = 50.0;

/// Schemes that already point at a fetchable or local resource.
const PASS_THROUGH_SCHEMES: &[&str] = &["http", "https", "blob", "data", "file"];

/// Which tickets a badge applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeType {
    /// One badge for every ticket of the event.
    #[default]
    CommonTicket,
    /// Badge for the listed tickets only.
    SpecificTicket,
}

/// A badge record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRecord {
    /// Record id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Background artwork path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Background fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Layout width (cm, or px in legacy records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_width: Option<f64>,
    /// Layout height (cm, or px in legacy records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_height: Option<f64>,
    /// JSON array of elements.
    #[serde(default)]
    pub builder_data: String,
    /// Ticket scope.
    #[serde(default)]
    pub badge_type: BadgeType,
    /// Ticket ids, present for specific-ticket badges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tickets: Vec<String>,
    /// Event the badge belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// Record fields that travel with the document but are not edited on canvas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeMeta {
    /// Background fill color.
    pub background_color: Option<String>,
    /// Ticket scope.
    pub badge_type: BadgeType,
    /// Ticket ids for specific-ticket badges.
    pub tickets: Vec<String>,
    /// Owning event.
    pub event: Option<String>,
}

impl From<&BadgeRecord> for BadgeMeta {
    fn from(record: &BadgeRecord) -> Self {
        Self {
            background_color: record.background_color.clone(),
            badge_type: record.badge_type,
            tickets: record.tickets.clone(),
            event: record.event.clone(),
        }
    }
}

/// Fields submitted to the backend on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeFields {
    /// Record id; `None` creates a new record.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Background artwork URI, omitted when a new file is uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Background fill color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Layout width in centimetres.
    pub layout_width: f64,
    /// Layout height in centimetres.
    pub layout_height: f64,
    /// JSON array of elements.
    pub builder_data: String,
    /// Ticket scope.
    pub badge_type: BadgeType,
    /// Ticket ids for specific-ticket badges.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tickets: Vec<String>,
    /// Owning event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// A document built from a record.
#[derive(Debug, Clone)]
pub struct LoadedBadge {
    /// The canonicalized document.
    pub document: PosterDocument,
    /// Non-geometric record fields.
    pub meta: BadgeMeta,
    /// Whether the record lacked layout dimensions and defaults were used.
    pub layout_defaulted: bool,
}

/// Parse builder data; malformed data yields an empty list.
#[must_use]
pub fn parse_builder_data(raw: &str) -> Vec<Element> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<Element>>(raw) {
        Ok(elements) => elements,
        Err(e) => {
            tracing::warn!("Malformed builder data, starting with an empty badge: {e}");
            Vec::new()
        }
    }
}

/// Canonicalize one layout dimension to centimetres.
#[must_use]
pub fn normalize_layout_dimension(value: f64) -> f64 {
    if value > LEGACY_LAYOUT_THRESHOLD {
        px_to_cm(value)
    } else {
        value
    }
}

/// Whether an element's geometry looks like legacy pixel data.
#[must_use]
pub fn is_legacy_geometry(g: &Geometry) -> bool {
    g.width > LEGACY_SIZE_THRESHOLD
        || g.height > LEGACY_SIZE_THRESHOLD
        || g.position_x > LEGACY_POSITION_THRESHOLD
        || g.position_y > LEGACY_POSITION_THRESHOLD
}

/// Canonicalize an element's geometry to centimetres.
///
/// When any field trips the legacy heuristic, all four fields are treated as
/// pixels.
#[must_use]
pub fn normalize_geometry(g: Geometry) -> Geometry {
    if is_legacy_geometry(&g) {
        g.scaled_down(PX_PER_CM)
    } else {
        g
    }
}

fn normalize_element(mut element: Element) -> Element {
    if element.is_background() {
        return element;
    }
    let before = element.geometry;
    let mut g = normalize_geometry(before);
    if g != before {
        tracing::debug!(id = %element.id, "Converted legacy pixel geometry to cm");
    }
    g.width = g.width.max(MIN_ELEMENT_SIZE_CM);
    g.height = g.height.max(MIN_ELEMENT_SIZE_CM);
    element.geometry = g;
    element
}

/// Whether a reference can be used as-is without prefixing the asset base.
#[must_use]
pub fn is_absolute_reference(reference: &str) -> bool {
    Url::parse(reference).is_ok_and(|u| PASS_THROUGH_SCHEMES.contains(&u.scheme()))
}

/// Resolve an asset reference to an absolute URI.
///
/// Absolute URLs and transient local references (`blob:`, `data:`) pass
/// through unchanged; relative paths are joined onto `base`.
///
/// # Errors
///
/// Returns [`crate::EditorError::InvalidUri`] if `base` is not a URL or the
/// path cannot be joined.
pub fn resolve_asset_uri(reference: &str, base: &str) -> EditorResult<String> {
    if is_absolute_reference(reference) {
        return Ok(reference.to_string());
    }
    let base = if base.ends_with('/') {
        Url::parse(base)?
    } else {
        Url::parse(&format!("{base}/"))?
    };
    Ok(base.join(reference.trim_start_matches('/'))?.to_string())
}

fn resolve_background(record: &BadgeRecord, config: &EditorConfig) -> Option<String> {
    let raw = record.background_image.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match resolve_asset_uri(raw, &config.asset_base_url) {
        Ok(uri) => Some(uri),
        Err(e) => {
            tracing::warn!("Could not resolve background {raw:?}: {e}");
            Some(raw.to_string())
        }
    }
}

/// Build a canonical document from a persisted record.
///
/// Never fails: malformed builder data becomes an empty badge, missing layout
/// dimensions fall back to the configured defaults (and are flagged so the
/// caller may probe the artwork for its real size).
#[must_use]
pub fn load_record(record: &BadgeRecord, config: &EditorConfig) -> LoadedBadge {
    let declared = match (record.layout_width, record.layout_height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => {
            Some((normalize_layout_dimension(w), normalize_layout_dimension(h)))
        }
        _ => None,
    };
    let layout_defaulted = declared.is_none();
    let (width, height) = declared.unwrap_or((
        config.default_layout_width_cm,
        config.default_layout_height_cm,
    ));

    let poster = PosterData {
        layout_width: width,
        layout_height: height,
        background_image: resolve_background(record, config),
    };

    let elements: Vec<Element> = parse_builder_data(&record.builder_data)
        .into_iter()
        .map(normalize_element)
        .collect();

    tracing::info!(
        record = %record.id,
        elements = elements.len(),
        width,
        height,
        layout_defaulted,
        "Loaded badge"
    );

    LoadedBadge {
        document: PosterDocument::from_parts(poster, elements),
        meta: BadgeMeta::from(record),
        layout_defaulted,
    }
}

/// Serialize a document's elements, forcing the background to the current
/// layout size first.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_builder_data(document: &PosterDocument) -> EditorResult<String> {
    let geometry = document.poster().background_geometry();
    let elements: Vec<Element> = document
        .elements()
        .iter()
        .cloned()
        .map(|mut e| {
            if e.is_background() {
                e.geometry = geometry;
            }
            e
        })
        .collect();
    Ok(serde_json::to_string(&elements)?)
}

/// Build the fields to submit for a save.
///
/// When `uploading` is set the background URI is left out so the backend
/// stores the attached file instead.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_fields(
    document: &PosterDocument,
    record_id: Option<&str>,
    meta: &BadgeMeta,
    uploading: bool,
) -> EditorResult<BadgeFields> {
    let background_image = if uploading {
        None
    } else {
        document
            .poster()
            .background_image
            .clone()
            .filter(|uri| !uri.starts_with("blob:"))
    };
    Ok(BadgeFields {
        id: record_id.map(str::to_string),
        background_image,
        background_color: meta.background_color.clone(),
        layout_width: document.layout_width(),
        layout_height: document.layout_height(),
        builder_data: serialize_builder_data(document)?,
        badge_type: meta.badge_type,
        tickets: meta.tickets.clone(),
        event: meta.event.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;

    fn record(builder_data: &str) -> BadgeRecord {
        BadgeRecord {
            id: "badge-1".to_string(),
            background_image: Some("badges/art.png".to_string()),
            layout_width: Some(21.0),
            layout_height: Some(29.7),
            builder_data: builder_data.to_string(),
            ..BadgeRecord::default()
        }
    }

    #[test]
    fn test_malformed_builder_data_loads_empty() {
        let loaded = load_record(&record("{not json"), &EditorConfig::default());
        // Only the synthesized background remains.
        assert_eq!(loaded.document.len(), 1);
        assert!(loaded.document.elements()[0].is_background());
    }

    #[test]
    fn test_legacy_layout_dimensions() {
        assert!((normalize_layout_dimension(400.0) - 400.0 / PX_PER_CM).abs() < 1e-9);
        assert!((normalize_layout_dimension(4.0) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_legacy_element_geometry() {
        let legacy = Geometry {
            position_x: 10.0,
            position_y: 10.0,
            width: 400.0,
            height: 40.0,
        };
        let g = normalize_geometry(legacy);
        assert!((g.width - 400.0 / PX_PER_CM).abs() < 1e-9);
        assert!((g.position_x - 10.0 / PX_PER_CM).abs() < 1e-9);

        let modern = Geometry {
            position_x: 1.0,
            position_y: 2.0,
            width: 4.0,
            height: 4.0,
        };
        assert_eq!(normalize_geometry(modern), modern);
    }

    #[test]
    fn test_load_normalizes_elements_and_locks_background() {
        let data = r#"[
            {"id":1,"type":"background","positionX":5,"positionY":5,"width":3,"height":3},
            {"id":2,"type":"text","positionX":60,"positionY":20,"width":300,"height":40,"content":"Hi"},
            {"id":3,"type":"image","positionX":1,"positionY":1,"width":4,"height":4}
        ]"#;
        let loaded = load_record(&record(data), &EditorConfig::default());
        let doc = &loaded.document;
        let bg = doc.background().expect("background");
        assert_eq!(bg.geometry, Geometry::sized(21.0, 29.7));

        let text = &doc.elements()[1];
        assert!((text.geometry.width - 300.0 / PX_PER_CM).abs() < 1e-9);
        let image = &doc.elements()[2];
        assert!((image.geometry.width - 4.0).abs() < f64::EPSILON);
        assert!(!loaded.layout_defaulted);
    }

    #[test]
    fn test_missing_layout_uses_defaults() {
        let mut rec = record("[]");
        rec.layout_width = None;
        let config = EditorConfig::default();
        let loaded = load_record(&rec, &config);
        assert!(loaded.layout_defaulted);
        assert!((loaded.document.layout_width() - config.default_layout_width_cm).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_asset_uri() {
        let base = "https://cdn.example.com/uploads";
        assert_eq!(
            resolve_asset_uri("badges/a.png", base).expect("resolve"),
            "https://cdn.example.com/uploads/badges/a.png"
        );
        assert_eq!(
            resolve_asset_uri("/badges/a.png", base).expect("resolve"),
            "https://cdn.example.com/uploads/badges/a.png"
        );
        assert_eq!(
            resolve_asset_uri("https://other.example/x.png", base).expect("resolve"),
            "https://other.example/x.png"
        );
        let blob = "blob:http://localhost:5173/1c3e";
        assert_eq!(resolve_asset_uri(blob, base).expect("resolve"), blob);
        assert!(resolve_asset_uri("a.png", "not a base").is_err());
    }

    #[test]
    fn test_background_uri_resolved_on_load() {
        let loaded = load_record(&record("[]"), &EditorConfig::default());
        assert_eq!(
            loaded.document.poster().background_image.as_deref(),
            Some("http://localhost:3000/uploads/badges/art.png")
        );
        let ElementKind::Background(props) = &loaded.document.elements()[0].kind else {
            panic!("expected background");
        };
        assert_eq!(props.src, "http://localhost:3000/uploads/badges/art.png");
    }

    #[test]
    fn test_fields_force_background_to_layout() {
        let loaded = load_record(&record("[]"), &EditorConfig::default());
        let fields = to_fields(&loaded.document, Some("badge-1"), &loaded.meta, false)
            .expect("fields");
        let stored: Vec<Element> = serde_json::from_str(&fields.builder_data).expect("json");
        assert_eq!(stored[0].geometry, Geometry::sized(21.0, 29.7));
        assert!((fields.layout_width - 21.0).abs() < f64::EPSILON);
        assert_eq!(fields.id.as_deref(), Some("badge-1"));
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{"_id":"b1","backgroundImage":"x.png","layoutWidth":10,"layoutHeight":14,
            "builderData":"[]","badgeType":"SPECIFIC_TICKET","tickets":["t1","t2"]}"#;
        let rec: BadgeRecord = serde_json::from_str(json).expect("json");
        assert_eq!(rec.badge_type, BadgeType::SpecificTicket);
        assert_eq!(rec.tickets.len(), 2);
    }
}
