//! Live-data preview.
//!
//! Previewing swaps bound elements' content for values from a sample attendee
//! record. Leaving preview restores the exact element list captured on entry,
//! so a preview round trip never alters the document.

use serde_json::{Map, Value};

use crate::element::{Element, ElementKind};
use crate::persistence::resolve_asset_uri;

/// A sample attendee record as returned by the backend.
pub type SampleRecord = Map<String, Value>;

/// Record paths tried, in order, for each known text binding.
///
/// Bindings not listed here are looked up as `record[var]`.
const TEXT_BINDINGS: &[(&str, &[&str])] = &[
    ("name", &["name", "fullName"]),
    ("firstName", &["firstName", "first_name"]),
    ("lastName", &["lastName", "last_name"]),
    ("email", &["email"]),
    ("phone", &["phone", "mobile", "contact"]),
    ("contact", &["contact", "phone", "mobile"]),
    ("event", &["eventName", "event.name", "event.title", "event"]),
    ("ticket", &["ticketName", "ticket.name", "ticket.title", "ticket"]),
    ("designation", &["designation", "jobTitle"]),
    ("company", &["company", "organization", "companyName"]),
    ("ticketNumber", &["ticketNumber", "ticketNo", "ticket.number"]),
    ("ticketStartDate", &["ticketStartDate", "ticket.startDate"]),
    ("ticketEndDate", &["ticketEndDate", "ticket.endDate"]),
];

/// Record paths tried for image bindings.
const IMAGE_BINDINGS: &[(&str, &[&str])] = &[
    ("profilePicture", &["profilePicture", "photo", "avatar", "image"]),
    ("photo", &["photo", "profilePicture", "avatar"]),
    ("logo", &["logo", "event.logo", "companyLogo"]),
];

/// Follow a dotted path through nested objects.
fn lookup_path<'a>(record: &'a SampleRecord, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_match(record: &SampleRecord, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup_path(record, path).and_then(scalar_text))
}

fn lookup(table: &[(&str, &[&str])], record: &SampleRecord, var: &str) -> Option<String> {
    let paths = table
        .iter()
        .find(|(name, _)| *name == var)
        .map_or(&[][..], |(_, paths)| *paths);
    first_match(record, paths).or_else(|| lookup_path(record, var).and_then(scalar_text))
}

/// Text value for a binding.
#[must_use]
pub fn lookup_text(record: &SampleRecord, var: &str) -> Option<String> {
    let value = lookup(TEXT_BINDINGS, record, var);
    if value.is_none() && var == "name" {
        let joined = [
            first_match(record, &["firstName", "first_name"]),
            first_match(record, &["lastName", "last_name"]),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
        return (!joined.is_empty()).then_some(joined);
    }
    value
}

/// Substitute bound elements with sample values.
///
/// Text and select elements take the looked-up text; images take the
/// looked-up asset resolved against `asset_base`. Elements whose binding has
/// no value in the record are left as they are.
#[must_use]
pub fn substitute(elements: &[Element], record: &SampleRecord, asset_base: &str) -> Vec<Element> {
    elements
        .iter()
        .map(|element| {
            let mut element = element.clone();
            let Some(var) = element.var_binding().map(str::to_string) else {
                return element;
            };
            match &mut element.kind {
                ElementKind::Text(p) => {
                    if let Some(text) = lookup_text(record, &var) {
                        p.content = text;
                    }
                }
                ElementKind::Select(p) => {
                    if let Some(text) = lookup_text(record, &var) {
                        p.label = text;
                    }
                }
                ElementKind::Image(p) => {
                    if let Some(path) = lookup(IMAGE_BINDINGS, record, &var) {
                        match resolve_asset_uri(&path, asset_base) {
                            Ok(uri) => p.src = Some(uri),
                            Err(e) => tracing::debug!("Skipping preview image {path:?}: {e}"),
                        }
                    }
                }
                _ => {}
            }
            element
        })
        .collect()
}

/// Preview state machine: `Idle → Previewing → Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewState {
    /// Showing the editable document.
    #[default]
    Idle,
    /// Showing sample data; holds the elements to restore.
    Previewing {
        /// Element list captured on entry.
        snapshot: Vec<Element>,
    },
}

impl PreviewState {
    /// Whether sample data is showing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Previewing { .. })
    }

    /// Enter preview: capture `elements` and return their substituted form.
    ///
    /// Returns `None` if already previewing.
    pub fn enter(
        &mut self,
        elements: &[Element],
        record: &SampleRecord,
        asset_base: &str,
    ) -> Option<Vec<Element>> {
        if self.is_active() {
            return None;
        }
        let substituted = substitute(elements, record, asset_base);
        *self = Self::Previewing {
            snapshot: elements.to_vec(),
        };
        tracing::info!("Entered preview mode");
        Some(substituted)
    }

    /// Leave preview, returning the exact element list captured on entry.
    pub fn exit(&mut self) -> Option<Vec<Element>> {
        match std::mem::take(self) {
            Self::Previewing { snapshot } => {
                tracing::info!("Left preview mode");
                Some(snapshot)
            }
            Self::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementId, Geometry, ImageProps, QrCodeProps, TextProps};
    use serde_json::json;

    const BASE: &str = "https://cdn.example.com/uploads/";

    fn record(value: Value) -> SampleRecord {
        value.as_object().cloned().expect("object")
    }

    fn text(id: u64, var: Option<&str>) -> Element {
        Element::new(
            ElementId::from_raw(id),
            ElementKind::Text(TextProps {
                content: "placeholder".to_string(),
                var: var.map(str::to_string),
                ..TextProps::default()
            }),
            Geometry::sized(4.0, 1.0),
        )
    }

    fn content(el: &Element) -> &str {
        match &el.kind {
            ElementKind::Text(p) => &p.content,
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn test_text_lookup_table() {
        let rec = record(json!({
            "name": "Ada Lovelace",
            "event": {"name": "RustConf"},
            "ticketNumber": 1042,
            "company": "Analytical Engines"
        }));
        assert_eq!(lookup_text(&rec, "name").as_deref(), Some("Ada Lovelace"));
        assert_eq!(lookup_text(&rec, "event").as_deref(), Some("RustConf"));
        assert_eq!(lookup_text(&rec, "ticketNumber").as_deref(), Some("1042"));
        assert_eq!(lookup_text(&rec, "company").as_deref(), Some("Analytical Engines"));
        assert_eq!(lookup_text(&rec, "email"), None);
    }

    #[test]
    fn test_generic_fallback_and_name_join() {
        let rec = record(json!({"firstName": "Grace", "lastName": "Hopper", "tShirt": "M"}));
        assert_eq!(lookup_text(&rec, "tShirt").as_deref(), Some("M"));
        assert_eq!(lookup_text(&rec, "name").as_deref(), Some("Grace Hopper"));
    }

    #[test]
    fn test_substitute_only_bound_elements() {
        let rec = record(json!({"name": "Ada", "designation": "Engineer"}));
        let elements = vec![text(1, Some("name")), text(2, None), text(3, Some("email"))];
        let out = substitute(&elements, &rec, BASE);
        assert_eq!(content(&out[0]), "Ada");
        assert_eq!(content(&out[1]), "placeholder");
        assert_eq!(content(&out[2]), "placeholder");
    }

    #[test]
    fn test_image_src_resolved() {
        let rec = record(json!({"profilePicture": "avatars/ada.jpg"}));
        let image = Element::new(
            ElementId::from_raw(5),
            ElementKind::Image(ImageProps {
                var: Some("profilePicture".to_string()),
                ..ImageProps::default()
            }),
            Geometry::sized(4.0, 4.0),
        );
        let out = substitute(&[image], &rec, BASE);
        let ElementKind::Image(p) = &out[0].kind else {
            panic!("expected image");
        };
        assert_eq!(
            p.src.as_deref(),
            Some("https://cdn.example.com/uploads/avatars/ada.jpg")
        );
    }

    #[test]
    fn test_unbound_kinds_untouched() {
        let rec = record(json!({"name": "Ada"}));
        let qr = Element::new(
            ElementId::from_raw(9),
            ElementKind::QrCode(QrCodeProps::default()),
            Geometry::sized(3.0, 3.0),
        );
        assert_eq!(substitute(&[qr.clone()], &rec, BASE), vec![qr]);
    }

    #[test]
    fn test_round_trip_restores_snapshot() {
        let rec = record(json!({"name": "Ada"}));
        let elements = vec![text(1, Some("name"))];
        let mut state = PreviewState::default();

        let shown = state.enter(&elements, &rec, BASE).expect("enter");
        assert_eq!(content(&shown[0]), "Ada");
        assert!(state.is_active());
        assert!(state.enter(&shown, &rec, BASE).is_none());

        let restored = state.exit().expect("exit");
        assert_eq!(restored, elements);
        assert!(!state.is_active());
        assert!(state.exit().is_none());
    }
}
