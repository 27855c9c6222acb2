//! Template import.
//!
//! A template lists which standard fields a badge should carry, each with
//! optional pixel-unit placement. Importing replaces every non-background
//! element with one element per enabled field; the badge's own background
//! artwork is always kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::PosterDocument;
use crate::element::{
    Element, ElementKind, ElementType, Geometry, ImagePreset, MIN_ELEMENT_SIZE_CM,
};
use crate::factory::{create_element, NewElement};
use crate::persistence::normalize_geometry;
use crate::units::cm_to_px;

/// Standard badge fields a template can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateField {
    /// Attendee name.
    Name,
    /// Job title.
    Designation,
    /// Company name.
    Company,
    /// Event name.
    Event,
    /// Ticket type.
    Ticket,
    /// Ticket QR code.
    Qr,
    /// Attendee photo.
    Photo,
    /// Event logo.
    Logo,
}

impl TemplateField {
    /// Every field, in the paint order imported elements get.
    pub const ALL: [Self; 8] = [
        Self::Photo,
        Self::Logo,
        Self::Name,
        Self::Designation,
        Self::Company,
        Self::Event,
        Self::Ticket,
        Self::Qr,
    ];

    fn request(self) -> NewElement {
        match self {
            Self::Name => NewElement::of(ElementType::Text).with_preset("name"),
            Self::Designation => NewElement::of(ElementType::Text).with_preset("designation"),
            Self::Company => NewElement::of(ElementType::Text).with_preset("company"),
            Self::Event => NewElement::of(ElementType::Text).with_preset("event"),
            Self::Ticket => NewElement::of(ElementType::Text).with_preset("ticket"),
            Self::Qr => NewElement::of(ElementType::QrCode),
            Self::Photo => NewElement::of(ElementType::Image).with_preset("profile"),
            Self::Logo => NewElement::of(ElementType::Image)
                .with_preset("logo")
                .with_var("logo"),
        }
    }
}

/// Placement override in pixels. Missing values keep the field's default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelRect {
    /// Left edge.
    pub x: Option<f64>,
    /// Top edge.
    pub y: Option<f64>,
    /// Width.
    pub width: Option<f64>,
    /// Height.
    pub height: Option<f64>,
}

/// An importable badge template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BadgeTemplate {
    /// Template name.
    pub name: Option<String>,
    /// Include the attendee name.
    pub include_name: bool,
    /// Include the job title.
    pub include_designation: bool,
    /// Include the company.
    pub include_company: bool,
    /// Include the event name.
    pub include_event: bool,
    /// Include the ticket type.
    pub include_ticket: bool,
    /// Include the ticket QR code.
    pub include_qr: bool,
    /// Include the attendee photo.
    pub include_photo: bool,
    /// Include the event logo.
    pub include_logo: bool,
    /// Per-field placement overrides.
    pub positions: BTreeMap<TemplateField, PixelRect>,
}

impl BadgeTemplate {
    /// Whether a field is switched on.
    #[must_use]
    pub const fn includes(&self, field: TemplateField) -> bool {
        match field {
            TemplateField::Name => self.include_name,
            TemplateField::Designation => self.include_designation,
            TemplateField::Company => self.include_company,
            TemplateField::Event => self.include_event,
            TemplateField::Ticket => self.include_ticket,
            TemplateField::Qr => self.include_qr,
            TemplateField::Photo => self.include_photo,
            TemplateField::Logo => self.include_logo,
        }
    }

    /// Enabled fields in paint order.
    pub fn enabled_fields(&self) -> impl Iterator<Item = TemplateField> + '_ {
        TemplateField::ALL.into_iter().filter(|f| self.includes(*f))
    }
}

/// Geometry for a field: the default placement in pixels, overlaid with the
/// template's pixel overrides, canonicalized like stored legacy data.
fn placed_geometry(default: Geometry, rect: Option<&PixelRect>) -> Geometry {
    let Some(rect) = rect else {
        return default;
    };
    let px = Geometry {
        position_x: rect.x.unwrap_or_else(|| cm_to_px(default.position_x)),
        position_y: rect.y.unwrap_or_else(|| cm_to_px(default.position_y)),
        width: rect.width.unwrap_or_else(|| cm_to_px(default.width)),
        height: rect.height.unwrap_or_else(|| cm_to_px(default.height)),
    };
    let mut g = normalize_geometry(px);
    g.width = g.width.max(MIN_ELEMENT_SIZE_CM);
    g.height = g.height.max(MIN_ELEMENT_SIZE_CM);
    g
}

/// Build the elements a template describes, with fresh ids from `document`.
#[must_use]
pub fn build_elements(document: &mut PosterDocument, template: &BadgeTemplate) -> Vec<Element> {
    template
        .enabled_fields()
        .map(|field| {
            let mut element = create_element(document, &field.request());
            element.geometry = placed_geometry(element.geometry, template.positions.get(&field));
            let g = element.geometry;
            match &mut element.kind {
                ElementKind::QrCode(p) => p.size = cm_to_px(g.width),
                ElementKind::Image(p) if p.preset == Some(ImagePreset::Profile) => {
                    p.border_radius = g.width.min(g.height) / 2.0;
                }
                _ => {}
            }
            element
        })
        .collect()
}

/// Replace the document's foreground with the template's fields.
///
/// Returns the number of elements created.
pub fn import_template(document: &mut PosterDocument, template: &BadgeTemplate) -> usize {
    let elements = build_elements(document, template);
    let count = elements.len();
    document.replace_foreground(elements);
    tracing::info!(
        template = template.name.as_deref().unwrap_or("unnamed"),
        count,
        "Imported badge template"
    );
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PosterData;
    use crate::units::PX_PER_CM;

    fn document() -> PosterDocument {
        let mut doc = PosterDocument::new(PosterData::new(10.5, 14.8));
        doc.set_background_image(Some("https://cdn.example/own-art.png".to_string()));
        doc
    }

    #[test]
    fn test_import_replaces_foreground_and_keeps_background() {
        let mut doc = document();
        let mut old = create_element(&mut doc, &NewElement::of(ElementType::Video));
        old.geometry.width = 3.0;
        let old_id = doc.push(old).expect("push");
        let background = doc.background().cloned();

        let template = BadgeTemplate {
            include_name: true,
            include_qr: true,
            ..BadgeTemplate::default()
        };
        assert_eq!(import_template(&mut doc, &template), 2);

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.background().cloned(), background);
        assert!(doc.get(old_id).is_none());
        assert!(matches!(doc.elements()[1].kind, ElementKind::Text(_)));
        assert!(matches!(doc.elements()[2].kind, ElementKind::QrCode(_)));
    }

    #[test]
    fn test_pixel_overrides_converted() {
        let mut doc = document();
        let mut positions = BTreeMap::new();
        positions.insert(
            TemplateField::Name,
            PixelRect {
                x: Some(60.0),
                y: Some(120.0),
                width: Some(300.0),
                height: Some(50.0),
            },
        );
        let template = BadgeTemplate {
            include_name: true,
            positions,
            ..BadgeTemplate::default()
        };
        import_template(&mut doc, &template);
        let g = doc.elements()[1].geometry;
        assert!((g.position_x - 60.0 / PX_PER_CM).abs() < 1e-9);
        assert!((g.width - 300.0 / PX_PER_CM).abs() < 1e-9);
    }

    #[test]
    fn test_empty_template_clears_foreground() {
        let mut doc = document();
        let el = create_element(&mut doc, &NewElement::of(ElementType::Text));
        doc.push(el);
        assert_eq!(import_template(&mut doc, &BadgeTemplate::default()), 0);
        assert_eq!(doc.len(), 1);
        assert!(doc.elements()[0].is_background());
    }

    #[test]
    fn test_template_from_json() {
        let json = r#"{"name":"Conference","includeName":true,"includePhoto":true,
            "positions":{"photo":{"x":100,"y":40}}}"#;
        let template: BadgeTemplate = serde_json::from_str(json).expect("json");
        let fields: Vec<_> = template.enabled_fields().collect();
        assert_eq!(fields, vec![TemplateField::Photo, TemplateField::Name]);
        assert_eq!(template.positions[&TemplateField::Photo].x, Some(100.0));
    }
}
