//! Element factory: new elements with type- and preset-specific defaults.
//!
//! New elements are centered on the canvas. Text presets:
//!
//! | preset        | font size | color     |
//! |---------------|-----------|-----------|
//! | `name`        | 28        | `#FFFFFF` |
//! | `designation` | 16        | `#FFFFFF` |
//! | `event`       | 20        | `#FFFFFF` |
//! | `ticket`      | 24        | `#FFFFFF` |
//!
//! Image presets: `profile` (4 × 4 cm, circular), `logo` (5.3 × 2.1 cm) and
//! the default 2.6 × 2.6 cm.

use serde::{Deserialize, Serialize};

use crate::document::PosterDocument;
use crate::element::{
    BackgroundProps, Element, ElementKind, ElementType, Geometry, ImagePreset, ImageProps,
    QrCodeProps, SelectProps, TextAlign, TextProps, VideoProps,
};
use crate::units::cm_to_px;

/// Request for a new element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewElement {
    /// Kind of element to create.
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Preset name, e.g. `name` for text or `profile` for images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Initial text or label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Data binding substituted in preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
}

impl NewElement {
    /// Request an element of the given type with no preset.
    #[must_use]
    pub fn of(element_type: ElementType) -> Self {
        Self {
            element_type,
            preset: None,
            label: None,
            var: None,
        }
    }

    /// Set the preset.
    #[must_use]
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the data binding.
    #[must_use]
    pub fn with_var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }
}

struct TextPreset {
    width: f64,
    height: f64,
    font_size: f64,
    color: &'static str,
    font_weight: &'static str,
    placeholder: &'static str,
    var: Option<&'static str>,
}

fn text_preset(preset: Option<&str>) -> TextPreset {
    let (width, height, font_size, font_weight, placeholder, var) = match preset {
        Some("name") => (8.0, 1.4, 28.0, "bold", "Attendee Name", Some("name")),
        Some("designation") => (7.0, 1.0, 16.0, "normal", "Designation", Some("designation")),
        Some("event") => (8.0, 1.2, 20.0, "bold", "Event Name", Some("event")),
        Some("ticket") => (6.0, 1.2, 24.0, "bold", "Ticket Type", Some("ticket")),
        Some("company") => (7.0, 1.0, 16.0, "normal", "Company", Some("company")),
        _ => {
            return TextPreset {
                width: 6.0,
                height: 1.0,
                font_size: 16.0,
                color: "#000000",
                font_weight: "normal",
                placeholder: "Text",
                var: None,
            }
        }
    };
    TextPreset {
        width,
        height,
        font_size,
        color: "#FFFFFF",
        font_weight,
        placeholder,
        var,
    }
}

fn image_preset(preset: Option<&str>) -> (ImagePreset, f64, f64) {
    match preset {
        Some("profile") => (ImagePreset::Profile, 4.0, 4.0),
        Some("logo") => (ImagePreset::Logo, 5.3, 2.1),
        _ => (ImagePreset::Default, 2.6, 2.6),
    }
}

/// Build the payload and size for a request, before an id is assigned.
fn kind_and_size(request: &NewElement, document: &PosterDocument) -> (ElementKind, f64, f64) {
    let preset = request.preset.as_deref();
    let var = request.var.clone();
    match request.element_type {
        ElementType::Background => (
            ElementKind::Background(BackgroundProps {
                src: document.poster().background_image.clone().unwrap_or_default(),
            }),
            document.layout_width(),
            document.layout_height(),
        ),
        ElementType::Text => {
            let p = text_preset(preset);
            let props = TextProps {
                content: request
                    .label
                    .clone()
                    .unwrap_or_else(|| p.placeholder.to_string()),
                color: p.color.to_string(),
                font_size: p.font_size,
                font_weight: p.font_weight.to_string(),
                text_align: TextAlign::Center,
                var: var.or_else(|| p.var.map(str::to_string)),
                ..TextProps::default()
            };
            (ElementKind::Text(props), p.width, p.height)
        }
        ElementType::Image => {
            let (chosen, width, height) = image_preset(preset);
            let profile = chosen == ImagePreset::Profile;
            let props = ImageProps {
                border_radius: if profile { width.min(height) / 2.0 } else { 0.0 },
                lock_aspect_ratio: profile,
                preset: Some(chosen),
                var: var.or_else(|| profile.then(|| "profilePicture".to_string())),
                ..ImageProps::default()
            };
            (ElementKind::Image(props), width, height)
        }
        ElementType::Video => (ElementKind::Video(VideoProps::default()), 6.0, 3.4),
        ElementType::QrCode => {
            let size = 3.0;
            let props = QrCodeProps {
                qr_value: request.label.clone().unwrap_or_default(),
                size: cm_to_px(size),
                ..QrCodeProps::default()
            };
            (ElementKind::QrCode(props), size, size)
        }
        ElementType::Select => {
            let props = SelectProps {
                label: request.label.clone().unwrap_or_else(|| "Select field".to_string()),
                var,
                options: Vec::new(),
            };
            (ElementKind::Select(props), 6.0, 1.0)
        }
    }
}

/// Create a new element centered on the document's canvas.
///
/// The element gets a fresh id from the document but is not inserted.
/// Background requests produce a full-canvas element at the origin.
pub fn create_element(document: &mut PosterDocument, request: &NewElement) -> Element {
    let (kind, width, height) = kind_and_size(request, document);
    let geometry = if matches!(kind, ElementKind::Background(_)) {
        document.poster().background_geometry()
    } else {
        Geometry {
            position_x: document.layout_width() / 2.0 - width / 2.0,
            position_y: document.layout_height() / 2.0 - height / 2.0,
            width,
            height,
        }
    };
    let id = document.next_element_id();
    tracing::debug!(%id, element_type = ?request.element_type, preset = ?request.preset, "Created element");
    Element::new(id, kind, geometry)
}
