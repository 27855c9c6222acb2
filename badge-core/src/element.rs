//! Badge elements - the positioned items on the canvas.
//!
//! Elements serialize flat, in the camelCase shape stored in a badge's
//! `builderData`:
//!
//! ```json
//! {"id": 7, "type": "text", "positionX": 1.5, "positionY": 2.0,
//!  "width": 8.0, "height": 1.2, "content": "Jane Doe", "fontSize": 28}
//! ```

use serde::{Deserialize, Serialize};

/// Smallest width or height, in centimetres, of any non-background element.
pub const MIN_ELEMENT_SIZE_CM: f64 = 0.1;

/// Identifier for an element, issued from a per-document monotonic counter.
///
/// Ids are never reused after deletion, so two snapshots never hold different
/// elements under the same id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "RawElementId")]
pub struct ElementId(u64);

impl ElementId {
    /// Wrap a raw id value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id forms found in stored builder data: integers, timestamps stored as
/// floats, and numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawElementId {
    Int(u64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawElementId> for ElementId {
    type Error = String;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn try_from(raw: RawElementId) -> Result<Self, Self::Error> {
        match raw {
            RawElementId::Int(v) => Ok(Self(v)),
            RawElementId::Float(v) if v.is_finite() && v >= 0.0 => Ok(Self(v.trunc() as u64)),
            RawElementId::Float(v) => Err(format!("invalid element id {v}")),
            RawElementId::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(Self)
                .map_err(|e| format!("invalid element id {s:?}: {e}")),
        }
    }
}

/// Position and size of an element, in centimetres from the canvas top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Geometry {
    /// Left edge.
    pub position_x: f64,
    /// Top edge.
    pub position_y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Geometry {
    /// Geometry of the given size anchored at the origin.
    #[must_use]
    pub const fn sized(width: f64, height: f64) -> Self {
        Self {
            position_x: 0.0,
            position_y: 0.0,
            width,
            height,
        }
    }

    /// Check if a point (in centimetres) is within this box.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.position_x
            && x <= self.position_x + self.width
            && y >= self.position_y
            && y <= self.position_y + self.height
    }

    /// Divide every field by `factor`.
    #[must_use]
    pub fn scaled_down(self, factor: f64) -> Self {
        Self {
            position_x: self.position_x / factor,
            position_y: self.position_y / factor,
            width: self.width / factor,
            height: self.height / factor,
        }
    }
}

/// Element type without its payload, used to request new elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Full-canvas artwork.
    Background,
    /// Text block.
    Text,
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// QR code.
    #[serde(rename = "qrcode")]
    QrCode,
    /// Bound data-field placeholder.
    Select,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    #[serde(alias = "start")]
    Left,
    /// Centered.
    #[default]
    Center,
    /// Right aligned.
    #[serde(alias = "end")]
    Right,
    /// Justified.
    Justify,
}

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrLevel {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

/// Image presets with their own default size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePreset {
    /// Attendee photo, square and circular by default.
    Profile,
    /// Event or sponsor logo.
    Logo,
    /// Generic image.
    Default,
}

/// Background artwork.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundProps {
    /// Artwork URI, empty for a placeholder.
    pub src: String,
}

/// Text block properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextProps {
    /// Displayed text.
    pub content: String,
    /// CSS color.
    pub color: String,
    /// Font size in points.
    pub font_size: f64,
    /// CSS font weight.
    pub font_weight: String,
    /// CSS font style.
    pub font_style: String,
    /// Horizontal alignment.
    pub text_align: TextAlign,
    /// Vertical alignment (CSS `align-content`).
    pub align_content: String,
    /// Line height multiplier.
    pub line_height: f64,
    /// Data binding name substituted in preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            content: String::new(),
            color: "#000000".to_string(),
            font_size: 16.0,
            font_weight: "normal".to_string(),
            font_style: "normal".to_string(),
            text_align: TextAlign::Center,
            align_content: "center".to_string(),
            line_height: 1.2,
            var: None,
        }
    }
}

/// Image properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageProps {
    /// Image URI or relative asset path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Corner radius in centimetres.
    pub border_radius: f64,
    /// Border width in centimetres.
    pub border_width: f64,
    /// CSS border color.
    pub border_color: String,
    /// Keep aspect ratio when resizing.
    pub lock_aspect_ratio: bool,
    /// Preset the image was created from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<ImagePreset>,
    /// Data binding name substituted in preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            src: None,
            border_radius: 0.0,
            border_width: 0.0,
            border_color: "#000000".to_string(),
            lock_aspect_ratio: false,
            preset: None,
            var: None,
        }
    }
}

impl ImageProps {
    /// Whether the corner radius makes a box of the given size a circle.
    #[must_use]
    pub fn is_circular(&self, width: f64, height: f64) -> bool {
        let radius = width.min(height) / 2.0;
        radius > 0.0 && (self.border_radius - radius).abs() < 1e-6
    }
}

/// Video properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoProps {
    /// Video URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Start playing on load.
    pub autoplay: bool,
    /// Loop playback.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Start muted.
    pub muted: bool,
    /// Show player controls.
    pub controls: bool,
}

impl Default for VideoProps {
    fn default() -> Self {
        Self {
            src: None,
            autoplay: false,
            looping: false,
            muted: true,
            controls: true,
        }
    }
}

/// QR code properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrCodeProps {
    /// Encoded value.
    pub qr_value: String,
    /// CSS background color.
    pub bg_color: String,
    /// CSS foreground color.
    pub fg_color: String,
    /// Error correction level.
    pub level: QrLevel,
    /// Render the quiet zone.
    pub include_margin: bool,
    /// Render size in pixels, derived from the element width.
    pub size: f64,
}

impl Default for QrCodeProps {
    fn default() -> Self {
        Self {
            qr_value: String::new(),
            bg_color: "#FFFFFF".to_string(),
            fg_color: "#000000".to_string(),
            level: QrLevel::M,
            include_margin: false,
            size: 0.0,
        }
    }
}

/// Data-field placeholder properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectProps {
    /// Text shown in the editor.
    pub label: String,
    /// Data binding name substituted in preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
    /// Bindings the user can pick from.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Type-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementKind {
    /// Full-canvas artwork, geometry locked to the layout.
    #[serde(rename = "background")]
    Background(BackgroundProps),
    /// Text block.
    #[serde(rename = "text")]
    Text(TextProps),
    /// Still image.
    #[serde(rename = "image")]
    Image(ImageProps),
    /// Video clip.
    #[serde(rename = "video")]
    Video(VideoProps),
    /// QR code.
    #[serde(rename = "qrcode", alias = "qr", alias = "qrCode")]
    QrCode(QrCodeProps),
    /// Bound data-field placeholder.
    #[serde(rename = "select")]
    Select(SelectProps),
}

impl ElementKind {
    /// The payload-free type of this kind.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Background(_) => ElementType::Background,
            Self::Text(_) => ElementType::Text,
            Self::Image(_) => ElementType::Image,
            Self::Video(_) => ElementType::Video,
            Self::QrCode(_) => ElementType::QrCode,
            Self::Select(_) => ElementType::Select,
        }
    }
}

/// A badge element: stable id, geometry and typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Position and size.
    #[serde(flatten)]
    pub geometry: Geometry,
    /// Type-specific payload.
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Create an element.
    #[must_use]
    pub fn new(id: ElementId, kind: ElementKind, geometry: Geometry) -> Self {
        Self { id, geometry, kind }
    }

    /// Whether this is the background element.
    #[must_use]
    pub const fn is_background(&self) -> bool {
        matches!(self.kind, ElementKind::Background(_))
    }

    /// Data binding name, for element kinds that carry one.
    #[must_use]
    pub fn var_binding(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text(p) => p.var.as_deref(),
            ElementKind::Image(p) => p.var.as_deref(),
            ElementKind::Select(p) => p.var.as_deref(),
            _ => None,
        }
    }

    /// Check if a point (in centimetres) is within this element.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.geometry.contains_point(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_json_shape() {
        let element = Element::new(
            ElementId::from_raw(3),
            ElementKind::Text(TextProps {
                content: "Jane".to_string(),
                var: Some("name".to_string()),
                ..TextProps::default()
            }),
            Geometry {
                position_x: 1.0,
                position_y: 2.0,
                width: 8.0,
                height: 1.2,
            },
        );
        let value = serde_json::to_value(&element).expect("serialize");
        assert_eq!(value["type"], "text");
        assert_eq!(value["id"], 3);
        assert_eq!(value["positionX"], 1.0);
        assert_eq!(value["fontSize"], 16.0);
        assert_eq!(value["var"], "name");
    }

    #[test]
    fn test_legacy_element_with_missing_fields() {
        let json = r#"{"id":"1712000000000","type":"qr","positionX":10,"positionY":20,"width":100,"height":100,"zIndex":4}"#;
        let element: Element = serde_json::from_str(json).expect("deserialize");
        assert_eq!(element.id, ElementId::from_raw(1_712_000_000_000));
        assert!(matches!(element.kind, ElementKind::QrCode(_)));
        assert!((element.geometry.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_float_id_truncated() {
        let json = r#"{"id":42.7,"type":"background","src":"a.png"}"#;
        let element: Element = serde_json::from_str(json).expect("deserialize");
        assert_eq!(element.id.as_u64(), 42);
        assert!(element.is_background());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"id":1,"type":"hologram","positionX":0}"#;
        assert!(serde_json::from_str::<Element>(json).is_err());
    }

    #[test]
    fn test_video_loop_field_name() {
        let json = r#"{"id":2,"type":"video","loop":true,"width":4,"height":3}"#;
        let element: Element = serde_json::from_str(json).expect("deserialize");
        let ElementKind::Video(props) = &element.kind else {
            panic!("expected video");
        };
        assert!(props.looping);
        let back = serde_json::to_value(&element).expect("serialize");
        assert_eq!(back["loop"], true);
    }

    #[test]
    fn test_circular_detection() {
        let props = ImageProps {
            border_radius: 2.0,
            ..ImageProps::default()
        };
        assert!(props.is_circular(4.0, 4.0));
        assert!(!props.is_circular(6.0, 6.0));
        assert!(!ImageProps::default().is_circular(4.0, 4.0));
    }

    #[test]
    fn test_contains_point() {
        let g = Geometry {
            position_x: 1.0,
            position_y: 1.0,
            width: 2.0,
            height: 2.0,
        };
        assert!(g.contains_point(2.0, 2.0));
        assert!(!g.contains_point(0.5, 2.0));
    }
}
