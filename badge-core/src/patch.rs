//! Partial element updates and their derived-field rules.
//!
//! A patch carries optional values for any element field. Fields that do not
//! apply to the target's kind are ignored. After merging, derived fields are
//! recomputed:
//!
//! - QR codes: a width or height change recomputes the pixel `size` hint.
//! - Circular profile images keep their circle: a resize sets the corner
//!   radius to half the shorter side. Non-circular images keep their radius.
//! - Background: geometry is always forced back to the full layout.

use serde::{Deserialize, Serialize};

use crate::document::PosterData;
use crate::element::{
    Element, ElementKind, Geometry, ImagePreset, QrLevel, TextAlign, MIN_ELEMENT_SIZE_CM,
};
use crate::units::cm_to_px;

/// Result of applying a patch to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The element changed.
    Applied,
    /// The patch matched the current state.
    Unchanged,
    /// The patch would break an invariant and was dropped entirely.
    Rejected,
    /// No element with the requested id.
    NotFound,
}

impl PatchOutcome {
    /// Whether the element was modified.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Partial update for an element, in the same camelCase shape as the stored
/// element JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct ElementPatch {
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,

    pub content: Option<String>,
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub text_align: Option<TextAlign>,
    pub align_content: Option<String>,
    pub line_height: Option<f64>,
    /// Data binding; an empty string clears it.
    pub var: Option<String>,

    pub src: Option<String>,
    pub border_radius: Option<f64>,
    pub border_width: Option<f64>,
    pub border_color: Option<String>,
    pub lock_aspect_ratio: Option<bool>,

    pub autoplay: Option<bool>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub muted: Option<bool>,
    pub controls: Option<bool>,

    pub qr_value: Option<String>,
    pub bg_color: Option<String>,
    pub fg_color: Option<String>,
    pub level: Option<QrLevel>,
    pub include_margin: Option<bool>,

    pub label: Option<String>,
    pub options: Option<Vec<String>>,
}

fn set<T: Clone>(target: &mut T, value: Option<&T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

fn set_binding(target: &mut Option<String>, value: Option<&String>) {
    if let Some(v) = value {
        *target = if v.is_empty() { None } else { Some(v.clone()) };
    }
}

impl ElementPatch {
    /// Patch that only moves an element.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            position_x: Some(x),
            position_y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that only resizes an element.
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    fn touches_size(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    fn merged_geometry(&self, current: Geometry) -> Geometry {
        Geometry {
            position_x: self.position_x.unwrap_or(current.position_x),
            position_y: self.position_y.unwrap_or(current.position_y),
            width: self.width.unwrap_or(current.width),
            height: self.height.unwrap_or(current.height),
        }
    }

    /// Merge this patch into `element`, then recompute derived fields.
    pub fn apply(&self, element: &mut Element, poster: &PosterData) -> PatchOutcome {
        let before = element.clone();
        let old = element.geometry;

        if element.is_background() {
            if let (ElementKind::Background(props), Some(src)) = (&mut element.kind, &self.src) {
                props.src.clone_from(src);
            }
            element.geometry = poster.background_geometry();
            return Self::outcome(&before, element);
        }

        let mut geometry = self.merged_geometry(old);
        let valid = [
            geometry.position_x,
            geometry.position_y,
            geometry.width,
            geometry.height,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !valid || geometry.width < MIN_ELEMENT_SIZE_CM || geometry.height < MIN_ELEMENT_SIZE_CM {
            tracing::debug!(id = %element.id, ?geometry, "Rejecting update with invalid geometry");
            return PatchOutcome::Rejected;
        }

        match &mut element.kind {
            ElementKind::Background(_) => {}
            ElementKind::Text(p) => {
                set(&mut p.content, self.content.as_ref());
                set(&mut p.color, self.color.as_ref());
                set(&mut p.font_size, self.font_size.as_ref());
                set(&mut p.font_weight, self.font_weight.as_ref());
                set(&mut p.font_style, self.font_style.as_ref());
                set(&mut p.text_align, self.text_align.as_ref());
                set(&mut p.align_content, self.align_content.as_ref());
                set(&mut p.line_height, self.line_height.as_ref());
                set_binding(&mut p.var, self.var.as_ref());
            }
            ElementKind::Image(p) => {
                let circular_profile =
                    p.preset == Some(ImagePreset::Profile) && p.is_circular(old.width, old.height);

                // A locked circle stays square: one changed side drives both.
                if circular_profile && p.lock_aspect_ratio {
                    match (self.width, self.height) {
                        (Some(w), None) => geometry.height = w,
                        (None, Some(h)) => geometry.width = h,
                        _ => {}
                    }
                }

                if self.src.is_some() {
                    p.src.clone_from(&self.src);
                }
                set(&mut p.border_width, self.border_width.as_ref());
                set(&mut p.border_color, self.border_color.as_ref());
                set(&mut p.lock_aspect_ratio, self.lock_aspect_ratio.as_ref());
                set_binding(&mut p.var, self.var.as_ref());

                if let Some(radius) = self.border_radius {
                    p.border_radius = radius;
                } else if circular_profile && self.touches_size() {
                    p.border_radius = geometry.width.min(geometry.height) / 2.0;
                }
            }
            ElementKind::Video(p) => {
                if self.src.is_some() {
                    p.src.clone_from(&self.src);
                }
                set(&mut p.autoplay, self.autoplay.as_ref());
                set(&mut p.looping, self.looping.as_ref());
                set(&mut p.muted, self.muted.as_ref());
                set(&mut p.controls, self.controls.as_ref());
            }
            ElementKind::QrCode(p) => {
                set(&mut p.qr_value, self.qr_value.as_ref());
                set(&mut p.bg_color, self.bg_color.as_ref());
                set(&mut p.fg_color, self.fg_color.as_ref());
                set(&mut p.level, self.level.as_ref());
                set(&mut p.include_margin, self.include_margin.as_ref());
                if self.touches_size() {
                    p.size = cm_to_px(geometry.width);
                }
            }
            ElementKind::Select(p) => {
                set(&mut p.label, self.label.as_ref());
                set(&mut p.options, self.options.as_ref());
                set_binding(&mut p.var, self.var.as_ref());
            }
        }

        element.geometry = geometry;
        Self::outcome(&before, element)
    }

    fn outcome(before: &Element, after: &Element) -> PatchOutcome {
        if before == after {
            PatchOutcome::Unchanged
        } else {
            PatchOutcome::Applied
        }
    }
}
