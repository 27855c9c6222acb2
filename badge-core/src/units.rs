//! Unit conversion and viewport scaling.
//!
//! The document stores every length in centimetres. Pixels only appear at the
//! render boundary, through [`cm_to_px`], and when normalizing legacy data,
//! through [`px_to_cm`]. Both go through the single [`PX_PER_CM`] constant.

use serde::{Deserialize, Serialize};

/// Pixels per centimetre at 96 DPI.
pub const PX_PER_CM: f64 = 96.0 / 2.54;

/// Smallest magnification the viewport allows.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest magnification the viewport allows.
pub const MAX_ZOOM: f64 = 2.0;

/// Number of discrete zoom steps exposed to the zoom control.
pub const ZOOM_STEPS: u8 = 20;

/// Scale values are truncated to this many decimal places.
const SCALE_DECIMALS: i32 = 5;

/// Convert centimetres to pixels.
#[must_use]
pub fn cm_to_px(cm: f64) -> f64 {
    cm * PX_PER_CM
}

/// Convert pixels to centimetres.
#[must_use]
pub fn px_to_cm(px: f64) -> f64 {
    px / PX_PER_CM
}

/// Truncate (not round) a scale factor to a fixed number of decimals.
#[must_use]
pub fn truncate_scale(scale: f64) -> f64 {
    let factor = 10_f64.powi(SCALE_DECIMALS);
    (scale * factor).trunc() / factor
}

/// How the poster is fitted into the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomMode {
    /// Whole poster visible.
    #[default]
    Fit,
    /// Viewport fully covered by the poster.
    Fill,
    /// Native size, one poster pixel per screen pixel.
    Original,
}

/// Screen-space size of the area the poster is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Width in screen pixels.
    pub width: f64,
    /// Height in screen pixels.
    pub height: f64,
}

/// Zoom and pan state of the editor viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Available drawing area.
    pub size: ViewportSize,
    /// Safety margin subtracted from each side of the drawing area.
    pub margin_px: f64,
    /// Current magnification.
    pub zoom: f64,
    /// Last zoom mode applied.
    pub mode: ZoomMode,
    /// Pan offset X in screen pixels.
    pub pan_x: f64,
    /// Pan offset Y in screen pixels.
    pub pan_y: f64,
}

impl Viewport {
    /// Create a viewport at 1.0× with no pan.
    #[must_use]
    pub fn new(width: f64, height: f64, margin_px: f64) -> Self {
        Self {
            size: ViewportSize { width, height },
            margin_px,
            zoom: 1.0,
            mode: ZoomMode::Original,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    /// Resize the drawing area without changing zoom.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.size = ViewportSize { width, height };
    }

    /// Apply a zoom mode for a poster of the given size in centimetres.
    ///
    /// Returns `false` (leaving the viewport untouched) when either the poster
    /// or the available area is degenerate, which would otherwise produce a
    /// NaN or infinite scale.
    pub fn set_zoom_mode(
        &mut self,
        mode: ZoomMode,
        poster_width_cm: f64,
        poster_height_cm: f64,
        dims: Option<ViewportSize>,
    ) -> bool {
        let size = dims.unwrap_or(self.size);
        let poster_w = cm_to_px(poster_width_cm);
        let poster_h = cm_to_px(poster_height_cm);
        let avail_w = size.width - 2.0 * self.margin_px;
        let avail_h = size.height - 2.0 * self.margin_px;

        if !(poster_w > 0.0 && poster_h > 0.0 && avail_w > 0.0 && avail_h > 0.0) {
            tracing::debug!(
                poster_w,
                poster_h,
                avail_w,
                avail_h,
                "Ignoring zoom mode change for degenerate dimensions"
            );
            return false;
        }
        self.size = size;

        let scale_x = avail_w / poster_w;
        let scale_y = avail_h / poster_h;
        let scale = match mode {
            ZoomMode::Fit => scale_x.min(scale_y),
            ZoomMode::Fill => scale_x.max(scale_y),
            ZoomMode::Original => 1.0,
        };

        self.zoom = truncate_scale(scale).clamp(MIN_ZOOM, MAX_ZOOM);
        self.mode = mode;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        true
    }

    /// Current zoom as a step of the zoom control (1..=20).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn zoom_step(&self) -> u8 {
        // zoom is clamped to [0.1, 2.0] so the rounded value fits in 1..=20
        ((self.zoom * 10.0).round() as u8).clamp(1, ZOOM_STEPS)
    }

    /// Set zoom from a zoom-control step, clamped to the valid range.
    pub fn set_zoom_step(&mut self, step: u8) {
        let step = step.clamp(1, ZOOM_STEPS);
        self.zoom = f64::from(step) / 10.0;
    }

    /// Pan the view by a screen-space offset.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Convert a length in centimetres to on-screen pixels at the current zoom.
    #[must_use]
    pub fn to_screen(&self, cm: f64) -> f64 {
        cm_to_px(cm) * self.zoom
    }

    /// Convert an on-screen pixel distance back to centimetres.
    #[must_use]
    pub fn to_document(&self, screen_px: f64) -> f64 {
        px_to_cm(screen_px / self.zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0, 40.0)
    }
}
