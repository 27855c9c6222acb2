//! Editor configuration.
//!
//! Defaults suit local development. Hosts override them from the environment
//! with [`EditorConfig::from_env`]:
//!
//! | Variable                 | Field               |
//! |--------------------------|---------------------|
//! | `BADGE_ASSET_BASE_URL`   | `asset_base_url`    |
//! | `BADGE_HISTORY_LIMIT`    | `history_limit`     |
//! | `BADGE_VIEWPORT_MARGIN`  | `viewport_margin_px`|
//! | `BADGE_PROBE_TIMEOUT_MS` | `probe_timeout_ms`  |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::{EditorError, EditorResult};

/// Default base for relative asset paths.
const DEFAULT_ASSET_BASE_URL: &str = "http://localhost:3000/uploads/";

/// Default layout width in centimetres (A6).
const DEFAULT_LAYOUT_WIDTH_CM: f64 = 10.5;

/// Default layout height in centimetres (A6).
const DEFAULT_LAYOUT_HEIGHT_CM: f64 = 14.8;

/// Settings shared by every editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base URL that relative asset paths are resolved against.
    pub asset_base_url: String,
    /// Maximum number of undo states kept.
    pub history_limit: usize,
    /// Safety margin, in screen pixels, kept around the poster when fitting.
    pub viewport_margin_px: f64,
    /// Upper bound on the background dimension probe.
    pub probe_timeout_ms: u64,
    /// Layout width used when a record has none and probing fails.
    pub default_layout_width_cm: f64,
    /// Layout height used when a record has none and probing fails.
    pub default_layout_height_cm: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            viewport_margin_px: 40.0,
            probe_timeout_ms: 5_000,
            default_layout_width_cm: DEFAULT_LAYOUT_WIDTH_CM,
            default_layout_height_cm: DEFAULT_LAYOUT_HEIGHT_CM,
        }
    }
}

impl EditorConfig {
    /// Build a configuration from defaults overlaid with environment variables.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            let value = raw.trim().parse().ok();
            if value.is_none() {
                tracing::warn!("Ignoring invalid {key}={raw:?}");
            }
            value
        }

        let mut config = Self::default();
        if let Some(base) = lookup("BADGE_ASSET_BASE_URL") {
            config.asset_base_url = base;
        }
        if let Some(limit) = parsed(&lookup, "BADGE_HISTORY_LIMIT") {
            config.history_limit = limit;
        }
        if let Some(margin) = parsed(&lookup, "BADGE_VIEWPORT_MARGIN") {
            config.viewport_margin_px = margin;
        }
        if let Some(timeout) = parsed(&lookup, "BADGE_PROBE_TIMEOUT_MS") {
            config.probe_timeout_ms = timeout;
        }
        config
    }

    /// Check the configuration for values the editor cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Config`] for a non-URL asset base, a zero
    /// history limit, or non-positive default layout dimensions.
    pub fn validate(&self) -> EditorResult<()> {
        url::Url::parse(&self.asset_base_url).map_err(|e| {
            EditorError::Config(format!("asset_base_url {:?}: {e}", self.asset_base_url))
        })?;
        if self.history_limit == 0 {
            return Err(EditorError::Config("history_limit must be at least 1".into()));
        }
        if !(self.default_layout_width_cm > 0.0 && self.default_layout_height_cm > 0.0) {
            return Err(EditorError::Config(
                "default layout dimensions must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
