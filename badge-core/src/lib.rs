//! # Saorsa Badge Core
//!
//! Core logic for the event badge editor: the poster document, centimetre
//! geometry, bounded undo history, record persistence mapping and the
//! live-data preview. Compiles to WASM for the browser editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               badge-core.wasm               │
//! ├─────────────────────────────────────────────┤
//! │  Document        │  Editor session          │
//! │  - Elements      │  - Mutations + history   │
//! │  - Background    │  - Selection, viewport   │
//! │  - Patches       │  - Preview state         │
//! ├─────────────────────────────────────────────┤
//! │  Persistence     │  Services (host-side)    │
//! │  - Legacy units  │  - Badge repository      │
//! │  - Asset URIs    │  - Sample data, probes   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All geometry is stored in centimetres; screen pixels only exist at the
//! viewport boundary (see [`units`]).

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod document;
pub mod editor;
pub mod element;
pub mod error;
pub mod factory;
pub mod history;
pub mod patch;
pub mod persistence;
pub mod preview;
pub mod services;
pub mod store;
pub mod template;
pub mod units;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::EditorConfig;
pub use document::{DocumentSnapshot, PosterData, PosterDocument};
pub use editor::{Editor, Notice, NoticeLevel, PreviewRequest, PreviewStep};
pub use element::{Element, ElementId, ElementKind, ElementType, Geometry};
pub use error::{EditorError, EditorResult};
pub use factory::{create_element, NewElement};
pub use history::History;
pub use patch::{ElementPatch, PatchOutcome};
pub use persistence::{BadgeFields, BadgeMeta, BadgeRecord, BadgeType};
pub use preview::{PreviewState, SampleRecord};
pub use services::{
    apply_to_many, ApplyOutcome, AssetProbe, AssetUpload, BadgeRepository, PixelSize,
    SampleSource, SharedDesign,
};
pub use store::{EditorStore, StoreError};
pub use template::{BadgeTemplate, TemplateField};
pub use units::{Viewport, ViewportSize, ZoomMode, PX_PER_CM};

/// Badge core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
