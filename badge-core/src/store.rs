//! Shared editor sessions.
//!
//! Provides a thread-safe [`EditorStore`] that hosts can share across request
//! handlers so every handler working on a badge sees the same [`Editor`].
//! Editors sit behind an async mutex because saves and preview fetches hold
//! them across `.await` points.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::editor::Editor;
use crate::services::{AssetProbe, BadgeRepository};
use crate::{EditorConfig, EditorError};

/// Handle to one shared editor session.
pub type SharedEditor = Arc<Mutex<Editor>>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No session is open for the record.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    /// The editor rejected the operation.
    #[error(transparent)]
    Editor(#[from] EditorError),
}

/// Thread-safe map from record id to open editor.
///
/// # Example
///
/// ```
/// use badge_core::store::EditorStore;
/// use badge_core::{Editor, EditorConfig};
///
/// let store = EditorStore::new(EditorConfig::default());
/// store.insert("badge-1", Editor::default());
/// assert_eq!(store.ids(), vec!["badge-1".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EditorStore {
    sessions: Arc<RwLock<HashMap<String, SharedEditor>>>,
    config: EditorConfig,
}

impl EditorStore {
    /// Create an empty store whose sessions use `config`.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Configuration new sessions are opened with.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Get the session for `id`, loading it from the repository if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Editor`] if the record cannot be fetched.
    pub async fn open(
        &self,
        repository: &dyn BadgeRepository,
        probe: Option<&dyn AssetProbe>,
        id: &str,
    ) -> Result<SharedEditor, StoreError> {
        if let Some(editor) = self.get(id) {
            return Ok(editor);
        }
        let editor = Editor::open(repository, probe, id, self.config.clone()).await?;

        // Another handler may have opened the same record while we loaded.
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let shared = sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(editor)))
            .clone();
        tracing::debug!(record = id, sessions = sessions.len(), "Opened editor session");
        Ok(shared)
    }

    /// Register an editor under `id`, replacing any existing session.
    pub fn insert(&self, id: &str, editor: Editor) -> SharedEditor {
        let shared = Arc::new(Mutex::new(editor));
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.insert(id.to_string(), Arc::clone(&shared));
        shared
    }

    /// Get a session if it is open.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SharedEditor> {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.get(id).cloned()
    }

    /// Close a session. Returns whether it was open.
    pub fn close(&self, id: &str) -> bool {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let removed = sessions.remove(id).is_some();
        if removed {
            tracing::debug!(record = id, "Closed editor session");
        }
        removed
    }

    /// Ids of all open sessions, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether no sessions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run a synchronous operation against a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionNotFound`] if no session is open for `id`,
    /// or the operation's own error.
    pub async fn with_editor<F, R>(&self, id: &str, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Editor) -> Result<R, EditorError>,
    {
        let shared = self
            .get(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        let mut editor = shared.lock().await;
        Ok(f(&mut editor)?)
    }
}
