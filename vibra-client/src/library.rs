//! Library Store
//!
//! Shared, cloneable collection of generated tracks plus the player's current
//! track and play flag. Clones share the same state. Every mutation takes the
//! write lock once, so observers never see a half-applied update.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use vibra_common::Track;

use crate::error::{ClientError, Result};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryState {
    tracks: Vec<Track>,
    #[serde(default)]
    current_track: Option<Track>,
    #[serde(skip)]
    is_playing: bool,
}

/// Shared track library
#[derive(Debug, Clone, Default)]
pub struct LibraryStore {
    inner: Arc<RwLock<LibraryState>>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a track at the front (newest first)
    pub async fn add(&self, track: Track) {
        let mut state = self.inner.write().await;
        debug!(id = %track.id, title = %track.title, "Library add");
        state.tracks.insert(0, track);
    }

    /// Remove every track with `id`; clears the current track if it matches.
    ///
    /// Returns the number of tracks removed.
    pub async fn remove(&self, id: &str) -> usize {
        let mut state = self.inner.write().await;
        let before = state.tracks.len();
        state.tracks.retain(|t| t.id != id);
        if state.current_track.as_ref().is_some_and(|t| t.id == id) {
            state.current_track = None;
        }
        before - state.tracks.len()
    }

    /// Replace the whole collection
    pub async fn replace_all(&self, tracks: Vec<Track>) {
        self.inner.write().await.tracks = tracks;
    }

    /// Select a track for playback; always sets the play flag
    pub async fn set_current_track(&self, track: Option<Track>) {
        let mut state = self.inner.write().await;
        state.current_track = track;
        state.is_playing = true;
    }

    pub async fn set_playing(&self, playing: bool) {
        self.inner.write().await.is_playing = playing;
    }

    /// Snapshot of the tracks, newest first
    pub async fn tracks(&self) -> Vec<Track> {
        self.inner.read().await.tracks.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Track> {
        self.inner.read().await.tracks.iter().find(|t| t.id == id).cloned()
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.inner.read().await.current_track.clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.inner.read().await.is_playing
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tracks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tracks.is_empty()
    }

    /// Load a library saved with [`LibraryStore::save_json`]; a missing file
    /// yields an empty library
    pub async fn load_json(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(ClientError::Library(format!("read {}: {}", path.display(), e)))
            }
        };

        let state: LibraryState = serde_json::from_str(&content)
            .map_err(|e| ClientError::Library(format!("parse {}: {}", path.display(), e)))?;
        debug!(tracks = state.tracks.len(), path = %path.display(), "Library loaded");

        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
        })
    }

    /// Write the library as JSON (the play flag is not saved)
    pub async fn save_json(&self, path: &Path) -> Result<()> {
        let json = {
            let state = self.inner.read().await;
            serde_json::to_vec_pretty(&*state)
                .map_err(|e| ClientError::Library(format!("serialize: {}", e)))?
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Library(format!("create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ClientError::Library(format!("write {}: {}", path.display(), e)))
    }
}
