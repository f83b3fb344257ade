//! File-backed key-value store

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Durable string-key → byte-payload map.
///
/// The on-disk format is a single JSON object mapping keys to
/// base64-encoded payloads. Values are opaque to the store; callers
/// decide what the bytes mean.
pub struct KvStore {
    path: PathBuf,
    state: Mutex<HashMap<String, Vec<u8>>>,
}

impl KvStore {
    /// Open the store at the given path, creating an empty file if absent.
    ///
    /// Initialization is idempotent: opening an existing store loads its
    /// contents, opening a missing one writes `{}` so later opens take
    /// the warm path.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading store file: {e}")))?;
            let encoded: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing store file: {e}")))?;
            let mut state = HashMap::with_capacity(encoded.len());
            for (key, value) in encoded {
                let bytes = BASE64
                    .decode(&value)
                    .map_err(|e| Error::Parse(format!("decoding value for key {key}: {e}")))?;
                state.insert(key, bytes);
            }
            info!(path = %path.display(), keys = state.len(), "opened store");
            state
        } else {
            info!(path = %path.display(), "store file not found, creating empty store");
            let state = HashMap::new();
            write_atomic(&path, &state).await?;
            state
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Fetch the payload stored under `key`, or `None` if absent.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state.get(key).cloned()
    }

    /// Insert or replace the payload under `key` and persist to disk.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(key.to_owned(), value);
        debug!(key, "stored value");
        write_atomic(&self.path, &state).await
    }

    /// Remove the payload under `key` and persist to disk.
    ///
    /// Returns `true` if a value was removed. Deleting an absent key is
    /// a no-op and does not rewrite the file.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let removed = state.remove(key).is_some();
        if removed {
            debug!(key, "deleted value");
            write_atomic(&self.path, &state).await?;
        }
        Ok(removed)
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Write the full map to disk atomically.
///
/// Writes to a temp file in the same directory, then renames it over the
/// target. Permissions are 0600 since the store holds OAuth tokens.
async fn write_atomic(path: &Path, state: &HashMap<String, Vec<u8>>) -> Result<()> {
    let encoded: HashMap<&String, String> = state
        .iter()
        .map(|(key, value)| (key, BASE64.encode(value)))
        .collect();
    let json = serde_json::to_string_pretty(&encoded)
        .map_err(|e| Error::Parse(format!("serializing store: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("store path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".store.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting store file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted store");
    Ok(())
}
