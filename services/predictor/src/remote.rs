use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Latest state of a file in the remote store. Absence is `None` at the
/// call site, so a `RemoteFile` always carries a version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub version: String,
    pub content: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Binary,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("version conflict writing {path}")]
    Conflict { path: String },
    #[error("malformed remote payload: {0}")]
    Payload(String),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Versioned file store with compare-and-swap writes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `Ok(None)` when the file does not exist.
    async fn read_current(&self, path: &str) -> Result<Option<RemoteFile>, RemoteError>;

    /// Writes `content` only if the file is still at `version`. `None` means
    /// create; the write fails with `Conflict` if someone else got there first.
    async fn write_conditional(
        &self,
        path: &str,
        content: &[u8],
        kind: ContentKind,
        version: Option<&str>,
    ) -> Result<(), RemoteError>;
}

pub fn commit_message(path: &str, version: Option<&str>) -> String {
    let verb = if version.is_some() { "Update" } else { "Create" };
    format!("{verb} prediction file: {path}")
}

/// One accepted write, as seen by [`MemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub path: String,
    pub version: Option<String>,
    pub kind: ContentKind,
    pub message: String,
}

#[derive(Default)]
struct MemoryInner {
    files: HashMap<String, (u64, Vec<u8>)>,
    next_version: u64,
    writes: Vec<WriteCall>,
    failing: HashSet<String>,
}

/// In-memory remote store (for testing and local runs).
#[derive(Default)]
pub struct MemoryRemoteStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a file unconditionally, as another writer would.
    pub async fn put(&self, path: &str, content: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().await;
        inner.next_version += 1;
        let version = inner.next_version;
        inner.files.insert(path.to_string(), (version, content.into()));
    }

    pub async fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().await.files.get(path).map(|(_, c)| c.clone())
    }

    pub async fn writes(&self) -> Vec<WriteCall> {
        self.inner.lock().await.writes.clone()
    }

    /// Makes every subsequent write to `path` fail with a 500.
    pub async fn fail_writes_to(&self, path: &str) {
        self.inner.lock().await.failing.insert(path.to_string());
    }

    pub async fn clear_failures(&self) {
        self.inner.lock().await.failing.clear();
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn read_current(&self, path: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let inner = self.inner.lock().await;
        Ok(inner.files.get(path).map(|(version, content)| RemoteFile {
            path: path.to_string(),
            version: version.to_string(),
            content: content.clone(),
        }))
    }

    async fn write_conditional(
        &self,
        path: &str,
        content: &[u8],
        kind: ContentKind,
        version: Option<&str>,
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        if inner.failing.contains(path) {
            return Err(RemoteError::Status {
                status: 500,
                body: "injected failure".to_string(),
            });
        }

        let current = inner.files.get(path).map(|(v, _)| v.to_string());
        if current.as_deref() != version {
            return Err(RemoteError::Conflict { path: path.to_string() });
        }

        inner.next_version += 1;
        let next = inner.next_version;
        inner.files.insert(path.to_string(), (next, content.to_vec()));
        inner.writes.push(WriteCall {
            path: path.to_string(),
            version: version.map(str::to_string),
            kind,
            message: commit_message(path, version),
        });
        Ok(())
    }
}
