//! External collaborators consumed by the views.
//!
//! Views receive these as trait objects at construction, so tests swap in the
//! in-memory fakes from `memory` and the binary wires Redis, S3 and the
//! in-process handle registry.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::payload::{NormalizedBinary, OpaquePayload};

#[cfg(test)]
pub mod memory;
pub mod redis_kv;
pub mod registry;
pub mod s3_files;

pub use redis_kv::RedisKvStore;
pub use registry::HandleRegistry;
pub use s3_files::S3FileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store error: {0}")]
    Kv(#[from] redis::RedisError),

    #[error("file store error for '{path}': {message}")]
    File { path: String, message: String },
}

/// Serialized records addressed by string keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns every `(key, value)` whose key matches the glob `pattern`.
    async fn list(&self, pattern: &str) -> Result<Vec<(String, String)>>;
}

/// Uploaded files addressed by path.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<OpaquePayload>>;
}

/// Revocable references to binary content, resolvable by a rendering surface.
pub trait ResourceRegistry: Send + Sync {
    fn create(&self, binary: NormalizedBinary) -> Result<DisplayHandle>;

    /// Idempotent: revoking an already revoked handle is not an error.
    fn revoke(&self, handle: &DisplayHandle) -> Result<()>;

    fn resolve(&self, handle: &DisplayHandle) -> Option<NormalizedBinary>;
}

/// Opaque handle to registered binary content. Rendered as `blob:<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayHandle(Uuid);

impl DisplayHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Path under which the HTTP layer serves this handle's bytes.
    pub fn url(&self) -> String {
        format!("/api/v1/blobs/{}", self.0)
    }
}

impl Default for DisplayHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

impl Serialize for DisplayHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.url())
    }
}

/// Result of asking the auth provider about a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthStatus {
    pub is_loading: bool,
    pub is_authenticated: bool,
}

pub trait AuthProvider: Send + Sync {
    fn status(&self, bearer_token: Option<&str>) -> AuthStatus;
}

/// Accepts callers presenting one fixed bearer token.
pub struct StaticTokenAuth {
    token: String,
}

impl StaticTokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl AuthProvider for StaticTokenAuth {
    fn status(&self, bearer_token: Option<&str>) -> AuthStatus {
        AuthStatus {
            is_loading: false,
            is_authenticated: !self.token.is_empty() && bearer_token == Some(self.token.as_str()),
        }
    }
}
