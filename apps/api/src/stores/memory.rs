//! In-memory fakes of the store traits, shared by the view and route tests.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{DisplayHandle, FileStore, HandleRegistry, KvStore, ResourceRegistry};
use crate::payload::{NormalizedBinary, OpaquePayload};

/// Matches `text` against a glob supporting `*` (any run) and `?` (one char).
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[derive(Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, String>>,
    fail: Mutex<bool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.values.lock().insert(key.to_string(), value.into());
    }

    pub fn fail_all(&self) {
        *self.fail.lock() = true;
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if *self.fail.lock() {
            return Err(anyhow!("kv unavailable"));
        }
        Ok(self.values.lock().get(key).cloned())
    }

    async fn list(&self, pattern: &str) -> Result<Vec<(String, String)>> {
        if *self.fail.lock() {
            return Err(anyhow!("kv unavailable"));
        }
        Ok(self
            .values
            .lock()
            .iter()
            .filter(|(k, _)| glob_match(pattern, k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

enum FileEntry {
    Present(OpaquePayload),
    Failing(String),
}

/// File store fake. Reads can be held at a gate until `release` is called,
/// which lets tests interleave a second load with one still in flight.
#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<String, FileEntry>>,
    reads: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, payload: OpaquePayload) {
        self.files
            .lock()
            .insert(path.to_string(), FileEntry::Present(payload));
    }

    pub fn insert_failing(&self, path: &str, message: &str) {
        self.files
            .lock()
            .insert(path.to_string(), FileEntry::Failing(message.to_string()));
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }

    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.notify_waiters();
        }
    }
}

#[async_trait]
impl FileStore for MemoryFiles {
    async fn read(&self, path: &str) -> Result<Option<OpaquePayload>> {
        self.reads.lock().push(path.to_string());
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.files.lock().get(path) {
            Some(FileEntry::Present(payload)) => Ok(Some(payload.clone())),
            Some(FileEntry::Failing(message)) => Err(anyhow!("{message}")),
            None => Ok(None),
        }
    }
}

/// Registry fake that records every create and revoke and can be told to
/// fail revocations.
#[derive(Default)]
pub struct RecordingRegistry {
    inner: HandleRegistry,
    created: Mutex<Vec<DisplayHandle>>,
    revoked: Mutex<Vec<DisplayHandle>>,
    fail_revoke: Mutex<bool>,
    fail_create: Mutex<bool>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<DisplayHandle> {
        self.created.lock().clone()
    }

    pub fn revoked(&self) -> Vec<DisplayHandle> {
        self.revoked.lock().clone()
    }

    pub fn revoke_count(&self, handle: &DisplayHandle) -> usize {
        self.revoked.lock().iter().filter(|h| *h == handle).count()
    }

    pub fn live_count(&self) -> usize {
        self.inner.live_count()
    }

    pub fn fail_revocations(&self) {
        *self.fail_revoke.lock() = true;
    }

    pub fn fail_creations(&self) {
        *self.fail_create.lock() = true;
    }
}

impl ResourceRegistry for RecordingRegistry {
    fn create(&self, binary: NormalizedBinary) -> Result<DisplayHandle> {
        if *self.fail_create.lock() {
            return Err(anyhow!("registry full"));
        }
        let handle = self.inner.create(binary)?;
        self.created.lock().push(handle);
        Ok(handle)
    }

    fn revoke(&self, handle: &DisplayHandle) -> Result<()> {
        self.revoked.lock().push(*handle);
        self.inner.revoke(handle)?;
        if *self.fail_revoke.lock() {
            return Err(anyhow!("revocation failed"));
        }
        Ok(())
    }

    fn resolve(&self, handle: &DisplayHandle) -> Option<NormalizedBinary> {
        self.inner.resolve(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("resume:*", "resume:1"));
        assert!(glob_match("resume:*", "resume:"));
        assert!(!glob_match("resume:*", "session:1"));
        assert!(glob_match("r?sume:*x", "resume:abcx"));
        assert!(!glob_match("resume:?", "resume:12"));
    }
}
