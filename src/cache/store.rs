//! Durable copies of fetched resources.
//!
//! One JSON file per resource at `{root}/{api}/{resource}/{id}.json`. The
//! file's modification time is its retrieval time.
//!
//! Reads and writes are blocking. On a multi-threaded tokio worker they run
//! under `block_in_place` so the worker's other tasks move elsewhere.

use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::trace;

/// Run blocking file I/O, handing the worker back to tokio when called
/// from a multi-threaded runtime.
fn blocking_io<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(f),
        _ => f(),
    }
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, api: &str, resource: &str, id: &dyn Display) -> PathBuf {
        self.root.join(api).join(resource).join(format!("{id}.json"))
    }

    /// Contents and modification time of `path`, if it exists and is
    /// younger than `ttl` at `now`.
    pub fn read_fresh(&self, path: &Path, now: SystemTime, ttl: Duration) -> Option<(Vec<u8>, SystemTime)> {
        blocking_io(|| Self::read_fresh_sync(path, now, ttl))
    }

    fn read_fresh_sync(path: &Path, now: SystemTime, ttl: Duration) -> Option<(Vec<u8>, SystemTime)> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age >= ttl {
            trace!(path = %path.display(), age_secs = age.as_secs(), "Stale disk copy");
            return None;
        }
        let bytes = fs::read(path).ok()?;
        Some((bytes, modified))
    }

    pub fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        blocking_io(|| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let store = DiskStore::new("/var/cache/b12");
        assert_eq!(
            store.path("pokeapi", "pokemon", &25),
            PathBuf::from("/var/cache/b12/pokeapi/pokemon/25.json")
        );
    }

    #[test]
    fn fresh_then_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let path = store.path("api", "thing", &1);
        store.write(&path, b"{}").unwrap();

        let now = SystemTime::now();
        let ttl = Duration::from_secs(60);
        assert_eq!(store.read_fresh(&path, now, ttl).map(|(b, _)| b), Some(b"{}".to_vec()));
        assert!(store.read_fresh(&path, now + Duration::from_secs(61), ttl).is_none());
        assert!(store.read_fresh(&store.path("api", "thing", &2), now, ttl).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reads_and_writes_on_runtime_workers() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let path = store.path("api", "thing", &3);
        store.write(&path, b"[]").unwrap();

        let read = store.read_fresh(&path, SystemTime::now(), Duration::from_secs(60));
        assert_eq!(read.map(|(b, _)| b), Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn reads_on_current_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let path = store.path("api", "thing", &4);
        store.write(&path, b"{}").unwrap();
        assert!(store.read_fresh(&path, SystemTime::now(), Duration::from_secs(60)).is_some());
    }
}
