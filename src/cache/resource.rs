//! Keyed cache over a remote API resource.
//!
//! Small integer ids live in a pre-sized vector; everything else goes to an
//! auxiliary map. One mutex guards both, and it is never held across a fetch
//! or a disk read. Concurrent requests for the same key share one pending
//! future instead of starting a second fetch.

use super::clock::Clock;
use super::fetch::{FetchResult, Fetcher};
use super::store::DiskStore;
use crate::metrics;
use b12_task::{Awaitable, BridgeError, Completion, Task};
use futures_util::future::{FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, trace, warn};

/// One week.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Identifier of a cached resource.
pub trait CacheKey: Clone + Eq + Hash + fmt::Display + Send + Sync + Unpin + 'static {
    /// Slot in the direct-indexed store, for integer ids.
    fn index(&self) -> Option<usize>;
}

macro_rules! integer_key {
    ($($t:ty),*) => {
        $(
            impl CacheKey for $t {
                fn index(&self) -> Option<usize> {
                    usize::try_from(*self).ok()
                }
            }
        )*
    };
}

integer_key!(u16, u32, u64, usize);

impl CacheKey for String {
    fn index(&self) -> Option<usize> {
        None
    }
}

/// Where a resource lives remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Directory name under the cache root, e.g. `pokeapi`.
    pub api: String,
    pub base_url: String,
    /// e.g. `pokemon`.
    pub resource: String,
}

impl Endpoint {
    pub fn new(api: impl Into<String>, base_url: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            base_url: base_url.into(),
            resource: resource.into(),
        }
    }

    pub fn url(&self, id: &dyn fmt::Display) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), self.resource, id)
    }

    /// List endpoint carrying the total `count`.
    pub fn list_url(&self) -> String {
        format!("{}/{}?limit=1", self.base_url.trim_end_matches('/'), self.resource)
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub root: PathBuf,
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("cache"),
            ttl: DEFAULT_TTL,
            max_entries: 0,
        }
    }
}

type Pending<V> = Shared<Awaitable<Option<Arc<V>>>>;

struct Entry<V> {
    value: Option<Arc<V>>,
    pending: Option<Pending<V>>,
    last_touched: Option<SystemTime>,
    retrieved_at: Option<SystemTime>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            value: None,
            pending: None,
            last_touched: None,
            retrieved_at: None,
        }
    }
}

impl<V> Entry<V> {
    fn fresh_value(&self, now: SystemTime, ttl: Duration) -> Option<Arc<V>> {
        let value = self.value.as_ref()?;
        let retrieved = self.retrieved_at?;
        let age = now.duration_since(retrieved).unwrap_or(Duration::ZERO);
        (age < ttl).then(|| Arc::clone(value))
    }
}

struct Entries<K, V> {
    direct: Vec<Entry<V>>,
    aux: HashMap<K, Entry<V>>,
}

impl<K: CacheKey, V> Entries<K, V> {
    fn with_capacity(max_entries: usize) -> Self {
        Self {
            direct: (0..max_entries).map(|_| Entry::default()).collect(),
            aux: HashMap::new(),
        }
    }

    fn get(&self, key: &K) -> Option<&Entry<V>> {
        match key.index() {
            Some(i) if i < self.direct.len() => self.direct.get(i),
            _ => self.aux.get(key),
        }
    }

    fn get_mut(&mut self, key: &K) -> &mut Entry<V> {
        match key.index() {
            Some(i) if i < self.direct.len() => &mut self.direct[i],
            _ => self.aux.entry(key.clone()).or_default(),
        }
    }
}

struct Inner<K, V> {
    endpoint: Endpoint,
    fetcher: Arc<dyn Fetcher>,
    store: DiskStore,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: Mutex<Entries<K, V>>,
}

/// Deduplicating, TTL-bounded, disk-backed cache of one remote resource.
pub struct ResourceCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for ResourceCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum Lookup<V> {
    Hit(Arc<V>),
    Wait(Pending<V>),
    Miss,
}

impl<K, V> ResourceCache<K, V>
where
    K: CacheKey,
    V: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(endpoint: Endpoint, fetcher: Arc<dyn Fetcher>, settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let entries = Entries::with_capacity(settings.max_entries);
        Self {
            inner: Arc::new(Inner {
                endpoint,
                fetcher,
                store: DiskStore::new(settings.root),
                clock,
                ttl: settings.ttl,
                entries: Mutex::new(entries),
            }),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Size of the direct-indexed store.
    pub fn max_entries(&self) -> usize {
        self.inner.entries.lock().direct.len()
    }

    /// Start resolving `key`.
    ///
    /// Never fails: a fetch or decode failure resolves to `None`, caches
    /// nothing, and the next request for the key fetches again.
    pub fn request(&self, key: K) -> ResourceHandle<K, V> {
        let inner = &self.inner;
        let resource = inner.endpoint.resource.as_str();
        let now = inner.clock.now();

        match inner.lookup(&key, now) {
            Lookup::Hit(value) => {
                metrics::record_cache_request(resource, "memory");
                return self.handle(key, HandleState::Ready(Some(Some(value))));
            }
            Lookup::Wait(pending) => {
                metrics::record_cache_request(resource, "coalesced");
                debug!(resource, %key, "Joining in-flight fetch");
                return self.handle(key, HandleState::Pending(pending));
            }
            Lookup::Miss => {}
        }

        let path = inner.path(&key);
        if let Some((bytes, modified)) = inner.store.read_fresh(&path, now, inner.ttl) {
            match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => {
                    let value = Arc::new(value);
                    let mut entries = inner.entries.lock();
                    let entry = entries.get_mut(&key);
                    entry.value = Some(Arc::clone(&value));
                    entry.retrieved_at = Some(modified);
                    drop(entries);
                    trace!(resource, %key, path = %path.display(), "Loaded from disk");
                    metrics::record_cache_request(resource, "disk");
                    return self.handle(key, HandleState::Ready(Some(Some(value))));
                }
                Err(e) => {
                    warn!(resource, %key, path = %path.display(), error = %e, "Unreadable disk copy, refetching");
                }
            }
        }

        // Another request may have started a fetch while the lock was released.
        let (awaitable, publish) = Awaitable::pair();
        let pending = {
            let mut entries = inner.entries.lock();
            let entry = entries.get_mut(&key);
            if let Some(value) = entry.fresh_value(now, inner.ttl) {
                drop(entries);
                metrics::record_cache_request(resource, "memory");
                return self.handle(key, HandleState::Ready(Some(Some(value))));
            }
            if let Some(pending) = &entry.pending {
                let pending = pending.clone();
                drop(entries);
                metrics::record_cache_request(resource, "coalesced");
                return self.handle(key, HandleState::Pending(pending));
            }
            let pending = awaitable.shared();
            entry.pending = Some(pending.clone());
            pending
        };

        metrics::record_cache_request(resource, "fetch");
        let url = inner.endpoint.url(&key);
        debug!(resource, %key, %url, "Fetching");

        let settle = Arc::clone(inner);
        let settle_key = key.clone();
        let done = Completion::from_fn(move |outcome: Result<FetchResult, BridgeError>| {
            let value = settle.settle(&settle_key, outcome);
            publish.complete(value);
        });
        inner.fetcher.fetch(url, done);

        self.handle(key, HandleState::Pending(pending))
    }

    /// Time `key` was last requested or read through a handle.
    pub fn last_touched(&self, key: &K) -> Option<SystemTime> {
        self.inner.entries.lock().get(key).and_then(|e| e.last_touched)
    }

    pub fn retrieved_at(&self, key: &K) -> Option<SystemTime> {
        self.inner.entries.lock().get(key).and_then(|e| e.retrieved_at)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.inner
            .entries
            .lock()
            .get(key)
            .is_some_and(|e| e.pending.is_some())
    }

    fn handle(&self, key: K, state: HandleState<V>) -> ResourceHandle<K, V> {
        ResourceHandle {
            inner: Arc::clone(&self.inner),
            key,
            state,
        }
    }
}

impl<K, V> Inner<K, V>
where
    K: CacheKey,
    V: DeserializeOwned + Send + Sync + 'static,
{
    fn path(&self, key: &K) -> PathBuf {
        self.store.path(&self.endpoint.api, &self.endpoint.resource, key)
    }

    fn lookup(&self, key: &K, now: SystemTime) -> Lookup<V> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key);
        entry.last_touched = Some(now);
        if let Some(value) = entry.fresh_value(now, self.ttl) {
            return Lookup::Hit(value);
        }
        match &entry.pending {
            Some(pending) => Lookup::Wait(pending.clone()),
            None => Lookup::Miss,
        }
    }

    fn touch(&self, key: &K) {
        let now = self.clock.now();
        self.entries.lock().get_mut(key).last_touched = Some(now);
    }

    fn settle(&self, key: &K, outcome: Result<FetchResult, BridgeError>) -> Option<Arc<V>> {
        let resource = self.endpoint.resource.as_str();
        let decoded = match outcome {
            Ok(Ok(bytes)) => match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => {
                    let path = self.path(key);
                    if let Err(e) = self.store.write(&path, &bytes) {
                        error!(resource, %key, path = %path.display(), error = %e, "Failed to persist resource");
                    }
                    Some(Arc::new(value))
                }
                Err(e) => {
                    warn!(resource, %key, error = %e, "Failed to decode fetched resource");
                    None
                }
            },
            Ok(Err(e)) => {
                warn!(resource, %key, error = %e, "Fetch failed");
                None
            }
            Err(e) => {
                warn!(resource, %key, error = %e, "Fetch abandoned by fetcher");
                None
            }
        };
        if decoded.is_none() {
            metrics::record_cache_fetch_failure(resource);
        }

        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key);
        entry.pending = None;
        if let Some(value) = &decoded {
            entry.value = Some(Arc::clone(value));
            entry.retrieved_at = Some(now);
        }
        decoded
    }
}

enum HandleState<V> {
    Ready(Option<Option<Arc<V>>>),
    Pending(Pending<V>),
}

/// Eventual value of one [`ResourceCache::request`].
///
/// Resolving the handle touches the entry.
pub struct ResourceHandle<K, V> {
    inner: Arc<Inner<K, V>>,
    key: K,
    state: HandleState<V>,
}

impl<K, V> ResourceHandle<K, V>
where
    K: CacheKey,
    V: DeserializeOwned + Send + Sync + 'static,
{
    /// Whether awaiting would complete without suspending.
    pub fn is_ready(&self) -> bool {
        match &self.state {
            HandleState::Ready(_) => true,
            HandleState::Pending(pending) => pending.peek().is_some(),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Block the calling thread until the value resolves.
    pub fn wait(self) -> Option<Arc<V>> {
        Task::spawn(self).wait().ok().flatten()
    }
}

impl<K, V> Future for ResourceHandle<K, V>
where
    K: CacheKey,
    V: DeserializeOwned + Send + Sync + 'static,
{
    type Output = Option<Arc<V>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let value = match &mut this.state {
            HandleState::Ready(value) => value.take().flatten(),
            HandleState::Pending(pending) => match pending.poll_unpin(cx) {
                Poll::Ready(result) => result.unwrap_or(None),
                Poll::Pending => return Poll::Pending,
            },
        };
        // A resolved `Shared` must not be polled again.
        this.state = HandleState::Ready(None);
        this.inner.touch(&this.key);
        Poll::Ready(value)
    }
}

impl<K: fmt::Debug, V> fmt::Debug for ResourceHandle<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            HandleState::Ready(_) => "ready",
            HandleState::Pending(_) => "pending",
        };
        f.debug_struct("ResourceHandle")
            .field("resource", &self.inner.endpoint.resource)
            .field("key", &self.key)
            .field("state", &state)
            .finish()
    }
}

impl<K, V> fmt::Debug for ResourceCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("endpoint", &self.inner.endpoint)
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}
