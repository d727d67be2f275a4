//! Scripted resource API.
//!
//! URLs with a canned response complete immediately on the requesting
//! thread. Anything else is parked until the test releases it.

use b12::cache::{CacheSettings, Clock, Endpoint, FetchResult, Fetcher, ResourceCache};
use b12_task::Completion;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Default)]
pub struct MockFetcher {
    canned: Mutex<HashMap<String, FetchResult>>,
    requested: Mutex<Vec<String>>,
    parked: Mutex<Vec<(String, Completion<FetchResult>)>>,
}

#[allow(dead_code)]
impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `body` from now on.
    pub fn respond(&self, url: &str, body: &str) {
        self.canned.lock().insert(url.to_string(), Ok(body.as_bytes().to_vec()));
    }

    pub fn respond_with(&self, url: &str, result: FetchResult) {
        self.canned.lock().insert(url.to_string(), result);
    }

    /// Total fetches requested.
    pub fn calls(&self) -> usize {
        self.requested.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.requested.lock().iter().filter(|u| *u == url).count()
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().len()
    }

    /// Complete every parked fetch of `url` with `result`.
    pub fn release(&self, url: &str, result: FetchResult) {
        let matching: Vec<_> = {
            let mut parked = self.parked.lock();
            let (matching, rest): (Vec<_>, Vec<_>) = parked.drain(..).partition(|(u, _)| u == url);
            *parked = rest;
            matching
        };
        for (_, done) in matching {
            done.complete(result.clone());
        }
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: String, done: Completion<FetchResult>) {
        self.requested.lock().push(url.clone());
        let canned = self.canned.lock().get(&url).cloned();
        match canned {
            Some(result) => done.complete(result),
            None => self.parked.lock().push((url, done)),
        }
    }
}

/// Minimal resource used by the cache tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thing {
    pub id: u32,
    pub name: String,
}

#[allow(dead_code)]
pub const THING_BASE: &str = "http://things.test";

/// Cache of `Thing`s served from `THING_BASE/thing/{id}` and stored under `root`.
#[allow(dead_code)]
pub fn thing_cache(
    fetcher: Arc<MockFetcher>,
    root: &Path,
    max_entries: usize,
    clock: Arc<dyn Clock>,
) -> ResourceCache<u32, Thing> {
    let settings = CacheSettings {
        root: root.to_path_buf(),
        max_entries,
        ..CacheSettings::default()
    };
    ResourceCache::new(Endpoint::new("testapi", THING_BASE, "thing"), fetcher, settings, clock)
}

#[allow(dead_code)]
pub fn thing_url(id: u32) -> String {
    format!("{THING_BASE}/thing/{id}")
}

#[allow(dead_code)]
pub fn thing_body(id: u32, name: &str) -> String {
    format!(r#"{{"id": {id}, "name": "{name}"}}"#)
}
