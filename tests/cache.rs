//! Resource cache behavior against a scripted API and a manual clock.

mod common;

use b12::cache::{CacheSettings, Clock, DEFAULT_TTL, FetchError, ManualClock, Pokedex};
use b12_task::Task;
use futures_util::FutureExt;
use common::{BASE_URL, MockFetcher, Thing, thing_body, thing_cache, thing_url};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn setup() -> (Arc<MockFetcher>, Arc<ManualClock>, tempfile::TempDir) {
    (
        Arc::new(MockFetcher::new()),
        Arc::new(ManualClock::starting_now()),
        tempfile::tempdir().unwrap(),
    )
}

// ============================================================================
// Coalescing
// ============================================================================

#[test]
fn concurrent_requests_share_one_fetch() {
    let (fetcher, clock, dir) = setup();
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);

    let handles: Vec<_> = (0..5).map(|_| cache.request(3)).collect();
    assert_eq!(fetcher.calls(), 1);
    assert!(cache.is_pending(&3));
    assert!(handles.iter().all(|h| !h.is_ready()));

    let waiters: Vec<Task<Option<Arc<Thing>>>> = handles.into_iter().map(Task::spawn).collect();

    let releaser = {
        let fetcher = Arc::clone(&fetcher);
        thread::spawn(move || fetcher.release(&thing_url(3), Ok(thing_body(3, "three").into_bytes())))
    };
    releaser.join().unwrap();

    let values: Vec<Arc<Thing>> = waiters
        .into_iter()
        .map(|t| t.wait().unwrap().expect("value"))
        .collect();
    assert_eq!(values[0].name, "three");
    for value in &values[1..] {
        assert!(Arc::ptr_eq(&values[0], value));
    }
    assert_eq!(fetcher.calls(), 1);
    assert!(!cache.is_pending(&3));
}

#[test]
fn requests_from_many_threads_share_one_fetch() {
    let (fetcher, clock, dir) = setup();
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);

    let workers: Vec<_> = (0..5)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.request(7).wait())
        })
        .collect();

    while fetcher.calls() == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    fetcher.release(&thing_url(7), Ok(thing_body(7, "seven").into_bytes()));

    let values: Vec<Arc<Thing>> = workers
        .into_iter()
        .map(|w| w.join().unwrap().expect("value"))
        .collect();
    for value in &values {
        assert!(Arc::ptr_eq(&values[0], value));
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn handles_can_be_awaited() {
    let (fetcher, clock, dir) = setup();
    fetcher.respond(&thing_url(2), &thing_body(2, "two"));
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);

    let handle = cache.request(2);
    assert!(handle.is_ready());
    assert_eq!(*handle.key(), 2);
    let value = handle.await.expect("value");
    assert_eq!(value.as_ref(), &Thing { id: 2, name: "two".into() });
}

#[test]
fn resolved_handle_can_be_polled_again() {
    let (fetcher, clock, dir) = setup();
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);

    let mut handle = cache.request(8);
    assert!((&mut handle).now_or_never().is_none());
    fetcher.release(&thing_url(8), Ok(thing_body(8, "eight").into_bytes()));

    let value = (&mut handle).now_or_never().expect("ready").expect("value");
    assert_eq!(value.name, "eight");
    assert_eq!((&mut handle).now_or_never(), Some(None));
}

// ============================================================================
// Freshness
// ============================================================================

#[test]
fn entries_expire_after_ttl() {
    let (fetcher, clock, dir) = setup();
    fetcher.respond(&thing_url(1), &thing_body(1, "one"));
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock.clone());

    let first = cache.request(1).wait().expect("value");
    assert_eq!(fetcher.calls(), 1);

    clock.advance(DEFAULT_TTL - Duration::from_secs(1));
    let second = cache.request(1).wait().expect("value");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fetcher.calls(), 1);

    // Past the TTL both the memory and disk copies are stale.
    clock.advance(Duration::from_secs(2));
    let third = cache.request(1).wait().expect("value");
    assert_eq!(fetcher.calls(), 2);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(cache.retrieved_at(&1), Some(clock.now()));
}

#[test]
fn touching_updates_last_touched() {
    let (fetcher, clock, dir) = setup();
    fetcher.respond(&thing_url(4), &thing_body(4, "four"));
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock.clone());

    assert_eq!(cache.last_touched(&4), None);
    cache.request(4).wait();
    let first = cache.last_touched(&4).expect("touched");

    clock.advance(Duration::from_secs(60));
    cache.request(4).wait();
    let second = cache.last_touched(&4).expect("touched");
    assert_eq!(second.duration_since(first).unwrap(), Duration::from_secs(60));
}

// ============================================================================
// Disk
// ============================================================================

#[test]
fn fresh_disk_copy_skips_fetch() {
    let (fetcher, clock, dir) = setup();
    let path = dir.path().join("testapi").join("thing").join("4.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, thing_body(4, "from disk")).unwrap();

    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);
    let handle = cache.request(4);
    assert!(handle.is_ready());
    assert_eq!(handle.wait().expect("value").name, "from disk");
    assert_eq!(fetcher.calls(), 0);

    let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(cache.retrieved_at(&4), Some(modified));
}

#[test]
fn stale_disk_copy_is_refetched() {
    let (fetcher, clock, dir) = setup();
    let path = dir.path().join("testapi").join("thing").join("6.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, thing_body(6, "old")).unwrap();
    fetcher.respond(&thing_url(6), &thing_body(6, "new"));

    clock.advance(DEFAULT_TTL + Duration::from_secs(1));
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);
    assert_eq!(cache.request(6).wait().expect("value").name, "new");
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), thing_body(6, "new"));
}

#[test]
fn fetched_bodies_persist_across_instances() {
    let (fetcher, clock, dir) = setup();
    fetcher.respond(&thing_url(9), &thing_body(9, "nine"));

    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock.clone());
    cache.request(9).wait().expect("value");
    assert!(dir.path().join("testapi/thing/9.json").exists());

    let restarted = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);
    assert_eq!(restarted.request(9).wait().expect("value").name, "nine");
    assert_eq!(fetcher.calls(), 1);
}

// ============================================================================
// Failures and keys
// ============================================================================

#[test]
fn failures_resolve_empty_and_retry() {
    let (fetcher, clock, dir) = setup();
    fetcher.respond_with(&thing_url(5), Err(FetchError::Status(404)));
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 10, clock);

    assert_eq!(cache.request(5).wait(), None);
    assert!(!cache.is_pending(&5));
    assert_eq!(cache.retrieved_at(&5), None);
    assert!(!dir.path().join("testapi/thing/5.json").exists());

    fetcher.respond(&thing_url(5), "not json");
    assert_eq!(cache.request(5).wait(), None);

    fetcher.respond(&thing_url(5), &thing_body(5, "five"));
    assert_eq!(cache.request(5).wait().expect("value").name, "five");
    assert_eq!(fetcher.calls(), 3);
}

#[test]
fn keys_beyond_direct_store_are_cached() {
    let (fetcher, clock, dir) = setup();
    fetcher.respond(&thing_url(500), &thing_body(500, "far"));
    let cache = thing_cache(Arc::clone(&fetcher), dir.path(), 2, clock);
    assert_eq!(cache.max_entries(), 2);

    let first = cache.request(500).wait().expect("value");
    let second = cache.request(500).wait().expect("value");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fetcher.calls(), 1);
    assert!(cache.last_touched(&500).is_some());
}

// ============================================================================
// Pokedex sizing
// ============================================================================

#[test]
fn pokedex_sized_from_species_count() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.respond(
        &format!("{BASE_URL}/pokemon-species?limit=1"),
        r#"{"count": 1025, "next": null, "results": []}"#,
    );
    let dir = tempfile::tempdir().unwrap();
    let settings = CacheSettings {
        root: dir.path().to_path_buf(),
        ..CacheSettings::default()
    };

    let pokedex = Pokedex::sized_from_remote(BASE_URL, fetcher, settings, Arc::new(ManualClock::starting_now()));
    assert_eq!(pokedex.pokemon.max_entries(), 1026);
    assert_eq!(pokedex.species.max_entries(), 1026);
}

#[test]
fn pokedex_keeps_configured_size_when_count_fails() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.respond_with(
        &format!("{BASE_URL}/pokemon-species?limit=1"),
        Err(FetchError::Transport("connection refused".into())),
    );
    let dir = tempfile::tempdir().unwrap();
    let settings = CacheSettings {
        root: dir.path().to_path_buf(),
        max_entries: 12,
        ..CacheSettings::default()
    };

    let pokedex = Pokedex::sized_from_remote(BASE_URL, fetcher, settings, Arc::new(ManualClock::starting_now()));
    assert_eq!(pokedex.pokemon.max_entries(), 12);
}
