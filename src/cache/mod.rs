//! Resource cache for externally fetched API data.
//!
//! Lookups go memory, then in-flight fetch, then disk, then network. The
//! public API never fails: an unavailable resource resolves to `None`.

pub mod clock;
pub mod fetch;
pub mod pokeapi;
pub mod resource;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fetch::{FetchError, FetchResult, Fetcher, HttpFetcher, fetch_count};
pub use pokeapi::{Pokedex, Pokemon, PokemonSpecies};
pub use resource::{CacheKey, CacheSettings, DEFAULT_TTL, Endpoint, ResourceCache, ResourceHandle};
pub use store::DiskStore;
