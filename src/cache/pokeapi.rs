//! PokeAPI resources served through the cache.

use super::clock::Clock;
use super::fetch::{Fetcher, fetch_count};
use super::resource::{CacheSettings, Endpoint, ResourceCache};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const API_NAME: &str = "pokeapi";
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stat {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    /// Sprite URLs are deeply nested and mostly optional.
    #[serde(default)]
    pub sprites: serde_json::Value,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

impl Pokemon {
    /// Sprite URL at a `/`-separated path under `sprites`.
    pub fn sprite(&self, path: &str) -> Option<&str> {
        path.split('/')
            .try_fold(&self.sprites, |node, segment| node.get(segment))
            .and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonSpecies {
    pub id: u32,
    pub name: String,
    pub generation: NamedResource,
}

/// Caches for the `pokemon` and `pokemon-species` resources.
#[derive(Debug, Clone)]
pub struct Pokedex {
    pub pokemon: ResourceCache<u32, Pokemon>,
    pub species: ResourceCache<u32, PokemonSpecies>,
}

impl Pokedex {
    pub fn new(base_url: &str, fetcher: Arc<dyn Fetcher>, settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            pokemon: ResourceCache::new(
                Endpoint::new(API_NAME, base_url, "pokemon"),
                Arc::clone(&fetcher),
                settings.clone(),
                Arc::clone(&clock),
            ),
            species: ResourceCache::new(
                Endpoint::new(API_NAME, base_url, "pokemon-species"),
                fetcher,
                settings,
                clock,
            ),
        }
    }

    /// Like [`Pokedex::new`], but sizes the direct store from the species
    /// count the API reports. Blocks the calling thread.
    pub fn sized_from_remote(
        base_url: &str,
        fetcher: Arc<dyn Fetcher>,
        mut settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let species = Endpoint::new(API_NAME, base_url, "pokemon-species");
        if let Some(count) = fetch_count(fetcher.as_ref(), species.list_url()) {
            // National dex numbers start at 1.
            settings.max_entries = count + 1;
            info!(count, "Sized pokedex cache from remote count");
        }
        Self::new(base_url, fetcher, settings, clock)
    }
}
