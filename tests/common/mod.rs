//! Integration test common infrastructure.
//!
//! Provides scripted stand-ins for the two collaborators the bot talks to:
//! the chat platform and the remote resource API.

pub mod fetcher;
pub mod platform;

#[allow(unused_imports)]
pub use fetcher::{MockFetcher, THING_BASE, Thing, thing_body, thing_cache, thing_url};
#[allow(unused_imports)]
pub use platform::{Confirm, MockPlatform, RecordedBan};

use b12::bot::BotContext;
use b12::cache::{CacheSettings, Fetcher, ManualClock, Pokedex};
use b12::commands::core::{Invocation, Permissions};
use b12::platform::model::{Snowflake, User};
use std::path::Path;
use std::sync::Arc;

pub const GUILD: Snowflake = 1000;
pub const CHANNEL: Snowflake = 2000;
pub const CALLER: Snowflake = 3000;
pub const BASE_URL: &str = "http://pokeapi.test/api/v2";

/// Bot wired to `platform`, with a pokedex cached under `cache_root`.
#[allow(dead_code)]
pub fn bot_context(platform: Arc<MockPlatform>, fetcher: Arc<dyn Fetcher>, cache_root: &Path) -> BotContext {
    let settings = CacheSettings {
        root: cache_root.to_path_buf(),
        max_entries: 1025,
        ..CacheSettings::default()
    };
    let pokedex = Pokedex::new(BASE_URL, fetcher, settings, Arc::new(ManualClock::starting_now()));
    BotContext::new(platform, pokedex)
}

#[allow(dead_code)]
pub fn bot(platform: Arc<MockPlatform>, fetcher: Arc<dyn Fetcher>, cache_root: &Path) -> Arc<BotContext> {
    bot_context(platform, fetcher, cache_root).into_shared()
}

/// Invocation of `path` from the test guild and channel, with every right
/// the bot needs but none for the caller.
#[allow(dead_code)]
pub fn invocation(path: &str) -> Invocation {
    let mut invocation = Invocation::new(path.split(' '));
    invocation.guild_id = GUILD;
    invocation.channel_id = CHANNEL;
    invocation.caller = User {
        id: CALLER,
        username: "tester".into(),
        bot: false,
    };
    invocation.bot_rights = Permissions::SEND_MESSAGES
        | Permissions::EMBED_LINKS
        | Permissions::ADD_REACTIONS
        | Permissions::MANAGE_ROLES
        | Permissions::BAN_MEMBERS
        | Permissions::CREATE_PUBLIC_THREADS;
    invocation
}
