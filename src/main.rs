//! b12 - console front end.
//!
//! Reads JSON invocations from stdin and prints one JSON response per line.

use b12::bot::BotContext;
use b12::cache::{HttpFetcher, Pokedex, SystemClock};
use b12::commands::command_table;
use b12::commands::core::Registry;
use b12::commands::core::export::application_commands;
use b12::config::Config;
use b12::console::run_console;
use b12::platform::DryRunPlatform;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!(bot = %config.bot.name, config = %config_path, "Starting b12");

    b12::metrics::init();

    let fetcher = Arc::new(HttpFetcher::new(tokio::runtime::Handle::current())?);
    let base_url = config.apis.pokeapi.base_url.clone();
    let settings = config.cache.settings();
    let pokedex = if config.cache.size_from_remote {
        // Blocks on the count request, so keep it off the runtime's workers.
        tokio::task::spawn_blocking(move || {
            Pokedex::sized_from_remote(&base_url, fetcher, settings, Arc::new(SystemClock))
        })
        .await?
    } else {
        Pokedex::new(&base_url, fetcher, settings, Arc::new(SystemClock))
    };
    info!(
        root = %config.cache.root.display(),
        ttl_secs = config.cache.ttl_secs,
        max_entries = pokedex.pokemon.max_entries(),
        "Resource cache ready"
    );

    let bot = BotContext::new(Arc::new(DryRunPlatform::default()), pokedex)
        .with_name(config.bot.name.clone())
        .with_confirm_timeout(config.bot.confirm_timeout())
        .into_shared();

    let registry = Arc::new(Registry::new(command_table())?.with_admin_override(config.bot.admin_override));
    info!(commands = registry.len(), admin_override = config.bot.admin_override, "Command tree built");

    if config.metrics.enabled {
        tokio::spawn(b12::http::run_http_server(config.metrics.port, Arc::clone(&registry)));
    }

    let payload = serde_json::to_string(&application_commands(&registry, config.bot.application_id))?;
    info!(payload = %payload, "Command registration payload");

    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = run_console(&registry, &bot, stdin, tokio::io::stdout()).await {
        error!(error = %e, "Console transport failed");
        return Err(e.into());
    }

    for (command, uses) in registry.get_command_stats() {
        info!(command, uses, "Command usage");
    }
    Ok(())
}
