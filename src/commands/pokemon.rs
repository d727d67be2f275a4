//! `/pokemon dex <name-or-number>`

use super::core::{Args, CommandContext, Embed, Handler, Message, Response};
use crate::cache::{Pokemon, PokemonSpecies};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;
use tracing::warn;

const USAGE: &str = "Please provide a valid pokemon name or national number.";

/// `generation-iv` becomes `Generation-IV`.
pub fn generation_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut after_dash = false;
    for (i, c) in name.chars().enumerate() {
        if i == 0 || after_dash {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
        if c == '-' {
            after_dash = true;
        }
    }
    label
}

fn capitalized(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Dex card for one pokemon.
pub fn dex_embed(pokemon: &Pokemon, species: &PokemonSpecies) -> Embed {
    let name = capitalized(&pokemon.name);
    let thumbnail = pokemon
        .sprite("versions/generation-v/black-white/animated/front_default")
        .or_else(|| pokemon.sprite("front_default"));

    let mut embed = Embed {
        title: Some(name.clone()),
        url: Some(format!("https://bulbapedia.bulbagarden.net/wiki/{name}_(Pok%C3%A9mon)")),
        image: pokemon
            .sprite("other/official-artwork/front_default")
            .map(str::to_string),
        thumbnail: thumbnail.map(str::to_string),
        footer: Some(generation_label(&species.generation.name)),
        ..Embed::default()
    };
    for stat in &pokemon.stats {
        embed = embed.field(stat.stat.name.clone(), stat.base_stat.to_string());
    }
    embed
}

pub struct PokemonDexHandler;

#[async_trait]
impl Handler for PokemonDexHandler {
    async fn handle(&self, ctx: CommandContext, args: Args) -> HandlerResult {
        let number: u32 = args
            .text("name-or-number")
            .map(|s| s.trim_start_matches([' ', '\t']))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| HandlerError::Usage(USAGE.into()))?;

        // Both lookups are in flight before either is awaited.
        let pokedex = &ctx.bot.pokedex;
        let pokemon = pokedex.pokemon.request(number);
        let species = pokedex.species.request(number);

        let Some(pokemon) = pokemon.await else {
            warn!(number, "Pokemon unavailable");
            return Err(HandlerError::Internal(format!("pokemon {number} unavailable")));
        };
        let Some(species) = species.await else {
            warn!(number, "Pokemon species unavailable");
            return Err(HandlerError::Internal(format!("species {number} unavailable")));
        };

        Ok(Response::edit(
            Message::default().with_embed(dex_embed(&pokemon, &species)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::core::options::{self, OptionKind, ParameterSchema, RawOption};
    use crate::commands::testing;
    use crate::platform::model::ResolvedEntities;

    fn pikachu() -> (Pokemon, PokemonSpecies) {
        let pokemon = serde_json::from_str(
            r#"{
                "id": 25,
                "name": "pikachu",
                "sprites": {
                    "front_default": "https://img/25.png",
                    "other": {"official-artwork": {"front_default": "https://img/art/25.png"}},
                    "versions": {"generation-v": {"black-white": {"animated": {"front_default": "https://img/bw/25.gif"}}}}
                },
                "stats": [
                    {"base_stat": 35, "stat": {"name": "hp"}},
                    {"base_stat": 55, "stat": {"name": "attack"}}
                ]
            }"#,
        )
        .unwrap();
        let species = serde_json::from_str(
            r#"{"id": 25, "name": "pikachu", "generation": {"name": "generation-i"}}"#,
        )
        .unwrap();
        (pokemon, species)
    }

    #[test]
    fn generation_labels() {
        assert_eq!(generation_label("generation-iv"), "Generation-IV");
        assert_eq!(generation_label("generation-i"), "Generation-I");
    }

    #[test]
    fn embed_layout() {
        let (pokemon, species) = pikachu();
        let embed = dex_embed(&pokemon, &species);
        assert_eq!(embed.title.as_deref(), Some("Pikachu"));
        assert_eq!(
            embed.url.as_deref(),
            Some("https://bulbapedia.bulbagarden.net/wiki/Pikachu_(Pok%C3%A9mon)")
        );
        assert_eq!(embed.image.as_deref(), Some("https://img/art/25.png"));
        assert_eq!(embed.thumbnail.as_deref(), Some("https://img/bw/25.gif"));
        assert_eq!(embed.footer.as_deref(), Some("Generation-I"));
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[1].name, "attack");
        assert_eq!(embed.fields[1].value, "55");
    }

    #[tokio::test]
    async fn rejects_names() {
        let schema = [ParameterSchema::required(
            "name-or-number",
            "Name or national dex number",
            OptionKind::Text,
        )];
        let raw = [RawOption::text("name-or-number", "pikachu")];
        let args = options::bind(&schema, &raw, &ResolvedEntities::new()).unwrap();

        let bot = testing::bot();
        let err = PokemonDexHandler
            .handle(testing::context(&bot, "pokemon dex"), args)
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::Usage(USAGE.into()));
    }

    #[tokio::test]
    async fn unavailable_resource_is_internal_error() {
        let schema = [ParameterSchema::required(
            "name-or-number",
            "Name or national dex number",
            OptionKind::Text,
        )];
        let raw = [RawOption::text("name-or-number", "25")];
        let args = options::bind(&schema, &raw, &ResolvedEntities::new()).unwrap();

        let bot = testing::bot();
        let err = PokemonDexHandler
            .handle(testing::context(&bot, "pokemon dex"), args)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Internal(_)));
    }
}
