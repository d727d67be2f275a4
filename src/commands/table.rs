//! The bot's command table.

use super::ban::BanHandler;
use super::bigmoji::BigmojiHandler;
use super::core::{CommandSpec, LeafSpec, OptionKind, ParameterSchema, Permissions};
use super::meow::MeowHandler;
use super::poll::PollHandler;
use super::pokemon::PokemonDexHandler;
use super::study::{ServerSettingsStudyHandler, StudyHandler};

/// Every command the bot registers, as the registry builds it.
pub fn command_table() -> Vec<CommandSpec> {
    vec![
        LeafSpec::new("meow", "Meow to me!", MeowHandler).into(),
        LeafSpec::new("study", "Toggle study mode", StudyHandler)
            .bot_rights(Permissions::MANAGE_ROLES)
            .into(),
        CommandSpec::group(
            "server",
            "Server settings",
            vec![CommandSpec::group(
                "settings",
                "Server settings",
                vec![
                    LeafSpec::new("study", "Set the server's study role and channel", ServerSettingsStudyHandler)
                        .caller_rights(Permissions::MANAGE_ROLES | Permissions::MANAGE_CHANNELS)
                        .bot_rights(Permissions::MANAGE_ROLES)
                        .param(ParameterSchema::optional("role", "New study role", OptionKind::Role))
                        .param(ParameterSchema::optional("channel", "New study channel", OptionKind::Channel))
                        .into(),
                ],
            )],
        ),
        LeafSpec::new("bigmoji", "Make an emoji big", BigmojiHandler)
            .caller_rights(Permissions::USE_EXTERNAL_EMOJIS)
            .bot_rights(Permissions::EMBED_LINKS | Permissions::SEND_MESSAGES)
            .param(ParameterSchema::required("emoji", "Emoji to show", OptionKind::Text))
            .into(),
        LeafSpec::new("ban", "Ban a user", BanHandler)
            .caller_rights(Permissions::BAN_MEMBERS)
            .bot_rights(Permissions::BAN_MEMBERS)
            .param(ParameterSchema::required("user", "User to ban", OptionKind::User))
            .param(ParameterSchema::optional("time", "Duration of the ban", OptionKind::Duration))
            .param(ParameterSchema::optional("reason", "Reason for the ban", OptionKind::Text))
            .into(),
        poll(),
        LeafSpec::new("pokemon dex", "Look up a pokemon in the national dex", PokemonDexHandler)
            .param(ParameterSchema::required(
                "name-or-number",
                "Name or national dex number",
                OptionKind::Text,
            ))
            .into(),
    ]
}

fn poll() -> CommandSpec {
    const OPTIONS: [(&str, &str); 8] = [
        ("option1", "Option 1 for the poll"),
        ("option2", "Option 2 for the poll"),
        ("option3", "Option 3 for the poll"),
        ("option4", "Option 4 for the poll"),
        ("option5", "Option 5 for the poll"),
        ("option6", "Option 6 for the poll"),
        ("option7", "Option 7 for the poll"),
        ("option8", "Option 8 for the poll"),
    ];

    let mut leaf = LeafSpec::new("poll", "Create a poll", PollHandler)
        .bot_rights(Permissions::SEND_MESSAGES | Permissions::ADD_REACTIONS)
        .param(ParameterSchema::required("title", "Title of the poll", OptionKind::Text));
    for (i, (name, description)) in OPTIONS.into_iter().enumerate() {
        leaf = leaf.param(if i < 2 {
            ParameterSchema::required(name, description, OptionKind::Text)
        } else {
            ParameterSchema::optional(name, description, OptionKind::Text)
        });
    }
    leaf.param(ParameterSchema::optional(
        "create-thread",
        "Whether to create a thread for the poll or not",
        OptionKind::Boolean,
    ))
    .param(ParameterSchema::optional("ping-role", "Optional role to ping", OptionKind::Role))
    .into()
}
