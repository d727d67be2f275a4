//! Bulk command registration payload.
//!
//! Converts the command tree into the shape the platform expects when
//! registering application commands: one entry per top-level node, with
//! groups and subcommands nested as typed options.

use super::registry::{NodeId, NodeKind, Registry};
use crate::platform::model::Snowflake;
use serde::Serialize;

const SUB_COMMAND: u8 = 1;
const SUB_COMMAND_GROUP: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOptionPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    pub application_id: Snowflake,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionPayload>,
    /// Permission mask as a decimal string; absent when anyone may use it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
}

fn description(registry: &Registry, id: NodeId) -> String {
    let node = registry.node(id);
    if node.description.is_empty() {
        node.name.clone()
    } else {
        node.description.clone()
    }
}

/// Options of a node: parameters for a leaf, subcommands for a group.
fn options_of(registry: &Registry, id: NodeId) -> Vec<CommandOptionPayload> {
    match &registry.node(id).kind {
        NodeKind::Leaf(leaf) => leaf
            .parameters
            .iter()
            .map(|p| CommandOptionPayload {
                kind: p.kind.api_type(),
                name: p.name.to_string(),
                description: p.description.to_string(),
                required: !p.optional,
                options: Vec::new(),
            })
            .collect(),
        NodeKind::Group { children } => children
            .iter()
            .map(|&child| {
                let kind = match registry.node(child).kind {
                    NodeKind::Leaf(_) => SUB_COMMAND,
                    NodeKind::Group { .. } => SUB_COMMAND_GROUP,
                };
                CommandOptionPayload {
                    kind,
                    name: registry.node(child).name.clone(),
                    description: description(registry, child),
                    required: false,
                    options: options_of(registry, child),
                }
            })
            .collect(),
    }
}

/// Build the bulk registration payload for every top-level command.
pub fn application_commands(registry: &Registry, application_id: Snowflake) -> Vec<ApplicationCommand> {
    registry
        .roots()
        .iter()
        .map(|&id| {
            let node = registry.node(id);
            let default_member_permissions = match &node.kind {
                NodeKind::Leaf(leaf) if !leaf.caller_rights.is_empty() => {
                    Some(leaf.caller_rights.0.to_string())
                }
                _ => None,
            };
            ApplicationCommand {
                name: node.name.clone(),
                description: description(registry, id),
                application_id,
                options: options_of(registry, id),
                default_member_permissions,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::core::context::{CommandContext, Handler};
    use crate::commands::core::options::{Args, OptionKind, ParameterSchema};
    use crate::commands::core::permissions::Permissions;
    use crate::commands::core::registry::{CommandSpec, LeafSpec};
    use crate::commands::core::response::Response;
    use crate::error::HandlerResult;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Handler for Noop {
        async fn handle(&self, _ctx: CommandContext, _args: Args) -> HandlerResult {
            Ok(Response::none())
        }
    }

    #[test]
    fn nested_groups_become_typed_options() {
        let registry = Registry::new(vec![
            LeafSpec::new("ban", "Ban a user", Noop)
                .caller_rights(Permissions::BAN_MEMBERS)
                .param(ParameterSchema::required("user", "User to ban", OptionKind::User))
                .param(ParameterSchema::optional("time", "Duration", OptionKind::Duration))
                .into(),
            CommandSpec::group(
                "server",
                "Server settings",
                vec![
                    LeafSpec::new("settings study", "Study settings", Noop)
                        .param(ParameterSchema::optional("role", "Role", OptionKind::Role))
                        .into(),
                ],
            ),
        ])
        .unwrap();

        let payload = application_commands(&registry, 99);
        assert_eq!(payload.len(), 2);

        let ban = &payload[0];
        assert_eq!(ban.default_member_permissions.as_deref(), Some("4"));
        assert_eq!(ban.options[0].kind, 6);
        assert!(ban.options[0].required);
        assert_eq!(ban.options[1].kind, 3);
        assert!(!ban.options[1].required);

        let server = &payload[1];
        let settings = &server.options[0];
        assert_eq!(settings.kind, SUB_COMMAND_GROUP);
        assert_eq!(settings.description, "settings");
        let study = &settings.options[0];
        assert_eq!(study.kind, SUB_COMMAND);
        assert_eq!(study.options[0].kind, 8);

        let json = serde_json::to_value(&payload[1]).unwrap();
        assert_eq!(json["options"][0]["type"], 2);
        assert!(json.get("default_member_permissions").is_none());
    }
}
