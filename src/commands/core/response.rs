//! Command responses: what to do with the invocation, and what to say.

use serde::Serialize;

/// How the transport should deliver a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Answer the invocation.
    Reply,
    /// Replace the earlier (deferred) answer.
    Edit,
    /// The command already answered on its own.
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich content block attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }
}

/// Message body of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Only visible to the invoking user.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ephemeral: bool,
}

impl Message {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn success(message: impl AsRef<str>) -> Self {
        Self::new(format!("Yes! {}", message.as_ref()))
    }

    pub fn thumbs_up() -> Self {
        Self::new("thumbs up!")
    }

    pub fn usage_error(message: impl AsRef<str>) -> Self {
        Self::new(format!("Usage error: {}", message.as_ref()))
    }

    pub fn internal_error() -> Self {
        Self::new("Internal error (woopsie)")
    }

    pub fn internal_error_with(message: impl AsRef<str>) -> Self {
        Self::new(format!("Internal error: {}", message.as_ref()))
    }

    pub fn aborted() -> Self {
        Self::new("Command aborted")
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

/// A message and the action that delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub action: Action,
    #[serde(flatten)]
    pub message: Message,
}

impl Response {
    pub fn reply(message: Message) -> Self {
        Self {
            action: Action::Reply,
            message,
        }
    }

    pub fn edit(message: Message) -> Self {
        Self {
            action: Action::Edit,
            message,
        }
    }

    pub fn none() -> Self {
        Self {
            action: Action::None,
            message: Message::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wording() {
        assert_eq!(Message::success("done").content, "Yes! done");
        assert_eq!(Message::usage_error("bad").content, "Usage error: bad");
        assert_eq!(Message::thumbs_up().content, "thumbs up!");
        assert_eq!(Message::aborted().content, "Command aborted");
    }

    #[test]
    fn serializes_flat() {
        let json = serde_json::to_value(Response::edit(Message::new("hi").ephemeral())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"action": "edit", "content": "hi", "ephemeral": true})
        );
        let json = serde_json::to_value(Response::none()).unwrap();
        assert_eq!(json, serde_json::json!({"action": "none", "content": ""}));
    }
}
