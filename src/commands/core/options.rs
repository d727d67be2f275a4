//! Option schemas and parameter binding.
//!
//! Binding walks a leaf's schema once, in declaration order. For each entry
//! it looks for a raw option with the same name and the same platform type,
//! then hands the payload to the decoder registered for the entry's kind.
//! Entity-reference kinds never fetch anything: their payload is an id that
//! must already be present in the invocation's resolved entities.

use crate::error::DispatchError;
use crate::platform::model::{Channel, ResolvedEntities, ResolvedEntity, Role, Snowflake, User};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value kind of a command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Text,
    Integer,
    Boolean,
    /// Text such as `1w2d3h`, decoded to a [`Duration`].
    Duration,
    User,
    Role,
    Channel,
}

impl OptionKind {
    /// Platform option type code.
    pub fn api_type(self) -> u8 {
        match self {
            Self::Text | Self::Duration => 3,
            Self::Integer => 4,
            Self::Boolean => 5,
            Self::User => 6,
            Self::Channel => 7,
            Self::Role => 8,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Text => 0,
            Self::Integer => 1,
            Self::Boolean => 2,
            Self::Duration => 3,
            Self::User => 4,
            Self::Role => 5,
            Self::Channel => 6,
        }
    }
}

/// One declared parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub optional: bool,
}

impl ParameterSchema {
    pub const fn required(name: &'static str, description: &'static str, kind: OptionKind) -> Self {
        Self {
            name,
            description,
            kind,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str, kind: OptionKind) -> Self {
        Self {
            name,
            description,
            kind,
            optional: true,
        }
    }
}

/// Untyped option payload as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

/// An option as supplied with an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOption {
    pub name: String,
    pub kind: OptionKind,
    pub value: RawValue,
}

impl RawOption {
    pub fn new(name: impl Into<String>, kind: OptionKind, value: RawValue) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, OptionKind::Text, RawValue::Text(value.into()))
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, OptionKind::Integer, RawValue::Integer(value))
    }

    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, OptionKind::Boolean, RawValue::Boolean(value))
    }

    /// A reference to an entity of `kind`, by id.
    pub fn reference(name: impl Into<String>, kind: OptionKind, id: Snowflake) -> Self {
        Self::new(name, kind, RawValue::Text(id.to_string()))
    }
}

/// A decoded option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Duration(Duration),
    User(User),
    Role(Role),
    Channel(Channel),
}

// ============================================================================
// Decoder table
// ============================================================================

type DecodeResult = Result<BoundValue, DispatchError>;

trait OptionDecoder: Sync {
    fn decode(&self, option: &RawOption, entities: &ResolvedEntities) -> DecodeResult;
}

fn invalid(option: &RawOption, reason: impl Into<String>) -> DispatchError {
    DispatchError::InvalidOption {
        name: option.name.clone(),
        reason: reason.into(),
    }
}

struct TextDecoder;

impl OptionDecoder for TextDecoder {
    fn decode(&self, option: &RawOption, _: &ResolvedEntities) -> DecodeResult {
        match &option.value {
            RawValue::Text(text) => Ok(BoundValue::Text(text.clone())),
            _ => Err(invalid(option, "expected text")),
        }
    }
}

struct IntegerDecoder;

impl OptionDecoder for IntegerDecoder {
    fn decode(&self, option: &RawOption, _: &ResolvedEntities) -> DecodeResult {
        match &option.value {
            RawValue::Integer(value) => Ok(BoundValue::Integer(*value)),
            _ => Err(invalid(option, "expected an integer")),
        }
    }
}

struct BooleanDecoder;

impl OptionDecoder for BooleanDecoder {
    fn decode(&self, option: &RawOption, _: &ResolvedEntities) -> DecodeResult {
        match &option.value {
            RawValue::Boolean(value) => Ok(BoundValue::Boolean(*value)),
            _ => Err(invalid(option, "expected true or false")),
        }
    }
}

struct DurationDecoder;

impl OptionDecoder for DurationDecoder {
    fn decode(&self, option: &RawOption, _: &ResolvedEntities) -> DecodeResult {
        let RawValue::Text(text) = &option.value else {
            return Err(invalid(option, "expected a duration such as 1d12h"));
        };
        parse_duration(text)
            .map(BoundValue::Duration)
            .ok_or_else(|| invalid(option, format!("`{text}` is not a duration such as 1d12h")))
    }
}

struct EntityDecoder(OptionKind);

impl EntityDecoder {
    fn id(option: &RawOption) -> Result<Snowflake, DispatchError> {
        match &option.value {
            RawValue::Integer(id) => {
                Snowflake::try_from(*id).map_err(|_| invalid(option, "negative id"))
            }
            RawValue::Text(id) => id
                .trim()
                .parse()
                .map_err(|_| invalid(option, format!("`{id}` is not an id"))),
            RawValue::Boolean(_) => Err(invalid(option, "expected an id")),
        }
    }
}

impl OptionDecoder for EntityDecoder {
    fn decode(&self, option: &RawOption, entities: &ResolvedEntities) -> DecodeResult {
        let id = Self::id(option)?;
        let entity = entities
            .get(id)
            .ok_or_else(|| DispatchError::UnresolvedReference {
                name: option.name.clone(),
                id,
            })?;
        match (self.0, entity) {
            (OptionKind::User, ResolvedEntity::User(user)) => Ok(BoundValue::User(user.clone())),
            (OptionKind::Role, ResolvedEntity::Role(role)) => Ok(BoundValue::Role(role.clone())),
            (OptionKind::Channel, ResolvedEntity::Channel(channel)) => {
                Ok(BoundValue::Channel(channel.clone()))
            }
            (_, other) => Err(invalid(
                option,
                format!("{id} is a {}, not a {:?}", other.kind_name(), self.0).to_lowercase(),
            )),
        }
    }
}

/// Indexed by [`OptionKind::index`].
static DECODERS: [&dyn OptionDecoder; 7] = [
    &TextDecoder,
    &IntegerDecoder,
    &BooleanDecoder,
    &DurationDecoder,
    &EntityDecoder(OptionKind::User),
    &EntityDecoder(OptionKind::Role),
    &EntityDecoder(OptionKind::Channel),
];

fn decoder(kind: OptionKind) -> &'static dyn OptionDecoder {
    DECODERS[kind.index()]
}

// ============================================================================
// Binding
// ============================================================================

/// Bind `options` against `schema`, producing arguments in schema order.
pub fn bind(
    schema: &[ParameterSchema],
    options: &[RawOption],
    entities: &ResolvedEntities,
) -> Result<Args, DispatchError> {
    let mut values = Vec::with_capacity(schema.len());
    for param in schema {
        let raw = options
            .iter()
            .find(|o| o.name == param.name && o.kind.api_type() == param.kind.api_type());
        let value = match raw {
            Some(raw) => Some(decoder(param.kind).decode(raw, entities)?),
            None if param.optional => None,
            None => return Err(DispatchError::MissingOption(param.name.to_string())),
        };
        values.push((param.name, value));
    }
    Ok(Args { values })
}

/// Bound arguments of one invocation, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    values: Vec<(&'static str, Option<BoundValue>)>,
}

impl Args {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at schema position `index`, if bound.
    pub fn at(&self, index: usize) -> Option<&BoundValue> {
        self.values.get(index).and_then(|(_, v)| v.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(BoundValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(BoundValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(BoundValue::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        match self.get(name) {
            Some(BoundValue::Duration(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        match self.get(name) {
            Some(BoundValue::User(user)) => Some(user),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        match self.get(name) {
            Some(BoundValue::Role(role)) => Some(role),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        match self.get(name) {
            Some(BoundValue::Channel(channel)) => Some(channel),
            _ => None,
        }
    }
}

/// Parse `1w2d3h4m5s`-style durations. A bare number is seconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit: u64 = match c.to_ascii_lowercase() {
            'w' => 7 * 24 * 3600,
            'd' => 24 * 3600,
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        if digits.is_empty() {
            return None;
        }
        let amount: u64 = digits.parse().ok()?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
        digits.clear();
    }
    if !digits.is_empty() {
        total = total.checked_add(digits.parse().ok()?)?;
    }
    Some(Duration::from_secs(total))
}
