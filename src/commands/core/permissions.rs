//! Permission bitmasks.
//!
//! Bit positions follow the chat platform's permission integer so masks can
//! be passed through from invocations unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of platform permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u64);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const CREATE_INSTANT_INVITE: Self = Self(1 << 0);
    pub const KICK_MEMBERS: Self = Self(1 << 1);
    pub const BAN_MEMBERS: Self = Self(1 << 2);
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    pub const MANAGE_CHANNELS: Self = Self(1 << 4);
    pub const MANAGE_GUILD: Self = Self(1 << 5);
    pub const ADD_REACTIONS: Self = Self(1 << 6);
    pub const SEND_MESSAGES: Self = Self(1 << 11);
    pub const MANAGE_MESSAGES: Self = Self(1 << 13);
    pub const EMBED_LINKS: Self = Self(1 << 14);
    pub const MENTION_EVERYONE: Self = Self(1 << 17);
    pub const USE_EXTERNAL_EMOJIS: Self = Self(1 << 18);
    pub const MANAGE_ROLES: Self = Self(1 << 28);
    pub const USE_APPLICATION_COMMANDS: Self = Self(1 << 31);
    pub const CREATE_PUBLIC_THREADS: Self = Self(1 << 35);

    const NAMES: &'static [(Self, &'static str)] = &[
        (Self::CREATE_INSTANT_INVITE, "Create Instant Invite"),
        (Self::KICK_MEMBERS, "Kick Members"),
        (Self::BAN_MEMBERS, "Ban Members"),
        (Self::ADMINISTRATOR, "Administrator"),
        (Self::MANAGE_CHANNELS, "Manage Channels"),
        (Self::MANAGE_GUILD, "Manage Server"),
        (Self::ADD_REACTIONS, "Add Reactions"),
        (Self::SEND_MESSAGES, "Send Messages"),
        (Self::MANAGE_MESSAGES, "Manage Messages"),
        (Self::EMBED_LINKS, "Embed Links"),
        (Self::MENTION_EVERYONE, "Mention Everyone"),
        (Self::USE_EXTERNAL_EMOJIS, "Use External Emojis"),
        (Self::MANAGE_ROLES, "Manage Roles"),
        (Self::USE_APPLICATION_COMMANDS, "Use Application Commands"),
        (Self::CREATE_PUBLIC_THREADS, "Create Public Threads"),
    ];

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits of `required` that `self` lacks.
    #[inline]
    pub fn missing(self, required: Self) -> Self {
        Self(required.0 & !self.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(*flag) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
                rest &= !flag.0;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{rest:#x}")?;
        }
        Ok(())
    }
}
