//! Scripted chat platform.
//!
//! Records every request and answers immediately, except where a test asks
//! for completions to be parked so it can deliver them later, in any order.

use b12::commands::core::Message;
use b12::platform::model::{Ban, Snowflake};
use b12::platform::{Platform, PlatformError, PlatformResult};
use b12_task::Completion;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// How the user answers a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Accept,
    Decline,
    /// Never answers; the completion is held until the platform is dropped.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBan {
    pub guild: Snowflake,
    pub user: Snowflake,
    pub delete_history_secs: u64,
    pub audit_reason: String,
}

pub struct MockPlatform {
    calls: AtomicUsize,
    next_id: AtomicU64,
    confirm: Confirm,
    existing_ban: Option<Ban>,
    rejected_reactions: HashSet<String>,
    park_reactions: bool,
    fail_role_changes: bool,

    pub messages: Mutex<Vec<(Snowflake, Message)>>,
    pub edits: Mutex<Vec<(Snowflake, Snowflake, Message)>>,
    pub reactions: Mutex<Vec<String>>,
    pub bans: Mutex<Vec<RecordedBan>>,
    pub roles_added: Mutex<Vec<(Snowflake, Snowflake)>>,
    pub roles_removed: Mutex<Vec<(Snowflake, Snowflake)>>,
    pub threads: Mutex<Vec<(Snowflake, String)>>,
    pub prompts: Mutex<Vec<String>>,

    parked_reactions: Mutex<Vec<(String, Completion<PlatformResult<()>>)>>,
    parked_confirmations: Mutex<Vec<Completion<bool>>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            next_id: AtomicU64::new(5000),
            confirm: Confirm::Accept,
            existing_ban: None,
            rejected_reactions: HashSet::new(),
            park_reactions: false,
            fail_role_changes: false,
            messages: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            bans: Mutex::new(Vec::new()),
            roles_added: Mutex::new(Vec::new()),
            roles_removed: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            parked_reactions: Mutex::new(Vec::new()),
            parked_confirmations: Mutex::new(Vec::new()),
        }
    }
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming(mut self, confirm: Confirm) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_ban(mut self, ban: Ban) -> Self {
        self.existing_ban = Some(ban);
        self
    }

    /// Reacting with `emoji` fails with an unknown-emoji error.
    pub fn rejecting_reaction(mut self, emoji: &str) -> Self {
        self.rejected_reactions.insert(emoji.to_string());
        self
    }

    /// Hold reaction completions until [`MockPlatform::release_reactions`].
    pub fn parking_reactions(mut self) -> Self {
        self.park_reactions = true;
        self
    }

    pub fn failing_role_changes(mut self) -> Self {
        self.fail_role_changes = true;
        self
    }

    /// Number of platform operations requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn parked_reactions(&self) -> usize {
        self.parked_reactions.lock().len()
    }

    /// Complete the parked reactions, last requested first.
    ///
    /// Completions run on this thread, so anything waiting on them resumes
    /// before this returns.
    pub fn release_reactions_in_reverse(&self) {
        let parked: Vec<_> = self.parked_reactions.lock().drain(..).collect();
        for (emoji, done) in parked.into_iter().rev() {
            self.reactions.lock().push(emoji);
            done.complete(Ok(()));
        }
    }

    fn next_id(&self) -> Snowflake {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn role_change(&self) -> PlatformResult<()> {
        if self.fail_role_changes {
            Err(PlatformError::new(50013, "Missing Permissions"))
        } else {
            Ok(())
        }
    }
}

impl Platform for MockPlatform {
    fn get_ban(&self, _guild: Snowflake, user: Snowflake, done: Completion<PlatformResult<Option<Ban>>>) {
        self.record();
        let ban = self.existing_ban.clone().filter(|b| b.user_id == user);
        done.complete(Ok(ban));
    }

    fn add_ban(
        &self,
        guild: Snowflake,
        user: Snowflake,
        delete_history_secs: u64,
        audit_reason: String,
        done: Completion<PlatformResult<()>>,
    ) {
        self.record();
        self.bans.lock().push(RecordedBan {
            guild,
            user,
            delete_history_secs,
            audit_reason,
        });
        done.complete(Ok(()));
    }

    fn add_member_role(&self, _guild: Snowflake, user: Snowflake, role: Snowflake, done: Completion<PlatformResult<()>>) {
        self.record();
        let result = self.role_change();
        if result.is_ok() {
            self.roles_added.lock().push((user, role));
        }
        done.complete(result);
    }

    fn remove_member_role(
        &self,
        _guild: Snowflake,
        user: Snowflake,
        role: Snowflake,
        done: Completion<PlatformResult<()>>,
    ) {
        self.record();
        let result = self.role_change();
        if result.is_ok() {
            self.roles_removed.lock().push((user, role));
        }
        done.complete(result);
    }

    fn create_message(&self, channel: Snowflake, message: Message, done: Completion<PlatformResult<Snowflake>>) {
        self.record();
        self.messages.lock().push((channel, message));
        done.complete(Ok(self.next_id()));
    }

    fn edit_message(
        &self,
        channel: Snowflake,
        message_id: Snowflake,
        message: Message,
        done: Completion<PlatformResult<()>>,
    ) {
        self.record();
        self.edits.lock().push((channel, message_id, message));
        done.complete(Ok(()));
    }

    fn add_reaction(&self, _channel: Snowflake, _message: Snowflake, emoji: String, done: Completion<PlatformResult<()>>) {
        self.record();
        if self.rejected_reactions.contains(&emoji) {
            done.complete(Err(PlatformError::new(10014, "Unknown Emoji")));
        } else if self.park_reactions {
            self.parked_reactions.lock().push((emoji, done));
        } else {
            self.reactions.lock().push(emoji);
            done.complete(Ok(()));
        }
    }

    fn create_thread(
        &self,
        _channel: Snowflake,
        message: Snowflake,
        name: String,
        done: Completion<PlatformResult<Snowflake>>,
    ) {
        self.record();
        self.threads.lock().push((message, name));
        done.complete(Ok(self.next_id()));
    }

    fn request_confirmation(&self, _channel: Snowflake, _user: Snowflake, prompt: String, done: Completion<bool>) {
        self.record();
        self.prompts.lock().push(prompt);
        match self.confirm {
            Confirm::Accept => done.complete(true),
            Confirm::Decline => done.complete(false),
            Confirm::Never => self.parked_confirmations.lock().push(done),
        }
    }
}
