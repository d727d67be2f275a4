//! Command registry and dispatch.
//!
//! The `Registry` owns the command tree built from the static command table
//! and provides command usage statistics. The tree is an arena of nodes with
//! index-based child lists; every child list is sorted by name once at build
//! time, so each path segment is found with a binary search. After `new`
//! returns the tree is never mutated, so dispatch needs no lock.

use super::context::{CommandContext, Handler, Invocation};
use super::options::{self, Args, ParameterSchema};
use super::permissions::Permissions;
use super::response::Response;
use crate::bot::BotContext;
use crate::error::{Denied, DispatchError, DispatchResult, RegistryError};
use crate::telemetry::{CommandTimer, spans};
use b12_task::Task;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug, error};

/// Index of a node in the registry arena.
pub type NodeId = usize;

const ROOT: NodeId = 0;

// ============================================================================
// Declarative table
// ============================================================================

/// One entry of the command table.
pub enum CommandSpec {
    Group {
        name: &'static str,
        description: &'static str,
        children: Vec<CommandSpec>,
    },
    Leaf(LeafSpec),
}

impl CommandSpec {
    pub fn group(name: &'static str, description: &'static str, children: Vec<CommandSpec>) -> Self {
        Self::Group {
            name,
            description,
            children,
        }
    }
}

/// An invocable command. `name` may hold several space-separated segments
/// (`"server settings study"`); missing groups along the way are created.
pub struct LeafSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: Arc<dyn Handler>,
    pub caller_rights: Permissions,
    /// Rights the bot needs in the channel. `SEND_MESSAGES` unless overridden.
    pub bot_rights: Permissions,
    pub parameters: Vec<ParameterSchema>,
}

impl LeafSpec {
    pub fn new(name: &'static str, description: &'static str, handler: impl Handler + 'static) -> Self {
        Self {
            name,
            description,
            handler: Arc::new(handler),
            caller_rights: Permissions::NONE,
            bot_rights: Permissions::SEND_MESSAGES,
            parameters: Vec::new(),
        }
    }

    pub fn caller_rights(mut self, rights: Permissions) -> Self {
        self.caller_rights = rights;
        self
    }

    pub fn bot_rights(mut self, rights: Permissions) -> Self {
        self.bot_rights = rights;
        self
    }

    pub fn param(mut self, param: ParameterSchema) -> Self {
        self.parameters.push(param);
        self
    }
}

impl From<LeafSpec> for CommandSpec {
    fn from(leaf: LeafSpec) -> Self {
        Self::Leaf(leaf)
    }
}

// ============================================================================
// Tree
// ============================================================================

/// A routable command.
pub struct Leaf {
    /// Full path, space separated.
    pub path: String,
    pub handler: Arc<dyn Handler>,
    pub caller_rights: Permissions,
    pub bot_rights: Permissions,
    pub parameters: Vec<ParameterSchema>,
    uses: Arc<AtomicU64>,
}

pub enum NodeKind {
    /// Children sorted by name.
    Group { children: Vec<NodeId> },
    Leaf(Leaf),
}

pub struct CommandNode {
    pub name: String,
    pub description: String,
    pub kind: NodeKind,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Group { children } => f
                .debug_struct("Group")
                .field("name", &self.name)
                .field("children", children)
                .finish(),
            NodeKind::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("path", &leaf.path)
                .field("parameters", &leaf.parameters.len())
                .finish(),
        }
    }
}

struct TreeBuilder {
    nodes: Vec<CommandNode>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![CommandNode {
                name: String::new(),
                description: String::new(),
                kind: NodeKind::Group {
                    children: Vec::new(),
                },
            }],
        }
    }

    fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[parent].kind {
            NodeKind::Group { children } => {
                children.iter().copied().find(|&id| self.nodes[id].name == name)
            }
            NodeKind::Leaf(_) => None,
        }
    }

    fn push_child(&mut self, parent: NodeId, node: CommandNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        if let NodeKind::Group { children } = &mut self.nodes[parent].kind {
            children.push(id);
        }
        id
    }

    /// Find or create the group `segment` under `parent`.
    fn group(
        &mut self,
        parent: NodeId,
        segment: &str,
        description: &str,
        path: &[String],
    ) -> Result<NodeId, RegistryError> {
        match self.find_child(parent, segment) {
            Some(id) => {
                let node = &mut self.nodes[id];
                if matches!(node.kind, NodeKind::Leaf(_)) {
                    return Err(RegistryError::HandlerOnGroup(path.join(" ")));
                }
                if node.description.is_empty() {
                    node.description = description.to_string();
                }
                Ok(id)
            }
            None => Ok(self.push_child(
                parent,
                CommandNode {
                    name: segment.to_string(),
                    description: description.to_string(),
                    kind: NodeKind::Group {
                        children: Vec::new(),
                    },
                },
            )),
        }
    }

    fn insert(
        &mut self,
        parent: NodeId,
        prefix: &[String],
        spec: CommandSpec,
        counts: &mut HashMap<String, Arc<AtomicU64>>,
    ) -> Result<(), RegistryError> {
        let name = match &spec {
            CommandSpec::Group { name, .. } => *name,
            CommandSpec::Leaf(leaf) => leaf.name,
        };
        let segments: Vec<String> = name.split_whitespace().map(str::to_string).collect();
        let mut path = prefix.to_vec();
        let Some((last, middle)) = segments.split_last() else {
            path.push(name.to_string());
            return Err(RegistryError::EmptyName(path.join(" ")));
        };

        // Intermediate segments are always groups.
        let mut node = parent;
        for segment in middle {
            path.push(segment.clone());
            node = self.group(node, segment, "", &path)?;
        }
        path.push(last.clone());

        match spec {
            CommandSpec::Group {
                description,
                children,
                ..
            } => {
                let group = self.group(node, last, description, &path)?;
                for child in children {
                    self.insert(group, &path, child, counts)?;
                }
            }
            CommandSpec::Leaf(leaf) => {
                let full_path = path.join(" ");
                if let Some(existing) = self.find_child(node, last) {
                    return Err(match self.nodes[existing].kind {
                        NodeKind::Group { .. } => RegistryError::HandlerOnGroup(full_path),
                        NodeKind::Leaf(_) => RegistryError::DuplicateName(full_path),
                    });
                }
                let uses = Arc::new(AtomicU64::new(0));
                counts.insert(full_path.clone(), Arc::clone(&uses));
                self.push_child(
                    node,
                    CommandNode {
                        name: last.clone(),
                        description: leaf.description.to_string(),
                        kind: NodeKind::Leaf(Leaf {
                            path: full_path,
                            handler: leaf.handler,
                            caller_rights: leaf.caller_rights,
                            bot_rights: leaf.bot_rights,
                            parameters: leaf.parameters,
                            uses,
                        }),
                    },
                );
            }
        }
        Ok(())
    }

    /// Sort every child list and reject empty groups.
    fn finish(mut self) -> Result<Vec<CommandNode>, RegistryError> {
        let mut stack = vec![(ROOT, String::new())];
        while let Some((id, path)) = stack.pop() {
            let NodeKind::Group { children } = &mut self.nodes[id].kind else {
                continue;
            };
            let mut children = std::mem::take(children);
            if children.is_empty() && id != ROOT {
                return Err(RegistryError::EmptyGroup(path));
            }
            children.sort_by(|a, b| self.nodes[*a].name.cmp(&self.nodes[*b].name));
            for &child in &children {
                let child_path = if path.is_empty() {
                    self.nodes[child].name.clone()
                } else {
                    format!("{} {}", path, self.nodes[child].name)
                };
                stack.push((child, child_path));
            }
            self.nodes[id].kind = NodeKind::Group { children };
        }
        Ok(self.nodes)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of command handlers.
pub struct Registry {
    nodes: Vec<CommandNode>,
    /// Command usage counters, keyed by full path.
    command_counts: HashMap<String, Arc<AtomicU64>>,
    /// Whether ADMINISTRATOR satisfies any caller permission requirement.
    admin_override: bool,
}

impl Registry {
    /// Build the command tree from a declarative table.
    pub fn new(table: Vec<CommandSpec>) -> Result<Self, RegistryError> {
        let mut builder = TreeBuilder::new();
        let mut command_counts = HashMap::new();
        for spec in table {
            builder.insert(ROOT, &[], spec, &mut command_counts)?;
        }
        let nodes = builder.finish()?;
        debug!(
            nodes = nodes.len(),
            commands = command_counts.len(),
            "Command tree built"
        );
        Ok(Self {
            nodes,
            command_counts,
            admin_override: true,
        })
    }

    pub fn with_admin_override(mut self, enabled: bool) -> Self {
        self.admin_override = enabled;
        self
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id]
    }

    /// Sorted children of a group node; empty for leaves.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id].kind {
            NodeKind::Group { children } => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    /// Top-level commands and groups.
    pub fn roots(&self) -> &[NodeId] {
        self.children(ROOT)
    }

    /// Number of invocable commands.
    pub fn len(&self) -> usize {
        self.command_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.command_counts.is_empty()
    }

    fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let children = self.children(parent);
        children
            .binary_search_by(|&id| self.nodes[id].name.as_str().cmp(name))
            .ok()
            .map(|index| children[index])
    }

    /// Walk `path` down the tree. Only leaves are returned.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&Leaf> {
        let mut node = ROOT;
        for segment in path {
            node = self.child(node, segment.as_ref())?;
        }
        match &self.nodes[node].kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Group { .. } => None,
        }
    }

    /// Get command usage statistics, most used first.
    pub fn get_command_stats(&self) -> Vec<(&str, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(cmd, count)| (cmd.as_str(), count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        stats.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        stats
    }

    /// Route, check and bind an invocation without running anything.
    fn prepare(
        &self,
        bot: &Arc<BotContext>,
        invocation: Invocation,
    ) -> Result<(&Leaf, CommandContext, Args), DispatchError> {
        let leaf = self
            .resolve(&invocation.path)
            .ok_or_else(|| DispatchError::SyntaxError(invocation.full_path()))?;

        let missing = invocation.bot_rights.missing(leaf.bot_rights);
        if !missing.is_empty() {
            return Err(DispatchError::PermissionDenied {
                denied: Denied::Bot,
                missing,
            });
        }

        let overridden =
            self.admin_override && invocation.caller_rights.contains(Permissions::ADMINISTRATOR);
        let missing = invocation.caller_rights.missing(leaf.caller_rights);
        if !overridden && !missing.is_empty() {
            return Err(DispatchError::PermissionDenied {
                denied: Denied::Caller,
                missing,
            });
        }

        let args = options::bind(&leaf.parameters, &invocation.options, &invocation.resolved)?;
        let ctx = CommandContext::new(Arc::clone(bot), leaf.path.clone(), invocation);
        Ok((leaf, ctx, args))
    }

    /// Dispatch an invocation to its handler.
    ///
    /// Routing, permission and binding failures come back as an already
    /// finished task and the handler never runs. Otherwise the handler is
    /// started as a task right away; it runs on this thread until its first
    /// suspension.
    pub fn dispatch(&self, bot: &Arc<BotContext>, invocation: Invocation) -> Task<DispatchResult> {
        let path = invocation.full_path();
        let command_span = spans::command(&path, invocation.guild_id, invocation.caller.id);

        let prepared = {
            let _enter = command_span.enter();
            self.prepare(bot, invocation)
        };

        let (leaf, ctx, args) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                let label = match &err {
                    DispatchError::SyntaxError(_) => "unknown",
                    _ => path.as_str(),
                };
                crate::metrics::record_command_error(label, err.error_code());
                debug!(parent: &command_span, error = %err, "Command rejected");
                return Task::ready(Err(err));
            }
        };

        leaf.uses.fetch_add(1, Ordering::Relaxed);
        let handler = Arc::clone(&leaf.handler);
        let command = leaf.path.clone();

        Task::spawn(
            async move {
                let _timer = CommandTimer::new(&command);
                let result = handler
                    .handle(ctx, args)
                    .await
                    .map_err(DispatchError::from);

                if let Err(ref e) = result {
                    crate::metrics::record_command_error(&command, e.error_code());
                    debug!(command = %command, error = %e, "Command error");
                }
                result
            }
            .instrument(command_span),
        )
    }

    /// Dispatch and wait for the single response the caller should see.
    pub async fn execute(&self, bot: &Arc<BotContext>, invocation: Invocation) -> Response {
        let path = invocation.full_path();
        match self.dispatch(bot, invocation).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => err.to_response(),
            Err(err) => {
                error!(command = %path, error = %err, "Command task failed");
                crate::metrics::record_command_error(&path, "panicked");
                DispatchError::from(err).to_response()
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.command_counts.keys().collect();
        commands.sort();
        f.debug_struct("Registry")
            .field("commands", &commands)
            .field("admin_override", &self.admin_override)
            .finish()
    }
}
