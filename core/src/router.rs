//! The command tree and the resolution algorithm.
//!
//! [`Router::resolve`] walks the tree top-down. At each command it parses
//! that command's flags from the front of the remaining tokens, then tries
//! the first leftover token against the children in declaration order. The
//! first child that answers to the token owns the rest of the line; once a
//! child has matched, its errors are final and no sibling is tried. When no
//! child matches, the current command is the terminal one and the leftover
//! tokens become its operands.
//!
//! Recursive flags are copied onto every descendant at the start of each
//! resolve, before any tokens are parsed.

use std::mem;

use tracing::{debug, trace};

use crate::command::{Command, CommandNode, Context, Handler, handler_fn};
use crate::error::{Cause, Error};
use crate::flags::propagate_recursive_flags;
use crate::hydrate::BoxError;

/// Stable index of a command inside a [`Router`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the command in the router's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Outcome of offering a token to a command.
enum Descent {
    /// The command does not answer to the token; try the next sibling.
    NoMatch,
    /// Terminal command and its operand tokens.
    Resolved(NodeId, Vec<String>),
}

/// An arena of commands built from a [`Command`] tree.
///
/// Resolution writes to shared destinations and per-command state, so it
/// needs `&mut self`. Slots are reference counted without atomics, which
/// keeps a router on the thread that built it.
///
/// # Panics
///
/// Methods taking a [`NodeId`] panic if the id came from another router.
#[derive(Debug)]
pub struct Router {
    nodes: Vec<CommandNode>,
}

impl Router {
    /// Flattens `root` and its subcommands into a router.
    pub fn new(root: Command) -> Self {
        let mut router = Self { nodes: Vec::new() };
        router.insert(root, None);
        router
    }

    fn insert(&mut self, command: Command, parent: Option<NodeId>) -> NodeId {
        let Command {
            mut node,
            subcommands,
        } = command;
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);

        for sub in subcommands {
            let child = self.insert(sub, Some(id));
            self.nodes[id.0].children.push(child);
        }
        id
    }

    /// Appends `command` (and its subcommands) as the last child of `parent`.
    pub fn add_subcommand(&mut self, parent: NodeId, command: Command) -> NodeId {
        assert!(parent.0 < self.nodes.len(), "unknown parent command");
        let child = self.insert(command, Some(parent));
        self.nodes[parent.0].children.push(child);
        child
    }

    /// The command the tree was built from.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The command at `id`.
    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }

    /// Number of commands in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a router built by [`Router::new`].
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ancestor chain of `id`, root first, ending with `id`.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Follows a path of names or aliases from the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_router_core::{Command, Router};
    ///
    /// let remote = Command::from_fn("remote", |_| Ok(()))
    ///     .with_subcommand(Command::from_fn("add|a", |_| Ok(())));
    /// let router = Router::new(Command::from_fn("git", |_| Ok(())).with_subcommand(remote));
    ///
    /// let id = router.find(&["remote", "a"]).unwrap();
    /// assert_eq!(router.node(id).name(), "add");
    /// assert!(router.find(&["add"]).is_none());
    /// ```
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        let mut current = self.root();
        for segment in path {
            if segment.is_empty() {
                return None;
            }
            current = self.nodes[current.0]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child.0].answers_to(segment))?;
        }
        Some(current)
    }

    /// Deepest command reached by the last resolve, or the root.
    ///
    /// After a failed resolve this is the command where resolution stopped.
    pub fn resolved(&self) -> NodeId {
        let mut current = self.root();
        while let Some(&child) = self.nodes[current.0]
            .children
            .iter()
            .find(|&&child| self.nodes[child.0].called)
        {
            current = child;
        }
        current
    }

    /// Resolves `args` (without the program name) to a terminal command.
    ///
    /// Flags are hydrated at every level along the path; operands are
    /// hydrated once, for the terminal command only.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`Error`], bound to the command where it
    /// occurred.
    pub fn resolve<I, S>(&mut self, args: I) -> Result<NodeId, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        debug!(?args, "resolving command line");

        self.propagate_recursive_flags();
        for node in &mut self.nodes {
            node.called = false;
        }

        let root = self.root();
        let (terminal, operands) = self.walk(root, args)?;
        debug!(
            command = self.nodes[terminal.0].name(),
            ?operands,
            "resolved command"
        );

        self.nodes[terminal.0]
            .operands
            .resolve(&operands)
            .map_err(|err| self.error(terminal, err.into()))?;
        Ok(terminal)
    }

    fn propagate_recursive_flags(&mut self) {
        for index in 0..self.nodes.len() {
            let source = self.nodes[index].flags.recursive_only();
            if source.is_empty() {
                continue;
            }

            let mut stack = self.nodes[index].children.clone();
            while let Some(id) = stack.pop() {
                trace!(
                    from = self.nodes[index].name(),
                    to = self.nodes[id.0].name(),
                    count = source.len(),
                    "propagating recursive flags"
                );
                propagate_recursive_flags(&source, &mut self.nodes[id.0].flags);
                stack.extend_from_slice(&self.nodes[id.0].children);
            }
        }
    }

    fn visit(
        &mut self,
        id: NodeId,
        tokens: Vec<String>,
        invocation: &str,
    ) -> Result<Descent, Error> {
        if !self.nodes[id.0].answers_to(invocation) {
            return Ok(Descent::NoMatch);
        }
        let (terminal, operands) = self.walk(id, tokens)?;
        Ok(Descent::Resolved(terminal, operands))
    }

    fn walk(&mut self, id: NodeId, tokens: Vec<String>) -> Result<(NodeId, Vec<String>), Error> {
        self.nodes[id.0].called = true;
        trace!(command = self.nodes[id.0].name(), ?tokens, "entering command");

        let rest = self.nodes[id.0]
            .flags
            .parse(&tokens)
            .map_err(|err| self.error(id, err.into()))?;

        if rest.is_empty() {
            if self.nodes[id.0].subcommand_required {
                return Err(self.error(id, Cause::SubcommandRequired));
            }
            return Ok((id, rest));
        }

        let candidate = rest[0].clone();
        for child in self.nodes[id.0].children.clone() {
            match self.visit(child, rest[1..].to_vec(), &candidate)? {
                Descent::NoMatch => continue,
                Descent::Resolved(terminal, operands) => return Ok((terminal, operands)),
            }
        }

        if self.nodes[id.0].subcommand_required {
            return Err(self.error(id, Cause::SubcommandRequired));
        }
        Ok((id, rest))
    }

    fn error(&self, id: NodeId, cause: Cause) -> Error {
        debug!(command = self.nodes[id.0].name(), %cause, "resolution failed");
        Error::new(id, self.nodes[id.0].name(), cause)
    }

    /// Runs the handler of `id`.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error unchanged.
    pub fn handle(&self, id: NodeId) -> Result<(), BoxError> {
        debug!(command = self.nodes[id.0].name(), "handling command");
        let ctx = Context { router: self, id };
        self.nodes[id.0].handler.handle(&ctx)
    }

    /// Runs the handler of [`resolved`](Self::resolved).
    pub fn handle_resolved(&self) -> Result<(), BoxError> {
        self.handle(self.resolved())
    }

    /// Replaces the handler of `id` with one built from the current handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use command_router_core::{Command, Handler, Router, handler_fn};
    ///
    /// let calls = Rc::new(Cell::new(0));
    /// let mut router = Router::new(Command::from_fn("app", |_| Ok(())));
    ///
    /// let seen = Rc::clone(&calls);
    /// router.wrap_handler(router.root(), move |inner| {
    ///     Box::new(handler_fn(move |ctx| {
    ///         seen.set(seen.get() + 1);
    ///         inner.handle(ctx)
    ///     }))
    /// });
    ///
    /// router.handle_resolved().unwrap();
    /// assert_eq!(calls.get(), 1);
    /// ```
    pub fn wrap_handler<F>(&mut self, id: NodeId, wrap: F)
    where
        F: FnOnce(Box<dyn Handler>) -> Box<dyn Handler>,
    {
        let node = &mut self.nodes[id.0];
        let inner = mem::replace(&mut node.handler, Box::new(handler_fn(|_| Ok(()))));
        node.handler = wrap(inner);
    }

    /// Usage text for `id`; see [`crate::usage::render`].
    pub fn usage(&self, id: NodeId) -> String {
        crate::usage::render(self, id)
    }
}
