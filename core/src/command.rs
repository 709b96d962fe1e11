//! Command nodes, handlers and the builder used to compose a command tree.

use std::fmt;

use crate::flags::{Flag, FlagSet, Meta, split_names};
use crate::hydrate::{BoxError, Destination};
use crate::operands::{Operand, OperandSet};
use crate::router::{NodeId, Router};

/// Runs a resolved command.
///
/// Middleware is a handler that owns and calls another handler; see
/// [`Router::wrap_handler`].
pub trait Handler {
    /// Runs the command described by `ctx`.
    fn handle(&self, ctx: &Context<'_>) -> Result<(), BoxError>;
}

/// Adapts a closure into a [`Handler`].
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Context<'_>) -> Result<(), BoxError>,
{
    fn handle(&self, ctx: &Context<'_>) -> Result<(), BoxError> {
        (self.0)(ctx)
    }
}

/// Wraps a closure so it can be used where a [`Handler`] is expected.
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&Context<'_>) -> Result<(), BoxError>,
{
    HandlerFn(f)
}

/// What a handler sees: the router and the command being handled.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub(crate) router: &'a Router,
    pub(crate) id: NodeId,
}

impl<'a> Context<'a> {
    /// The router that resolved the command.
    pub fn router(&self) -> &'a Router {
        self.router
    }

    /// Id of the command being handled.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The command being handled.
    pub fn command(&self) -> &'a CommandNode {
        self.router.node(self.id)
    }

    /// Canonical names from the root down to the handled command.
    pub fn path(&self) -> Vec<&'a str> {
        self.router
            .lineage(self.id)
            .into_iter()
            .map(|id| self.router.node(id).name())
            .collect()
    }
}

/// One command of a [`Router`]'s tree.
///
/// Parent and child links are assigned when the node is inserted into a
/// router. The parent link is only used to rebuild ancestor chains.
pub struct CommandNode {
    name: String,
    aliases: Vec<String>,
    /// Named options of this command.
    pub flags: FlagSet,
    /// Positional operands of this command.
    pub operands: OperandSet,
    /// Fail resolution when no subcommand matches.
    pub subcommand_required: bool,
    /// One-line description shown in usage text.
    pub description: String,
    /// Group heading under which the parent lists this command.
    pub category: String,
    /// Order of subcommand categories as `"Name|Description"` entries.
    pub category_order: Vec<String>,
    /// Omit from the parent's subcommand listing.
    pub hide_usage: bool,
    /// Free-form data for custom renderers.
    pub meta: Meta,
    pub(crate) handler: Box<dyn Handler>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) called: bool,
}

impl CommandNode {
    fn new(names: &str, handler: Box<dyn Handler>) -> Self {
        let mut names = split_names(names);
        let name = names.remove(0);
        Self {
            name,
            aliases: names,
            flags: FlagSet::default(),
            operands: OperandSet::default(),
            subcommand_required: false,
            description: String::new(),
            category: String::new(),
            category_order: Vec::new(),
            hide_usage: false,
            meta: Meta::new(),
            handler,
            parent: None,
            children: Vec::new(),
            called: false,
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names after the canonical one.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether `invocation` selects this command by name or alias. An empty
    /// token never selects a command; the root is entered without one.
    pub fn answers_to(&self, invocation: &str) -> bool {
        !invocation.is_empty()
            && (self.name == invocation || self.aliases.iter().any(|a| a == invocation))
    }

    /// The enclosing command; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Set when the last resolve passed through this command.
    pub fn is_called(&self) -> bool {
        self.called
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("flags", &self.flags)
            .field("operands", &self.operands)
            .field("subcommand_required", &self.subcommand_required)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("called", &self.called)
            .finish_non_exhaustive()
    }
}

/// A command and its subcommands, before insertion into a [`Router`].
///
/// # Examples
///
/// ```
/// use command_router_core::{Command, Router, Slot};
///
/// let verbose = Slot::new(false);
/// let first = Slot::new(String::new());
///
/// let mut print = Command::from_fn("print|p", |_| Ok(()))
///     .with_description("Print operands");
/// print.operand(&first, true, "first", "Value to print");
///
/// let mut root = Command::from_fn("myapp", |_| Ok(()))
///     .with_subcommand(print)
///     .require_subcommand();
/// root.flag_recursive(&verbose, "verbose|v", "Enable verbose output");
///
/// let mut router = Router::new(root);
/// let id = router.resolve(["p", "-v", "hello"]).unwrap();
///
/// assert_eq!(router.node(id).name(), "print");
/// assert!(verbose.get());
/// assert_eq!(first.get(), "hello");
/// ```
pub struct Command {
    pub(crate) node: CommandNode,
    pub(crate) subcommands: Vec<Command>,
}

impl Command {
    /// Creates a command. `names` is `|`-separated: `"hello|hi"` is named
    /// `hello` with alias `hi`.
    pub fn new(names: &str, handler: impl Handler + 'static) -> Self {
        Self {
            node: CommandNode::new(names, Box::new(handler)),
            subcommands: Vec::new(),
        }
    }

    /// Creates a command handled by a closure.
    pub fn from_fn<F>(names: &str, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<(), BoxError> + 'static,
    {
        Self::new(names, handler_fn(f))
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn aliases(&self) -> &[String] {
        self.node.aliases()
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    /// Appends a subcommand; declaration order is resolution order.
    pub fn with_subcommand(mut self, sub: Command) -> Self {
        self.subcommands.push(sub);
        self
    }

    /// Appends several subcommands.
    pub fn with_subcommands(mut self, subs: impl IntoIterator<Item = Command>) -> Self {
        self.subcommands.extend(subs);
        self
    }

    /// Marks the command as unusable without a subcommand.
    pub fn require_subcommand(mut self) -> Self {
        self.node.subcommand_required = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.node.description = description.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.node.category = category.to_string();
        self
    }

    /// Sets the order of subcommand categories (`"Name|Description"`).
    pub fn with_category_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node.category_order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Hides the command from its parent's usage text.
    pub fn hidden(mut self) -> Self {
        self.node.hide_usage = true;
        self
    }

    /// See [`FlagSet::flag`].
    pub fn flag(
        &mut self,
        destination: impl Into<Destination>,
        names: &str,
        description: &str,
    ) -> &mut Flag {
        self.node.flags.flag(destination, names, description)
    }

    /// See [`FlagSet::flag_recursive`].
    pub fn flag_recursive(
        &mut self,
        destination: impl Into<Destination>,
        names: &str,
        description: &str,
    ) -> &mut Flag {
        self.node.flags.flag_recursive(destination, names, description)
    }

    /// See [`OperandSet::operand`].
    pub fn operand(
        &mut self,
        destination: impl Into<Destination>,
        required: bool,
        name: &str,
        description: &str,
    ) -> &mut Operand {
        self.node
            .operands
            .operand(destination, required, name, description)
    }

    /// Direct access to the node being built.
    pub fn node_mut(&mut self) -> &mut CommandNode {
        &mut self.node
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("node", &self.node)
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_split_into_aliases() {
        let cmd = Command::from_fn("hello|hi|hey", |_| Ok(()));
        assert_eq!(cmd.name(), "hello");
        assert_eq!(cmd.aliases(), ["hi", "hey"]);
        assert!(cmd.node.answers_to("hey"));
        assert!(!cmd.node.answers_to(""));
        assert!(!cmd.node.answers_to("Hello"));
    }

    #[test]
    fn test_builder_keeps_declaration_order() {
        let cmd = Command::from_fn("root", |_| Ok(()))
            .with_subcommand(Command::from_fn("b", |_| Ok(())))
            .with_subcommands([
                Command::from_fn("a", |_| Ok(())),
                Command::from_fn("c", |_| Ok(())),
            ]);
        let names: Vec<&str> = cmd.subcommands().iter().map(Command::name).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
