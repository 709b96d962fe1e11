//! Command-line routing: command trees, flags, operands and resolution.
//!
//! A program describes its interface as a tree of [`Command`]s and hands the
//! root to a [`Router`]. Resolving a command line walks that tree:
//!
//! - Each level parses its own [`Flag`]s from the tokens it is given and
//!   writes parsed values into caller-owned [`Slot`]s.
//! - The first token left over selects a subcommand, which continues with
//!   the remaining tokens.
//! - The deepest selected command binds its positional [`Operand`]s.
//!
//! Flags declared recursive on a command are available at every
//! descendant. Errors ([`Error`]) name the command where they happened so
//! its [`usage`](Router::usage) text can be shown next to the message.
//!
//! # Example
//!
//! ```
//! use command_router_core::*;
//!
//! let verbose = Slot::new(false);
//! let count = Slot::new(0_u32);
//! let target = Slot::new(String::new());
//!
//! let mut deploy = Command::from_fn("deploy|d", |ctx| {
//!     println!("running {}", ctx.path().join(" "));
//!     Ok(())
//! });
//! deploy.flag(&count, "count|n", "Number of replicas");
//! deploy.operand(&target, true, "target", "Where to deploy");
//!
//! let mut root = Command::from_fn("app", |_| Ok(()))
//!     .with_subcommand(deploy)
//!     .require_subcommand();
//! root.flag_recursive(&verbose, "verbose|v", "Enable verbose output");
//!
//! let mut router = Router::new(root);
//! let id = router.resolve(["d", "-v", "--count=3", "prod"]).unwrap();
//!
//! assert_eq!(router.node(id).name(), "deploy");
//! assert!(verbose.get());
//! assert_eq!(count.get(), 3);
//! assert_eq!(target.get(), "prod");
//! router.handle_resolved().unwrap();
//! ```

mod command;
mod error;
mod flags;
mod hydrate;
mod operands;
mod router;
mod slot;
pub mod usage;

pub use command::{Command, CommandNode, Context, Handler, HandlerFn, handler_fn};
pub use error::{Cause, Error, ErrorKind};
pub use flags::{Flag, FlagError, FlagSet, Meta, propagate_recursive_flags};
pub use hydrate::{
    BoxError, Destination, DurationError, HydrateError, IntSlot, Setter, TextCodec,
    format_duration, parse_bool, parse_duration,
};
pub use operands::{Operand, OperandError, OperandSet};
pub use router::{NodeId, Router};
pub use slot::Slot;

/// Result alias for resolution.
pub type Result<T> = std::result::Result<T, Error>;
