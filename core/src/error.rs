//! Resolution errors.
//!
//! Every fatal error carries the command at which it occurred so callers can
//! render that command's usage text next to the message.

use serde::Serialize;
use thiserror::Error;

use crate::flags::FlagError;
use crate::hydrate::HydrateError;
use crate::operands::OperandError;
use crate::router::NodeId;

/// What went wrong while resolving a command line.
#[derive(Debug, Error)]
pub enum Cause {
    /// The command needs a subcommand and none matched.
    #[error("subcommand required")]
    SubcommandRequired,
    /// Flag tokenizing or hydration failed.
    #[error(transparent)]
    Flag(#[from] FlagError),
    /// Operand resolution failed.
    #[error(transparent)]
    Operand(#[from] OperandError),
}

/// Coarse classification of a [`Cause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No subcommand matched where one is required.
    SubcommandRequired,
    /// A token named no known flag.
    FlagUnrecognized,
    /// A flag needing a value came last.
    FlagValueMissing,
    /// A flag value failed to convert.
    FlagHydrate,
    /// A required operand had no token.
    OperandMissing,
    /// An operand token failed to convert.
    OperandHydrate,
}

/// A fatal resolution error bound to the command where it happened.
#[derive(Debug, Error)]
#[error("command {command_name}: {cause}")]
pub struct Error {
    command: NodeId,
    command_name: String,
    #[source]
    cause: Cause,
}

impl Error {
    pub(crate) fn new(command: NodeId, command_name: &str, cause: Cause) -> Self {
        Self {
            command,
            command_name: command_name.to_string(),
            cause,
        }
    }

    /// The command at which resolution failed.
    pub fn command(&self) -> NodeId {
        self.command
    }

    /// Canonical name of [`command`](Self::command).
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// What went wrong.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Classification of [`cause`](Self::cause).
    pub fn kind(&self) -> ErrorKind {
        match &self.cause {
            Cause::SubcommandRequired => ErrorKind::SubcommandRequired,
            Cause::Flag(FlagError::Unrecognized { .. }) => ErrorKind::FlagUnrecognized,
            Cause::Flag(FlagError::MissingValue { .. }) => ErrorKind::FlagValueMissing,
            Cause::Flag(FlagError::Hydrate { .. }) => ErrorKind::FlagHydrate,
            Cause::Operand(OperandError::Missing { .. }) => ErrorKind::OperandMissing,
            Cause::Operand(OperandError::Hydrate { .. }) => ErrorKind::OperandHydrate,
        }
    }

    /// Name of the flag or operand involved, if any.
    pub fn subject(&self) -> Option<&str> {
        match &self.cause {
            Cause::SubcommandRequired => None,
            Cause::Flag(err) => Some(err.flag_name()),
            Cause::Operand(err) => Some(err.operand_name()),
        }
    }

    /// A plain-language message suitable for end users.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_router_core::{Command, Router, Slot};
    ///
    /// let count = Slot::new(0_i32);
    /// let mut root = Command::from_fn("app", |_| Ok(()));
    /// root.flag(&count, "count|c", "");
    /// let mut router = Router::new(root);
    ///
    /// let err = router.resolve(&["--count=many"]).unwrap_err();
    /// assert_eq!(
    ///     err.user_message(),
    ///     "Cannot process flag \"count\" (\"many\" is not a valid int32)"
    /// );
    /// ```
    pub fn user_message(&self) -> String {
        match &self.cause {
            Cause::SubcommandRequired => "A subcommand is required".to_string(),
            Cause::Flag(FlagError::Unrecognized { name }) => {
                format!("Unrecognized flag {name:?}")
            }
            Cause::Flag(FlagError::MissingValue { name }) => {
                format!("Flag {name:?} requires a value")
            }
            Cause::Flag(FlagError::Hydrate { name, source }) => {
                format!("Cannot process flag {name:?} ({})", describe(source))
            }
            Cause::Operand(OperandError::Missing { name }) => {
                format!("Operand {name:?} is required")
            }
            Cause::Operand(OperandError::Hydrate { name, source }) => {
                format!("Cannot process operand {name:?} ({})", describe(source))
            }
        }
    }
}

fn describe(err: &HydrateError) -> String {
    match err {
        HydrateError::Invalid { type_name, raw, .. } => {
            format!("{raw:?} is not a valid {type_name}")
        }
        HydrateError::Custom(source) => source.to_string(),
    }
}
