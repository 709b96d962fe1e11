//! Ordered positional operands.

use thiserror::Error;
use tracing::trace;

use crate::flags::Meta;
use crate::hydrate::{Destination, HydrateError};

/// Operand resolution failure.
#[derive(Debug, Error)]
pub enum OperandError {
    /// A required operand had no token.
    #[error("operand {name} is required")]
    Missing {
        /// Operand name.
        name: String,
    },
    /// The operand's token could not be converted.
    #[error("invalid value for operand {name}: {source}")]
    Hydrate {
        /// Operand name.
        name: String,
        /// Underlying conversion failure.
        #[source]
        source: HydrateError,
    },
}

impl OperandError {
    /// Name of the offending operand.
    pub fn operand_name(&self) -> &str {
        match self {
            Self::Missing { name } | Self::Hydrate { name, .. } => name,
        }
    }
}

/// A positional parameter.
#[derive(Debug, Clone)]
pub struct Operand {
    name: String,
    hint: String,
    destination: Destination,
    /// Whether resolution fails when no token is present.
    pub required: bool,
    /// Human-readable description.
    pub description: String,
    /// Free-form data for custom renderers.
    pub meta: Meta,
}

impl Operand {
    /// Name used in hints and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>` for required operands, `[name]` for optional ones.
    ///
    /// Fixed at registration; later changes to [`required`](Self::required)
    /// do not affect it.
    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// Where the bound token is written.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Sets a metadata entry.
    pub fn with_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

/// The operands of one command, in declaration order.
///
/// # Examples
///
/// ```
/// use command_router_core::{OperandSet, Slot};
///
/// let first = Slot::new(String::new());
/// let second = Slot::new(String::from("default"));
/// let mut operands = OperandSet::default();
/// operands.operand(&first, true, "first", "");
/// operands.operand(&second, false, "second", "");
///
/// operands.resolve(&["hello".to_string()]).unwrap();
/// assert_eq!(first.get(), "hello");
/// assert_eq!(second.get(), "default");
///
/// let err = operands.resolve(&[]).unwrap_err();
/// assert_eq!(err.operand_name(), "first");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperandSet {
    operands: Vec<Operand>,
}

impl OperandSet {
    /// Appends an operand.
    pub fn operand(
        &mut self,
        destination: impl Into<Destination>,
        required: bool,
        name: &str,
        description: &str,
    ) -> &mut Operand {
        let hint = if required {
            format!("<{name}>")
        } else {
            format!("[{name}]")
        };
        self.operands.push(Operand {
            name: name.to_string(),
            hint,
            destination: destination.into(),
            required,
            description: description.to_string(),
            meta: Meta::new(),
        });
        let last = self.operands.len() - 1;
        &mut self.operands[last]
    }

    /// Operands in registration order.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Finds an operand by name.
    pub fn get(&self, name: &str) -> Option<&Operand> {
        self.operands.iter().find(|o| o.name == name)
    }

    /// Finds an operand by name for editing.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Operand> {
        self.operands.iter_mut().find(|o| o.name == name)
    }

    /// Number of declared operands.
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    /// Whether no operands are declared.
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Hydrates operands from `tokens` positionally.
    ///
    /// Stops at the first operand without a token: a required one fails with
    /// [`OperandError::Missing`], an optional one keeps its current value
    /// along with every operand after it. Tokens beyond the declared
    /// operands are ignored.
    pub fn resolve(&self, tokens: &[String]) -> Result<(), OperandError> {
        for (index, operand) in self.operands.iter().enumerate() {
            let Some(raw) = tokens.get(index) else {
                if operand.required {
                    return Err(OperandError::Missing {
                        name: operand.name.clone(),
                    });
                }
                break;
            };

            trace!(operand = %operand.name, value = %raw, "hydrating operand");
            operand
                .destination
                .hydrate(raw)
                .map_err(|source| OperandError::Hydrate {
                    name: operand.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Slot;

    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_hint_is_fixed_at_registration() {
        let mut operands = OperandSet::default();
        let op = operands.operand(&Slot::new(String::new()), true, "path", "");
        assert_eq!(op.hint(), "<path>");

        op.required = false;
        assert_eq!(operands.get("path").unwrap().hint(), "<path>");
    }

    #[test]
    fn test_missing_required_stops_before_later_operands() {
        let first = Slot::new(String::from("a"));
        let second = Slot::new(String::from("b"));
        let third = Slot::new(String::from("c"));
        let mut operands = OperandSet::default();
        operands.operand(&first, false, "first", "");
        operands.operand(&second, true, "second", "");
        operands.operand(&third, false, "third", "");

        let err = operands.resolve(&tokens(&["x"])).unwrap_err();
        assert!(matches!(err, OperandError::Missing { ref name } if name == "second"));
        assert_eq!(first.get(), "x");
        assert_eq!(third.get(), "c");
    }

    #[test]
    fn test_optional_gap_stops_without_error() {
        let first = Slot::new(0_u32);
        let second = Slot::new(7_u32);
        let mut operands = OperandSet::default();
        operands.operand(&first, false, "first", "");
        operands.operand(&second, true, "second", "");

        operands.resolve(&[]).unwrap();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 7);
    }

    #[test]
    fn test_extra_tokens_are_ignored() {
        let only = Slot::new(String::new());
        let mut operands = OperandSet::default();
        operands.operand(&only, true, "only", "");

        operands.resolve(&tokens(&["one", "two", "three"])).unwrap();
        assert_eq!(only.get(), "one");
    }

    #[test]
    fn test_hydrate_failure_names_operand() {
        let port = Slot::new(0_u16);
        let mut operands = OperandSet::default();
        operands.operand(&port, true, "port", "");

        let err = operands.resolve(&tokens(&["http"])).unwrap_err();
        assert_eq!(err.operand_name(), "port");
        assert!(matches!(err, OperandError::Hydrate { .. }));
    }
}
