//! Command tree descriptions loaded from YAML or JSON.
//!
//! A description is turned into a [`Router`] whose flags and operands write
//! into slots owned by the [`LoadedTree`], so a resolution can be reported
//! back as plain data.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use command_router_core::{
    BoxError, Command, Context, Destination, HydrateError, NodeId, Router, Slot, format_duration,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from loading a tree description.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported tree file extension {0:?} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("default for {name:?} must be a string, number or boolean")]
    NonScalarDefault { name: String },

    #[error("invalid default for {name:?}: {source}")]
    InvalidDefault {
        name: String,
        #[source]
        source: HydrateError,
    },
}

/// Value types a description can declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    Bool,
    Int,
    Uint,
    Float,
    Duration,
    /// Every occurrence appends to a list of strings.
    List,
}

/// One command of a description, with its subcommands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeSpec {
    /// `|`-separated name and aliases.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_order: Vec<String>,
    #[serde(default)]
    pub subcommand_required: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub flags: Vec<FlagSpec>,
    #[serde(default)]
    pub operands: Vec<OperandSpec>,
    #[serde(default)]
    pub subcommands: Vec<TreeSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagSpec {
    /// `|`-separated canonical name and aliases.
    pub names: String,
    #[serde(rename = "type", default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperandSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub description: String,
}

impl TreeSpec {
    /// Reads a description, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let text = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match extension {
            "json" => Ok(serde_json::from_str(&text)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(&text)?),
            other => Err(TreeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Storage behind a flag or operand of a loaded tree.
#[derive(Debug, Clone)]
enum Value {
    Text(Slot<String>),
    Bool(Slot<bool>),
    Int(Slot<i64>),
    Uint(Slot<u64>),
    Float(Slot<f64>),
    Duration(Slot<Duration>),
    List(Slot<Vec<String>>),
}

impl Value {
    fn new(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Self::Text(Slot::default()),
            ValueKind::Bool => Self::Bool(Slot::default()),
            ValueKind::Int => Self::Int(Slot::default()),
            ValueKind::Uint => Self::Uint(Slot::default()),
            ValueKind::Float => Self::Float(Slot::default()),
            ValueKind::Duration => Self::Duration(Slot::default()),
            ValueKind::List => Self::List(Slot::default()),
        }
    }

    fn destination(&self) -> Destination {
        match self {
            Self::Text(slot) => slot.into(),
            Self::Bool(slot) => slot.into(),
            Self::Int(slot) => slot.into(),
            Self::Uint(slot) => slot.into(),
            Self::Float(slot) => slot.into(),
            Self::Duration(slot) => slot.into(),
            Self::List(slot) => {
                let items = slot.clone();
                Destination::setter(move |raw| {
                    items.update(|list| list.push(raw.to_string()));
                    Ok(())
                })
            }
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Self::Text(slot) => JsonValue::from(slot.get()),
            Self::Bool(slot) => JsonValue::from(slot.get()),
            Self::Int(slot) => JsonValue::from(slot.get()),
            Self::Uint(slot) => JsonValue::from(slot.get()),
            Self::Float(slot) => JsonValue::from(slot.get()),
            Self::Duration(slot) => JsonValue::from(format_duration(slot.get())),
            Self::List(slot) => JsonValue::from(slot.get()),
        }
    }
}

/// A value and the destination handle registered for it.
struct Binding {
    value: Value,
    destination: Destination,
}

impl Binding {
    fn new(kind: ValueKind, name: &str, default: Option<&JsonValue>) -> Result<Self, TreeError> {
        let value = Value::new(kind);
        let destination = value.destination();

        if let Some(default) = default {
            let raw = match default {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                _ => {
                    return Err(TreeError::NonScalarDefault {
                        name: name.to_string(),
                    });
                }
            };
            destination
                .hydrate(&raw)
                .map_err(|source| TreeError::InvalidDefault {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(Self { value, destination })
    }
}

/// What a successful resolution produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Canonical names from the root to the resolved command.
    pub command: Vec<String>,
    /// Flag values of the resolved command by canonical name.
    pub flags: BTreeMap<String, JsonValue>,
    /// Operand values of the resolved command by name.
    pub operands: BTreeMap<String, JsonValue>,
}

/// A router built from a [`TreeSpec`] together with the values it writes.
pub struct LoadedTree {
    pub router: Router,
    bindings: Vec<Binding>,
}

impl LoadedTree {
    /// Loads and builds a description file.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let spec = TreeSpec::load(path)?;
        debug!(path = %path.display(), root = %spec.name, "loaded tree description");
        Self::build(&spec)
    }

    /// Builds a router from a description.
    pub fn build(spec: &TreeSpec) -> Result<Self, TreeError> {
        let mut bindings = Vec::new();
        let root = build_command(spec, &mut bindings)?;
        Ok(Self {
            router: Router::new(root),
            bindings,
        })
    }

    fn value_of(&self, destination: &Destination) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|b| b.destination.same_target(destination))
            .map(|b| &b.value)
    }

    /// Current values of `id`'s flags and operands.
    pub fn report(&self, id: NodeId) -> Report {
        let node = self.router.node(id);
        let command = self
            .router
            .lineage(id)
            .into_iter()
            .map(|ancestor| self.router.node(ancestor).name().to_string())
            .collect();

        let flags = node
            .flags
            .flags()
            .iter()
            .filter_map(|flag| {
                let value = self.value_of(flag.destination())?;
                Some((flag.name().to_string(), value.to_json()))
            })
            .collect();

        let operands = node
            .operands
            .operands()
            .iter()
            .filter_map(|operand| {
                let value = self.value_of(operand.destination())?;
                Some((operand.name().to_string(), value.to_json()))
            })
            .collect();

        Report {
            command,
            flags,
            operands,
        }
    }
}

fn log_invocation(ctx: &Context<'_>) -> Result<(), BoxError> {
    info!(command = %ctx.path().join(" "), "command invoked");
    Ok(())
}

fn build_command(spec: &TreeSpec, bindings: &mut Vec<Binding>) -> Result<Command, TreeError> {
    let mut command = Command::from_fn(&spec.name, log_invocation)
        .with_description(&spec.description)
        .with_category(&spec.category)
        .with_category_order(spec.category_order.iter().cloned());
    if spec.subcommand_required {
        command = command.require_subcommand();
    }
    if spec.hidden {
        command = command.hidden();
    }

    for flag in &spec.flags {
        let binding = Binding::new(flag.kind, &flag.names, flag.default.as_ref())?;
        let destination = binding.destination.clone();
        let registered = if flag.recursive {
            command.flag_recursive(destination, &flag.names, &flag.description)
        } else {
            command.flag(destination, &flag.names, &flag.description)
        };
        if flag.hidden {
            registered.hide();
        }
        bindings.push(binding);
    }

    for operand in &spec.operands {
        let binding = Binding::new(operand.kind, &operand.name, operand.default.as_ref())?;
        command.operand(
            binding.destination.clone(),
            operand.required,
            &operand.name,
            &operand.description,
        );
        bindings.push(binding);
    }

    for sub in &spec.subcommands {
        command = command.with_subcommand(build_command(sub, bindings)?);
    }
    Ok(command)
}
