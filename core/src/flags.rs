//! Per-command flag tables and the flag tokenizer.
//!
//! A [`FlagSet`] holds the named options of one command. Flags registered
//! with [`FlagSet::flag_recursive`] are also recorded separately; those
//! records are copied onto every descendant command before any tokens are
//! parsed (see [`propagate_recursive_flags`]).
//!
//! # Syntax
//!
//! [`FlagSet::parse`] consumes the longest prefix of the arguments that
//! looks like flags:
//!
//! - `--name=value`, `--name value`, `-name=value`, `-name value`
//! - `-x value`, `-xvalue`, and clustered booleans such as `-xyz`
//! - boolean flags never consume the next token (`--verbose=false` works)
//! - `--` ends flag parsing and is consumed; a lone `-` is not a flag
//!
//! Parsing stops at the first token that is neither a flag nor a flag value;
//! that token and everything after it are returned untouched.

use std::collections::BTreeMap;
use std::iter;

use thiserror::Error;
use tracing::trace;

use crate::hydrate::{Destination, HydrateError};

/// Open metadata attached to flags, operands and commands.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Flag tokenizing or hydration failure.
#[derive(Debug, Error)]
pub enum FlagError {
    /// The token looks like a flag but no registered name matches.
    #[error("flag provided but not defined: -{name}")]
    Unrecognized {
        /// Name as written, without leading dashes.
        name: String,
    },
    /// A value-taking flag was the last token.
    #[error("flag needs an argument: -{name}")]
    MissingValue {
        /// Canonical flag name.
        name: String,
    },
    /// The flag's value could not be converted.
    #[error("invalid value for flag -{name}: {source}")]
    Hydrate {
        /// Canonical flag name.
        name: String,
        /// Underlying conversion failure.
        #[source]
        source: HydrateError,
    },
}

impl FlagError {
    /// Name of the offending flag.
    pub fn flag_name(&self) -> &str {
        match self {
            Self::Unrecognized { name }
            | Self::MissingValue { name }
            | Self::Hydrate { name, .. } => name,
        }
    }
}

/// A named option bound to a destination.
///
/// # Examples
///
/// ```
/// use command_router_core::{FlagSet, Slot};
///
/// let info = Slot::new(String::from("none"));
/// let mut flags = FlagSet::default();
/// flags
///     .flag(&info, "info|i", "Set additional info.")
///     .with_meta("group", "output");
///
/// let flag = flags.get("i").unwrap();
/// assert_eq!(flag.name(), "info");
/// assert_eq!(flag.aliases(), ["i"]);
/// assert_eq!(flag.default_text, "none");
/// assert_eq!(flag.meta["group"], "output");
/// ```
#[derive(Debug, Clone)]
pub struct Flag {
    names: Vec<String>,
    destination: Destination,
    /// Human-readable description.
    pub description: String,
    /// Type hint shown in usage text (e.g. `STRING`).
    pub type_name: String,
    /// Default value shown in usage text; empty for zero values.
    pub default_text: String,
    /// Omit from usage text.
    pub hidden: bool,
    /// Free-form data for custom renderers.
    pub meta: Meta,
}

impl Flag {
    fn new(destination: Destination, names: Vec<String>, description: &str) -> Self {
        let default_text = default_text(&destination);
        Self {
            names,
            type_name: destination.type_name().to_uppercase(),
            destination,
            description: description.to_string(),
            default_text,
            hidden: false,
            meta: Meta::new(),
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    /// Names after the canonical one.
    pub fn aliases(&self) -> &[String] {
        &self.names[1..]
    }

    /// Canonical name followed by aliases.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Where parsed values are written.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Returns `true` if `name` is the canonical name or an alias.
    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Hides the flag from usage text.
    pub fn hide(&mut self) -> &mut Self {
        self.hidden = true;
        self
    }

    /// Sets a metadata entry.
    pub fn with_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    fn copy_display(&mut self, source: &Flag) {
        self.description.clone_from(&source.description);
        self.type_name.clone_from(&source.type_name);
        self.default_text.clone_from(&source.default_text);
        self.hidden = source.hidden;
        for (key, value) in &source.meta {
            self.meta.insert(key.clone(), value.clone());
        }
    }
}

fn default_text(destination: &Destination) -> String {
    let text = destination.value_text();
    match destination {
        Destination::Text(_) => text,
        _ if matches!(text.as_str(), "false" | "0" | "0s") => String::new(),
        _ => text,
    }
}

/// Splits `"name|alias|alias"`; the first entry is always kept.
pub(crate) fn split_names(names: &str) -> Vec<String> {
    let mut parts = names.split('|').map(str::trim);
    let first = parts.next().unwrap_or_default().to_string();
    iter::once(first)
        .chain(parts.filter(|p| !p.is_empty()).map(String::from))
        .collect()
}

/// The flags of one command.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: Vec<Flag>,
    recursive: Vec<usize>,
}

impl FlagSet {
    /// Registers a flag. `names` is `|`-separated; the first is canonical.
    pub fn flag(
        &mut self,
        destination: impl Into<Destination>,
        names: &str,
        description: &str,
    ) -> &mut Flag {
        let index = self.push(destination.into(), names, description);
        &mut self.flags[index]
    }

    /// Registers a flag that every descendant command also accepts.
    ///
    /// The flag is visible in descendants only after
    /// [`Router::resolve`](crate::Router::resolve) has propagated it.
    pub fn flag_recursive(
        &mut self,
        destination: impl Into<Destination>,
        names: &str,
        description: &str,
    ) -> &mut Flag {
        let index = self.push(destination.into(), names, description);
        self.recursive.push(index);
        &mut self.flags[index]
    }

    fn push(&mut self, destination: Destination, names: &str, description: &str) -> usize {
        self.flags
            .push(Flag::new(destination, split_names(names), description));
        self.flags.len() - 1
    }

    /// All flags in registration order, including adopted recursive ones.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Flags registered on this table as recursive.
    pub fn recursive_flags(&self) -> impl Iterator<Item = &Flag> {
        self.recursive.iter().map(|&i| &self.flags[i])
    }

    /// A table holding clones of this table's recursive flags.
    pub(crate) fn recursive_only(&self) -> FlagSet {
        FlagSet {
            flags: self.recursive_flags().cloned().collect(),
            recursive: (0..self.recursive.len()).collect(),
        }
    }

    /// Finds a flag by canonical name or alias.
    pub fn get(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.matches(name))
    }

    /// Finds a flag by canonical name or alias for editing.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Flag> {
        self.flags.iter_mut().find(|f| f.matches(name))
    }

    /// Number of flags, adopted ones included.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the table holds no flags.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Accepts a recursive flag from an ancestor table.
    ///
    /// The adopted flag shares the source's destination and is not itself
    /// recursive. A flag with the same names writing to the same target is
    /// refreshed instead of duplicated.
    pub fn adopt_recursive(&mut self, source: &Flag) {
        let existing = self.flags.iter_mut().find(|f| {
            f.names == source.names && f.destination.same_target(&source.destination)
        });
        if let Some(flag) = existing {
            flag.copy_display(source);
            return;
        }

        let mut flag = Flag::new(
            source.destination.clone(),
            source.names.clone(),
            &source.description,
        );
        flag.copy_display(source);
        self.flags.push(flag);
    }

    /// Parses leading flag tokens and returns the unconsumed suffix.
    ///
    /// # Errors
    ///
    /// Fails on the first unrecognized flag, missing value or hydration
    /// error. Values of flags parsed before the failure stay written.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_router_core::{FlagSet, Slot};
    ///
    /// let verbose = Slot::new(false);
    /// let count = Slot::new(0_i32);
    /// let mut flags = FlagSet::default();
    /// flags.flag(&verbose, "verbose|v", "");
    /// flags.flag(&count, "count|n", "");
    ///
    /// let args: Vec<String> = ["-vn3", "run", "--count=9"]
    ///     .iter()
    ///     .map(|s| s.to_string())
    ///     .collect();
    /// let rest = flags.parse(&args).unwrap();
    ///
    /// assert!(verbose.get());
    /// assert_eq!(count.get(), 3);
    /// assert_eq!(rest, ["run", "--count=9"]);
    /// ```
    pub fn parse(&self, args: &[String]) -> Result<Vec<String>, FlagError> {
        let mut index = 0;
        while let Some(token) = args.get(index) {
            if token == "--" {
                index += 1;
                break;
            }
            let Some(body) = token.strip_prefix('-') else {
                break;
            };
            if body.is_empty() {
                break;
            }
            index += 1;

            let (long, body) = match body.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, body),
            };
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            if let Some(flag) = self.get(name) {
                let value = match inline {
                    Some(value) => value,
                    None if flag.destination.is_bool() => "true",
                    None => {
                        let value = args.get(index).ok_or_else(|| FlagError::MissingValue {
                            name: flag.name().to_string(),
                        })?;
                        index += 1;
                        value.as_str()
                    }
                };
                apply(flag, value)?;
            } else if !long && inline.is_none() && name.chars().count() > 1 {
                index = self.parse_cluster(name, args, index)?;
            } else {
                return Err(FlagError::Unrecognized {
                    name: name.to_string(),
                });
            }
        }

        Ok(args[index..].to_vec())
    }

    fn parse_cluster(
        &self,
        cluster: &str,
        args: &[String],
        mut index: usize,
    ) -> Result<usize, FlagError> {
        for (offset, ch) in cluster.char_indices() {
            let end = offset + ch.len_utf8();
            let name = &cluster[offset..end];
            let Some(flag) = self.get(name) else {
                let name = if offset == 0 { cluster } else { name };
                return Err(FlagError::Unrecognized {
                    name: name.to_string(),
                });
            };

            if flag.destination.is_bool() {
                apply(flag, "true")?;
                continue;
            }

            let rest = &cluster[end..];
            let value = if rest.is_empty() {
                let value = args.get(index).ok_or_else(|| FlagError::MissingValue {
                    name: flag.name().to_string(),
                })?;
                index += 1;
                value.as_str()
            } else {
                rest
            };
            apply(flag, value)?;
            break;
        }
        Ok(index)
    }
}

fn apply(flag: &Flag, value: &str) -> Result<(), FlagError> {
    trace!(flag = flag.name(), value, "hydrating flag");
    flag.destination
        .hydrate(value)
        .map_err(|source| FlagError::Hydrate {
            name: flag.name().to_string(),
            source,
        })
}

/// Registers every recursive flag of `source` on `destination`.
pub fn propagate_recursive_flags(source: &FlagSet, destination: &mut FlagSet) {
    for flag in source.recursive_flags() {
        destination.adopt_recursive(flag);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::Slot;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_names_drops_empty_aliases() {
        assert_eq!(split_names("hello|hi||hey"), vec!["hello", "hi", "hey"]);
        assert_eq!(split_names(""), vec![""]);
    }

    #[test]
    fn test_long_forms() {
        let info = Slot::new(String::new());
        let wait = Slot::new(Duration::ZERO);
        let mut flags = FlagSet::default();
        flags.flag(&info, "info", "");
        flags.flag(&wait, "wait|w", "");

        let rest = flags
            .parse(&args(&["--info=a=b", "-wait", "2s", "op"]))
            .unwrap();

        assert_eq!(info.get(), "a=b");
        assert_eq!(wait.get(), Duration::from_secs(2));
        assert_eq!(rest, ["op"]);
    }

    #[test]
    fn test_bool_does_not_consume_next_token() {
        let verbose = Slot::new(true);
        let mut flags = FlagSet::default();
        flags.flag(&verbose, "verbose|v", "");

        let rest = flags.parse(&args(&["--verbose=false", "-v", "false"])).unwrap();
        assert!(verbose.get());
        assert_eq!(rest, ["false"]);
    }

    #[test]
    fn test_double_dash_terminates() {
        let verbose = Slot::new(false);
        let mut flags = FlagSet::default();
        flags.flag(&verbose, "v", "");

        let rest = flags.parse(&args(&["--", "-v"])).unwrap();
        assert!(!verbose.get());
        assert_eq!(rest, ["-v"]);

        let rest = flags.parse(&args(&["-", "-v"])).unwrap();
        assert_eq!(rest, ["-", "-v"]);
    }

    #[test]
    fn test_cluster_value_takes_next_token() {
        let all = Slot::new(false);
        let name = Slot::new(String::new());
        let mut flags = FlagSet::default();
        flags.flag(&all, "a", "");
        flags.flag(&name, "n", "");

        let rest = flags.parse(&args(&["-an", "x", "y"])).unwrap();
        assert!(all.get());
        assert_eq!(name.get(), "x");
        assert_eq!(rest, ["y"]);
    }

    #[test]
    fn test_unrecognized_names() {
        let all = Slot::new(false);
        let mut flags = FlagSet::default();
        flags.flag(&all, "a", "");

        let err = flags.parse(&args(&["--bogus"])).unwrap_err();
        assert!(matches!(err, FlagError::Unrecognized { ref name } if name == "bogus"));

        let err = flags.parse(&args(&["-ax"])).unwrap_err();
        assert_eq!(err.flag_name(), "x");

        let err = flags.parse(&args(&["-xa"])).unwrap_err();
        assert_eq!(err.flag_name(), "xa");
    }

    #[test]
    fn test_missing_value() {
        let count = Slot::new(0_u8);
        let mut flags = FlagSet::default();
        flags.flag(&count, "count|c", "");

        let err = flags.parse(&args(&["-c"])).unwrap_err();
        assert!(matches!(err, FlagError::MissingValue { ref name } if name == "count"));
    }

    #[test]
    fn test_hydrate_error_names_canonical_flag() {
        let count = Slot::new(0_u8);
        let mut flags = FlagSet::default();
        flags.flag(&count, "count|c", "");

        let err = flags.parse(&args(&["-c", "300"])).unwrap_err();
        assert!(matches!(err, FlagError::Hydrate { ref name, .. } if name == "count"));
    }

    #[test]
    fn test_default_text_hides_zero_values() {
        let mut flags = FlagSet::default();
        flags.flag(&Slot::new(false), "a", "");
        flags.flag(&Slot::new(0_i64), "b", "");
        flags.flag(&Slot::new(Duration::from_secs(90)), "c", "");

        let texts: Vec<&str> = flags.flags().iter().map(|f| f.default_text.as_str()).collect();
        assert_eq!(texts, ["", "", "1m30s"]);
        assert_eq!(flags.flags()[2].type_name, "DURATION");
    }

    #[test]
    fn test_propagation_shares_destination_and_dedupes() {
        let verbose = Slot::new(false);
        let mut parent = FlagSet::default();
        parent
            .flag_recursive(&verbose, "verbose|v", "Be loud.")
            .with_meta("scope", "global");

        let mut child = FlagSet::default();
        propagate_recursive_flags(&parent, &mut child);
        parent.get_mut("v").unwrap().with_meta("late", true);
        propagate_recursive_flags(&parent, &mut child);

        assert_eq!(child.len(), 1);
        assert_eq!(child.recursive_flags().count(), 0);
        let adopted = child.get("verbose").unwrap();
        assert_eq!(adopted.description, "Be loud.");
        assert_eq!(adopted.meta["scope"], "global");
        assert_eq!(adopted.meta["late"], true);

        child.parse(&args(&["-v"])).unwrap();
        assert!(verbose.get());
    }
}
