//! Conversion of raw string tokens into typed destinations.
//!
//! Every flag and operand is bound to a [`Destination`]. The set of
//! destination kinds is closed: text, bool, the integer family, float,
//! duration, a [`TextCodec`] implementation, or a [`Setter`] function. A value
//! can only become a destination through one of the `From` impls or the
//! [`Destination::codec`] / [`Destination::setter`] constructors, so an
//! unsupported destination type is a compile error rather than a silent
//! no-op at parse time.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use command_router_core::{Destination, Slot};
//!
//! let timeout = Slot::new(Duration::ZERO);
//! let dest = Destination::from(&timeout);
//! dest.hydrate("1h30m").unwrap();
//! assert_eq!(timeout.get(), Duration::from_secs(90 * 60));
//!
//! let port = Slot::new(0_u16);
//! let dest = Destination::from(&port);
//! assert!(dest.hydrate("70000").is_err());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::Slot;

/// Error type for caller-owned logic (handlers, setters, codecs).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to convert a raw token into a destination value.
#[derive(Debug, Error)]
pub enum HydrateError {
    /// A built-in conversion (bool, number, duration) rejected the token.
    #[error("invalid {type_name} value {raw:?}: {source}")]
    Invalid {
        /// Logical name of the destination type (e.g. `int64`).
        type_name: &'static str,
        /// The token that failed to convert.
        raw: String,
        /// The underlying parse error.
        #[source]
        source: BoxError,
    },
    /// A codec or setter rejected the token; its error is kept as is.
    #[error(transparent)]
    Custom(BoxError),
}

impl HydrateError {
    fn invalid(
        type_name: &'static str,
        raw: &str,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Invalid {
            type_name,
            raw: raw.to_string(),
            source: source.into(),
        }
    }
}

/// A value that can render itself as text and parse itself back.
///
/// # Examples
///
/// ```
/// use command_router_core::{BoxError, Destination, Slot, TextCodec};
///
/// #[derive(Debug, Default)]
/// struct Level(u8);
///
/// impl TextCodec for Level {
///     fn encode(&self) -> String {
///         ["low", "high"][self.0 as usize].to_string()
///     }
///
///     fn decode(&mut self, raw: &str) -> Result<(), BoxError> {
///         self.0 = match raw {
///             "low" => 0,
///             "high" => 1,
///             _ => return Err(format!("unknown level {raw}").into()),
///         };
///         Ok(())
///     }
/// }
///
/// let level = Slot::new(Level::default());
/// let dest = Destination::codec(&level);
/// dest.hydrate("high").unwrap();
/// assert_eq!(level.borrow().0, 1);
/// assert_eq!(dest.value_text(), "high");
/// ```
pub trait TextCodec {
    /// Renders the current value.
    fn encode(&self) -> String;

    /// Replaces the current value with the parsed token.
    fn decode(&mut self, raw: &str) -> Result<(), BoxError>;
}

/// A single-argument function invoked with the raw token.
#[derive(Clone)]
pub struct Setter(Rc<dyn Fn(&str) -> Result<(), BoxError>>);

impl Setter {
    fn same_fn(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

macro_rules! int_slots {
    ($($variant:ident($ty:ty) => $name:literal),* $(,)?) => {
        /// A destination in the integer family.
        #[derive(Debug, Clone)]
        pub enum IntSlot {
            $(
                #[allow(missing_docs)]
                $variant(Slot<$ty>),
            )*
        }

        impl IntSlot {
            fn hydrate(&self, raw: &str) -> Result<(), HydrateError> {
                match self {
                    $(Self::$variant(slot) => {
                        let value = raw
                            .parse::<$ty>()
                            .map_err(|e| HydrateError::invalid($name, raw, e))?;
                        slot.set(value);
                    })*
                }
                Ok(())
            }

            fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $name,)*
                }
            }

            fn value_text(&self) -> String {
                match self {
                    $(Self::$variant(slot) => slot.get().to_string(),)*
                }
            }

            fn same_target(&self, other: &Self) -> bool {
                match (self, other) {
                    $((Self::$variant(a), Self::$variant(b)) => a.same_slot(b),)*
                    _ => false,
                }
            }
        }

        $(
            impl From<&Slot<$ty>> for Destination {
                fn from(slot: &Slot<$ty>) -> Self {
                    Destination::Int(IntSlot::$variant(slot.clone()))
                }
            }
        )*
    };
}

int_slots! {
    I8(i8) => "int8",
    I16(i16) => "int16",
    I32(i32) => "int32",
    I64(i64) => "int64",
    Isize(isize) => "int",
    U8(u8) => "uint8",
    U16(u16) => "uint16",
    U32(u32) => "uint32",
    U64(u64) => "uint64",
    Usize(usize) => "uint",
}

/// Where a flag or operand writes its value.
///
/// Variants are listed in hydration priority order.
#[derive(Clone)]
pub enum Destination {
    /// Verbatim text.
    Text(Slot<String>),
    /// `true`/`false` and their common short forms.
    Bool(Slot<bool>),
    /// Signed or unsigned integer of a fixed width.
    Int(IntSlot),
    /// Decimal or exponential float.
    Float(Slot<f64>),
    /// Composite duration such as `1h30m` or `250ms`.
    Duration(Slot<Duration>),
    /// Custom type parsed through [`TextCodec::decode`].
    Codec(Slot<dyn TextCodec>),
    /// Caller function receiving the raw token.
    Setter(Setter),
}

impl Destination {
    /// Binds a [`TextCodec`] value.
    pub fn codec<T: TextCodec + 'static>(slot: &Slot<T>) -> Self {
        let shared: Rc<RefCell<dyn TextCodec>> = slot.0.clone();
        Self::Codec(Slot(shared))
    }

    /// Binds a function that receives each raw token.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_router_core::{Destination, Slot};
    ///
    /// let tags = Slot::new(Vec::<String>::new());
    /// let sink = tags.clone();
    /// let dest = Destination::setter(move |raw| {
    ///     sink.update(|v| v.push(raw.to_string()));
    ///     Ok(())
    /// });
    /// dest.hydrate("a").unwrap();
    /// dest.hydrate("b").unwrap();
    /// assert_eq!(tags.get(), vec!["a", "b"]);
    /// ```
    pub fn setter<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<(), BoxError> + 'static,
    {
        Self::Setter(Setter(Rc::new(f)))
    }

    /// Converts `raw` and writes it through the destination.
    ///
    /// # Errors
    ///
    /// Returns [`HydrateError::Invalid`] when a built-in conversion fails and
    /// [`HydrateError::Custom`] with the caller's own error for codecs and
    /// setters.
    pub fn hydrate(&self, raw: &str) -> Result<(), HydrateError> {
        match self {
            Self::Text(slot) => slot.set(raw.to_string()),
            Self::Bool(slot) => {
                let value = parse_bool(raw)
                    .ok_or_else(|| HydrateError::invalid("bool", raw, "expected true or false"))?;
                slot.set(value);
            }
            Self::Int(int) => int.hydrate(raw)?,
            Self::Float(slot) => {
                let value = raw
                    .parse::<f64>()
                    .map_err(|e| HydrateError::invalid("float64", raw, e))?;
                slot.set(value);
            }
            Self::Duration(slot) => {
                let value =
                    parse_duration(raw).map_err(|e| HydrateError::invalid("duration", raw, e))?;
                slot.set(value);
            }
            Self::Codec(slot) => slot
                .0
                .borrow_mut()
                .decode(raw)
                .map_err(HydrateError::Custom)?,
            Self::Setter(setter) => (setter.0)(raw).map_err(HydrateError::Custom)?,
        }
        Ok(())
    }

    /// Logical type name used in errors and usage text.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int(int) => int.type_name(),
            Self::Float(_) => "float64",
            Self::Duration(_) => "duration",
            Self::Codec(_) => "value",
            Self::Setter(_) => "func",
        }
    }

    /// Boolean destinations do not consume a value token as flags.
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Current value rendered as text.
    pub fn value_text(&self) -> String {
        match self {
            Self::Text(slot) => slot.get(),
            Self::Bool(slot) => slot.get().to_string(),
            Self::Int(int) => int.value_text(),
            Self::Float(slot) => slot.get().to_string(),
            Self::Duration(slot) => format_duration(slot.get()),
            Self::Codec(slot) => slot.0.borrow().encode(),
            Self::Setter(_) => String::new(),
        }
    }

    /// Returns `true` when both destinations write to the same memory.
    pub fn same_target(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.same_slot(b),
            (Self::Bool(a), Self::Bool(b)) => a.same_slot(b),
            (Self::Int(a), Self::Int(b)) => a.same_target(b),
            (Self::Float(a), Self::Float(b)) => a.same_slot(b),
            (Self::Duration(a), Self::Duration(b)) => a.same_slot(b),
            (Self::Codec(a), Self::Codec(b)) => a.same_slot(b),
            (Self::Setter(a), Self::Setter(b)) => a.same_fn(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("type", &self.type_name())
            .field("value", &self.value_text())
            .finish()
    }
}

impl From<&Slot<String>> for Destination {
    fn from(slot: &Slot<String>) -> Self {
        Self::Text(slot.clone())
    }
}

impl From<&Slot<bool>> for Destination {
    fn from(slot: &Slot<bool>) -> Self {
        Self::Bool(slot.clone())
    }
}

impl From<&Slot<f64>> for Destination {
    fn from(slot: &Slot<f64>) -> Self {
        Self::Float(slot.clone())
    }
}

impl From<&Slot<Duration>> for Destination {
    fn from(slot: &Slot<Duration>) -> Self {
        Self::Duration(slot.clone())
    }
}

/// Parses the common truthy/falsy spellings.
///
/// # Examples
///
/// ```
/// use command_router_core::parse_bool;
///
/// assert_eq!(parse_bool("T"), Some(true));
/// assert_eq!(parse_bool("False"), Some(false));
/// assert_eq!(parse_bool("yes"), None);
/// ```
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Reasons a duration token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The token is empty or does not follow `<number><unit>...`.
    #[error("malformed duration")]
    Malformed,
    /// The token starts with `-`.
    #[error("negative durations are not supported")]
    Negative,
    /// The total does not fit in 64 bits of nanoseconds.
    #[error("duration out of range")]
    Overflow,
}

static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]*)(?:\.([0-9]*))?(ns|us|µs|μs|ms|s|m|h)").expect("valid duration regex")
});

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        _ => 3_600 * 1_000_000_000,
    }
}

/// Parses a duration such as `1h30m`, `1.5s` or `250ms`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use command_router_core::parse_duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
/// assert!(parse_duration("10").is_err());
/// ```
pub fn parse_duration(raw: &str) -> Result<Duration, DurationError> {
    let mut rest = raw.strip_prefix('+').unwrap_or(raw);
    if rest.starts_with('-') {
        return Err(DurationError::Negative);
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Malformed);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = DURATION_PART
            .captures(rest)
            .ok_or(DurationError::Malformed)?;
        let whole = caps.get(1).map_or("", |m| m.as_str());
        let fraction = caps.get(2).map_or("", |m| m.as_str());
        if whole.is_empty() && fraction.is_empty() {
            return Err(DurationError::Malformed);
        }

        let unit = unit_nanos(&caps[3]);
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| DurationError::Overflow)?
        };
        let mut part = whole.checked_mul(unit).ok_or(DurationError::Overflow)?;

        let mut scale = unit;
        for digit in fraction.bytes() {
            scale /= 10;
            if scale == 0 {
                break;
            }
            part = part
                .checked_add(u128::from(digit - b'0') * scale)
                .ok_or(DurationError::Overflow)?;
        }

        total = total.checked_add(part).ok_or(DurationError::Overflow)?;
        rest = &rest[caps[0].len()..];
    }

    let nanos = u64::try_from(total).map_err(|_| DurationError::Overflow)?;
    Ok(Duration::from_nanos(nanos))
}

/// Renders a duration in the same grammar [`parse_duration`] accepts.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use command_router_core::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
/// assert_eq!(format_duration(Duration::from_micros(250)), "250µs");
/// assert_eq!(format_duration(Duration::ZERO), "0s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    const SECOND: u128 = 1_000_000_000;

    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < SECOND {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let secs = nanos / SECOND;
    let (hours, minutes, seconds) = (secs / 3_600, secs % 3_600 / 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&decimal(seconds * SECOND + nanos % SECOND, SECOND));
    out.push('s');
    out
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
