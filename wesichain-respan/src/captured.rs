//! Owned snapshots of values crossing an SDK boundary.
//!
//! SDK responses arrive as plain mappings, typed objects with attributes, or
//! enumerated wrappers. [`Captured`] holds all three in one tree so the
//! extractor can probe fields without knowing which shape it was handed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Number, Value};

/// Recursion bound for [`Captured::to_json`].
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Keyword arguments retained from an intercepted call.
pub type CallArgs = BTreeMap<String, Captured>;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Captured {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Captured>),
    Map(BTreeMap<String, Captured>),
    /// A typed object: class name plus its public attributes.
    Object {
        class: String,
        attrs: BTreeMap<String, Captured>,
    },
    /// An enumerated value wrapper, e.g. `ResponseMode::Streaming => "streaming"`.
    Enum { name: String, value: Box<Captured> },
}

impl Captured {
    pub fn object<K: Into<String>>(
        class: impl Into<String>,
        attrs: impl IntoIterator<Item = (K, Captured)>,
    ) -> Self {
        Captured::Object {
            class: class.into(),
            attrs: attrs
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    pub fn enumeration(name: impl Into<String>, value: impl Into<Captured>) -> Self {
        Captured::Enum {
            name: name.into(),
            value: Box::new(value.into()),
        }
    }

    /// Snapshot a serializable SDK type as a typed object named `class`.
    ///
    /// Struct fields become attributes; values that do not serialize to a JSON
    /// object are captured as-is, and serialization failures capture as `Null`.
    pub fn from_serialize<T: Serialize + ?Sized>(class: impl Into<String>, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Captured::Object {
                class: class.into(),
                attrs: map
                    .into_iter()
                    .map(|(key, value)| (key, Captured::from(value)))
                    .collect(),
            },
            Ok(other) => Captured::from(other),
            Err(err) => {
                tracing::debug!(error = %err, "value could not be captured");
                Captured::Null
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Captured::Null)
    }

    /// `Null` and the empty string both count as "no value" during probing.
    pub fn is_empty(&self) -> bool {
        match self {
            Captured::Null => true,
            Captured::String(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_list(&self) -> Option<&[Captured]> {
        match self {
            Captured::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Captured::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Captured::Object { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Strip enumerated-value wrappers down to the underlying value.
    pub fn unwrap_enum(&self) -> &Captured {
        let mut current = self;
        while let Captured::Enum { value, .. } = current {
            current = value;
        }
        current
    }

    /// Render as text: strings verbatim, everything else as JSON.
    pub fn to_text(&self) -> String {
        match self.unwrap_enum() {
            Captured::String(text) => text.clone(),
            other => other.to_json().to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        self.to_json_bounded(DEFAULT_MAX_DEPTH)
    }

    /// Convert to JSON, recursing at most `depth` levels. Past the bound,
    /// containers keep one level of keys and their children collapse to
    /// strings.
    pub fn to_json_bounded(&self, depth: usize) -> Value {
        if depth == 0 {
            return self.flatten();
        }
        match self {
            Captured::Null => Value::Null,
            Captured::Bool(flag) => Value::Bool(*flag),
            Captured::Number(number) => Value::Number(number.clone()),
            Captured::String(text) => Value::String(text.clone()),
            Captured::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json_bounded(depth - 1))
                    .collect(),
            ),
            Captured::Map(entries) | Captured::Object { attrs: entries, .. } => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json_bounded(depth - 1)))
                    .collect(),
            ),
            Captured::Enum { value, .. } => value.to_json_bounded(depth - 1),
        }
    }

    fn flatten(&self) -> Value {
        match self.unwrap_enum() {
            Captured::Null => Value::Null,
            Captured::Bool(flag) => Value::Bool(*flag),
            Captured::Number(number) => Value::Number(number.clone()),
            Captured::String(text) => Value::String(text.clone()),
            Captured::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Value::String(item.summary()))
                    .collect(),
            ),
            Captured::Map(entries) | Captured::Object { attrs: entries, .. } => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::String(value.summary())))
                    .collect(),
            ),
            Captured::Enum { .. } => Value::Null,
        }
    }

    fn summary(&self) -> String {
        match self.unwrap_enum() {
            Captured::Null => "null".to_string(),
            Captured::Bool(flag) => flag.to_string(),
            Captured::Number(number) => number.to_string(),
            Captured::String(text) => text.clone(),
            Captured::List(items) => format!("[{} items]", items.len()),
            Captured::Map(entries) => format!("{{{} keys}}", entries.len()),
            Captured::Object { class, .. } => format!("<{class}>"),
            Captured::Enum { name, .. } => name.clone(),
        }
    }
}

impl From<Value> for Captured {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Captured::Null,
            Value::Bool(flag) => Captured::Bool(flag),
            Value::Number(number) => Captured::Number(number),
            Value::String(text) => Captured::String(text),
            Value::Array(items) => Captured::List(items.into_iter().map(Captured::from).collect()),
            Value::Object(map) => Captured::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Captured::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Captured {
    fn from(value: &str) -> Self {
        Captured::String(value.to_string())
    }
}

impl From<String> for Captured {
    fn from(value: String) -> Self {
        Captured::String(value)
    }
}

impl From<bool> for Captured {
    fn from(value: bool) -> Self {
        Captured::Bool(value)
    }
}

impl From<i64> for Captured {
    fn from(value: i64) -> Self {
        Captured::Number(value.into())
    }
}

impl From<u64> for Captured {
    fn from(value: u64) -> Self {
        Captured::Number(value.into())
    }
}

impl From<Vec<Captured>> for Captured {
    fn from(items: Vec<Captured>) -> Self {
        Captured::List(items)
    }
}

impl From<Captured> for Value {
    fn from(value: Captured) -> Self {
        value.to_json()
    }
}

/// Structured field lookup over mappings and attribute-bearing objects.
///
/// Missing fields and explicit nulls both read as `None`; lookups never fail.
pub trait FieldAccess {
    fn field(&self, name: &str) -> Option<&Captured>;

    fn path(&self, path: &[&str]) -> Option<&Captured> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.field(first)?, |current, part| current.field(part))
    }

    fn first_non_empty(&self, paths: &[&[&str]]) -> Option<&Captured> {
        paths
            .iter()
            .filter_map(|path| self.path(path))
            .find(|value| !value.is_empty())
    }
}

impl FieldAccess for Captured {
    fn field(&self, name: &str) -> Option<&Captured> {
        let value = match self {
            Captured::Map(entries) => entries.get(name),
            Captured::Object { attrs, .. } => attrs.get(name),
            _ => None,
        }?;
        (!value.is_null()).then_some(value)
    }
}

impl FieldAccess for CallArgs {
    fn field(&self, name: &str) -> Option<&Captured> {
        self.get(name).filter(|value| !value.is_null())
    }
}

/// Types that can be snapshotted when they cross the interception boundary.
pub trait Capture {
    fn capture(&self) -> Captured;
}

impl Capture for Captured {
    fn capture(&self) -> Captured {
        self.clone()
    }
}

impl Capture for Value {
    fn capture(&self) -> Captured {
        Captured::from(self.clone())
    }
}

impl Capture for String {
    fn capture(&self) -> Captured {
        Captured::String(self.clone())
    }
}

impl Capture for str {
    fn capture(&self) -> Captured {
        Captured::String(self.to_string())
    }
}

impl Capture for () {
    fn capture(&self) -> Captured {
        Captured::Null
    }
}

impl<T: Capture> Capture for Option<T> {
    fn capture(&self) -> Captured {
        self.as_ref().map(Capture::capture).unwrap_or_default()
    }
}

impl<T: Capture> Capture for Vec<T> {
    fn capture(&self) -> Captured {
        Captured::List(self.iter().map(Capture::capture).collect())
    }
}

impl<T: Capture + ?Sized> Capture for &T {
    fn capture(&self) -> Captured {
        (**self).capture()
    }
}

