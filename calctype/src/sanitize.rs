//! Deep conversion of heterogeneous values into JSON-safe trees.
//!
//! Values enter as [`Raw`] and leave as [`Sanitized`]. Structured
//! conversion is driven by capabilities: a [`ValueEnum`] contributes its
//! string value and an [`AsDict`] object contributes its dictionary form.
//! Anything without a capability becomes its string form, or an error in
//! strict mode.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use ndarray::{ArrayD, ArrayViewD, Axis};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::SanitizeError;

/// An enumeration whose members serialize as a string value.
pub trait ValueEnum {
    /// The member's value.
    fn value(&self) -> Cow<'_, str>;
}

/// An object that can describe itself as a plain dictionary.
pub trait AsDict {
    /// The object's dictionary form, in field order.
    fn as_dict(&self) -> Vec<(String, Raw)>;
}

/// Sanitizer behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Fail on values with no structured form instead of stringifying them.
    pub strict: bool,
    /// Pass datetimes, bytes, and object ids through untouched.
    pub allow_bson: bool,
}

/// A 12-byte database object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub [u8; 12]);

impl ObjectId {
    /// Parses a 24-character hex string.
    #[must_use]
    pub fn parse_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An input value of any supported shape.
pub enum Raw {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Database object id.
    ObjectId(ObjectId),
    /// Ordered sequence (list or tuple).
    Seq(Vec<Raw>),
    /// Float array of any dimension.
    Array(ArrayD<f64>),
    /// Integer array of any dimension.
    IntArray(ArrayD<i64>),
    /// Mapping with arbitrary scalar keys.
    Map(Vec<(Raw, Raw)>),
    /// Enumeration member.
    Enum(Box<dyn ValueEnum>),
    /// Object with a dictionary form.
    Object(Box<dyn AsDict>),
    /// Value with no structured form, kept as its type name and display text.
    Opaque {
        /// Rust type name.
        type_name: &'static str,
        /// Display rendering.
        text: String,
    },
}

impl Raw {
    /// Wraps a value that only knows how to display itself.
    pub fn opaque<T: fmt::Display>(value: &T) -> Self {
        Self::Opaque {
            type_name: std::any::type_name::<T>(),
            text: value.to_string(),
        }
    }

    /// Wraps an enumeration member.
    pub fn enumeration<E: ValueEnum + 'static>(value: E) -> Self {
        Self::Enum(Box::new(value))
    }

    /// Wraps an object with a dictionary form.
    pub fn object<O: AsDict + 'static>(value: O) -> Self {
        Self::Object(Box::new(value))
    }

    /// Converts any serde-serializable value through its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    fn kind(&self) -> &'static str {
        match self {
            Raw::Null => "null",
            Raw::Bool(_) => "bool",
            Raw::Int(_) => "int",
            Raw::Float(_) => "float",
            Raw::Str(_) => "str",
            Raw::Bytes(_) => "bytes",
            Raw::DateTime(_) => "datetime",
            Raw::ObjectId(_) => "object id",
            Raw::Seq(_) => "sequence",
            Raw::Array(_) | Raw::IntArray(_) => "array",
            Raw::Map(_) => "map",
            Raw::Enum(_) => "enum",
            Raw::Object(_) => "object",
            Raw::Opaque { .. } => "opaque",
        }
    }
}

impl From<Value> for Raw {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Raw::Null,
            Value::Bool(b) => Raw::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Raw::Int(i),
                None => Raw::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Raw::Str(s),
            Value::Array(items) => Raw::Seq(items.into_iter().map(Raw::from).collect()),
            Value::Object(map) => Raw::Map(
                map.into_iter()
                    .map(|(k, v)| (Raw::Str(k), Raw::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Raw {
    fn from(s: &str) -> Self {
        Raw::Str(s.to_owned())
    }
}

/// A JSON-safe value tree, optionally carrying database scalar types.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sanitized {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// List.
    List(Vec<Sanitized>),
    /// String-keyed mapping in insertion order.
    #[serde(serialize_with = "serialize_entries")]
    Map(Vec<(String, Sanitized)>),
    /// Passed-through timestamp.
    DateTime(DateTime<Utc>),
    /// Passed-through bytes.
    Bytes(Vec<u8>),
    /// Passed-through object id.
    ObjectId(ObjectId),
}

impl Sanitized {
    /// Converts to a `serde_json::Value`; database scalars become strings
    /// or byte lists and non-finite floats become null.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Sanitized::Null => Value::Null,
            Sanitized::Bool(b) => Value::Bool(b),
            Sanitized::Int(i) => Value::from(i),
            Sanitized::Float(f) => {
                serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
            }
            Sanitized::Str(s) => Value::String(s),
            Sanitized::List(items) => {
                Value::Array(items.into_iter().map(Self::into_json).collect())
            }
            Sanitized::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
            Sanitized::DateTime(dt) => Value::String(dt.to_rfc3339()),
            Sanitized::Bytes(bytes) => Value::from(bytes),
            Sanitized::ObjectId(oid) => Value::String(oid.to_string()),
        }
    }
}

fn serialize_entries<S: Serializer>(
    entries: &[(String, Sanitized)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
}

/// Collects mapping entries in first-seen key order. A repeated key keeps its
/// first position and takes the last value.
#[derive(Default)]
struct Entries {
    entries: Vec<(String, Sanitized)>,
    index: HashMap<String, usize>,
}

impl Entries {
    fn insert(&mut self, key: String, value: Sanitized) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    fn finish(self) -> Sanitized {
        Sanitized::Map(self.entries)
    }
}

/// Recursively sanitizes `value`.
///
/// Checks run in a fixed order: database scalars (when allowed), sequences,
/// numeric arrays, enumerations, mappings, dictionary-capable objects,
/// numbers and booleans, null, and finally the string fallback.
///
/// # Errors
///
/// In strict mode, returns [`SanitizeError::NotSerializable`] for bytes,
/// datetimes, object ids (unless `allow_bson`), and opaque values. In either
/// mode, returns [`SanitizeError::UnhashableKey`] for a composite mapping key.
pub fn jsanitize(value: &Raw, options: SanitizeOptions) -> Result<Sanitized, SanitizeError> {
    if options.allow_bson {
        match value {
            Raw::DateTime(dt) => return Ok(Sanitized::DateTime(*dt)),
            Raw::Bytes(bytes) => return Ok(Sanitized::Bytes(bytes.clone())),
            Raw::ObjectId(oid) => return Ok(Sanitized::ObjectId(*oid)),
            _ => {}
        }
    }

    match value {
        Raw::Seq(items) => items
            .iter()
            .map(|item| jsanitize(item, options))
            .collect::<Result<_, _>>()
            .map(Sanitized::List),
        Raw::Array(array) => Ok(array_to_list(array.view(), Sanitized::Float)),
        Raw::IntArray(array) => Ok(array_to_list(array.view(), Sanitized::Int)),
        Raw::Enum(member) => Ok(Sanitized::Str(member.value().into_owned())),
        Raw::Map(entries) => {
            let mut map = Entries::default();
            for (key, item) in entries {
                map.insert(key_string(key)?, jsanitize(item, options)?);
            }
            Ok(map.finish())
        }
        Raw::Object(object) => sanitize_dict(object.as_dict(), options),
        Raw::Int(i) => Ok(Sanitized::Int(*i)),
        Raw::Float(f) => Ok(Sanitized::Float(*f)),
        Raw::Bool(b) => Ok(Sanitized::Bool(*b)),
        Raw::Null => Ok(Sanitized::Null),
        Raw::Str(s) => Ok(Sanitized::Str(s.clone())),
        other if !options.strict => Ok(Sanitized::Str(display_string(other))),
        Raw::Opaque { type_name, .. } => Err(SanitizeError::NotSerializable {
            type_name: (*type_name).to_owned(),
        }),
        other => Err(SanitizeError::NotSerializable {
            type_name: other.kind().to_owned(),
        }),
    }
}

fn sanitize_dict(
    entries: Vec<(String, Raw)>,
    options: SanitizeOptions,
) -> Result<Sanitized, SanitizeError> {
    let mut map = Entries::default();
    for (key, item) in entries {
        map.insert(key, jsanitize(&item, options)?);
    }
    Ok(map.finish())
}

/// Nested lists with the element type kept: integer arrays stay integers.
fn array_to_list<T: Copy>(array: ArrayViewD<'_, T>, leaf: fn(T) -> Sanitized) -> Sanitized {
    if array.ndim() == 0 {
        return array.iter().next().map_or(Sanitized::Null, |&x| leaf(x));
    }
    if array.ndim() == 1 {
        return Sanitized::List(array.iter().map(|&x| leaf(x)).collect());
    }
    Sanitized::List(
        array
            .axis_iter(Axis(0))
            .map(|sub| array_to_list(sub, leaf))
            .collect(),
    )
}

/// Mapping keys follow Python `str()` rendering.
fn key_string(key: &Raw) -> Result<String, SanitizeError> {
    match key {
        Raw::Seq(_) | Raw::Array(_) | Raw::IntArray(_) | Raw::Map(_) | Raw::Object(_) => {
            Err(SanitizeError::UnhashableKey { kind: key.kind() })
        }
        other => Ok(display_string(other)),
    }
}

fn display_string(value: &Raw) -> String {
    match value {
        Raw::Null => "None".to_owned(),
        Raw::Bool(true) => "True".to_owned(),
        Raw::Bool(false) => "False".to_owned(),
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => float_string(*f),
        Raw::Str(s) => s.clone(),
        Raw::Bytes(bytes) => {
            let escaped: String = bytes
                .iter()
                .flat_map(|&b| std::ascii::escape_default(b))
                .map(char::from)
                .collect();
            format!("b'{escaped}'")
        }
        Raw::DateTime(dt) => {
            if dt.timestamp_subsec_micros() == 0 {
                dt.format("%Y-%m-%d %H:%M:%S%:z").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
            }
        }
        Raw::ObjectId(oid) => oid.to_string(),
        Raw::Enum(member) => member.value().into_owned(),
        Raw::Opaque { text, .. } => text.clone(),
        Raw::Seq(_) | Raw::Array(_) | Raw::IntArray(_) | Raw::Map(_) | Raw::Object(_) => {
            value.kind().to_owned()
        }
    }
}

fn float_string(f: f64) -> String {
    if f.is_nan() {
        "nan".to_owned()
    } else if f == f64::INFINITY {
        "inf".to_owned()
    } else if f == f64::NEG_INFINITY {
        "-inf".to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}
