//! Runtime values
//!
//! Every evaluation produces and consumes [`Value`]s. A value always knows
//! its [`ValueKind`], which is what operator dispatch, argument conversion and
//! composite literals key on.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::duration::Duration;
use crate::error::{ConversionError, Result};
use crate::function::{Function, ParamKind};
use crate::host::FromValue;

/// Seconds from the Unix epoch to 0001-01-01T00:00:00Z, the zero instant
const ZERO_TIME_UNIX: i64 = -62_135_596_800;

/// The zero calendar instant (January 1, year 1, 00:00:00 UTC)
pub fn zero_time() -> DateTime<FixedOffset> {
    DateTime::from_timestamp(ZERO_TIME_UNIX, 0)
        .unwrap_or_default()
        .into()
}

/// Runtime type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Uint,
    Float,
    String,
    Bool,
    Duration,
    Time,
    Aggregate,
    Sequence,
    Function,
    Namespace,
}

impl ValueKind {
    /// Int, Uint, Float and Duration interconvert
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueKind::Int | ValueKind::Uint | ValueKind::Float | ValueKind::Duration
        )
    }

    /// Kinds that format into a String on conversion
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ValueKind::Int
                | ValueKind::Uint
                | ValueKind::Float
                | ValueKind::String
                | ValueKind::Bool
                | ValueKind::Duration
                | ValueKind::Time
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Int => "int64",
            ValueKind::Uint => "uint64",
            ValueKind::Float => "float64",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Duration => "time.Duration",
            ValueKind::Time => "time.Time",
            ValueKind::Aggregate => "struct",
            ValueKind::Sequence => "slice",
            ValueKind::Function => "func",
            ValueKind::Namespace => "package",
        })
    }
}

/// Method attached to an aggregate type; receives the receiver and converted arguments
pub type AggregateMethod = fn(&Aggregate, &[Value]) -> Result<Value>;

/// Entry of an aggregate's method table
#[derive(Clone)]
pub struct MethodSpec {
    pub name: String,
    pub params: Vec<ParamKind>,
    pub body: AggregateMethod,
}

/// A named record: type name, ordered fields and a method table
#[derive(Clone)]
pub struct Aggregate {
    type_name: String,
    fields: IndexMap<String, Value>,
    methods: Arc<Vec<MethodSpec>>,
}

impl Aggregate {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            methods: Arc::new(Vec::new()),
        }
    }

    /// Builder: append a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder: append a method
    pub fn with_method(mut self, name: &str, params: &[ParamKind], body: AggregateMethod) -> Self {
        Arc::make_mut(&mut self.methods).push(MethodSpec {
            name: name.to_string(),
            params: params.to_vec(),
            body,
        });
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn method_spec(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|m| m.name.as_str())
    }

    /// Same type and methods, every field reset to its zero value
    pub fn zeroed(&self) -> Aggregate {
        Aggregate {
            type_name: self.type_name.clone(),
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.zeroed()))
                .collect(),
            methods: Arc::clone(&self.methods),
        }
    }
}

impl PartialEq for Aggregate {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.fields == other.fields
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.type_name);
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.finish()
    }
}

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    Aggregate(Aggregate),
    Sequence(Vec<Value>),
    Function(Function),
    Namespace(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
            Value::Duration(_) => ValueKind::Duration,
            Value::Time(_) => ValueKind::Time,
            Value::Aggregate(_) => ValueKind::Aggregate,
            Value::Sequence(_) => ValueKind::Sequence,
            Value::Function(_) => ValueKind::Function,
            Value::Namespace(_) => ValueKind::Namespace,
        }
    }

    /// Kind name, or the declared type name for aggregates
    pub fn type_name(&self) -> String {
        match self {
            Value::Aggregate(a) => a.type_name().to_string(),
            other => other.kind().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to `target` following the conversion rules
    pub fn convert_to(&self, target: ValueKind) -> std::result::Result<Value, ConversionError> {
        let source = self.kind();
        if source == target {
            return Ok(self.clone());
        }

        let unconvertible = || ConversionError::new(self.type_name(), target.to_string());

        if target == ValueKind::String && source.is_scalar() {
            return Ok(Value::String(self.to_string()));
        }

        if !(source.is_numeric() && target.is_numeric()) {
            return Err(unconvertible());
        }

        let converted = match (self, target) {
            (Value::Int(i), ValueKind::Uint) => Value::Uint(*i as u64),
            (Value::Int(i), ValueKind::Float) => Value::Float(*i as f64),
            (Value::Int(i), ValueKind::Duration) => Value::Duration(Duration(*i)),

            (Value::Uint(u), ValueKind::Int) => Value::Int(*u as i64),
            (Value::Uint(u), ValueKind::Float) => Value::Float(*u as f64),
            (Value::Uint(u), ValueKind::Duration) => Value::Duration(Duration(*u as i64)),

            (Value::Float(f), ValueKind::Int) => Value::Int(f.trunc() as i64),
            (Value::Float(f), ValueKind::Uint) => Value::Uint(f.trunc() as i64 as u64),
            (Value::Float(f), ValueKind::Duration) => Value::Duration(Duration(f.trunc() as i64)),

            (Value::Duration(d), ValueKind::Int) => Value::Int(d.0),
            (Value::Duration(d), ValueKind::Uint) => Value::Uint(d.0 as u64),
            (Value::Duration(d), ValueKind::Float) => Value::Float(d.0 as f64),

            _ => return Err(unconvertible()),
        };

        tracing::trace!(from = %source, to = %target, "converted value");
        Ok(converted)
    }

    /// Convert to a declared parameter kind; `Any` passes the value through
    pub fn convert_to_param(&self, kind: ParamKind) -> std::result::Result<Value, ConversionError> {
        match kind {
            ParamKind::Any => Ok(self.clone()),
            ParamKind::Of(target) => self.convert_to(target),
        }
    }

    /// Convert into the shape of `template`: its kind, and for aggregates its type name
    pub fn convert_like(&self, template: &Value) -> std::result::Result<Value, ConversionError> {
        match (self, template) {
            (Value::Aggregate(a), Value::Aggregate(t)) if a.type_name() != t.type_name() => Err(
                ConversionError::new(a.type_name().to_string(), t.type_name().to_string()),
            ),
            _ => self.convert_to(template.kind()),
        }
    }

    /// The zero value of this value's type
    pub fn zeroed(&self) -> Value {
        match self {
            Value::Int(_) => Value::Int(0),
            Value::Uint(_) => Value::Uint(0),
            Value::Float(_) => Value::Float(0.0),
            Value::String(_) => Value::String(String::new()),
            Value::Bool(_) => Value::Bool(false),
            Value::Duration(_) => Value::Duration(Duration(0)),
            Value::Time(_) => Value::Time(zero_time()),
            Value::Aggregate(a) => Value::Aggregate(a.zeroed()),
            Value::Sequence(_) => Value::Sequence(Vec::new()),
            Value::Function(_) | Value::Namespace(_) => self.clone(),
        }
    }

    /// Whether this value equals the zero value of its type
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bool(b) => !b,
            Value::Duration(d) => d.0 == 0,
            Value::Time(t) => *t == zero_time(),
            Value::Aggregate(a) => a.fields().all(|(_, v)| v.is_zero()),
            Value::Sequence(items) => items.is_empty(),
            Value::Function(_) | Value::Namespace(_) => false,
        }
    }

    /// Extract a host type; the runtime kind must match the target type
    pub fn extract<T: FromValue>(&self) -> std::result::Result<T, ConversionError> {
        T::from_value(self)
    }

    /// Convert to a JSON value (aggregates become objects)
    pub fn to_json(&self) -> std::result::Result<serde_json::Value, ConversionError> {
        use serde_json::Value as Json;

        Ok(match self {
            Value::Int(i) => Json::from(*i),
            Value::Uint(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| ConversionError::new(format_float(*f), "json number"))?,
            Value::String(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Duration(_) | Value::Time(_) => Json::String(self.to_string()),
            Value::Aggregate(a) => {
                let mut map = serde_json::Map::new();
                for (name, value) in a.fields() {
                    map.insert(name.clone(), value.to_json()?);
                }
                Json::Object(map)
            }
            Value::Sequence(items) => Json::Array(
                items
                    .iter()
                    .map(|v| v.to_json())
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Value::Function(_) | Value::Namespace(_) => {
                return Err(ConversionError::new(self.type_name(), "json"))
            }
        })
    }

    /// Build a value from JSON; objects become `Object` aggregates, null is rejected
    pub fn from_json(json: &serde_json::Value) -> std::result::Result<Value, ConversionError> {
        use serde_json::Value as Json;

        Ok(match json {
            Json::Null => return Err(ConversionError::new("null", "value")),
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Sequence(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Json::Object(map) => {
                let mut aggregate = Aggregate::new("Object");
                for (key, value) in map {
                    aggregate = aggregate.with_field(key.clone(), Value::from_json(value)?);
                }
                Value::Aggregate(aggregate)
            }
        })
    }
}

/// Format a float the way `%v` does: shortest representation, exponent
/// notation outside `[1e-4, 1e21)`.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e21).contains(&abs) {
        let formatted = format!("{:e}", f);
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            return format!("{}e{}{:0>2}", mantissa, sign, digits);
        }
        return formatted;
    }

    format!("{}", f)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Aggregate(a) => {
                let parts: Vec<String> = a.fields().map(|(_, v)| v.to_string()).collect();
                write!(f, "{{{}}}", parts.join(" "))
            }
            Value::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(" "))
            }
            Value::Function(func) => write!(f, "func {}", func.signature()),
            Value::Namespace(name) => write!(f, "package {}", name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Aggregate(a), Value::Aggregate(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Namespace(a), Value::Namespace(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Time(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v.into())
    }
}

impl From<Aggregate> for Value {
    fn from(v: Aggregate) -> Self {
        Value::Aggregate(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Sequence(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Function(v)
    }
}
