//! Host capability interface
//!
//! Values that expose members to selector expressions implement
//! [`HostObject`]: aggregates (fields plus their method table), calendar
//! instants and durations. Methods come back as bound [`Function`]s so the
//! enclosing call expression applies the usual arity and conversion rules.
//!
//! [`FromValue`] and [`ToValue`] are the conversion hooks between host Rust
//! types and [`Value`].

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use std::fmt::Write as _;

use crate::duration::Duration;
use crate::error::{ConversionError, EvalError, Result};
use crate::function::{duration_arg, string_arg, time_arg, Function, ParamKind};
use crate::value::{zero_time, Aggregate, Value, ValueKind};

/// Capability interface for values with fields and methods
pub trait HostObject {
    /// Name used in error messages
    fn type_name(&self) -> String;

    /// Field by exact name
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Method by exact name, bound to this receiver
    fn method(&self, name: &str) -> Option<Function>;

    /// Look up and invoke a method in one step
    fn call_method(&self, name: &str, args: Vec<Value>) -> Option<Result<Value>> {
        self.method(name).map(|m| m.apply(args))
    }
}

impl Value {
    /// Member access capability, if this kind of value has members
    pub fn as_host(&self) -> Option<&dyn HostObject> {
        match self {
            Value::Aggregate(a) => Some(a),
            Value::Time(t) => Some(t),
            Value::Duration(d) => Some(d),
            _ => None,
        }
    }
}

impl HostObject for Aggregate {
    fn type_name(&self) -> String {
        Aggregate::type_name(self).to_string()
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        self.field(name).cloned()
    }

    fn method(&self, name: &str) -> Option<Function> {
        let spec = self.method_spec(name)?;
        let receiver = self.clone();
        let body = spec.body;
        Some(Function::new(
            format!("{}.{}", Aggregate::type_name(self), spec.name),
            &spec.params,
            move |args| body(&receiver, args),
        ))
    }
}

/// Add a duration to an instant, failing outside the representable range
pub fn time_add(t: DateTime<FixedOffset>, d: Duration) -> Result<DateTime<FixedOffset>> {
    t.checked_add_signed(d.to_chrono())
        .ok_or_else(|| EvalError::unsupported("time arithmetic outside the representable range"))
}

/// Elapsed time between two instants
pub fn time_sub(t: DateTime<FixedOffset>, u: DateTime<FixedOffset>) -> Result<Duration> {
    t.signed_duration_since(u)
        .num_nanoseconds()
        .map(Duration)
        .ok_or_else(|| EvalError::unsupported("duration outside the representable range"))
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl HostObject for DateTime<FixedOffset> {
    fn type_name(&self) -> String {
        ValueKind::Time.to_string()
    }

    fn get_field(&self, _name: &str) -> Option<Value> {
        None
    }

    fn method(&self, name: &str) -> Option<Function> {
        let t = *self;
        let qualified = format!("Time.{}", name);

        let function = match name {
            "Add" => Function::new(qualified, &[ParamKind::DURATION], move |args| {
                Ok(Value::Time(time_add(t, duration_arg(args, 0)?)?))
            }),
            "Sub" => Function::new(qualified, &[ParamKind::TIME], move |args| {
                Ok(Value::Duration(time_sub(t, time_arg(args, 0)?)?))
            }),
            "Before" => Function::new(qualified, &[ParamKind::TIME], move |args| {
                Ok(Value::Bool(t < time_arg(args, 0)?))
            }),
            "After" => Function::new(qualified, &[ParamKind::TIME], move |args| {
                Ok(Value::Bool(t > time_arg(args, 0)?))
            }),
            "Equal" => Function::new(qualified, &[ParamKind::TIME], move |args| {
                Ok(Value::Bool(t == time_arg(args, 0)?))
            }),
            // Layouts are strftime patterns (`%Y-%m-%d`), not Go reference dates
            "Format" => Function::new(qualified, &[ParamKind::STRING], move |args| {
                let layout = string_arg(args, 0)?;
                let mut out = String::new();
                write!(out, "{}", t.format(layout)).map_err(|_| {
                    EvalError::call_failed("Time.Format", format!("invalid layout {:?}", layout))
                })?;
                Ok(Value::String(out))
            }),
            "IsZero" => Function::new(qualified, &[], move |_| Ok(Value::Bool(t == zero_time()))),
            "Unix" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.timestamp()))),
            "UnixNano" => Function::new(qualified, &[], move |_| {
                t.timestamp_nanos_opt()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::call_failed("Time.UnixNano", "out of range"))
            }),
            "UTC" => Function::new(qualified, &[], move |_| {
                Ok(Value::Time(t.with_timezone(&Utc).into()))
            }),
            "Year" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.year() as i64))),
            "Month" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.month() as i64))),
            "Day" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.day() as i64))),
            "Hour" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.hour() as i64))),
            "Minute" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.minute() as i64))),
            "Second" => Function::new(qualified, &[], move |_| Ok(Value::Int(t.second() as i64))),
            "Nanosecond" => Function::new(qualified, &[], move |_| {
                Ok(Value::Int(t.nanosecond() as i64))
            }),
            "Weekday" => Function::new(qualified, &[], move |_| {
                Ok(Value::from(weekday_name(t.weekday())))
            }),
            "String" => Function::new(qualified, &[], move |_| Ok(Value::String(Value::Time(t).to_string()))),
            _ => return None,
        };

        Some(function)
    }
}

impl HostObject for Duration {
    fn type_name(&self) -> String {
        ValueKind::Duration.to_string()
    }

    fn get_field(&self, _name: &str) -> Option<Value> {
        None
    }

    fn method(&self, name: &str) -> Option<Function> {
        let d = *self;
        let qualified = format!("Duration.{}", name);

        let function = match name {
            "Hours" => Function::new(qualified, &[], move |_| Ok(Value::Float(d.hours()))),
            "Minutes" => Function::new(qualified, &[], move |_| Ok(Value::Float(d.minutes()))),
            "Seconds" => Function::new(qualified, &[], move |_| Ok(Value::Float(d.seconds()))),
            "Milliseconds" => Function::new(qualified, &[], move |_| {
                Ok(Value::Int(d.0 / Duration::MILLISECOND.0))
            }),
            "Microseconds" => Function::new(qualified, &[], move |_| {
                Ok(Value::Int(d.0 / Duration::MICROSECOND.0))
            }),
            "Nanoseconds" => Function::new(qualified, &[], move |_| Ok(Value::Int(d.nanoseconds()))),
            "Abs" => Function::new(qualified, &[], move |_| Ok(Value::Duration(d.abs()))),
            "Truncate" => Function::new(qualified, &[ParamKind::DURATION], move |args| {
                Ok(Value::Duration(d.truncate(duration_arg(args, 0)?)))
            }),
            "String" => Function::new(qualified, &[], move |_| Ok(Value::String(d.to_string()))),
            _ => return None,
        };

        Some(function)
    }
}

/// Extract a host type from a value whose runtime kind matches exactly
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError>;
}

/// Expose a host type as a value
pub trait ToValue {
    fn to_value(&self) -> Value;
}

fn mismatch(value: &Value, target: &str) -> ConversionError {
    ConversionError::new(value.type_name(), target)
}

impl FromValue for Value {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Err(mismatch(other, "int64")),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Uint(u) => Ok(*u),
            other => Err(mismatch(other, "uint64")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(*f),
            other => Err(mismatch(other, "float64")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(other, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch(other, "string")),
        }
    }
}

impl FromValue for Duration {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Duration(d) => Ok(*d),
            other => Err(mismatch(other, "time.Duration")),
        }
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Time(t) => Ok(*t),
            other => Err(mismatch(other, "time.Time")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Time(t) => Ok(t.with_timezone(&Utc)),
            other => Err(mismatch(other, "time.Time")),
        }
    }
}

impl FromValue for Aggregate {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Aggregate(a) => Ok(a.clone()),
            other => Err(mismatch(other, "struct")),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> std::result::Result<Self, ConversionError> {
        match value {
            Value::Sequence(items) => items.iter().map(T::from_value).collect(),
            other => Err(mismatch(other, "slice")),
        }
    }
}

impl<T: Clone + Into<Value>> ToValue for T {
    fn to_value(&self) -> Value {
        self.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned() -> DateTime<FixedOffset> {
        DateTime::from_timestamp(1_577_836_800, 0).unwrap().into()
    }

    fn host_port() -> Aggregate {
        Aggregate::new("HostPort")
            .with_field("Host", "example.com")
            .with_field("Port", 443i64)
            .with_method("String", &[], |receiver, _| {
                let host = receiver.field("Host").map(|v| v.to_string()).unwrap_or_default();
                let port = receiver.field("Port").map(|v| v.to_string()).unwrap_or_default();
                Ok(Value::String(format!("{}:{}", host, port)))
            })
    }

    #[test]
    fn test_aggregate_fields_and_methods() {
        let hp = host_port();
        assert_eq!(hp.get_field("Port"), Some(Value::Int(443)));
        assert_eq!(hp.get_field("port"), None);
        let out = hp.call_method("String", vec![]).unwrap().unwrap();
        assert_eq!(out, Value::from("example.com:443"));
        assert!(hp.method("Missing").is_none());
    }

    #[test]
    fn test_time_methods() {
        let t = pinned();
        let earlier = t
            .call_method("Add", vec![Value::Duration(Duration(-Duration::MINUTE.0))])
            .unwrap()
            .unwrap();
        assert_eq!(
            earlier,
            Value::Time(DateTime::from_timestamp(1_577_836_740, 0).unwrap().into())
        );
        assert_eq!(t.call_method("Year", vec![]).unwrap().unwrap(), Value::Int(2020));
        assert_eq!(
            t.call_method("Unix", vec![]).unwrap().unwrap(),
            Value::Int(1_577_836_800)
        );
        assert_eq!(
            t.call_method("Weekday", vec![]).unwrap().unwrap(),
            Value::from("Wednesday")
        );
        assert_eq!(
            t.call_method("IsZero", vec![]).unwrap().unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            zero_time().call_method("IsZero", vec![]).unwrap().unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_time_add_converts_integer_argument() {
        let later = pinned()
            .call_method("Add", vec![Value::Int(Duration::SECOND.0)])
            .unwrap()
            .unwrap();
        assert_eq!(
            later,
            Value::Time(DateTime::from_timestamp(1_577_836_801, 0).unwrap().into())
        );
    }

    #[test]
    fn test_time_format() {
        let out = pinned()
            .call_method("Format", vec![Value::from("%Y-%m-%d")])
            .unwrap()
            .unwrap();
        assert_eq!(out, Value::from("2020-01-01"));
    }

    #[test]
    fn test_duration_methods() {
        let d = Duration::parse("1h30m").unwrap();
        assert_eq!(d.call_method("Hours", vec![]).unwrap().unwrap(), Value::Float(1.5));
        assert_eq!(
            d.call_method("String", vec![]).unwrap().unwrap(),
            Value::from("1h30m0s")
        );
        assert_eq!(
            Duration(-5).call_method("Abs", vec![]).unwrap().unwrap(),
            Value::Duration(Duration(5))
        );
    }

    #[test]
    fn test_as_host_availability() {
        assert!(Value::Int(1).as_host().is_none());
        assert!(Value::Duration(Duration(1)).as_host().is_some());
        assert_eq!(
            Value::Aggregate(host_port()).as_host().unwrap().type_name(),
            "HostPort"
        );
    }

    #[test]
    fn test_extract_requires_matching_kind() {
        assert_eq!(Value::Int(3).extract::<i64>().unwrap(), 3);
        assert!(Value::Int(3).extract::<f64>().is_err());
        assert!(Value::from("3").extract::<i64>().is_err());
        let seq = Value::Sequence(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(seq.extract::<Vec<String>>().unwrap(), vec!["a", "b"]);
        assert_eq!(
            Value::Time(pinned()).extract::<DateTime<Utc>>().unwrap().timestamp(),
            1_577_836_800
        );
    }

    #[test]
    fn test_to_value() {
        assert_eq!(42i64.to_value(), Value::Int(42));
        assert_eq!("x".to_string().to_value(), Value::from("x"));
        assert_eq!(Duration::SECOND.to_value(), Value::Duration(Duration::SECOND));
    }
}
