//! Callable values: builtins, package members and bound methods
//!
//! A [`Function`] carries a name, a typed parameter list (optionally ending
//! in a variadic tail) and a native body. Calling it through [`Function::apply`]
//! checks arity, converts each argument to its declared kind and then runs
//! the body with the converted arguments.

use std::fmt;
use std::sync::Arc;

use crate::error::{EvalError, Result};
use crate::value::{Value, ValueKind};

/// Native function body
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Plain function pointer form used by the builtin and package tables
pub type BuiltinFunction = fn(&[Value]) -> Result<Value>;

/// Declared kind of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Accepts any value unchanged
    Any,
    /// Argument is converted to this kind before the call
    Of(ValueKind),
}

impl ParamKind {
    pub const INT: ParamKind = ParamKind::Of(ValueKind::Int);
    pub const UINT: ParamKind = ParamKind::Of(ValueKind::Uint);
    pub const FLOAT: ParamKind = ParamKind::Of(ValueKind::Float);
    pub const STRING: ParamKind = ParamKind::Of(ValueKind::String);
    pub const BOOL: ParamKind = ParamKind::Of(ValueKind::Bool);
    pub const DURATION: ParamKind = ParamKind::Of(ValueKind::Duration);
    pub const TIME: ParamKind = ParamKind::Of(ValueKind::Time);
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Any => f.write_str("any"),
            ParamKind::Of(kind) => write!(f, "{}", kind),
        }
    }
}

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// At least this many
    Variadic(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == *n,
            Arity::Variadic(min) => count >= *min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic(min) => write!(f, "at least {}", min),
        }
    }
}

/// A callable value
#[derive(Clone)]
pub struct Function {
    name: String,
    params: Vec<ParamKind>,
    variadic: Option<ParamKind>,
    implicit_self: bool,
    body: NativeFn,
}

impl Function {
    /// Create a function from a closure
    pub fn new<F>(name: impl Into<String>, params: &[ParamKind], body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.to_vec(),
            variadic: None,
            implicit_self: false,
            body: Arc::new(body),
        }
    }

    /// Create a function from a plain function pointer
    pub fn builtin(name: &str, params: &[ParamKind], body: BuiltinFunction) -> Self {
        Self::new(name, params, body)
    }

    /// Accept any number of trailing arguments of `kind`
    pub fn variadic(mut self, kind: ParamKind) -> Self {
        self.variadic = Some(kind);
        self
    }

    /// Allow the environment's `self` binding to fill a missing first argument
    pub fn with_implicit_self(mut self) -> Self {
        self.implicit_self = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    pub fn accepts_implicit_self(&self) -> bool {
        self.implicit_self
    }

    pub fn arity(&self) -> Arity {
        if self.variadic.is_some() {
            Arity::Variadic(self.params.len())
        } else {
            Arity::Fixed(self.params.len())
        }
    }

    /// Human-readable signature, e.g. `sprintf(string, ...any)`
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        if let Some(tail) = self.variadic {
            parts.push(format!("...{}", tail));
        }
        format!("{}({})", self.name, parts.join(", "))
    }

    /// Check arity, convert each argument to its declared kind, then call
    pub fn apply(&self, args: Vec<Value>) -> Result<Value> {
        let arity = self.arity();
        if !arity.accepts(args.len()) {
            return Err(EvalError::ArityMismatch {
                function: self.name.clone(),
                expected: arity,
                received: args.len(),
            });
        }

        let mut converted = Vec::with_capacity(args.len());
        for (index, arg) in args.into_iter().enumerate() {
            let kind = self
                .params
                .get(index)
                .copied()
                .or(self.variadic)
                .unwrap_or(ParamKind::Any);
            let value = arg
                .convert_to_param(kind)
                .map_err(|e| EvalError::ArgumentConversion {
                    function: self.name.clone(),
                    index,
                    from: e.from,
                    to: e.to,
                })?;
            converted.push(value);
        }

        (self.body)(&converted)
    }

    /// Identity comparison: both handles share the same native body
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

// =============================================================================
// ARGUMENT HELPERS
// =============================================================================
//
// Native bodies run after `apply` has converted every argument, so these only
// fail when a body reads past or against its declared parameters.

fn arg_error(args: &[Value], index: usize, expected: &str) -> EvalError {
    let from = args
        .get(index)
        .map(|v| v.type_name())
        .unwrap_or_else(|| "missing argument".to_string());
    crate::error::ConversionError::new(from, expected).into()
}

pub(crate) fn arg(args: &[Value], index: usize) -> Result<&Value> {
    args.get(index).ok_or_else(|| arg_error(args, index, "any"))
}

pub(crate) fn string_arg(args: &[Value], index: usize) -> Result<&str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(arg_error(args, index, "string")),
    }
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> Result<i64> {
    match args.get(index) {
        Some(Value::Int(i)) => Ok(*i),
        _ => Err(arg_error(args, index, "int64")),
    }
}

pub(crate) fn float_arg(args: &[Value], index: usize) -> Result<f64> {
    match args.get(index) {
        Some(Value::Float(f)) => Ok(*f),
        _ => Err(arg_error(args, index, "float64")),
    }
}

pub(crate) fn duration_arg(args: &[Value], index: usize) -> Result<crate::duration::Duration> {
    match args.get(index) {
        Some(Value::Duration(d)) => Ok(*d),
        _ => Err(arg_error(args, index, "time.Duration")),
    }
}

pub(crate) fn time_arg(
    args: &[Value],
    index: usize,
) -> Result<chrono::DateTime<chrono::FixedOffset>> {
    match args.get(index) {
        Some(Value::Time(t)) => Ok(*t),
        _ => Err(arg_error(args, index, "time.Time")),
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_first(args: &[Value]) -> Result<Value> {
        Ok(args[0].clone())
    }

    #[test]
    fn test_arity_reporting() {
        let f = Function::builtin("upper", &[ParamKind::STRING], echo_first);
        assert_eq!(f.arity(), Arity::Fixed(1));

        let v = Function::builtin("sprintf", &[ParamKind::STRING], echo_first)
            .variadic(ParamKind::Any);
        assert_eq!(v.arity(), Arity::Variadic(1));
        assert!(v.arity().accepts(3));
        assert!(!v.arity().accepts(0));
        assert_eq!(v.signature(), "sprintf(string, ...any)");
    }

    #[test]
    fn test_apply_rejects_wrong_arity() {
        let f = Function::builtin("upper", &[ParamKind::STRING], echo_first);
        let err = f.apply(vec![]).unwrap_err();
        assert_eq!(
            err,
            EvalError::ArityMismatch {
                function: "upper".to_string(),
                expected: Arity::Fixed(1),
                received: 0,
            }
        );
    }

    #[test]
    fn test_apply_converts_arguments() {
        let f = Function::builtin("float_id", &[ParamKind::FLOAT], echo_first);
        assert_eq!(f.apply(vec![Value::Int(3)]).unwrap(), Value::Float(3.0));

        let s = Function::builtin("string_id", &[ParamKind::STRING], echo_first);
        assert_eq!(
            s.apply(vec![Value::Int(42)]).unwrap(),
            Value::String("42".to_string())
        );
    }

    #[test]
    fn test_apply_reports_conversion_failure() {
        let f = Function::builtin("int_id", &[ParamKind::INT], echo_first);
        let err = f.apply(vec![Value::String("12".to_string())]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::ArgumentConversion { ref function, index: 0, .. } if function == "int_id"
        ));
    }

    #[test]
    fn test_variadic_tail_is_converted() {
        let join = Function::new("join", &[], |args| {
            let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            Ok(Value::String(parts.join("/")))
        })
        .variadic(ParamKind::STRING);
        assert_eq!(
            join.apply(vec![Value::from("a"), Value::Int(1)]).unwrap(),
            Value::from("a/1")
        );
    }
}
