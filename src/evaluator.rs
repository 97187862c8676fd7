//! Evaluator - resolves identifiers, members, calls and operators over an AST

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::ast::{BinaryOperator, Element, Expression, LiteralKind, SourceSpan};
use crate::error::{ConversionError, EvalError, ParseError, Result};
use crate::format;
use crate::function::{Arity, Function};
use crate::functions;
use crate::operators;
use crate::packages::{self, normalize_member};
use crate::value::{Aggregate, Value};

/// Name of the binding that fills a missing first argument
pub const SELF_BINDING: &str = "self";

/// Caller-supplied name bindings for one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a binding
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a binding
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Build an environment from a JSON object; each key becomes a binding
    pub fn from_json(json: &serde_json::Value) -> std::result::Result<Self, ConversionError> {
        let object = json
            .as_object()
            .ok_or_else(|| ConversionError::new(json_kind(json), "object"))?;
        let mut env = Environment::new();
        for (name, value) in object {
            env.insert(name.clone(), Value::from_json(value)?);
        }
        Ok(env)
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Evaluator context
pub struct Evaluator<'env> {
    env: &'env Environment,
}

impl<'env> Evaluator<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self { env }
    }

    /// Evaluate an expression to a value
    pub fn evaluate(&self, expr: &Expression) -> Result<Value> {
        match expr {
            Expression::Literal { kind, text, span } => decode_literal(*kind, text, span.as_ref()),

            Expression::Identifier { name, .. } => self.resolve(name),

            Expression::Paren { inner, .. } => self.evaluate(inner),

            // Values are not pointers; dereference passes through
            Expression::Star { operand, .. } => self.evaluate(operand),

            Expression::Unary { op, operand, .. } => {
                let value = self.evaluate(operand)?;
                operators::unary(*op, value)
            }

            Expression::Binary {
                op, left, right, ..
            } => self.evaluate_binary(*op, left, right),

            Expression::Call { callee, args, .. } => self.evaluate_call(callee, args),

            Expression::Selector { object, member, .. } => {
                let base = self.evaluate(object)?;
                self.select(base, member)
            }

            Expression::Composite {
                type_expr,
                elements,
                ..
            } => self.evaluate_composite(type_expr, elements),

            Expression::Index { object, index, .. } => {
                let base = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_sequence(base, index)
            }

            Expression::Slice { .. } => Err(EvalError::unsupported("slice")),
        }
    }

    /// Environment, then builtins, then package namespaces
    fn resolve(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.env.get(name) {
            trace!(name, "resolved from environment");
            return Ok(value.clone());
        }
        if let Some(value) = functions::lookup(name) {
            trace!(name, "resolved builtin");
            return Ok(value);
        }
        if packages::is_package(name) {
            trace!(name, "resolved package");
            return Ok(Value::Namespace(name.to_string()));
        }
        Err(EvalError::Undefined {
            name: name.to_string(),
        })
    }

    fn evaluate_binary(
        &self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Value> {
        let lhs = self.evaluate(left)?;

        match (op, &lhs) {
            (BinaryOperator::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (BinaryOperator::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }

        let rhs = self.evaluate(right)?;
        operators::binary(op, lhs, rhs)
    }

    fn evaluate_call(&self, callee: &Expression, args: &[Expression]) -> Result<Value> {
        match self.evaluate(callee)? {
            Value::Function(function) => self.call_function(&function, args),
            Value::Namespace(name) => Err(EvalError::NotCallable {
                type_name: format!("package {}", name),
            }),
            template => self.convert_call(template, args),
        }
    }

    fn call_function(&self, function: &Function, args: &[Expression]) -> Result<Value> {
        let mut values = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<Result<Vec<_>>>()?;

        if function.accepts_implicit_self() {
            if let Arity::Fixed(expected) = function.arity() {
                if values.len() + 1 == expected {
                    if let Some(receiver) = self.env.get(SELF_BINDING) {
                        trace!(function = function.name(), "passing self as first argument");
                        values.insert(0, receiver.clone());
                    }
                }
            }
        }

        debug!(function = function.name(), args = values.len(), "calling function");
        function.apply(values)
    }

    /// `T(x)` where `T` is not a function: convert `x` into the zero value of `T`
    fn convert_call(&self, template: Value, args: &[Expression]) -> Result<Value> {
        let zero = template.zeroed();
        match args {
            [] => Ok(zero),
            [arg] => {
                let value = self.evaluate(arg)?;
                debug!(to = %zero.type_name(), "type conversion call");
                Ok(value.convert_like(&zero)?)
            }
            _ => Err(EvalError::ArityMismatch {
                function: zero.type_name(),
                expected: Arity::Fixed(1),
                received: args.len(),
            }),
        }
    }

    /// Package member, or method then field of a host object; each tried by
    /// exact name before its normalized spelling
    fn select(&self, base: Value, member: &str) -> Result<Value> {
        if let Value::Namespace(namespace) = &base {
            return packages::lookup_member(namespace, member).ok_or_else(|| {
                EvalError::UnknownMember {
                    namespace: namespace.clone(),
                    member: member.to_string(),
                }
            });
        }

        let no_such_member = || EvalError::NoSuchMember {
            type_name: base.type_name(),
            member: member.to_string(),
        };
        let host = base.as_host().ok_or_else(no_such_member)?;
        let normalized = normalize_member(member);

        host.method(member)
            .or_else(|| host.method(&normalized))
            .map(Value::Function)
            .or_else(|| host.get_field(member))
            .or_else(|| host.get_field(&normalized))
            .ok_or_else(no_such_member)
    }

    fn evaluate_composite(&self, type_expr: &Expression, elements: &[Element]) -> Result<Value> {
        let template = self.evaluate(type_expr)?;

        match template.zeroed() {
            Value::Aggregate(record) => self.build_aggregate(record, elements),

            Value::Sequence(_) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Element::Positional(expr) => items.push(self.evaluate(expr)?),
                        Element::Keyed { .. } => {
                            return Err(EvalError::unsupported("keyed element in slice literal"))
                        }
                    }
                }
                Ok(Value::Sequence(items))
            }

            Value::Function(_) | Value::Namespace(_) => Err(EvalError::unsupported(format!(
                "composite literal of {}",
                template.type_name()
            ))),

            zero => match elements {
                [] => Ok(zero),
                [Element::Positional(expr)] => Ok(self.evaluate(expr)?.convert_like(&zero)?),
                _ => Err(EvalError::unsupported(format!(
                    "composite literal of {} with {} elements",
                    zero.type_name(),
                    elements.len()
                ))),
            },
        }
    }

    fn build_aggregate(&self, mut record: Aggregate, elements: &[Element]) -> Result<Value> {
        let keyed = elements
            .iter()
            .filter(|e| matches!(e, Element::Keyed { .. }))
            .count();

        if keyed == 0 && !elements.is_empty() {
            if elements.len() != record.len() {
                return Err(EvalError::unsupported(format!(
                    "{} values for {} fields in {} literal",
                    elements.len(),
                    record.len(),
                    record.type_name()
                )));
            }
            let names: Vec<String> = record.field_names().cloned().collect();
            for (name, element) in names.iter().zip(elements) {
                if let Element::Positional(expr) = element {
                    let value = self.evaluate(expr)?;
                    assign_field(&mut record, name, value)?;
                }
            }
            return Ok(Value::Aggregate(record));
        }

        if keyed != elements.len() {
            return Err(EvalError::unsupported(format!(
                "mixture of field:value and value elements in {} literal",
                record.type_name()
            )));
        }

        for element in elements {
            if let Element::Keyed { key, value } = element {
                let name = if record.field(key).is_some() {
                    key.clone()
                } else {
                    let normalized = normalize_member(key);
                    if record.field(&normalized).is_none() {
                        return Err(EvalError::UnknownField {
                            type_name: record.type_name().to_string(),
                            key: key.clone(),
                        });
                    }
                    normalized
                };
                let value = self.evaluate(value)?;
                assign_field(&mut record, &name, value)?;
            }
        }

        Ok(Value::Aggregate(record))
    }
}

/// Store `value` in an existing field, converted to that field's kind
fn assign_field(record: &mut Aggregate, name: &str, value: Value) -> Result<()> {
    if let Some(slot) = record.field_mut(name) {
        *slot = value.convert_like(slot)?;
    }
    Ok(())
}

fn index_sequence(base: Value, index: Value) -> Result<Value> {
    let Value::Sequence(mut items) = base else {
        return Err(EvalError::unsupported(format!(
            "index of {}",
            base.type_name()
        )));
    };

    let position = match index {
        Value::Int(i) => i,
        Value::Uint(u) => i64::try_from(u).unwrap_or(i64::MAX),
        other => return Err(ConversionError::new(other.type_name(), "int64").into()),
    };

    let len = items.len();
    usize::try_from(position)
        .ok()
        .filter(|&i| i < len)
        .map(|i| items.swap_remove(i))
        .ok_or(EvalError::IndexOutOfRange {
            index: position,
            len,
        })
}

fn literal_error(message: String, span: Option<&SourceSpan>) -> EvalError {
    let (line, column) = span.map(|s| (s.line, s.column)).unwrap_or((0, 0));
    ParseError::new(message, line, column).into()
}

/// Decode literal source text into a value
fn decode_literal(kind: LiteralKind, text: &str, span: Option<&SourceSpan>) -> Result<Value> {
    match kind {
        LiteralKind::Int => {
            if let Ok(i) = text.parse::<i64>() {
                Ok(Value::Int(i))
            } else if let Ok(u) = text.parse::<u64>() {
                Ok(Value::Uint(u))
            } else {
                Err(literal_error(
                    format!("integer literal {} out of range", text),
                    span,
                ))
            }
        }
        LiteralKind::Float => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| literal_error(format!("invalid float literal {}", text), span)),
        LiteralKind::Bool => Ok(Value::Bool(text == "true")),
        LiteralKind::String | LiteralKind::Char => format::unquote(text)
            .map(Value::String)
            .map_err(|e| literal_error(e, span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::Duration;
    use crate::token_parser::parse;
    use pretty_assertions::assert_eq;

    fn eval_in(source: &str, env: &Environment) -> Result<Value> {
        let expr = parse(source)?;
        Evaluator::new(env).evaluate(&expr)
    }

    fn eval(source: &str) -> Result<Value> {
        eval_in(source, &Environment::new())
    }

    fn something() -> Aggregate {
        Aggregate::new("Something")
            .with_field("S", "")
            .with_field("N", 0i64)
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42").unwrap(), Value::Int(42));
        assert_eq!(eval("18446744073709551615").unwrap(), Value::Uint(u64::MAX));
        assert_eq!(eval("2.5e1").unwrap(), Value::Float(25.0));
        assert_eq!(eval(r#""a\tb""#).unwrap(), Value::from("a\tb"));
        assert_eq!(eval("'single'").unwrap(), Value::from("single"));
        assert_eq!(eval(r"`raw\n`").unwrap(), Value::from(r"raw\n"));
        assert_eq!(eval("true").unwrap(), Value::Bool(true));
        assert!(matches!(eval("99999999999999999999999"), Err(EvalError::Parse(_))));
        assert!(matches!(eval(r#""\q""#), Err(EvalError::Parse(_))));
    }

    #[test]
    fn test_identifier_resolution_order() {
        let env = Environment::new().bind("len", 7i64);
        assert_eq!(eval_in("len", &env).unwrap(), Value::Int(7));
        assert!(matches!(eval("len").unwrap(), Value::Function(_)));
        assert_eq!(eval("math").unwrap(), Value::Namespace("math".to_string()));
        assert_eq!(
            eval("nope").unwrap_err(),
            EvalError::Undefined {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        assert_eq!(eval("false && undefined_name").unwrap(), Value::Bool(false));
        assert_eq!(eval("true || undefined_name").unwrap(), Value::Bool(true));
        assert!(eval("true && undefined_name").is_err());
    }

    #[test]
    fn test_calls_and_arity() {
        assert_eq!(eval("min(200, 150)").unwrap(), Value::Int(150));
        assert!(matches!(
            eval("upper()").unwrap_err(),
            EvalError::ArityMismatch { ref function, expected: Arity::Fixed(1), received: 0 }
                if function == "upper"
        ));
        assert!(matches!(
            eval("itoa(\"x\")").unwrap_err(),
            EvalError::ArgumentConversion { index: 0, .. }
        ));
        assert!(matches!(eval("math(1)").unwrap_err(), EvalError::NotCallable { .. }));
    }

    #[test]
    fn test_implicit_self() {
        let env = Environment::new().bind("self", ":8080");
        assert_eq!(
            eval_in("split_addr(self).port > 1024", &env).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_in("split_addr().port > 1024", &env).unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(
            eval("split_addr()").unwrap_err(),
            EvalError::ArityMismatch { .. }
        ));
        // Only functions flagged for it take `self`
        assert!(eval_in("itoa()", &Environment::new().bind("self", 1i64)).is_err());
    }

    #[test]
    fn test_type_conversion_calls() {
        assert_eq!(eval("time.Duration(5)").unwrap(), Value::Duration(Duration(5)));
        assert_eq!(eval("time.Duration()").unwrap(), Value::Duration(Duration(0)));
        let env = Environment::new().bind("x", 1.5);
        assert_eq!(eval_in("x(3)", &env).unwrap(), Value::Float(3.0));
        assert!(matches!(
            eval("time.Duration(1, 2)").unwrap_err(),
            EvalError::ArityMismatch { received: 2, .. }
        ));
    }

    #[test]
    fn test_selectors() {
        assert!(matches!(eval("math.round").unwrap(), Value::Function(_)));
        assert!(matches!(
            eval("math.Nope").unwrap_err(),
            EvalError::UnknownMember { ref namespace, .. } if namespace == "math"
        ));
        assert_eq!(eval("time.Time{}.is_zero()").unwrap(), Value::Bool(true));
        assert_eq!(eval("(time.Time{}).IsZero()").unwrap(), Value::Bool(true));
        assert!(matches!(
            eval("(1).Foo").unwrap_err(),
            EvalError::NoSuchMember { ref type_name, .. } if type_name == "int64"
        ));
    }

    #[test]
    fn test_composite_literals() {
        let env = Environment::new().bind("Something", something());
        let built = eval_in(r#"Something{S: "testing", N: 5}"#, &env).unwrap();
        let expected = Aggregate::new("Something")
            .with_field("S", "testing")
            .with_field("N", 5i64);
        assert_eq!(built, Value::Aggregate(expected.clone()));

        assert_eq!(
            eval_in(r#"Something{"testing", 5}"#, &env).unwrap(),
            Value::Aggregate(expected)
        );
        assert_eq!(
            eval_in("Something{n: 2.9}", &env).unwrap(),
            Value::Aggregate(something().with_field("N", 2i64))
        );
        assert_eq!(eval_in("Something{}", &env).unwrap(), Value::Aggregate(something()));
        assert!(matches!(
            eval_in("Something{X: 1}", &env).unwrap_err(),
            EvalError::UnknownField { ref key, .. } if key == "X"
        ));
        assert!(matches!(
            eval_in(r#"Something{S: "a", 5}"#, &env).unwrap_err(),
            EvalError::Unsupported { .. }
        ));
        assert!(matches!(
            eval_in(r#"Something{N: "a"}"#, &env).unwrap_err(),
            EvalError::Unconvertible(_)
        ));
        assert_eq!(eval("time.Duration{7}").unwrap(), Value::Duration(Duration(7)));
    }

    #[test]
    fn test_index_and_slice() {
        let env = Environment::new().bind(
            "xs",
            vec![Value::Int(10), Value::Int(20), Value::Int(30)],
        );
        assert_eq!(eval_in("xs[1]", &env).unwrap(), Value::Int(20));
        assert_eq!(
            eval_in("xs[3]", &env).unwrap_err(),
            EvalError::IndexOutOfRange { index: 3, len: 3 }
        );
        assert_eq!(
            eval_in("xs[-1]", &env).unwrap_err(),
            EvalError::IndexOutOfRange { index: -1, len: 3 }
        );
        assert_eq!(
            eval_in("xs[0:1]", &env).unwrap_err(),
            EvalError::Unsupported {
                what: "slice".to_string()
            }
        );
        assert_eq!(eval(r#"split("a b", " ")[1]"#).unwrap(), Value::from("b"));
    }

    #[test]
    fn test_environment_from_json() {
        let json = serde_json::json!({"port": 8080, "name": "svc", "tags": ["a"]});
        let env = Environment::from_json(&json).unwrap();
        assert_eq!(env.get("port"), Some(&Value::Int(8080)));
        assert_eq!(env.len(), 3);
        assert!(Environment::from_json(&serde_json::json!([1])).is_err());
    }
}
