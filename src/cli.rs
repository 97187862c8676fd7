//! CLI utilities and helpers

use colored::*;

use crate::format::quote;
use crate::value::Value;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Format a value the way it would be written in an expression
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Aggregate(a) => {
            let fields: Vec<String> = a
                .fields()
                .map(|(name, v)| format!("{}: {}", name, format_value(v)))
                .collect();
            format!("{}{{{}}}", a.type_name(), fields.join(", "))
        }
        Value::Sequence(items) => {
            let formatted: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", formatted.join(", "))
        }
        other => other.to_string(),
    }
}

/// Split a `name=value` command-line binding
pub fn split_binding(binding: &str) -> Option<(&str, &str)> {
    let (name, value) = binding.split_once('=')?;
    let name = name.trim();
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some((name, value))
}
