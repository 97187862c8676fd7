//! Built-in functions
//!
//! Free functions callable by bare identifier: length checks, casts, numeric
//! helpers, string operations, formatting, OS queries, time, network parsing
//! and hashing. The registry is built once and shared read-only.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{
    DateTime, FixedOffset, Months, NaiveDate, TimeDelta, TimeZone, Utc,
};
use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use rand::Rng;
use regex::Regex;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::Write as _;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ast::BinaryOperator;
use crate::duration::Duration;
use crate::error::{EvalError, Result};
use crate::format;
use crate::function::{arg, int_arg, string_arg, BuiltinFunction, Function, ParamKind};
use crate::operators;
use crate::value::{Aggregate, Value, ValueKind};

/// Unix time of the instant `now()` returns in test mode (2020-01-01T00:00:00Z)
pub const TEST_NOW_UNIX: i64 = 1_577_836_800;

static TEST_MODE: AtomicBool = AtomicBool::new(false);

/// Pin `now()` to [`TEST_NOW_UNIX`] process-wide
pub fn enable_test_mode() {
    TEST_MODE.store(true, Ordering::SeqCst);
}

pub fn disable_test_mode() {
    TEST_MODE.store(false, Ordering::SeqCst);
}

pub fn is_test_mode() -> bool {
    TEST_MODE.load(Ordering::SeqCst)
}

/// The current instant in UTC, or the pinned instant in test mode
pub fn current_time() -> DateTime<FixedOffset> {
    if is_test_mode() {
        if let Some(pinned) = DateTime::from_timestamp(TEST_NOW_UNIX, 0) {
            return pinned.fixed_offset();
        }
    }
    Utc::now().fixed_offset()
}

/// Function registry
pub struct FunctionRegistry {
    functions: IndexMap<String, Value>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        use ParamKind as P;

        let mut registry = Self {
            functions: IndexMap::new(),
        };

        // Length and emptiness
        registry.register_self("len", &[P::Any], fn_len);
        registry.register_self("some", &[P::Any], fn_some);
        registry.register_self("none", &[P::Any], fn_none);

        // Casts
        registry.register_self("int", &[P::Any], fn_int);
        registry.register_self("float", &[P::Any], fn_float);
        registry.register_self("string", &[P::Any], fn_string);

        // Numeric
        registry.register_variadic("min", &[P::Any], P::Any, fn_min);
        registry.register_variadic("max", &[P::Any], P::Any, fn_max);
        registry.register("rand", &[], fn_rand);
        registry.register("random", &[P::INT], fn_random);

        // Strings
        registry.register_self("startswith", &[P::STRING, P::STRING], fn_startswith);
        registry.register_self("endswith", &[P::STRING, P::STRING], fn_endswith);
        registry.register_self("trim", &[P::STRING], fn_trim);
        registry.register_self("upper", &[P::STRING], fn_upper);
        registry.register_self("lower", &[P::STRING], fn_lower);
        registry.register_self("split", &[P::STRING, P::STRING], fn_split);
        registry.register_self("atoi", &[P::STRING], fn_atoi);
        registry.register("itoa", &[P::INT], fn_itoa);
        registry.register_self("quote", &[P::STRING], fn_quote);
        registry.register_self("unquote", &[P::STRING], fn_unquote);

        // Formatting
        registry.register_variadic("print", &[], P::Any, fn_print);
        registry.register_variadic("printf", &[P::STRING], P::Any, fn_printf);
        registry.register_variadic("println", &[], P::Any, fn_println);
        registry.register_variadic("sprint", &[], P::Any, fn_sprint);
        registry.register_variadic("sprintf", &[P::STRING], P::Any, fn_sprintf);
        registry.register_variadic("sprintln", &[], P::Any, fn_sprintln);

        // OS
        registry.register("getwd", &[], fn_getwd);
        registry.register("tempdir", &[], fn_tempdir);
        registry.register_variadic("joinpath", &[], P::STRING, fn_joinpath);
        registry.register("getenv", &[P::STRING], fn_getenv);

        // Time
        registry.register("now", &[], fn_now);
        registry.register("date", &[P::INT, P::INT, P::INT], fn_date);
        registry.register_self("duration", &[P::STRING], fn_duration);

        // Network
        registry.register_self("parse_mac", &[P::STRING], fn_parse_mac);
        registry.register_self("parse_ip", &[P::STRING], fn_parse_ip);
        registry.register_self("split_addr", &[P::STRING], fn_split_addr);

        // Hashing
        registry.register("hmac", &[P::STRING, P::STRING], fn_hmac);
        registry.register_self("md5", &[P::STRING], fn_md5);
        registry.register_self("sha1", &[P::STRING], fn_sha1);
        registry.register_self("sha256", &[P::STRING], fn_sha256);

        registry
    }

    /// Register a function with a fixed parameter list
    pub fn register(&mut self, name: &str, params: &[ParamKind], func: BuiltinFunction) {
        self.insert(Function::builtin(name, params, func));
    }

    /// Register a function whose first argument may come from the `self` binding
    pub fn register_self(&mut self, name: &str, params: &[ParamKind], func: BuiltinFunction) {
        self.insert(Function::builtin(name, params, func).with_implicit_self());
    }

    /// Register a function taking any number of trailing `tail` arguments
    pub fn register_variadic(
        &mut self,
        name: &str,
        params: &[ParamKind],
        tail: ParamKind,
        func: BuiltinFunction,
    ) {
        self.insert(Function::builtin(name, params, func).variadic(tail));
    }

    fn insert(&mut self, function: Function) {
        self.functions
            .insert(function.name().to_string(), Value::Function(function));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.functions.get(name)
    }

    /// Check if a function exists
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// List all function names, sorted
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Global function registry using lazy_static
lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: FunctionRegistry = FunctionRegistry::new();
}

/// The process-wide builtin registry
pub fn registry() -> &'static FunctionRegistry {
    &GLOBAL_REGISTRY
}

/// Look up a builtin by name
pub fn lookup(name: &str) -> Option<Value> {
    GLOBAL_REGISTRY.get(name).cloned()
}

// =============================================================================
// LENGTH FUNCTIONS
// =============================================================================

fn fn_len(args: &[Value]) -> Result<Value> {
    let len = match arg(args, 0)? {
        Value::String(s) => s.len(),
        Value::Sequence(items) => items.len(),
        Value::Aggregate(a) => a.len(),
        _ => 0,
    };
    Ok(Value::Int(len as i64))
}

fn fn_some(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(!arg(args, 0)?.is_zero()))
}

fn fn_none(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(arg(args, 0)?.is_zero()))
}

// =============================================================================
// CAST FUNCTIONS
// =============================================================================

fn fn_int(args: &[Value]) -> Result<Value> {
    match arg(args, 0)? {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| EvalError::call_failed("int", format!("parsing {:?}: {}", s, e))),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        other => Ok(other.convert_to(ValueKind::Int)?),
    }
}

fn fn_float(args: &[Value]) -> Result<Value> {
    match arg(args, 0)? {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| EvalError::call_failed("float", format!("parsing {:?}: {}", s, e))),
        other => Ok(other.convert_to(ValueKind::Float)?),
    }
}

fn fn_string(args: &[Value]) -> Result<Value> {
    Ok(Value::String(arg(args, 0)?.to_string()))
}

// =============================================================================
// NUMERIC FUNCTIONS
// =============================================================================

fn extremum(args: &[Value], keep_rhs: BinaryOperator) -> Result<Value> {
    let mut best = arg(args, 0)?.clone();
    for candidate in &args[1..] {
        let replace = operators::binary(keep_rhs, candidate.clone(), best.clone())?;
        if replace.as_bool() == Some(true) {
            best = candidate.clone();
        }
    }
    Ok(best)
}

fn fn_min(args: &[Value]) -> Result<Value> {
    extremum(args, BinaryOperator::LessThan)
}

fn fn_max(args: &[Value]) -> Result<Value> {
    extremum(args, BinaryOperator::GreaterThan)
}

fn fn_rand(_args: &[Value]) -> Result<Value> {
    Ok(Value::Float(rand::thread_rng().gen::<f64>()))
}

fn fn_random(args: &[Value]) -> Result<Value> {
    let n = int_arg(args, 0)?;
    if n <= 0 {
        return Err(EvalError::call_failed(
            "random",
            format!("invalid argument {}: must be positive", n),
        ));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(0..n)))
}

// =============================================================================
// STRING FUNCTIONS
// =============================================================================

fn fn_startswith(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let prefix = string_arg(args, 1)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn fn_endswith(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let suffix = string_arg(args, 1)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

fn fn_trim(args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_arg(args, 0)?.trim().to_string()))
}

fn fn_upper(args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn fn_lower(args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn fn_split(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let sep = string_arg(args, 1)?;
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(sep).map(|p| Value::String(p.to_string())).collect()
    };
    Ok(Value::Sequence(parts))
}

fn fn_atoi(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    s.parse::<i64>()
        .map(Value::Int)
        .map_err(|_| EvalError::call_failed("atoi", format!("parsing {:?}: invalid syntax", s)))
}

fn fn_itoa(args: &[Value]) -> Result<Value> {
    Ok(Value::String(int_arg(args, 0)?.to_string()))
}

fn fn_quote(args: &[Value]) -> Result<Value> {
    Ok(Value::String(format::quote(string_arg(args, 0)?)))
}

fn fn_unquote(args: &[Value]) -> Result<Value> {
    format::unquote(string_arg(args, 0)?)
        .map(Value::String)
        .map_err(|e| EvalError::call_failed("unquote", e))
}

// =============================================================================
// FORMATTING FUNCTIONS
// =============================================================================

fn write_stdout(function: &str, text: &str) -> Result<Value> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| EvalError::call_failed(function, e.to_string()))?;
    Ok(Value::Int(text.len() as i64))
}

pub(crate) fn fn_print(args: &[Value]) -> Result<Value> {
    write_stdout("print", &format::sprint(args))
}

pub(crate) fn fn_printf(args: &[Value]) -> Result<Value> {
    write_stdout("printf", &format::sprintf(string_arg(args, 0)?, &args[1..]))
}

pub(crate) fn fn_println(args: &[Value]) -> Result<Value> {
    write_stdout("println", &format::sprintln(args))
}

pub(crate) fn fn_sprint(args: &[Value]) -> Result<Value> {
    Ok(Value::String(format::sprint(args)))
}

pub(crate) fn fn_sprintf(args: &[Value]) -> Result<Value> {
    Ok(Value::String(format::sprintf(string_arg(args, 0)?, &args[1..])))
}

pub(crate) fn fn_sprintln(args: &[Value]) -> Result<Value> {
    Ok(Value::String(format::sprintln(args)))
}

// =============================================================================
// OS FUNCTIONS
// =============================================================================

fn fn_getwd(_args: &[Value]) -> Result<Value> {
    let dir = std::env::current_dir().map_err(|e| EvalError::call_failed("getwd", e.to_string()))?;
    Ok(Value::String(dir.to_string_lossy().into_owned()))
}

fn fn_tempdir(_args: &[Value]) -> Result<Value> {
    Ok(Value::String(
        std::env::temp_dir().to_string_lossy().into_owned(),
    ))
}

fn fn_joinpath(args: &[Value]) -> Result<Value> {
    let mut path = PathBuf::new();
    for (i, _) in args.iter().enumerate() {
        let part = string_arg(args, i)?;
        if !part.is_empty() {
            path.push(part);
        }
    }
    Ok(Value::String(path.to_string_lossy().into_owned()))
}

fn fn_getenv(args: &[Value]) -> Result<Value> {
    let key = string_arg(args, 0)?;
    Ok(Value::String(std::env::var(key).unwrap_or_default()))
}

// =============================================================================
// TIME FUNCTIONS
// =============================================================================

/// Build an instant from calendar fields, normalizing out-of-range values
/// (month 13 is January of the next year, day 0 is the last day of the
/// previous month, and so on).
pub(crate) fn civil_time(
    year: i64,
    month: i64,
    day: i64,
    clock: [i64; 4],
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let [hour, minute, second, nanos] = clock;
    let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)?;
    let months = month - 1;
    let month_start = if months >= 0 {
        first.checked_add_months(Months::new(u32::try_from(months).ok()?))?
    } else {
        first.checked_sub_months(Months::new(u32::try_from(-months).ok()?))?
    };

    let delta = TimeDelta::try_days(day - 1)?
        .checked_add(&TimeDelta::try_hours(hour)?)?
        .checked_add(&TimeDelta::try_minutes(minute)?)?
        .checked_add(&TimeDelta::try_seconds(second)?)?
        .checked_add(&TimeDelta::nanoseconds(nanos))?;

    let local = month_start.and_hms_opt(0, 0, 0)?.checked_add_signed(delta)?;
    offset.from_local_datetime(&local).single()
}

pub(crate) fn fn_now(_args: &[Value]) -> Result<Value> {
    Ok(Value::Time(current_time()))
}

fn fn_date(args: &[Value]) -> Result<Value> {
    let (year, month, day) = (int_arg(args, 0)?, int_arg(args, 1)?, int_arg(args, 2)?);
    let utc = FixedOffset::east_opt(0).ok_or_else(|| EvalError::call_failed("date", "invalid offset"))?;
    civil_time(year, month, day, [0; 4], utc)
        .map(Value::Time)
        .ok_or_else(|| {
            EvalError::call_failed("date", format!("date {}-{}-{} out of range", year, month, day))
        })
}

fn fn_duration(args: &[Value]) -> Result<Value> {
    Duration::parse(string_arg(args, 0)?)
        .map(Value::Duration)
        .map_err(|e| EvalError::call_failed("duration", e))
}

// =============================================================================
// NETWORK FUNCTIONS
// =============================================================================

lazy_static::lazy_static! {
    static ref MAC_SEPARATED: Regex =
        Regex::new(r"^[0-9A-Fa-f]{2}(?:[:-][0-9A-Fa-f]{2})+$").expect("valid MAC pattern");
    static ref MAC_DOTTED: Regex =
        Regex::new(r"^[0-9A-Fa-f]{4}(?:\.[0-9A-Fa-f]{4})+$").expect("valid MAC pattern");
}

/// Canonical lowercase colon-separated form of an EUI-48, EUI-64 or
/// 20-octet InfiniBand hardware address
pub(crate) fn parse_mac(s: &str) -> std::result::Result<String, String> {
    let invalid = || format!("address {}: invalid MAC address", s);

    let hex: String = if MAC_SEPARATED.is_match(s) {
        let separator = s.as_bytes()[2];
        if s.bytes().skip(2).step_by(3).any(|b| b != separator) {
            return Err(invalid());
        }
        s.chars().filter(|c| c.is_ascii_hexdigit()).collect()
    } else if MAC_DOTTED.is_match(s) {
        s.chars().filter(|c| c.is_ascii_hexdigit()).collect()
    } else {
        return Err(invalid());
    };

    if !matches!(hex.len() / 2, 6 | 8 | 20) {
        return Err(invalid());
    }

    let octets: Vec<String> = hex
        .to_lowercase()
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect();
    Ok(octets.join(":"))
}

/// Canonical text form of an IPv4 or IPv6 address; IPv4-mapped IPv6
/// addresses print as IPv4
pub(crate) fn parse_ip(s: &str) -> Option<IpAddr> {
    let ip: IpAddr = s.parse().ok()?;
    Some(match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    })
}

fn host_port_string(receiver: &Aggregate, _args: &[Value]) -> Result<Value> {
    let host = receiver.field("Host").map(|v| v.to_string()).unwrap_or_default();
    let port = receiver.field("Port").map(|v| v.to_string()).unwrap_or_default();
    Ok(Value::String(if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }))
}

/// Split `host:port` or `[host]:port` into a `HostPort` aggregate
pub(crate) fn split_host_port(addr: &str) -> std::result::Result<Aggregate, String> {
    let fail = |reason: &str| format!("address {}: {}", addr, reason);

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(|| fail("missing ']' in address"))?;
        let port = after.strip_prefix(':').ok_or_else(|| fail("missing port in address"))?;
        (host, port)
    } else {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| fail("missing port in address"))?;
        if host.contains(':') {
            return Err(fail("too many colons in address"));
        }
        (host, port)
    };

    let port: i64 = port.parse().map_err(|_| fail("invalid port"))?;

    Ok(Aggregate::new("HostPort")
        .with_field("Host", host)
        .with_field("Port", port)
        .with_method("String", &[], host_port_string))
}

fn fn_parse_mac(args: &[Value]) -> Result<Value> {
    parse_mac(string_arg(args, 0)?)
        .map(Value::String)
        .map_err(|e| EvalError::call_failed("parse_mac", e))
}

fn fn_parse_ip(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    parse_ip(s)
        .map(|ip| Value::String(ip.to_string()))
        .ok_or_else(|| EvalError::call_failed("parse_ip", format!("invalid IP address {:?}", s)))
}

fn fn_split_addr(args: &[Value]) -> Result<Value> {
    split_host_port(string_arg(args, 0)?)
        .map(Value::Aggregate)
        .map_err(|e| EvalError::call_failed("split_addr", e))
}

// =============================================================================
// HASH FUNCTIONS
// =============================================================================

/// HMAC-SHA256 of `data` keyed by `key`, as lowercase hex
fn fn_hmac(args: &[Value]) -> Result<Value> {
    let key = string_arg(args, 0)?;
    let data = string_arg(args, 1)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| EvalError::call_failed("hmac", e.to_string()))?;
    mac.update(data.as_bytes());
    let result = mac.finalize().into_bytes();
    Ok(Value::String(format!("{:x}", result)))
}

fn fn_md5(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    Ok(Value::String(format!("{:x}", md5::compute(s))))
}

fn fn_sha1(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    Ok(Value::String(format!("{:x}", result)))
}

fn fn_sha256(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    Ok(Value::String(format!("{:x}", result)))
}

/// Standard base64 text of a string's bytes
pub(crate) fn base64_encode(s: &str) -> String {
    STANDARD.encode(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value> {
        match lookup(name) {
            Some(Value::Function(f)) => f.apply(args),
            other => panic!("{} is not a builtin function: {:?}", name, other),
        }
    }

    #[test]
    fn test_registry_contents() {
        let names = registry().list_functions();
        for expected in ["len", "sprintf", "split_addr", "hmac", "now", "joinpath"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert!(!registry().has_function("Something"));
    }

    #[test]
    fn test_len_some_none() {
        assert_eq!(call("len", vec!["hello".into()]).unwrap(), Value::Int(5));
        assert_eq!(
            call("len", vec![Value::Sequence(vec![Value::Int(1), Value::Int(2)])]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(call("len", vec![Value::Int(7)]).unwrap(), Value::Int(0));
        assert_eq!(call("some", vec!["x".into()]).unwrap(), Value::Bool(true));
        assert_eq!(call("none", vec!["".into()]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_casts() {
        assert_eq!(call("int", vec![Value::Float(3.9)]).unwrap(), Value::Int(3));
        assert_eq!(call("int", vec![" 42 ".into()]).unwrap(), Value::Int(42));
        assert_eq!(call("float", vec!["2.5".into()]).unwrap(), Value::Float(2.5));
        assert_eq!(call("string", vec![Value::Int(9)]).unwrap(), Value::from("9"));
        assert!(matches!(
            call("int", vec!["abc".into()]),
            Err(EvalError::CallFailed { .. })
        ));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(
            call("min", vec![Value::Int(200), Value::Int(150)]).unwrap(),
            Value::Int(150)
        );
        assert_eq!(
            call("max", vec![Value::Int(1), Value::Float(2.5), Value::Int(2)]).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(call("min", vec![Value::Int(4)]).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_random_values_in_range() {
        for _ in 0..50 {
            match call("rand", vec![]).unwrap() {
                Value::Float(f) => assert!((0.0..1.0).contains(&f)),
                other => panic!("unexpected {:?}", other),
            }
            match call("random", vec![Value::Int(10)]).unwrap() {
                Value::Int(i) => assert!((0..10).contains(&i)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(call("random", vec![Value::Int(0)]).is_err());
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("upper", vec!["abc".into()]).unwrap(), Value::from("ABC"));
        assert_eq!(call("trim", vec!["  x ".into()]).unwrap(), Value::from("x"));
        assert_eq!(
            call("startswith", vec!["prefix-x".into(), "prefix".into()]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("split", vec!["a,b,c".into(), ",".into()]).unwrap(),
            Value::Sequence(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(call("atoi", vec!["-12".into()]).unwrap(), Value::Int(-12));
        assert!(call("atoi", vec![" 1".into()]).is_err());
        assert_eq!(call("itoa", vec![Value::Int(12)]).unwrap(), Value::from("12"));
        assert_eq!(call("quote", vec!["a\nb".into()]).unwrap(), Value::from("\"a\\nb\""));
        assert_eq!(call("unquote", vec!["\"a\\nb\"".into()]).unwrap(), Value::from("a\nb"));
    }

    #[test]
    fn test_sprintf_builtin() {
        assert_eq!(
            call("sprintf", vec!["%s: %d".into(), "count".into(), Value::Int(100)]).unwrap(),
            Value::from("count: 100")
        );
        assert_eq!(
            call("sprint", vec!["a".into(), Value::Int(1), Value::Int(2)]).unwrap(),
            Value::from("a1 2")
        );
    }

    #[test]
    fn test_joinpath() {
        let joined = call("joinpath", vec!["a".into(), "b".into(), "c.txt".into()]).unwrap();
        let expected: PathBuf = ["a", "b", "c.txt"].iter().collect();
        assert_eq!(joined, Value::String(expected.to_string_lossy().into_owned()));
    }

    #[test]
    fn test_date_normalizes() {
        let t = call("date", vec![Value::Int(2020), Value::Int(1), Value::Int(1)]).unwrap();
        assert_eq!(t.to_string(), "2020-01-01T00:00:00Z");

        let rolled = call("date", vec![Value::Int(2019), Value::Int(13), Value::Int(1)]).unwrap();
        assert_eq!(rolled, t);

        let back = call("date", vec![Value::Int(2020), Value::Int(3), Value::Int(0)]).unwrap();
        assert_eq!(back.to_string(), "2020-02-29T00:00:00Z");
    }

    #[test]
    fn test_duration_builtin() {
        assert_eq!(
            call("duration", vec!["-1m".into()]).unwrap(),
            Value::Duration(Duration(-Duration::MINUTE.0))
        );
        assert!(matches!(
            call("duration", vec!["soon".into()]),
            Err(EvalError::CallFailed { ref function, .. }) if function == "duration"
        ));
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(parse_mac("00:1A:2b:3C:4d:5E").unwrap(), "00:1a:2b:3c:4d:5e");
        assert_eq!(parse_mac("00-1a-2b-3c-4d-5e").unwrap(), "00:1a:2b:3c:4d:5e");
        assert_eq!(parse_mac("001a.2b3c.4d5e").unwrap(), "00:1a:2b:3c:4d:5e");
        assert!(parse_mac("00:1a-2b:3c:4d:5e").is_err());
        assert!(parse_mac("00:1a:2b").is_err());
        assert!(parse_mac("zz:1a:2b:3c:4d:5e").is_err());
    }

    #[test]
    fn test_parse_ip() {
        assert_eq!(call("parse_ip", vec!["10.0.0.1".into()]).unwrap(), Value::from("10.0.0.1"));
        assert_eq!(
            call("parse_ip", vec!["2001:0db8:0000:0000:0000:0000:0000:0001".into()]).unwrap(),
            Value::from("2001:db8::1")
        );
        assert_eq!(
            call("parse_ip", vec!["::ffff:192.0.2.1".into()]).unwrap(),
            Value::from("192.0.2.1")
        );
        assert!(call("parse_ip", vec!["300.1.1.1".into()]).is_err());
    }

    #[test]
    fn test_split_addr() {
        let hp = split_host_port(":8080").unwrap();
        assert_eq!(hp.field("Host"), Some(&Value::from("")));
        assert_eq!(hp.field("Port"), Some(&Value::Int(8080)));

        let v6 = split_host_port("[::1]:443").unwrap();
        assert_eq!(v6.field("Host"), Some(&Value::from("::1")));
        assert_eq!(host_port_string(&v6, &[]).unwrap(), Value::from("[::1]:443"));

        assert!(split_host_port("localhost").is_err());
        assert!(split_host_port("::1:80").is_err());
        assert!(split_host_port("host:http").is_err());
    }

    #[test]
    fn test_hashes() {
        assert_eq!(
            call("md5", vec!["data".into()]).unwrap(),
            Value::from("8d777f385d3dfec8815d20f7496026dc")
        );
        assert_eq!(
            call("sha1", vec!["data".into()]).unwrap(),
            Value::from("a17c9aaa61e80a1bf71d0d850af4e5baa9800bbd")
        );
        assert_eq!(
            call("sha256", vec!["data".into()]).unwrap(),
            Value::from("3a6eb0790f39ac87c94f3856b2dd2c5d110e6811602261a9a923d3bb23adc8b7")
        );
        assert_eq!(
            call("hmac", vec!["some key".into(), "data".into()]).unwrap(),
            Value::from("80d8e243bb787f3f34042d99d14c1e6d8c50e0dd3ff5eb713982443bebf161d0")
        );
    }

    #[test]
    fn test_base64_encode() {
        assert_eq!(base64_encode("data"), "ZGF0YQ==");
    }
}
