//! Package registry
//!
//! Namespaced members reached through selector syntax (`math.Round`,
//! `time.Minute`, `net.ParseCIDR`). The registry is built once on first use
//! and never mutated afterwards.
//!
//! Member lookup tries the exact name first and then exactly one fallback,
//! [`normalize_member`], so `math.round` and `time.parse_duration` resolve to
//! `Round` and `ParseDuration`.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};
use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::duration::Duration;
use crate::error::{EvalError, Result};
use crate::function::{arg, float_arg, int_arg, string_arg, BuiltinFunction, Function, ParamKind};
use crate::functions;
use crate::value::{zero_time, Aggregate, Value};

/// A namespace and its members
pub struct Package {
    name: &'static str,
    members: IndexMap<String, Value>,
}

impl Package {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            members: IndexMap::new(),
        }
    }

    fn function(mut self, member: &str, params: &[ParamKind], body: BuiltinFunction) -> Self {
        let qualified = format!("{}.{}", self.name, member);
        self.members.insert(
            member.to_string(),
            Value::Function(Function::new(qualified, params, body)),
        );
        self
    }

    fn variadic(
        mut self,
        member: &str,
        params: &[ParamKind],
        tail: ParamKind,
        body: BuiltinFunction,
    ) -> Self {
        let qualified = format!("{}.{}", self.name, member);
        self.members.insert(
            member.to_string(),
            Value::Function(Function::new(qualified, params, body).variadic(tail)),
        );
        self
    }

    fn math(mut self, member: &str, op: fn(f64) -> f64) -> Self {
        let qualified = format!("{}.{}", self.name, member);
        let function = Function::new(qualified, &[ParamKind::FLOAT], move |args| {
            Ok(Value::Float(op(float_arg(args, 0)?)))
        });
        self.members.insert(member.to_string(), Value::Function(function));
        self
    }

    fn constant(mut self, member: &str, value: impl Into<Value>) -> Self {
        self.members.insert(member.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Member by exact name, then by its normalized spelling
    pub fn member(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.members.get(name) {
            return Some(value);
        }
        let normalized = normalize_member(name);
        let value = self.members.get(&normalized)?;
        tracing::trace!(package = self.name, member = name, resolved = %normalized, "normalized member");
        Some(value)
    }

    /// Members in registration order
    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Case-normalize a member name: first rune upper-cased, then each
/// `_`-separated part title-cased and the parts joined (`is_zero` -> `IsZero`)
pub fn normalize_member(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

lazy_static::lazy_static! {
    static ref PACKAGES: IndexMap<&'static str, Package> = build_packages();
}

/// Whether `name` is a known namespace
pub fn is_package(name: &str) -> bool {
    PACKAGES.contains_key(name)
}

pub fn package(name: &str) -> Option<&'static Package> {
    PACKAGES.get(name)
}

/// Resolve `namespace.member`
pub fn lookup_member(namespace: &str, member: &str) -> Option<Value> {
    PACKAGES.get(namespace)?.member(member).cloned()
}

/// Namespace names in registration order
pub fn package_names() -> Vec<&'static str> {
    PACKAGES.keys().copied().collect()
}

fn build_packages() -> IndexMap<&'static str, Package> {
    use ParamKind as P;

    let fmt = Package::new("fmt")
        .variadic("Print", &[], P::Any, functions::fn_print)
        .variadic("Printf", &[P::STRING], P::Any, functions::fn_printf)
        .variadic("Println", &[], P::Any, functions::fn_println)
        .variadic("Sprint", &[], P::Any, functions::fn_sprint)
        .variadic("Sprintf", &[P::STRING], P::Any, functions::fn_sprintf)
        .variadic("Sprintln", &[], P::Any, functions::fn_sprintln);

    let math = Package::new("math")
        .math("Abs", f64::abs)
        .math("Acos", f64::acos)
        .math("Asin", f64::asin)
        .math("Atan", f64::atan)
        .math("Ceil", f64::ceil)
        .math("Cos", f64::cos)
        .math("Exp", f64::exp)
        .math("Floor", f64::floor)
        .math("Log", f64::ln)
        .function("Max", &[P::FLOAT, P::FLOAT], math_max)
        .function("Min", &[P::FLOAT, P::FLOAT], math_min)
        .function("Pow", &[P::FLOAT, P::FLOAT], math_pow)
        .math("Round", f64::round)
        .math("Sin", f64::sin)
        .math("Sqrt", f64::sqrt)
        .math("Tan", f64::tan)
        .constant("Pi", std::f64::consts::PI)
        .constant("E", std::f64::consts::E);

    let time = Package::new("time")
        .constant("Time", zero_time())
        .constant("Duration", Duration(0))
        .constant("UTC", "UTC")
        .constant("Local", "Local")
        .function(
            "Date",
            &[P::INT, P::INT, P::INT, P::INT, P::INT, P::INT, P::INT, P::STRING],
            time_date,
        )
        .function("Now", &[], functions::fn_now)
        .function("ParseDuration", &[P::STRING], time_parse_duration)
        .function("Unix", &[P::INT, P::INT], time_unix)
        .constant("Nanosecond", Duration::NANOSECOND)
        .constant("Microsecond", Duration::MICROSECOND)
        .constant("Millisecond", Duration::MILLISECOND)
        .constant("Second", Duration::SECOND)
        .constant("Minute", Duration::MINUTE)
        .constant("Hour", Duration::HOUR);

    let net = Package::new("net")
        .function("ParseIP", &[P::STRING], net_parse_ip)
        .function("ParseCIDR", &[P::STRING], net_parse_cidr)
        .function("ParseMAC", &[P::STRING], net_parse_mac)
        .function("SplitHostPort", &[P::STRING], net_split_host_port);

    let strings = Package::new("strings")
        .function("HasPrefix", &[P::STRING, P::STRING], strings_has_prefix)
        .function("HasSuffix", &[P::STRING, P::STRING], strings_has_suffix)
        .function("Contains", &[P::STRING, P::STRING], strings_contains)
        .function("ToUpper", &[P::STRING], strings_to_upper)
        .function("ToLower", &[P::STRING], strings_to_lower)
        .function("TrimSpace", &[P::STRING], strings_trim_space)
        .function("Split", &[P::STRING, P::STRING], strings_split)
        .function("Repeat", &[P::STRING, P::INT], strings_repeat)
        .function("ReplaceAll", &[P::STRING, P::STRING, P::STRING], strings_replace_all);

    let base64 = Package::new("base64")
        .function("Encode", &[P::STRING], base64_encode)
        .function("Decode", &[P::STRING], base64_decode)
        .function("URLEncode", &[P::STRING], base64_url_encode)
        .function("URLDecode", &[P::STRING], base64_url_decode);

    let json = Package::new("json")
        .function("Encode", &[P::Any], json_encode)
        .function("Decode", &[P::STRING], json_decode)
        .function("Valid", &[P::STRING], json_valid);

    let url = Package::new("url")
        .function("QueryEscape", &[P::STRING], url_query_escape)
        .function("QueryUnescape", &[P::STRING], url_query_unescape);

    [fmt, math, time, net, strings, base64, json, url]
        .into_iter()
        .map(|package| (package.name, package))
        .collect()
}

// =============================================================================
// MATH
// =============================================================================

fn math_max(args: &[Value]) -> Result<Value> {
    let (x, y) = (float_arg(args, 0)?, float_arg(args, 1)?);
    Ok(Value::Float(if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.max(y)
    }))
}

fn math_min(args: &[Value]) -> Result<Value> {
    let (x, y) = (float_arg(args, 0)?, float_arg(args, 1)?);
    Ok(Value::Float(if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.min(y)
    }))
}

fn math_pow(args: &[Value]) -> Result<Value> {
    Ok(Value::Float(float_arg(args, 0)?.powf(float_arg(args, 1)?)))
}

// =============================================================================
// TIME
// =============================================================================

/// Resolve a location name: `UTC`, `Local`, or a fixed offset like `+05:30`
fn parse_location(name: &str) -> Option<FixedOffset> {
    match name {
        "UTC" | "" => FixedOffset::east_opt(0),
        "Local" => Some(*Local::now().offset()),
        offset => {
            let (sign, rest) = match offset.as_bytes().first()? {
                b'+' => (1, &offset[1..]),
                b'-' => (-1, &offset[1..]),
                _ => return None,
            };
            let (hours, minutes) = match rest.split_once(':') {
                Some((h, m)) => (h, m),
                None if rest.len() == 4 => (rest.get(..2)?, rest.get(2..)?),
                None => (rest, "0"),
            };
            let digits =
                |s: &str| (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
            if !digits(hours) || !digits(minutes) {
                return None;
            }
            let hours: i32 = hours.parse().ok()?;
            let minutes: i32 = minutes.parse().ok()?;
            if hours > 23 || minutes >= 60 {
                return None;
            }
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        }
    }
}

fn time_date(args: &[Value]) -> Result<Value> {
    let mut fields = [0i64; 7];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = int_arg(args, i)?;
    }
    let location = string_arg(args, 7)?;
    let offset = parse_location(location).ok_or_else(|| {
        EvalError::call_failed("time.Date", format!("unknown time zone {}", location))
    })?;

    let [year, month, day, hour, minute, second, nanos] = fields;
    functions::civil_time(year, month, day, [hour, minute, second, nanos], offset)
        .map(Value::Time)
        .ok_or_else(|| EvalError::call_failed("time.Date", "date out of range"))
}

fn time_parse_duration(args: &[Value]) -> Result<Value> {
    Duration::parse(string_arg(args, 0)?)
        .map(Value::Duration)
        .map_err(|e| EvalError::call_failed("time.ParseDuration", e))
}

fn time_unix(args: &[Value]) -> Result<Value> {
    let (sec, nsec) = (int_arg(args, 0)?, int_arg(args, 1)?);
    sec.checked_add(nsec.div_euclid(1_000_000_000))
        .and_then(|secs| DateTime::from_timestamp(secs, nsec.rem_euclid(1_000_000_000) as u32))
        .map(|t| Value::Time(t.fixed_offset()))
        .ok_or_else(|| EvalError::call_failed("time.Unix", "time out of range"))
}

// =============================================================================
// NET
// =============================================================================

fn ipnet_string(receiver: &Aggregate, _args: &[Value]) -> Result<Value> {
    Ok(receiver
        .field("Network")
        .cloned()
        .unwrap_or_else(|| Value::String(String::new())))
}

/// Parse `addr/prefix` into an `IPNet` aggregate holding the address, the
/// prefix length and the masked network
fn parse_cidr(s: &str) -> std::result::Result<Aggregate, String> {
    let invalid = || format!("invalid CIDR address: {}", s);
    let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
    let ip: IpAddr = addr.parse().map_err(|_| invalid())?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let prefix: u32 = prefix.parse().map_err(|_| invalid())?;

    let network = match ip {
        IpAddr::V4(v4) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
        }
        IpAddr::V6(v6) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
            IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
        }
        _ => return Err(invalid()),
    };

    Ok(Aggregate::new("IPNet")
        .with_field("IP", ip.to_string())
        .with_field("Prefix", i64::from(prefix))
        .with_field("Network", format!("{}/{}", network, prefix))
        .with_method("String", &[], ipnet_string))
}

fn net_parse_ip(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    functions::parse_ip(s)
        .map(|ip| Value::String(ip.to_string()))
        .ok_or_else(|| EvalError::call_failed("net.ParseIP", format!("invalid IP address {:?}", s)))
}

fn net_parse_cidr(args: &[Value]) -> Result<Value> {
    parse_cidr(string_arg(args, 0)?)
        .map(Value::Aggregate)
        .map_err(|e| EvalError::call_failed("net.ParseCIDR", e))
}

fn net_parse_mac(args: &[Value]) -> Result<Value> {
    functions::parse_mac(string_arg(args, 0)?)
        .map(Value::String)
        .map_err(|e| EvalError::call_failed("net.ParseMAC", e))
}

fn net_split_host_port(args: &[Value]) -> Result<Value> {
    functions::split_host_port(string_arg(args, 0)?)
        .map(Value::Aggregate)
        .map_err(|e| EvalError::call_failed("net.SplitHostPort", e))
}

// =============================================================================
// STRINGS
// =============================================================================

fn strings_has_prefix(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(string_arg(args, 0)?.starts_with(string_arg(args, 1)?)))
}

fn strings_has_suffix(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(string_arg(args, 0)?.ends_with(string_arg(args, 1)?)))
}

fn strings_contains(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(string_arg(args, 0)?.contains(string_arg(args, 1)?)))
}

fn strings_to_upper(args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn strings_to_lower(args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn strings_trim_space(args: &[Value]) -> Result<Value> {
    Ok(Value::String(string_arg(args, 0)?.trim().to_string()))
}

fn strings_split(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let sep = string_arg(args, 1)?;
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::from).collect()
    };
    Ok(Value::Sequence(parts))
}

fn strings_repeat(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    let count = int_arg(args, 1)?;
    let count = usize::try_from(count)
        .map_err(|_| EvalError::call_failed("strings.Repeat", "negative Repeat count"))?;
    Ok(Value::String(s.repeat(count)))
}

fn strings_replace_all(args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0)?;
    Ok(Value::String(s.replace(string_arg(args, 1)?, string_arg(args, 2)?)))
}

// =============================================================================
// BASE64
// =============================================================================

fn decoded_text(function: &str, decoded: std::result::Result<Vec<u8>, base64::DecodeError>) -> Result<Value> {
    let bytes = decoded.map_err(|e| EvalError::call_failed(function, e))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|e| EvalError::call_failed(function, e))
}

fn base64_encode(args: &[Value]) -> Result<Value> {
    Ok(Value::String(functions::base64_encode(string_arg(args, 0)?)))
}

fn base64_decode(args: &[Value]) -> Result<Value> {
    decoded_text("base64.Decode", STANDARD.decode(string_arg(args, 0)?))
}

fn base64_url_encode(args: &[Value]) -> Result<Value> {
    Ok(Value::String(URL_SAFE.encode(string_arg(args, 0)?)))
}

fn base64_url_decode(args: &[Value]) -> Result<Value> {
    decoded_text("base64.URLDecode", URL_SAFE.decode(string_arg(args, 0)?))
}

// =============================================================================
// JSON
// =============================================================================

fn json_encode(args: &[Value]) -> Result<Value> {
    let json = arg(args, 0)?.to_json()?;
    serde_json::to_string(&json)
        .map(Value::String)
        .map_err(|e| EvalError::call_failed("json.Encode", e))
}

fn json_decode(args: &[Value]) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(string_arg(args, 0)?)
        .map_err(|e| EvalError::call_failed("json.Decode", e))?;
    Ok(Value::from_json(&json)?)
}

fn json_valid(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(
        serde_json::from_str::<serde_json::Value>(string_arg(args, 0)?).is_ok(),
    ))
}

// =============================================================================
// URL
// =============================================================================

fn url_query_escape(args: &[Value]) -> Result<Value> {
    let encoded = urlencoding::encode(string_arg(args, 0)?);
    Ok(Value::String(encoded.replace("%20", "+")))
}

fn url_query_unescape(args: &[Value]) -> Result<Value> {
    let text = string_arg(args, 0)?;
    let bytes = text.as_bytes();
    for (i, _) in text.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            let bad: String = text[i..].chars().take(3).collect();
            return Err(EvalError::call_failed(
                "url.QueryUnescape",
                format!("invalid URL escape {:?}", bad),
            ));
        }
    }
    let plus_decoded = text.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|s| Value::String(s.into_owned()))
        .map_err(|e| EvalError::call_failed("url.QueryUnescape", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(namespace: &str, member: &str, args: Vec<Value>) -> Result<Value> {
        match lookup_member(namespace, member) {
            Some(Value::Function(f)) => f.apply(args),
            other => panic!("{}.{} is not a function: {:?}", namespace, member, other),
        }
    }

    #[test]
    fn test_normalize_member() {
        assert_eq!(normalize_member("round"), "Round");
        assert_eq!(normalize_member("is_zero"), "IsZero");
        assert_eq!(normalize_member("parse_duration"), "ParseDuration");
        assert_eq!(normalize_member("Round"), "Round");
        assert_eq!(normalize_member("url_encode"), "UrlEncode");
    }

    #[test]
    fn test_lookup_exact_then_normalized() {
        assert!(is_package("math"));
        assert!(!is_package("os"));
        assert!(lookup_member("math", "Round").is_some());
        assert!(lookup_member("math", "round").is_some());
        assert!(lookup_member("time", "parse_duration").is_some());
        assert!(lookup_member("math", "Nope").is_none());
        assert!(lookup_member("nope", "Round").is_none());
        assert_eq!(
            package_names(),
            vec!["fmt", "math", "time", "net", "strings", "base64", "json", "url"]
        );
    }

    #[test]
    fn test_math_members() {
        assert_eq!(call("math", "Round", vec![Value::Float(2.5)]).unwrap(), Value::Float(3.0));
        assert_eq!(call("math", "Abs", vec![Value::Int(-3)]).unwrap(), Value::Float(3.0));
        assert_eq!(
            call("math", "Max", vec![Value::Float(1.0), Value::Float(2.0)]).unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            call("math", "Pow", vec![Value::Int(2), Value::Int(10)]).unwrap(),
            Value::Float(1024.0)
        );
        assert_eq!(lookup_member("math", "Pi"), Some(Value::Float(std::f64::consts::PI)));
    }

    #[test]
    fn test_time_members() {
        let date = call(
            "time",
            "Date",
            vec![
                Value::Int(2020),
                Value::Int(1),
                Value::Int(1),
                Value::Int(0),
                Value::Int(0),
                Value::Int(0),
                Value::Int(0),
                lookup_member("time", "UTC").unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(date.to_string(), "2020-01-01T00:00:00Z");

        let unix = call("time", "Unix", vec![Value::Int(1_577_836_800), Value::Int(0)]).unwrap();
        assert_eq!(unix, date);

        assert_eq!(lookup_member("time", "Minute"), Some(Value::Duration(Duration::MINUTE)));
        assert_eq!(
            call("time", "ParseDuration", vec!["1h30m".into()]).unwrap(),
            Value::Duration(Duration(90 * Duration::MINUTE.0))
        );
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(parse_location("UTC"), FixedOffset::east_opt(0));
        assert_eq!(parse_location("+05:30"), FixedOffset::east_opt(5 * 3600 + 30 * 60));
        assert_eq!(parse_location("-0800"), FixedOffset::east_opt(-8 * 3600));
        assert_eq!(parse_location("Mars/Olympus"), None);
        assert_eq!(parse_location("+aé1"), None);
        assert_eq!(parse_location("+999999"), None);
        assert_eq!(parse_location("+24:00"), None);
        assert_eq!(parse_location("+05:60"), None);
        assert_eq!(parse_location("+"), None);
    }

    #[test]
    fn test_parse_cidr() {
        let net = parse_cidr("192.168.1.10/24").unwrap();
        assert_eq!(net.field("IP"), Some(&Value::from("192.168.1.10")));
        assert_eq!(net.field("Prefix"), Some(&Value::Int(24)));
        assert_eq!(net.field("Network"), Some(&Value::from("192.168.1.0/24")));

        let v6 = parse_cidr("2001:db8::1/32").unwrap();
        assert_eq!(v6.field("Network"), Some(&Value::from("2001:db8::/32")));

        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_cidr("10.0.0.0").is_err());
        assert!(parse_cidr("10.0.0.0/+8").is_err());
    }

    #[test]
    fn test_strings_members() {
        assert_eq!(
            call("strings", "Repeat", vec!["ab".into(), Value::Int(3)]).unwrap(),
            Value::from("ababab")
        );
        assert!(call("strings", "Repeat", vec!["ab".into(), Value::Int(-1)]).is_err());
        assert_eq!(
            call("strings", "ReplaceAll", vec!["a-b-c".into(), "-".into(), "+".into()]).unwrap(),
            Value::from("a+b+c")
        );
        assert_eq!(
            call("strings", "HasPrefix", vec!["prefix".into(), "pre".into()]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_base64_members() {
        assert_eq!(call("base64", "encode", vec!["data".into()]).unwrap(), Value::from("ZGF0YQ=="));
        assert_eq!(call("base64", "Decode", vec!["ZGF0YQ==".into()]).unwrap(), Value::from("data"));
        assert!(call("base64", "Decode", vec!["!!".into()]).is_err());
    }

    #[test]
    fn test_json_members() {
        let decoded = call("json", "Decode", vec![r#"{"a": 1, "b": [true]}"#.into()]).unwrap();
        match &decoded {
            Value::Aggregate(a) => {
                assert_eq!(a.field("a"), Some(&Value::Int(1)));
                assert_eq!(a.field("b"), Some(&Value::Sequence(vec![Value::Bool(true)])));
            }
            other => panic!("expected aggregate, got {:?}", other),
        }
        assert_eq!(
            call("json", "Encode", vec![decoded]).unwrap(),
            Value::from(r#"{"a":1,"b":[true]}"#)
        );
        assert_eq!(call("json", "Valid", vec!["{".into()]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_url_members() {
        assert_eq!(
            call("url", "QueryEscape", vec!["a b&c".into()]).unwrap(),
            Value::from("a+b%26c")
        );
        assert_eq!(
            call("url", "QueryUnescape", vec!["a+b%26c".into()]).unwrap(),
            Value::from("a b&c")
        );
        for bad in ["%zz", "100%", "%4"] {
            assert!(matches!(
                call("url", "QueryUnescape", vec![bad.into()]),
                Err(EvalError::CallFailed { .. })
            ));
        }
    }
}
