//! Text formatting: print-family semantics, `%` verbs, quoting and escapes

use crate::value::{format_float, Value};

/// Concatenate operands, adding a space between two operands when neither is a string
pub fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let is_string = matches!(arg, Value::String(_));
        if i > 0 && !is_string && !matches!(args[i - 1], Value::String(_)) {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

/// Operands separated by single spaces, terminated by a newline
pub fn sprintln(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("{}\n", parts.join(" "))
}

/// Largest width or precision accepted in a `%` directive
const MAX_WIDTH: usize = 1_000_000;

/// Digits past this many are always zero for an `f64`
const MAX_FLOAT_DIGITS: usize = 1100;

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    minus: bool,
    plus: bool,
    zero: bool,
    space: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Format according to a `%` template.
///
/// Supported verbs: `%v %+v %s %q %d %b %o %x %X %c %f %F %e %E %g %G %t %T %%`
/// with flags `- + 0 space #`, width and precision. Problems are reported
/// inline (`%!d(string=x)`, `%!s(MISSING)`, `%!(EXTRA ...)`) rather than failing.
pub fn sprintf(template: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                ' ' => spec.space = true,
                '#' => spec.sharp = true,
                _ => break,
            }
            chars.next();
        }
        match read_number(&mut chars) {
            Some(width) if width > MAX_WIDTH => out.push_str("%!(BADWIDTH)"),
            width => spec.width = width,
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            match read_number(&mut chars).unwrap_or(0) {
                precision if precision > MAX_WIDTH => out.push_str("%!(BADPREC)"),
                precision => spec.precision = Some(precision),
            }
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        match args.get(next_arg) {
            Some(arg) => {
                next_arg += 1;
                out.push_str(&format_verb(verb, &spec, arg));
            }
            None => out.push_str(&format!("%!{}(MISSING)", verb)),
        }
    }

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|a| format!("{}={}", a.type_name(), a))
            .collect();
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }

    out
}

/// Saturating, so oversized numbers still consume all their digits
fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        let n = number.unwrap_or(0);
        number = Some(n.saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    number
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{}({}={})", verb, arg.type_name(), arg)
}

fn format_verb(verb: char, spec: &Spec, arg: &Value) -> String {
    let body = match verb {
        'v' => match arg {
            Value::Aggregate(a) if spec.plus => {
                let parts: Vec<String> = a.fields().map(|(k, v)| format!("{}:{}", k, v)).collect();
                format!("{{{}}}", parts.join(" "))
            }
            Value::Float(f) => return pad_number(&with_sign(format_float(*f), spec), spec),
            Value::Int(_) | Value::Uint(_) => {
                return pad_number(&with_sign(arg.to_string(), spec), spec)
            }
            other => other.to_string(),
        },
        's' => match arg {
            Value::String(_) | Value::Duration(_) | Value::Time(_) => {
                truncate(arg.to_string(), spec.precision)
            }
            _ => return bad_verb(verb, arg),
        },
        'q' => match arg {
            Value::String(s) => quote(s),
            Value::Int(i) => match u32::try_from(*i).ok().and_then(char::from_u32) {
                Some(c) => quote_rune(c),
                None => return bad_verb(verb, arg),
            },
            _ => return bad_verb(verb, arg),
        },
        'd' | 'b' | 'o' | 'x' | 'X' | 'c' => return format_integer(verb, spec, arg),
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => match arg {
            Value::Float(f) => return pad_number(&with_sign(format_real(verb, spec, *f), spec), spec),
            _ => return bad_verb(verb, arg),
        },
        't' => match arg {
            Value::Bool(b) => b.to_string(),
            _ => return bad_verb(verb, arg),
        },
        'T' => arg.type_name(),
        _ => return bad_verb(verb, arg),
    };

    pad(&body, spec)
}

fn format_integer(verb: char, spec: &Spec, arg: &Value) -> String {
    if verb == 'x' || verb == 'X' {
        if let Value::String(s) = arg {
            let hex: String = s.bytes().map(|b| format!("{:02x}", b)).collect();
            let hex = if verb == 'X' { hex.to_uppercase() } else { hex };
            return pad(&hex, spec);
        }
    }

    let (negative, magnitude) = match arg {
        Value::Int(i) => (*i < 0, i.unsigned_abs()),
        Value::Uint(u) => (false, *u),
        Value::Duration(d) => (d.0 < 0, d.0.unsigned_abs()),
        _ => return bad_verb(verb, arg),
    };

    let digits = match verb {
        'd' => magnitude.to_string(),
        'b' => format!("{:b}", magnitude),
        'o' => format!("{}{:o}", if spec.sharp { "0" } else { "" }, magnitude),
        'x' => format!("{}{:x}", if spec.sharp { "0x" } else { "" }, magnitude),
        'X' => format!("{}{:X}", if spec.sharp { "0X" } else { "" }, magnitude),
        'c' => {
            return match u32::try_from(magnitude).ok().and_then(char::from_u32) {
                Some(c) if !negative => pad(&c.to_string(), spec),
                _ => bad_verb(verb, arg),
            }
        }
        _ => return bad_verb(verb, arg),
    };

    let signed = if negative {
        format!("-{}", digits)
    } else {
        with_sign(digits, spec)
    };
    pad_number(&signed, spec)
}

fn format_real(verb: char, spec: &Spec, f: f64) -> String {
    if !f.is_finite() {
        return format_float(f);
    }
    match verb {
        'f' | 'F' => fixed(f, spec.precision.unwrap_or(6)),
        'e' | 'E' => {
            let s = scientific(f, spec.precision.unwrap_or(6));
            if verb == 'E' {
                s.to_uppercase()
            } else {
                s
            }
        }
        _ => {
            let s = match spec.precision {
                Some(p) => {
                    let sig = p.max(1);
                    let exp = if f == 0.0 { 0 } else { f.abs().log10().floor() as i32 };
                    if exp < -4 || exp >= sig as i32 {
                        scientific(f, sig - 1)
                    } else {
                        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
                        let fixed = fixed(f, decimals);
                        if fixed.contains('.') {
                            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
                        } else {
                            fixed
                        }
                    }
                }
                None => format_float(f),
            };
            if verb == 'G' {
                s.to_uppercase()
            } else {
                s
            }
        }
    }
}

/// `%.Nf` digits, zero-extended past what an `f64` can hold
fn fixed(f: f64, precision: usize) -> String {
    let shown = precision.min(MAX_FLOAT_DIGITS);
    let mut s = format!("{:.*}", shown, f);
    s.push_str(&"0".repeat(precision - shown));
    s
}

/// `%.Ne` digits in Go exponent form, zero-extended like [`fixed`]
fn scientific(f: f64, precision: usize) -> String {
    let shown = precision.min(MAX_FLOAT_DIGITS);
    let s = go_exponent(&format!("{:.*e}", shown, f));
    match s.split_once('e') {
        Some((mantissa, exponent)) if precision > shown => {
            format!("{}{}e{}", mantissa, "0".repeat(precision - shown), exponent)
        }
        _ => s,
    }
}

/// Rewrite Rust's `1.5e-7` exponent form as `1.5e-07`
fn go_exponent(s: &str) -> String {
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => s.to_string(),
    }
}

fn with_sign(s: String, spec: &Spec) -> String {
    if s.starts_with('-') || s.starts_with('+') {
        s
    } else if spec.plus {
        format!("+{}", s)
    } else if spec.space {
        format!(" {}", s)
    } else {
        s
    }
}

fn truncate(s: String, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s,
    }
}

fn pad(s: &str, spec: &Spec) -> String {
    let width = spec.width.unwrap_or(0);
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let fill = " ".repeat(width - len);
    if spec.minus {
        format!("{}{}", s, fill)
    } else {
        format!("{}{}", fill, s)
    }
}

/// Pad a number, zero-filling after the sign when `0` is set
fn pad_number(s: &str, spec: &Spec) -> String {
    let width = spec.width.unwrap_or(0);
    let len = s.chars().count();
    if !spec.zero || spec.minus || len >= width {
        return pad(s, spec);
    }
    let (sign, digits) = match s.chars().next() {
        Some(c @ ('-' | '+' | ' ')) => (c.to_string(), &s[1..]),
        _ => (String::new(), s),
    };
    format!("{}{}{}", sign, "0".repeat(width - len), digits)
}

/// Double-quoted literal with escapes for quotes, backslashes and control characters
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        push_escaped(&mut out, c, '"');
    }
    out.push('"');
    out
}

fn quote_rune(c: char) -> String {
    let mut out = String::from("'");
    push_escaped(&mut out, c, '\'');
    out.push('\'');
    out
}

fn push_escaped(out: &mut String, c: char, delimiter: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0b}' => out.push_str("\\v"),
        c if c == delimiter => {
            out.push('\\');
            out.push(c);
        }
        c if (c as u32) < 0x20 || c as u32 == 0x7f => {
            out.push_str(&format!("\\x{:02x}", c as u32));
        }
        c => out.push(c),
    }
}

/// Remove one level of quoting: `"..."` and `'...'` are unescaped, `` `...` `` is taken verbatim
pub fn unquote(s: &str) -> Result<String, String> {
    let invalid = || format!("invalid quoted string {}", s);
    let mut chars = s.chars();
    let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
        return Err(invalid());
    };
    if open != close || !matches!(open, '"' | '\'' | '`') {
        return Err(invalid());
    }
    let body = chars.as_str();
    match open {
        '`' if !body.contains('`') => Ok(body.to_string()),
        '`' => Err(invalid()),
        _ => unescape(body),
    }
}

/// Decode backslash escapes: `\a \b \f \n \r \t \v \\ \' \"`, `\xHH`, octal `\ooo`,
/// `\uHHHH` and `\UHHHHHHHH`
pub fn unescape(body: &str) -> Result<String, String> {
    let mut bytes: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let escaped = chars.next().ok_or("trailing backslash in escape sequence")?;
        let simple = match escaped {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            '\'' => Some(b'\''),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(b) = simple {
            bytes.push(b);
            continue;
        }

        match escaped {
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let b = u8::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid escape \\x{}", hex))?;
                bytes.push(b);
            }
            '0'..='7' => {
                let rest: String = chars.by_ref().take(2).collect();
                let digits = format!("{}{}", escaped, rest);
                let b = u8::from_str_radix(&digits, 8)
                    .map_err(|_| format!("invalid escape \\{}", digits))?;
                bytes.push(b);
            }
            'u' | 'U' => {
                let len = if escaped == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(len).collect();
                let c = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == len)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid escape \\{}{}", escaped, hex))?;
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            other => return Err(format!("unknown escape sequence \\{}", other)),
        }
    }

    String::from_utf8(bytes).map_err(|_| "escape sequences produce invalid UTF-8".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Aggregate;

    #[test]
    fn test_sprint_spacing() {
        assert_eq!(sprint(&[Value::from("a"), Value::from("b")]), "ab");
        assert_eq!(sprint(&[Value::Int(1), Value::Int(2)]), "1 2");
        assert_eq!(sprint(&[Value::from("n="), Value::Int(2)]), "n=2");
        assert_eq!(sprintln(&[Value::from("a"), Value::Int(2)]), "a 2\n");
    }

    #[test]
    fn test_sprintf_basic_verbs() {
        assert_eq!(
            sprintf("%s: %d", &[Value::from("count"), Value::Int(100)]),
            "count: 100"
        );
        assert_eq!(sprintf("%v|%t", &[Value::Float(2.5), Value::Bool(true)]), "2.5|true");
        assert_eq!(sprintf("%x %X %o %b", &[Value::Int(255), Value::Int(255), Value::Int(8), Value::Int(5)]), "ff FF 10 101");
        assert_eq!(sprintf("%q", &[Value::from("a\"b")]), r#""a\"b""#);
        assert_eq!(sprintf("100%%", &[]), "100%");
        assert_eq!(sprintf("%T", &[Value::Int(1)]), "int64");
    }

    #[test]
    fn test_sprintf_width_and_precision() {
        assert_eq!(sprintf("%5d|%-5d|%05d", &[Value::Int(42), Value::Int(42), Value::Int(-42)]), "   42|42   |-0042");
        assert_eq!(sprintf("%.2f", &[Value::Float(3.14159)]), "3.14");
        assert_eq!(sprintf("%8.3f", &[Value::Float(3.14159)]), "   3.142");
        assert_eq!(sprintf("%.3s", &[Value::from("abcdef")]), "abc");
        assert_eq!(sprintf("%+d", &[Value::Int(5)]), "+5");
        assert_eq!(sprintf("%e", &[Value::Float(1234.5678)]), "1.234568e+03");
        assert_eq!(sprintf("%.3g", &[Value::Float(1234.5678)]), "1.23e+03");
        assert_eq!(sprintf("%g", &[Value::Float(0.5)]), "0.5");
    }

    #[test]
    fn test_sprintf_bounds_width_and_precision() {
        assert_eq!(sprintf("%3000000d", &[Value::Int(1)]), "%!(BADWIDTH)1");
        assert_eq!(sprintf("%.3000000f", &[Value::Float(1.0)]), "%!(BADPREC)1.000000");
        assert_eq!(sprintf("%99999999999999999999999d", &[Value::Int(7)]), "%!(BADWIDTH)7");

        let wide = sprintf("%.2000f", &[Value::Float(1.0)]);
        assert_eq!(wide.len(), 2002);
        assert!(wide.starts_with("1.000") && wide.ends_with('0'));

        let sci = sprintf("%.1500e", &[Value::Float(1.0)]);
        assert_eq!(sci.len(), 1506);
        assert!(sci.ends_with("0e+00"));
    }

    #[test]
    fn test_sprintf_reports_problems_inline() {
        assert_eq!(sprintf("%d", &[Value::from("x")]), "%!d(string=x)");
        assert_eq!(sprintf("%s %s", &[Value::from("x")]), "x %!s(MISSING)");
        assert_eq!(sprintf("%s", &[Value::from("x"), Value::Int(1)]), "x%!(EXTRA int64=1)");
    }

    #[test]
    fn test_sprintf_aggregates() {
        let a = Value::Aggregate(Aggregate::new("Something").with_field("S", "x").with_field("N", 5i64));
        assert_eq!(sprintf("%v", &[a.clone()]), "{x 5}");
        assert_eq!(sprintf("%+v", &[a]), "{S:x N:5}");
    }

    #[test]
    fn test_quote_and_unquote() {
        assert_eq!(quote("tab\there"), r#""tab\there""#);
        assert_eq!(quote("\u{1}"), r#""\x01""#);
        assert_eq!(unquote(r#""tab\there""#).unwrap(), "tab\there");
        assert_eq!(unquote("`raw\\n`").unwrap(), "raw\\n");
        assert_eq!(unquote("'x'").unwrap(), "x");
        assert!(unquote("\"unterminated").is_err());
        assert!(unquote("x").is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb").unwrap(), "a\nb");
        assert_eq!(unescape(r"\x41\101é\U0001F600").unwrap(), "AAé😀");
        assert!(unescape(r"\q").is_err());
        assert!(unescape(r"\xZZ").is_err());
        assert!(unescape("\\").is_err());
    }
}
