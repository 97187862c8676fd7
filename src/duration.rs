//! Signed nanosecond durations with Go-style text notation (`1h2m3.5s`)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Elapsed time in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Duration(pub i64);

impl Duration {
    pub const NANOSECOND: Duration = Duration(1);
    pub const MICROSECOND: Duration = Duration(1_000);
    pub const MILLISECOND: Duration = Duration(1_000_000);
    pub const SECOND: Duration = Duration(1_000_000_000);
    pub const MINUTE: Duration = Duration(60 * 1_000_000_000);
    pub const HOUR: Duration = Duration(3600 * 1_000_000_000);

    pub fn nanoseconds(&self) -> i64 {
        self.0
    }

    pub fn seconds(&self) -> f64 {
        split_float(self.0, Self::SECOND.0)
    }

    pub fn minutes(&self) -> f64 {
        split_float(self.0, Self::MINUTE.0)
    }

    pub fn hours(&self) -> f64 {
        split_float(self.0, Self::HOUR.0)
    }

    pub fn abs(&self) -> Duration {
        Duration(self.0.checked_abs().unwrap_or(i64::MAX))
    }

    /// Round toward zero to a multiple of `unit`; a non-positive unit is a no-op
    pub fn truncate(&self, unit: Duration) -> Duration {
        if unit.0 <= 0 {
            return *self;
        }
        Duration(self.0 - self.0 % unit.0)
    }

    pub fn to_chrono(self) -> chrono::TimeDelta {
        chrono::TimeDelta::nanoseconds(self.0)
    }

    /// Parse Go duration notation: an optional sign followed by one or more
    /// decimal numbers with unit suffixes (`ns us µs ms s m h`), e.g.
    /// `300ms`, `-1.5h`, `2h45m`. The bare string `0` is also accepted.
    pub fn parse(text: &str) -> Result<Duration, String> {
        let invalid = || format!("invalid duration {:?}", text);

        let mut rest = text;
        let negative = match rest.chars().next() {
            Some('-') => {
                rest = &rest[1..];
                true
            }
            Some('+') => {
                rest = &rest[1..];
                false
            }
            _ => false,
        };

        if rest == "0" {
            return Ok(Duration(0));
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut total: u128 = 0;
        while !rest.is_empty() {
            let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let int_part = &rest[..int_len];
            rest = &rest[int_len..];

            let mut frac_part = "";
            if let Some(after_dot) = rest.strip_prefix('.') {
                let frac_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                frac_part = &after_dot[..frac_len];
                rest = &after_dot[frac_len..];
            }
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(invalid());
            }

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let unit = match &rest[..unit_len] {
                "ns" => Self::NANOSECOND.0,
                "us" | "\u{00b5}s" | "\u{03bc}s" => Self::MICROSECOND.0,
                "ms" => Self::MILLISECOND.0,
                "s" => Self::SECOND.0,
                "m" => Self::MINUTE.0,
                "h" => Self::HOUR.0,
                "" => return Err(format!("missing unit in duration {:?}", text)),
                other => return Err(format!("unknown unit {:?} in duration {:?}", other, text)),
            } as u128;
            rest = &rest[unit_len..];

            let whole: u128 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| invalid())?
            };
            let mut value = whole.checked_mul(unit).ok_or_else(invalid)?;

            if !frac_part.is_empty() {
                let mut scale: u128 = 1;
                let mut frac: u128 = 0;
                for digit in frac_part.bytes().take(18) {
                    frac = frac * 10 + u128::from(digit - b'0');
                    scale *= 10;
                }
                value += frac * unit / scale;
            }

            total = total.checked_add(value).ok_or_else(invalid)?;
            if total > i64::MAX as u128 + 1 {
                return Err(invalid());
            }
        }

        if negative {
            Ok(Duration((total as i128).wrapping_neg() as i64))
        } else if total > i64::MAX as u128 {
            Err(invalid())
        } else {
            Ok(Duration(total as i64))
        }
    }
}

fn split_float(nanos: i64, unit: i64) -> f64 {
    let whole = nanos / unit;
    let rem = nanos % unit;
    whole as f64 + rem as f64 / unit as f64
}

/// Append `value / scale` with a trimmed decimal fraction
fn push_fraction(out: &mut String, value: u64, scale: u64) {
    out.push_str(&(value / scale).to_string());
    let rem = value % scale;
    if rem != 0 {
        let width = scale.to_string().len() - 1;
        let digits = format!("{:0width$}", rem, width = width);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }

        let mut out = String::new();
        if self.0 < 0 {
            out.push('-');
        }
        let u = self.0.unsigned_abs();

        if u < Self::SECOND.0 as u64 {
            let (scale, unit) = if u < Self::MICROSECOND.0 as u64 {
                (1, "ns")
            } else if u < Self::MILLISECOND.0 as u64 {
                (Self::MICROSECOND.0 as u64, "\u{00b5}s")
            } else {
                (Self::MILLISECOND.0 as u64, "ms")
            };
            push_fraction(&mut out, u, scale);
            out.push_str(unit);
            return f.write_str(&out);
        }

        let second = Self::SECOND.0 as u64;
        let total_secs = u / second;
        let hours = total_secs / 3600;
        let minutes = (total_secs / 60) % 60;

        if hours > 0 {
            out.push_str(&format!("{}h", hours));
        }
        if hours > 0 || minutes > 0 {
            out.push_str(&format!("{}m", minutes));
        }
        push_fraction(&mut out, (total_secs % 60) * second + u % second, second);
        out.push('s');

        f.write_str(&out)
    }
}
