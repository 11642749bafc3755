//! # rtsim-types::parse
//!
//! Permissive, C-`strtol`/`strtod`-style numeric parsing for the scripted
//! construction contract (`createInstance(Vec<String>)`). Unlike
//! `str::parse`, which rejects any trailing garbage, these functions consume
//! the longest valid numeric prefix of the input and ignore what follows,
//! matching the behavior callers of `atoi`/`strtod`-backed factories expect.

use crate::errors::SimError;

const PARSE_CLASS: &str = "numeric parameter";

/// Parses the longest leading integer prefix of `s`, skipping surrounding
/// whitespace and allowing a leading `+` or `-`.
pub fn parse_i64(s: &str) -> Result<i64, SimError> {
    let trimmed = s.trim();
    let mut end = 0;
    let bytes = trimmed.as_bytes();
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return Err(SimError::ParseExc {
            class_name: "i64".to_string(),
        });
    }
    trimmed[..end].parse::<i64>().map_err(|_| SimError::ParseExc {
        class_name: "i64".to_string(),
    })
}

/// Parses the longest leading floating-point prefix of `s`, skipping
/// surrounding whitespace, a leading sign, and an optional exponent.
pub fn parse_f64(s: &str) -> Result<f64, SimError> {
    let trimmed = s.trim();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let mut saw_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        saw_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return Err(SimError::ParseExc {
            class_name: "f64".to_string(),
        });
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let exp_start = end;
        let mut probe = end + 1;
        if probe < bytes.len() && (bytes[probe] == b'+' || bytes[probe] == b'-') {
            probe += 1;
        }
        let exp_digits_start = probe;
        while probe < bytes.len() && bytes[probe].is_ascii_digit() {
            probe += 1;
        }
        if probe > exp_digits_start {
            end = probe;
        } else {
            end = exp_start;
        }
    }
    trimmed[..end]
        .parse::<f64>()
        .map_err(|_| SimError::ParseExc {
            class_name: PARSE_CLASS.to_string(),
        })
}

/// Requires `params.len()` to be exactly `n`, raising `ParseExc` otherwise.
pub fn require_arity(
    params: &[String],
    n: usize,
    class_name: &str,
) -> Result<(), SimError> {
    if params.len() != n {
        Err(SimError::ParseExc {
            class_name: class_name.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers() {
        assert_eq!(parse_i64("42").unwrap(), 42);
        assert_eq!(parse_i64("  -7").unwrap(), -7);
        assert_eq!(parse_i64("+3").unwrap(), 3);
    }

    #[test]
    fn ignores_trailing_garbage_like_strtol() {
        assert_eq!(parse_i64("12abc").unwrap(), 12);
    }

    #[test]
    fn rejects_no_digits() {
        assert!(parse_i64("abc").is_err());
        assert!(parse_f64("xyz").is_err());
    }

    #[test]
    fn parses_floats_with_exponent() {
        assert_eq!(parse_f64("1.5e3").unwrap(), 1500.0);
        assert_eq!(parse_f64("-0.25").unwrap(), -0.25);
    }

    #[test]
    fn arity_check() {
        let params = vec!["1".to_string(), "2".to_string()];
        assert!(require_arity(&params, 2, "Thing").is_ok());
        assert!(require_arity(&params, 3, "Thing").is_err());
    }
}
