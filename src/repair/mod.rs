// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Argument repair
//
// Models frequently emit call arguments that are "almost JSON": bare
// keys, single-quoted strings, integers written as `1.0`, stray newlines.
// Repair runs a string-aware normalization pass, tries a strict parse,
// and falls back to the tolerant literal parser for what remains
// (trailing commas, `undefined`, comments).

mod literal;

pub use literal::{parse_literal, LiteralError};

use serde_json::{Map, Value};

/// Raised when neither the strict nor the tolerant parse succeeds.
///
/// Carries the raw text so the error can be reported to the consumer and
/// logged verbatim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("could not parse call arguments ({strict_error}; fallback: {literal_error})")]
pub struct RepairError {
    pub raw: String,
    pub strict_error: String,
    pub literal_error: String,
}

/// Parse model-emitted call arguments into a JSON object.
///
/// Empty or whitespace-only input yields an empty object. Text that does
/// not start with `{` is treated as the body of an object.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, RepairError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    let normalized = normalize(raw);
    let strict_error = match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected an object, found {}", value_kind(&other)),
        Err(e) => e.to_string(),
    };

    tracing::debug!(error = %strict_error, "strict argument parse failed, trying literal parser");

    let literal_error = match parse_literal(&normalized) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected an object, found {}", value_kind(&other)),
        Err(e) => e.to_string(),
    };

    Err(RepairError {
        raw: raw.to_string(),
        strict_error,
        literal_error,
    })
}

/// Rewrite near-JSON into JSON where that can be done textually.
///
/// Outside string literals: bare keys are quoted, numbers with an
/// all-zero fraction become integers, comments are dropped, and whitespace
/// runs collapse to one space. Single-quoted strings are re-delimited with
/// double quotes. Inside strings, whitespace runs also collapse. Running
/// the pass on its own output changes nothing.
pub fn normalize(raw: &str) -> String {
    let source = wrap_object(raw);
    let mut out = String::with_capacity(source.len() + 16);
    let mut i = 0;

    while let Some(c) = source[i..].chars().next() {
        let rest = &source[i..];
        match c {
            '"' | '\'' => {
                i = copy_string(&source, i, c, &mut out);
            }
            '/' if rest.starts_with("//") => {
                i += rest.find('\n').unwrap_or(rest.len());
                push_space(&mut out);
            }
            '/' if rest.starts_with("/*") => {
                i += rest.find("*/").map(|end| end + 2).unwrap_or(rest.len());
                push_space(&mut out);
            }
            c if c.is_whitespace() => {
                push_space(&mut out);
                i += c.len_utf8();
            }
            c if is_ident_start(c) => {
                let end = ident_end(&source, i);
                let ident = &source[i..end];
                if in_key_position(&out) && next_significant(&source, end) == Some(':') {
                    out.push('"');
                    out.push_str(ident);
                    out.push('"');
                } else {
                    out.push_str(ident);
                }
                i = end;
            }
            _ if starts_number(rest) => {
                let end = number_end(&source, i);
                out.push_str(&canonical_number(&source[i..end]));
                i = end;
            }
            c => {
                out.push(c);
                i += c.len_utf8();
            }
        }
    }

    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Scanning helpers
// ---------------------------------------------------------------------------

fn wrap_object(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "{}".to_string()
    } else if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        format!("{{{trimmed}}}")
    }
}

/// Copy a string literal starting at `start` (the opening quote) into
/// `out` as a double-quoted JSON string. Returns the index after the
/// closing quote, or the end of input for an unterminated literal.
fn copy_string(source: &str, start: usize, quote: char, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + quote.len_utf8();
    let mut last_was_space = false;

    while let Some(c) = source[i..].chars().next() {
        i += c.len_utf8();
        match c {
            '\\' => {
                let Some(next) = source[i..].chars().next() else {
                    out.push('\\');
                    break;
                };
                i += next.len_utf8();
                if next == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(next);
                }
                last_was_space = false;
            }
            c if c == quote => {
                out.push('"');
                return i;
            }
            '"' => {
                out.push_str("\\\"");
                last_was_space = false;
            }
            c if c.is_whitespace() => {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            }
            c => {
                out.push(c);
                last_was_space = false;
            }
        }
    }

    source.len()
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn ident_end(source: &str, start: usize) -> usize {
    source[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
        .map(|(offset, _)| start + offset)
        .unwrap_or(source.len())
}

fn in_key_position(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

fn next_significant(source: &str, from: usize) -> Option<char> {
    source[from..].chars().find(|c| !c.is_whitespace())
}

fn starts_number(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') | Some('+') | Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn number_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = start;
    if matches!(bytes.get(i), Some(b'-') | Some(b'+')) {
        i += 1;
    }
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-') | Some(b'+')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            while bytes.get(j).is_some_and(u8::is_ascii_digit) {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Largest magnitude at which every integer is exactly representable as f64.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Integral values written with a fraction or exponent become plain
/// integers; everything else keeps its lexeme in JSON form.
fn canonical_number(lexeme: &str) -> String {
    let lexeme = lexeme.strip_prefix('+').unwrap_or(lexeme);
    let is_plain_integer = !lexeme.contains(['.', 'e', 'E']);
    if is_plain_integer {
        return lexeme.to_string();
    }

    if let Ok(value) = lexeme.parse::<f64>() {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT {
            return format!("{}", value as i64);
        }
    }

    let mut json = String::with_capacity(lexeme.len() + 2);
    let (sign, digits) = match lexeme.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", lexeme),
    };
    json.push_str(sign);
    if digits.starts_with('.') {
        json.push('0');
    }
    json.push_str(digits);
    if json.ends_with('.') {
        json.push('0');
    }
    json
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
