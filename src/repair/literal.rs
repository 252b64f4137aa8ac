// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Tolerant structured-literal parser
//
// Recursive descent over a superset of JSON: unquoted keys, single-quoted
// strings, trailing commas, comments, `undefined`/`None`/`True`/`False`,
// leading `+` and bare-dot numbers. Never evaluates anything.

use serde_json::{Map, Number, Value};

const MAX_DEPTH: usize = 64;

/// A parse failure with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    pub offset: usize,
}

/// Parse a complete literal. Trailing non-whitespace input is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser { src: input, pos: 0 };
    let value = parser.parse_value(0)?;
    parser.skip_trivia()?;
    if parser.pos < input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            let rest = &self.src[self.pos..];
            if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error("unterminated block comment")),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_object(depth),
            Some('[') => self.parse_array(depth),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) if is_ident_start(c) => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some(q @ ('"' | '\'')) => self.parse_string(q)?,
                Some(c) if is_ident_start(c) => self.parse_ident().to_string(),
                Some(c) => return Err(self.error(format!("expected object key, found {c:?}"))),
                None => return Err(self.error("unterminated object")),
            };

            self.skip_trivia()?;
            if self.bump() != Some(':') {
                return Err(self.error(format!("expected ':' after key {key:?}")));
            }
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);

            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found {c:?}"))),
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value(depth + 1)?);

            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => return Err(self.error(format!("expected ',' or ']', found {c:?}"))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let high = self.parse_hex4()?;
                let c = if (0xD800..0xDC00).contains(&high) && self.src[self.pos..].starts_with("\\u") {
                    self.pos += 2;
                    let low = self.parse_hex4()?;
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                    char::from_u32(combined)
                } else {
                    char::from_u32(high)
                };
                out.push(c.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            // Line continuation.
            Some('\n') => {}
            Some(c) => out.push(c),
            None => return Err(self.error("unterminated escape")),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u32, LiteralError> {
        let digits = self.src.get(self.pos..self.pos + 4).ok_or_else(|| self.error("short unicode escape"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += 4;
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.bump();
            } else {
                break;
            }
        }
        let lexeme = &self.src[start..self.pos];
        let lexeme = lexeme.strip_prefix('+').unwrap_or(lexeme);

        if let Ok(n) = lexeme.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        if let Ok(n) = lexeme.parse::<u64>() {
            return Ok(Value::Number(n.into()));
        }
        let float = lexeme
            .parse::<f64>()
            .map_err(|_| LiteralError {
                message: format!("invalid number {lexeme:?}"),
                offset: start,
            })?;
        if float.fract() == 0.0 && float.abs() < 9_007_199_254_740_992.0 {
            return Ok(Value::Number((float as i64).into()));
        }
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                message: format!("non-finite number {lexeme:?}"),
                offset: start,
            })
    }

    fn parse_ident(&mut self) -> &str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        match self.parse_ident() {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "undefined" | "None" => Ok(Value::Null),
            other => Err(LiteralError {
                message: format!("unexpected identifier {other:?}"),
                offset: start,
            }),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_relaxed_object_syntax() {
        let value = parse_literal("{ name: 'x', 'quoted': \"y\", list: [1, 2,], }").unwrap();
        assert_eq!(value, json!({"name": "x", "quoted": "y", "list": [1, 2]}));
    }

    #[test]
    fn python_style_keywords() {
        let value = parse_literal("{a: True, b: False, c: None, d: undefined}").unwrap();
        assert_eq!(value, json!({"a": true, "b": false, "c": null, "d": null}));
    }

    #[test]
    fn escapes_and_surrogate_pairs() {
        let value = parse_literal(r#"{s: 'it\'s \u00e9 \ud83d\ude00'}"#).unwrap();
        assert_eq!(value, json!({"s": "it's é 😀"}));
    }

    #[test]
    fn numbers() {
        let value = parse_literal("[+3, -1.0, .25, 2e2, 18446744073709551615]").unwrap();
        assert_eq!(value, json!([3, -1, 0.25, 200, 18446744073709551615u64]));
    }

    #[test]
    fn reports_offset_of_failure() {
        let err = parse_literal("{a: 1 b: 2}").unwrap_err();
        assert_eq!(err.offset, 7);
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn rejects_unknown_identifiers_and_trailing_input() {
        assert!(parse_literal("{a: maybe}").is_err());
        assert!(parse_literal("{} {}").is_err());
        assert!(parse_literal("{a: 'open").is_err());
    }

    #[test]
    fn depth_is_bounded() {
        let deep = "[".repeat(MAX_DEPTH + 2) + &"]".repeat(MAX_DEPTH + 2);
        assert!(parse_literal(&deep).is_err());
    }
}
