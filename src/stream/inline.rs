// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Inline call markers
//
// Some models write calls into the text instead of using the call
// channel: `functions.requestOXCarouselButtons({})`. Grammar:
//
//   "function" ["s"] "." NAME ws "(" ws "{" BODY "}" ws ")"
//
// NAME is [A-Za-z0-9_]+. BODY is brace-balanced; quotes only open a
// string right after `{ [ , :` so apostrophes in prose do not hide a
// closing brace.

pub(crate) const MARKER_KEYWORD: &str = "function";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MarkerMatch {
    /// Could still become a marker. `body_open` once `{` has been seen.
    Partial { body_open: bool },
    /// Provably not a marker.
    Rejected,
    /// A full marker occupying `..end` of the fragment.
    Complete {
        end: usize,
        name: String,
        arguments: String,
    },
}

/// Offset of the earliest place a marker could start: a full keyword
/// occurrence, or a proper prefix of the keyword at the very end.
pub(crate) fn find_candidate(text: &str) -> Option<usize> {
    if let Some(pos) = text.find(MARKER_KEYWORD) {
        return Some(pos);
    }
    (1..MARKER_KEYWORD.len())
        .rev()
        .find(|&k| text.ends_with(&MARKER_KEYWORD[..k]))
        .map(|k| text.len() - k)
}

/// Match a fragment that starts at a candidate offset.
pub(crate) fn match_marker(fragment: &str) -> MarkerMatch {
    let bytes = fragment.as_bytes();
    let keyword = MARKER_KEYWORD.as_bytes();

    if bytes.len() < keyword.len() {
        return if keyword.starts_with(bytes) {
            MarkerMatch::Partial { body_open: false }
        } else {
            MarkerMatch::Rejected
        };
    }
    if !bytes.starts_with(keyword) {
        return MarkerMatch::Rejected;
    }

    let mut cursor = keyword.len();
    if bytes.get(cursor) == Some(&b's') {
        cursor += 1;
    }
    match bytes.get(cursor) {
        None => return MarkerMatch::Partial { body_open: false },
        Some(b'.') => cursor += 1,
        Some(_) => return MarkerMatch::Rejected,
    }

    let name_start = cursor;
    while bytes.get(cursor).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_') {
        cursor += 1;
    }
    if cursor == bytes.len() {
        return MarkerMatch::Partial { body_open: false };
    }
    if cursor == name_start {
        return MarkerMatch::Rejected;
    }
    let name_end = cursor;

    cursor = skip_ws(bytes, cursor);
    match bytes.get(cursor) {
        None => return MarkerMatch::Partial { body_open: false },
        Some(b'(') => cursor += 1,
        Some(_) => return MarkerMatch::Rejected,
    }

    cursor = skip_ws(bytes, cursor);
    match bytes.get(cursor) {
        None => return MarkerMatch::Partial { body_open: false },
        Some(b'{') => {}
        Some(_) => return MarkerMatch::Rejected,
    }

    let body_start = cursor;
    let Some(body_end) = balanced_body_end(bytes, body_start) else {
        return MarkerMatch::Partial { body_open: true };
    };

    cursor = skip_ws(bytes, body_end);
    match bytes.get(cursor) {
        None => MarkerMatch::Partial { body_open: true },
        Some(b')') => MarkerMatch::Complete {
            end: cursor + 1,
            name: fragment[name_start..name_end].to_string(),
            arguments: fragment[body_start..body_end].to_string(),
        },
        Some(_) => MarkerMatch::Rejected,
    }
}

fn skip_ws(bytes: &[u8], mut cursor: usize) -> usize {
    while bytes.get(cursor).is_some_and(u8::is_ascii_whitespace) {
        cursor += 1;
    }
    cursor
}

/// Index just past the `}` closing the brace at `start`, if present.
fn balanced_body_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut prev = b'{';

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
                prev = b;
            }
            continue;
        }

        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            b'"' | b'\'' if matches!(prev, b'{' | b'[' | b',' | b':') => quote = Some(b),
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            prev = b;
        }
    }
    None
}
