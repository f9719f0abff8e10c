// scan.rs - Low-level text scanning helpers shared by the document and filter parsers
//
// The on-disk document lines and the filter expressions use a deliberately
// tolerant JSON-shaped grammar: string contents are taken verbatim (no escape
// processing), unquoted literals run to the next delimiter, and objects or
// arrays are delimited by naive bracket counting. These helpers implement that
// grammar byte-for-byte so every consumer agrees on the edge cases.

use std::cmp::Ordering;

/// Strips leading and trailing ASCII whitespace (space, tab, CR, LF).
/// `str::trim` is not used on purpose: it would also strip Unicode whitespace,
/// which must stay part of field values.
pub fn trim(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// Parses a strict signed decimal integer: optional `+`/`-` followed by one
/// or more ASCII digits, nothing else. Leading zeros are accepted ("007" is
/// 7). Returns `None` for the empty string, trailing garbage, or values that
/// do not fit an `i64`.
pub fn parse_int(s: &str) -> Option<i64> {
    let t = trim(s);
    let digits = t.strip_prefix(['+', '-']).unwrap_or(t);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    t.parse::<i64>().ok()
}

/// Equality with the integer refinement: when both sides parse as signed
/// decimal integers the comparison is numeric ("007" equals "7"), otherwise
/// it is plain byte equality.
pub fn values_equal(lhs: &str, rhs: &str) -> bool {
    match (parse_int(lhs), parse_int(rhs)) {
        (Some(l), Some(r)) => l == r,
        _ => lhs == rhs,
    }
}

/// Ordering with the integer refinement: numeric when both sides are signed
/// decimal integers, lexicographic byte comparison otherwise.
pub fn values_cmp(lhs: &str, rhs: &str) -> Ordering {
    match (parse_int(lhs), parse_int(rhs)) {
        (Some(l), Some(r)) => l.cmp(&r),
        _ => lhs.cmp(rhs),
    }
}

/// SQL-style `LIKE` matching over raw bytes. `%` matches any run (possibly
/// empty) of bytes, `_` matches exactly one byte, every other byte matches
/// itself. There is no escape syntax.
pub fn like_match(value: &str, pattern: &str) -> bool {
    like_match_at(value.as_bytes(), pattern.as_bytes(), 0, 0)
}

fn like_match_at(value: &[u8], pattern: &[u8], i: usize, j: usize) -> bool {
    if j == pattern.len() {
        return i == value.len();
    }
    match pattern[j] {
        // %: either matches the empty run, or consumes one byte and retries
        b'%' => {
            like_match_at(value, pattern, i, j + 1)
                || (i < value.len() && like_match_at(value, pattern, i + 1, j))
        }
        b'_' => i < value.len() && like_match_at(value, pattern, i + 1, j + 1),
        pc => i < value.len() && value[i] == pc && like_match_at(value, pattern, i + 1, j + 1),
    }
}

/// Finds the next occurrence of `target` at or after `from`.
pub fn find_from(bytes: &[u8], from: usize, target: u8) -> Option<usize> {
    bytes
        .iter()
        .skip(from)
        .position(|&b| b == target)
        .map(|offset| from + offset)
}

/// Given the byte index of an opening `{` or `[` inside `s`, returns the byte
/// index of the matching closer, counting only delimiters of the same kind.
/// Strings are not tokenized separately, so a bare delimiter inside a quoted
/// value corrupts the count; callers document that restriction.
pub fn find_matching(s: &str, open_at: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let open = *bytes.get(open_at)?;
    let close = match open {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };
    let mut depth = 0i32;
    for (index, &b) in bytes.iter().enumerate().skip(open_at) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Strips one pair of surrounding double quotes, if present, then trims.
/// Used for scalar condition values, which may arrive quoted or bare.
pub fn unquote(s: &str) -> &str {
    let t = trim(s);
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        trim(&t[1..t.len() - 1])
    } else {
        t
    }
}

/// Scans the inner text of an object (braces already stripped) into
/// `(key, raw value)` pairs.
///
/// Keys are double-quoted; anything before the next quote is skipped, so a
/// clean end of input simply stops the scan. Values keep their raw text:
/// quoted strings keep their quotes, objects and arrays span to their
/// matching closer, bare literals run to the next `,` or `}` and are trimmed.
/// Returns `None` when the text turns out malformed mid-pair (unterminated
/// key or string, missing colon, unbalanced brackets, empty bare literal) —
/// callers treat that as a predicate that can never hold.
pub fn object_pairs(content: &str) -> Option<Vec<(String, String)>> {
    let bytes = content.as_bytes();
    let mut pairs = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let key_open = match find_from(bytes, pos, b'"') {
            Some(index) => index,
            None => break,
        };
        let key_close = find_from(bytes, key_open + 1, b'"')?;
        let key = &content[key_open + 1..key_close];

        let colon = find_from(bytes, key_close + 1, b':')?;
        let mut value_start = colon + 1;
        while value_start < bytes.len() && matches!(bytes[value_start], b' ' | b'\t') {
            value_start += 1;
        }
        if value_start >= bytes.len() {
            return None;
        }

        let raw_value;
        match bytes[value_start] {
            b'{' | b'[' => {
                let end = find_matching(content, value_start)?;
                raw_value = content[value_start..=end].to_string();
                pos = end + 1;
            }
            b'"' => {
                // Closing quote search honours a preceding backslash so that
                // an escaped quote does not end the value early.
                let mut probe = value_start;
                let end = loop {
                    probe = find_from(bytes, probe + 1, b'"')?;
                    if probe == 0 || bytes[probe - 1] != b'\\' {
                        break probe;
                    }
                };
                raw_value = content[value_start..=end].to_string();
                pos = end + 1;
            }
            _ => {
                let boundary = bytes[value_start..]
                    .iter()
                    .position(|&b| b == b',' || b == b'}')
                    .map(|offset| value_start + offset)
                    .unwrap_or(bytes.len());
                let literal = trim(&content[value_start..boundary]);
                if literal.is_empty() {
                    return None;
                }
                raw_value = literal.to_string();
                pos = boundary;
            }
        }

        pairs.push((key.to_string(), raw_value));
    }

    Some(pairs)
}
