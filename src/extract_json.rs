//! Scalar field extraction from unparsed JSON text.
//!
//! Nothing here builds a document tree. A field is located by scanning for
//! its quoted name followed by a colon, at any nesting depth, and the token
//! after the colon is decoded in place. Input may be truncated or malformed.
//!
//! # Zero values on absence
//!
//! A missing key is never an error. [`extract_int`] returns `0`,
//! [`extract_double`] returns `0.0`, [`extract_bool`] returns `false` and
//! [`extract_string`] writes an empty string. Callers cannot tell a missing
//! field from one that is present with a falsy value. Keys are expected to be
//! unique within the buffer; the first occurrence that is followed by a colon
//! wins.

use memchr::memmem;

/// The prefix of `bytes` before the first NUL byte.
pub(crate) fn until_nul(bytes: &[u8]) -> &[u8] {
    match memchr::memchr(0, bytes) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// The longest valid UTF-8 prefix of `bytes`.
pub(crate) fn utf8_prefix(bytes: &[u8]) -> &str {
    match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < bytes.len() && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    &bytes[start..]
}

/// Returns the raw text following `"key":`, leading whitespace removed.
///
/// The slice runs to the end of the buffer (or the first NUL); decoders only
/// look at its prefix.
pub fn find_value<'a>(json: &'a [u8], key: &str) -> Option<&'a [u8]> {
    let json = until_nul(json);
    let key = key.as_bytes();

    for pos in memmem::find_iter(json, key) {
        if pos == 0 || json[pos - 1] != b'"' {
            continue;
        }
        let after = pos + key.len();
        if json.get(after) != Some(&b'"') {
            continue;
        }
        let rest = skip_whitespace(&json[after + 1..]);
        if let Some((&b':', value)) = rest.split_first() {
            return Some(skip_whitespace(value));
        }
    }
    None
}

/// A bare scalar token: everything up to a delimiter or whitespace.
fn scalar_token(value: &[u8]) -> &[u8] {
    let end = value
        .iter()
        .position(|&c| matches!(c, b',' | b'}' | b']') || c.is_ascii_whitespace())
        .unwrap_or(value.len());
    &value[..end]
}

fn unescape(c: u8) -> Option<u8> {
    match c {
        b'"' => Some(b'"'),
        b'\\' => Some(b'\\'),
        b'/' => Some(b'/'),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        _ => None,
    }
}

/// Copies the value of `key` into `out` and NUL-terminates it.
///
/// Returns the number of bytes written, not counting the terminator. At most
/// `out.len() - 1` bytes are written; longer values are truncated. String
/// values are unescaped (`\uXXXX` is copied verbatim), other scalars are
/// copied as their raw token, and objects or arrays produce an empty string.
pub fn extract_string(json: &[u8], key: &str, out: &mut [u8]) -> usize {
    let Some(limit) = out.len().checked_sub(1) else {
        return 0;
    };
    let mut written = 0;

    match find_value(json, key) {
        Some([b'"', body @ ..]) => {
            let mut escape = false;
            for &c in body {
                if written == limit {
                    break;
                }
                match (escape, c) {
                    (false, b'\\') => escape = true,
                    (false, b'"') => break,
                    (false, c) => {
                        out[written] = c;
                        written += 1;
                    }
                    (true, c) => {
                        escape = false;
                        match unescape(c) {
                            Some(decoded) => {
                                out[written] = decoded;
                                written += 1;
                            }
                            None => {
                                out[written] = b'\\';
                                written += 1;
                                if written < limit {
                                    out[written] = c;
                                    written += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        Some([b'{' | b'[', ..]) | Some([]) | None => {}
        Some(value) => {
            let token = scalar_token(value);
            written = token.len().min(limit);
            out[..written].copy_from_slice(&token[..written]);
        }
    }

    out[written] = 0;
    written
}

/// Decodes a leading integer the way C's `atol` does: optional whitespace and
/// sign, then digits. Anything else yields `0`; overflow saturates.
pub fn parse_leading_int(bytes: &[u8]) -> i64 {
    let bytes = skip_whitespace(bytes);
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    for &c in digits.iter().take_while(|c| c.is_ascii_digit()) {
        let digit = i64::from(c - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// The longest prefix that reads as a decimal floating point number.
fn numeric_prefix(bytes: &[u8]) -> &[u8] {
    let is_digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut end = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let int_start = end;
    while is_digit(end) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while is_digit(frac_end) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return &bytes[..0];
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_start = exp_end;
        while is_digit(exp_end) {
            exp_end += 1;
        }
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    &bytes[..end]
}

/// Integer value of `key`, or `0` when absent or non-numeric.
///
/// A fractional value is truncated toward zero (`"42.9"` reads as `42`).
pub fn extract_int(json: &[u8], key: &str) -> i64 {
    find_value(json, key).map(parse_leading_int).unwrap_or(0)
}

/// Floating point value of `key`, or `0.0` when absent or non-numeric.
pub fn extract_double(json: &[u8], key: &str) -> f64 {
    find_value(json, key)
        .map(numeric_prefix)
        .and_then(|number| std::str::from_utf8(number).ok()?.parse().ok())
        .unwrap_or(0.0)
}

/// `true` only when the value of `key` is the literal `true`.
pub fn extract_bool(json: &[u8], key: &str) -> bool {
    find_value(json, key).is_some_and(|value| scalar_token(value) == b"true")
}
