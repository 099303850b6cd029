// SPDX-License-Identifier: MIT OR Apache-2.0
//! The tagged-URN text parser.

use std::collections::BTreeMap;

use cb_error::CapabilityKeyError;

use crate::{TaggedUrn, UrnParseError};

/// Parse `prefix:(key=value)(;key=value)*` into a [`TaggedUrn`].
pub(crate) fn parse_tagged_urn(text: &str) -> Result<TaggedUrn, UrnParseError> {
    let colon = text
        .find(':')
        .ok_or_else(|| UrnParseError::new(CapabilityKeyError::InvalidFormat, 0))?;
    let prefix = &text[..colon];
    if prefix.is_empty() {
        return Err(UrnParseError::new(CapabilityKeyError::InvalidFormat, 0));
    }
    let body = &text[colon + 1..];
    let body_start = colon + 1;

    let mut tags = BTreeMap::new();
    if body.is_empty() {
        return Ok(TaggedUrn {
            prefix: prefix.to_string(),
            tags,
        });
    }

    for (key, value, pos) in split_tags(body, body_start)? {
        if key.is_empty() {
            return Err(UrnParseError::new(CapabilityKeyError::EmptyTag, pos));
        }
        if tags.contains_key(&key) {
            return Err(UrnParseError::new(CapabilityKeyError::InvalidFormat, pos));
        }
        tags.insert(key, value);
    }

    Ok(TaggedUrn {
        prefix: prefix.to_string(),
        tags,
    })
}

/// Split the `;`-separated tag list, honoring double-quoted values, and
/// return `(key, value, offset_of_segment)` triples.
fn split_tags(body: &str, base_offset: usize) -> Result<Vec<(String, String, usize)>, UrnParseError> {
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;
    let len = bytes.len();

    loop {
        let seg_start = i;
        // Find the `=` that separates key from value (outside quotes, always
        // before the segment's own quoting begins since keys are never quoted).
        let eq = body[i..].find('=').map(|p| i + p);
        let Some(eq) = eq else {
            return Err(UrnParseError::new(
                CapabilityKeyError::InvalidTagFormat,
                base_offset + seg_start,
            ));
        };
        let key = &body[i..eq];
        let mut j = eq + 1;

        let value: String;
        if j < len && bytes[j] == b'"' {
            j += 1;
            let mut buf = String::new();
            let mut closed = false;
            while j < len {
                let c = bytes[j];
                if c == b'\\' {
                    if j + 1 >= len {
                        return Err(UrnParseError::new(
                            CapabilityKeyError::InvalidCharacter,
                            base_offset + j,
                        ));
                    }
                    let next = bytes[j + 1];
                    if next != b'"' && next != b'\\' {
                        return Err(UrnParseError::new(
                            CapabilityKeyError::InvalidCharacter,
                            base_offset + j,
                        ));
                    }
                    buf.push(next as char);
                    j += 2;
                    continue;
                }
                if c == b'"' {
                    closed = true;
                    j += 1;
                    break;
                }
                buf.push(c as char);
                j += 1;
            }
            if !closed {
                return Err(UrnParseError::new(
                    CapabilityKeyError::InvalidFormat,
                    base_offset + seg_start,
                ));
            }
            if j < len && bytes[j] != b';' {
                return Err(UrnParseError::new(
                    CapabilityKeyError::InvalidFormat,
                    base_offset + j,
                ));
            }
            value = buf;
        } else {
            let seg_end = body[j..].find(';').map(|p| j + p).unwrap_or(len);
            let raw = &body[j..seg_end];
            if raw.chars().any(|c| matches!(c, ';' | '"' | '=') || c.is_whitespace()) {
                return Err(UrnParseError::new(
                    CapabilityKeyError::InvalidCharacter,
                    base_offset + j,
                ));
            }
            value = raw.to_string();
            j = seg_end;
        }

        out.push((key.to_string(), value, base_offset + seg_start));

        if j >= len {
            break;
        }
        if bytes[j] != b';' {
            return Err(UrnParseError::new(
                CapabilityKeyError::InvalidFormat,
                base_offset + j,
            ));
        }
        j += 1;
        if j >= len {
            // Trailing `;` with nothing after it.
            return Err(UrnParseError::new(
                CapabilityKeyError::InvalidFormat,
                base_offset + j,
            ));
        }
        i = j;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_prefix() {
        let err = parse_tagged_urn("ext=pdf").unwrap_err();
        assert_eq!(err.kind, CapabilityKeyError::InvalidFormat);
    }

    #[test]
    fn rejects_empty_key() {
        let err = parse_tagged_urn("cap:=pdf").unwrap_err();
        assert_eq!(err.kind, CapabilityKeyError::EmptyTag);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse_tagged_urn("cap:op=a;op=b").unwrap_err();
        assert_eq!(err.kind, CapabilityKeyError::InvalidFormat);
    }

    #[test]
    fn rejects_trailing_semicolon() {
        let err = parse_tagged_urn("cap:op=a;").unwrap_err();
        assert_eq!(err.kind, CapabilityKeyError::InvalidFormat);
    }

    #[test]
    fn rejects_unterminated_quote() {
        let err = parse_tagged_urn(r#"cap:op="a"#).unwrap_err();
        assert_eq!(err.kind, CapabilityKeyError::InvalidFormat);
    }

    #[test]
    fn rejects_invalid_escape() {
        let err = parse_tagged_urn(r#"cap:op="a\nb""#).unwrap_err();
        assert_eq!(err.kind, CapabilityKeyError::InvalidCharacter);
    }

    #[test]
    fn accepts_quoted_value_with_escapes() {
        let urn = parse_tagged_urn(r#"cap:op="a\"b""#).unwrap();
        assert_eq!(urn.get_tag("op"), Some("a\"b"));
    }

    #[test]
    fn accepts_empty_body() {
        let urn = parse_tagged_urn("media:").unwrap();
        assert!(urn.tags().is_empty());
    }
}
