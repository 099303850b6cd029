// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Canonical tagged URNs.
//!
//! A [`TaggedUrn`] is an ordered multiset of `key=value` tags under a
//! prefix (`cap`, `media`, ...). [`CapUrn`] specializes it with the
//! reserved keys a capability pattern uses. [`MediaUrn`] is a distinct,
//! lighter-weight identifier: a positional format token followed by
//! unordered structural flags, matching how every media URN in the wild
//! is actually written (`media:json;list;record;textable`, never
//! `media:json="";list=""`).

use std::collections::BTreeMap;
use std::fmt;

use cb_error::CapabilityKeyError;
use serde::{Deserialize, Serialize, Serializer};

mod cap_urn;
mod media_urn;
mod parse;

pub use cap_urn::{CapUrn, CAP_RESERVED_KEYS};
pub use media_urn::MediaUrn;

/// A parse failure with the byte offset at which it occurred.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {position}")]
pub struct UrnParseError {
    /// The kind of parse failure.
    pub kind: CapabilityKeyError,
    /// Byte offset into the input string where the failure was detected.
    pub position: usize,
}

impl UrnParseError {
    fn new(kind: CapabilityKeyError, position: usize) -> Self {
        Self { kind, position }
    }
}

/// An ordered multiset of `key=value` tags under a prefix.
///
/// Two `TaggedUrn`s are equal iff their canonical string forms are equal;
/// tags are stored in a [`BTreeMap`] so iteration is always key-sorted and
/// the canonical form falls out of iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TaggedUrn {
    prefix: String,
    tags: BTreeMap<String, String>,
}

impl TaggedUrn {
    /// Construct an empty `TaggedUrn` with the given prefix and no tags.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Parse the canonical text form `prefix:(key=value)(;key=value)*`.
    ///
    /// # Errors
    ///
    /// Returns [`UrnParseError`] with the byte offset of the first
    /// malformed token: a missing prefix, an empty key, an unterminated
    /// quote, an invalid escape, a duplicate key, or a trailing `;`.
    pub fn parse(text: &str) -> Result<Self, UrnParseError> {
        parse::parse_tagged_urn(text)
    }

    /// The URN's prefix (`cap`, `media`, ...).
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Look up a tag's raw value.
    #[must_use]
    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Return a copy with `key` set to `value`, replacing any existing tag.
    #[must_use]
    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.tags.insert(key.into(), value.into());
        next
    }

    /// Return a copy with `key` removed, if present.
    #[must_use]
    pub fn without_tag(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.tags.remove(key);
        next
    }

    /// All tags in key-sorted order.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// `true` iff the tag at `key` is wildcard: absent, empty, `*`, or (for
    /// the reserved `in`/`out` media keys) an empty media URN.
    #[must_use]
    pub fn is_tag_wildcard(&self, key: &str) -> bool {
        match self.tags.get(key) {
            None => true,
            Some(value) => is_wildcard_value(key, value),
        }
    }

    /// Count of tags whose value is non-wildcard.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.tags
            .iter()
            .filter(|(k, v)| !is_wildcard_value(k, v))
            .count()
    }
}

/// `true` iff `value` is a wildcard value for tag `key`: empty, `*`, or (for
/// keys conventionally holding a media URN) an empty media URN.
#[must_use]
pub fn is_wildcard_value(key: &str, value: &str) -> bool {
    if value.is_empty() || value == "*" {
        return true;
    }
    if (key == "in" || key == "out") && value.starts_with("media:") {
        return MediaUrn::parse(value).is_ok_and(|m| m.is_empty());
    }
    false
}

impl fmt::Display for TaggedUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.prefix)?;
        let mut first = true;
        for (key, value) in &self.tags {
            if !first {
                write!(f, ";")?;
            }
            first = false;
            write!(f, "{key}=")?;
            write_quoted_if_needed(f, value)?;
        }
        Ok(())
    }
}

fn write_quoted_if_needed(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if needs_quoting(value) {
        f.write_str("\"")?;
        for ch in value.chars() {
            if ch == '"' || ch == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{ch}")?;
        }
        f.write_str("\"")
    } else {
        f.write_str(value)
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| matches!(c, ';' | '=' | '"') || c_is_ws(c))
}

fn c_is_ws(c: char) -> bool {
    c.is_whitespace()
}

impl Serialize for TaggedUrn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaggedUrn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        TaggedUrn::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Flag tokens a [`MediaUrn`] may carry, per the spec's convention.
///
/// Parsing does not reject flags outside this set (future formats may add
/// new structural flags); it is exposed for callers that want to validate
/// against the closed vocabulary.
pub const MEDIA_FLAGS: &[&str] = &[
    "list", "record", "textable", "image", "audio", "video", "code", "binary",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_sorts_keys() {
        let urn = TaggedUrn::new("cap")
            .with_tag("op", "thumb")
            .with_tag("ext", "pdf");
        assert_eq!(urn.to_string(), "cap:ext=pdf;op=thumb");
    }

    #[test]
    fn round_trips_through_parse() {
        let text = "cap:ext=pdf;in=media:;op=generate_thumbnail;out=media:binary";
        let urn = TaggedUrn::parse(text).unwrap();
        assert_eq!(urn.to_string(), text);
    }

    #[test]
    fn quotes_values_with_reserved_characters() {
        let urn = TaggedUrn::new("cap").with_tag("out", "media:json;list;record;textable");
        assert_eq!(
            urn.to_string(),
            r#"cap:out="media:json;list;record;textable""#
        );
        let back = TaggedUrn::parse(&urn.to_string()).unwrap();
        assert_eq!(back, urn);
    }

    #[test]
    fn empty_value_is_quoted() {
        let urn = TaggedUrn::new("cap").with_tag("note", "");
        assert_eq!(urn.to_string(), r#"cap:note="""#);
    }

    #[test]
    fn specificity_counts_non_wildcard_tags() {
        let urn = TaggedUrn::new("cap")
            .with_tag("ext", "pdf")
            .with_tag("op", "*")
            .with_tag("in", "media:");
        assert_eq!(urn.specificity(), 1);
    }

    #[test]
    fn adding_non_wildcard_tag_increases_specificity() {
        let base = TaggedUrn::new("cap").with_tag("op", "generate");
        let more = base.with_tag("ext", "pdf");
        assert!(more.specificity() > base.specificity());
    }

    #[test]
    fn adding_wildcard_tag_does_not_increase_specificity() {
        let base = TaggedUrn::new("cap").with_tag("op", "generate");
        let same = base.with_tag("ext", "*");
        assert_eq!(same.specificity(), base.specificity());
    }

    #[test]
    fn serializes_as_its_canonical_string() {
        let urn = TaggedUrn::new("cap")
            .with_tag("ext", "pdf")
            .with_tag("op", "thumb");
        let json = serde_json::to_string(&urn).unwrap();
        assert_eq!(json, r#""cap:ext=pdf;op=thumb""#);
    }

    #[test]
    fn deserializes_from_its_canonical_string() {
        let json = r#""cap:ext=pdf;op=thumb""#;
        let urn: TaggedUrn = serde_json::from_str(json).unwrap();
        assert_eq!(urn, TaggedUrn::new("cap").with_tag("ext", "pdf").with_tag("op", "thumb"));
    }

    #[test]
    fn deserializing_malformed_text_fails() {
        let json = r#""no-colon-here""#;
        let err = serde_json::from_str::<TaggedUrn>(json);
        assert!(err.is_err());
    }

    proptest::proptest! {
        #[test]
        fn parse_displays_round_trip(
            op in "[a-z]{1,8}",
            ext in "[a-z]{1,4}",
        ) {
            let urn = TaggedUrn::new("cap").with_tag("op", op).with_tag("ext", ext);
            let text = urn.to_string();
            let parsed = TaggedUrn::parse(&text).unwrap();
            proptest::prop_assert_eq!(parsed.to_string(), text);
        }
    }
}
