// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cap URNs: tagged URNs with reserved keys understood by the matcher.

use std::fmt;

use cb_error::CapabilityKeyError;
use serde::{Deserialize, Serialize, Serializer};

use crate::{MediaUrn, TaggedUrn, UrnParseError};

/// Reserved [`CapUrn`] tag keys with spec-defined meaning. Any other key is
/// user metadata.
pub const CAP_RESERVED_KEYS: &[&str] = &[
    "op", "in", "out", "ext", "format", "target", "type", "action",
];

/// A capability identifier: a [`TaggedUrn`] with prefix `cap` and a set of
/// reserved keys (`op`, `in`, `out`, `ext`, `format`, `target`, `type`,
/// `action`) that the matcher gives special meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapUrn(TaggedUrn);

impl CapUrn {
    /// Construct an empty cap URN with no tags.
    #[must_use]
    pub fn new() -> Self {
        Self(TaggedUrn::new("cap"))
    }

    /// Parse a `cap:...` URN.
    ///
    /// # Errors
    ///
    /// Returns [`UrnParseError`] if the text is malformed or its prefix is
    /// not `cap`.
    pub fn parse(text: &str) -> Result<Self, UrnParseError> {
        let urn = TaggedUrn::parse(text)?;
        if urn.prefix() != "cap" {
            return Err(UrnParseError::new(CapabilityKeyError::InvalidFormat, 0));
        }
        Ok(Self(urn))
    }

    /// The underlying generic tagged URN.
    #[must_use]
    pub fn as_tagged(&self) -> &TaggedUrn {
        &self.0
    }

    /// Raw value of an arbitrary tag (reserved or user metadata).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get_tag(key)
    }

    /// Return a copy with `key` set to `value`.
    #[must_use]
    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self(self.0.with_tag(key, value))
    }

    /// Return a copy with `key` removed.
    #[must_use]
    pub fn without_tag(&self, key: &str) -> Self {
        Self(self.0.without_tag(key))
    }

    /// The `op` (operation) tag.
    #[must_use]
    pub fn op(&self) -> Option<&str> {
        self.get("op")
    }

    /// The `ext` (filename extension hint) tag.
    #[must_use]
    pub fn ext(&self) -> Option<&str> {
        self.get("ext")
    }

    /// The `format` tag.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.get("format")
    }

    /// The `target` tag.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.get("target")
    }

    /// The `type` tag.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.get("type")
    }

    /// The `action` tag.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.get("action")
    }

    /// Parse the `in` tag as a [`MediaUrn`], if present.
    ///
    /// # Errors
    ///
    /// Returns [`UrnParseError`] if `in` is present but not a valid media
    /// URN.
    pub fn in_media(&self) -> Option<Result<MediaUrn, UrnParseError>> {
        self.get("in").map(MediaUrn::parse)
    }

    /// Parse the `out` tag as a [`MediaUrn`], if present.
    ///
    /// # Errors
    ///
    /// Returns [`UrnParseError`] if `out` is present but not a valid media
    /// URN.
    pub fn out_media(&self) -> Option<Result<MediaUrn, UrnParseError>> {
        self.get("out").map(MediaUrn::parse)
    }

    /// Count of non-wildcard tags.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.0.specificity()
    }
}

impl Default for CapUrn {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CapUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for CapUrn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CapUrn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        CapUrn::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reserved_keys() {
        let urn = CapUrn::parse("cap:ext=pdf;in=media:;op=generate_thumbnail;out=media:binary")
            .unwrap();
        assert_eq!(urn.op(), Some("generate_thumbnail"));
        assert_eq!(urn.ext(), Some("pdf"));
        assert!(urn.in_media().unwrap().unwrap().is_empty());
        assert_eq!(urn.out_media().unwrap().unwrap().format(), Some("binary"));
    }

    #[test]
    fn rejects_non_cap_prefix() {
        assert!(CapUrn::parse("media:pdf").is_err());
    }

    #[test]
    fn specificity_matches_s1_scenario() {
        let generic = CapUrn::parse("cap:in=media:;op=generate_thumbnail;out=media:binary").unwrap();
        let specific =
            CapUrn::parse("cap:ext=pdf;in=media:;op=generate_thumbnail;out=media:binary").unwrap();
        assert_eq!(generic.specificity(), 2);
        assert_eq!(specific.specificity(), 3);
    }
}
