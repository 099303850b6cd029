// SPDX-License-Identifier: MIT OR Apache-2.0
//! Media URNs: a positional format token plus unordered structural flags.

use std::collections::BTreeSet;
use std::fmt;

use cb_error::CapabilityKeyError;
use serde::{Deserialize, Serialize, Serializer};

use crate::UrnParseError;

/// A media identifier: `media:<format>(;<flag>)*`.
///
/// Unlike [`TaggedUrn`](crate::TaggedUrn), a media URN is not a key/value
/// multiset — `format` is positional (the first token) and `flags` are an
/// unordered set of structural markers (`list`, `record`, `textable`, ...).
/// An empty media URN (`media:`, no format, no flags) is the wildcard: it
/// matches any concrete media URN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MediaUrn {
    format: Option<String>,
    flags: BTreeSet<String>,
}

impl MediaUrn {
    /// The wildcard media URN (`media:`), matching any concrete media URN.
    #[must_use]
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// Construct a media URN from a format name and a set of flags.
    #[must_use]
    pub fn new(format: impl Into<String>, flags: impl IntoIterator<Item = String>) -> Self {
        Self {
            format: Some(format.into()),
            flags: flags.into_iter().collect(),
        }
    }

    /// Parse `media:<format>(;<flag>)*`, or `media:` for the wildcard.
    ///
    /// # Errors
    ///
    /// Returns [`UrnParseError`] if the prefix is not `media` or if a
    /// segment is malformed (contains `=`, a quote, or whitespace — flags
    /// and the format token are always bare identifiers).
    pub fn parse(text: &str) -> Result<Self, UrnParseError> {
        let rest = text
            .strip_prefix("media:")
            .ok_or_else(|| UrnParseError::new(CapabilityKeyError::InvalidFormat, 0))?;
        if rest.is_empty() {
            return Ok(Self::wildcard());
        }
        let base = "media:".len();
        let mut tokens = rest.split(';');
        let format_tok = tokens.next().unwrap();
        validate_token(format_tok, base)?;
        let mut flags = BTreeSet::new();
        let mut offset = base + format_tok.len() + 1;
        for tok in tokens {
            validate_token(tok, offset)?;
            if tok.is_empty() {
                return Err(UrnParseError::new(CapabilityKeyError::EmptyTag, offset));
            }
            flags.insert(tok.to_string());
            offset += tok.len() + 1;
        }
        if format_tok.is_empty() {
            // `media:;list` — empty format with flags is malformed, not a wildcard.
            return Err(UrnParseError::new(CapabilityKeyError::EmptyTag, base));
        }
        Ok(Self {
            format: Some(format_tok.to_string()),
            flags,
        })
    }

    /// The format token (`pdf`, `json`, ...), if any.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The structural flags attached to this media URN.
    #[must_use]
    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    /// `true` iff this is the wildcard (no format, no flags).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.flags.is_empty()
    }

    /// `true` iff this media URN carries structural flag `flag`.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Count of non-wildcard components: 1 for the format (if present) plus
    /// one per flag.
    #[must_use]
    pub fn specificity(&self) -> usize {
        usize::from(self.format.is_some()) + self.flags.len()
    }
}

fn validate_token(tok: &str, offset: usize) -> Result<(), UrnParseError> {
    if tok.chars().any(|c| matches!(c, ';' | '=' | '"') || c.is_whitespace()) {
        return Err(UrnParseError::new(
            CapabilityKeyError::InvalidCharacter,
            offset,
        ));
    }
    Ok(())
}

impl fmt::Display for MediaUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media:")?;
        if let Some(format) = &self.format {
            write!(f, "{format}")?;
            for flag in &self.flags {
                write!(f, ";{flag}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for MediaUrn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MediaUrn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        MediaUrn::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_parses_and_renders() {
        let urn = MediaUrn::parse("media:").unwrap();
        assert!(urn.is_empty());
        assert_eq!(urn.to_string(), "media:");
    }

    #[test]
    fn format_only_round_trips() {
        let urn = MediaUrn::parse("media:pdf").unwrap();
        assert_eq!(urn.format(), Some("pdf"));
        assert_eq!(urn.to_string(), "media:pdf");
    }

    #[test]
    fn flags_render_sorted() {
        let urn = MediaUrn::new("json", ["textable".into(), "list".into(), "record".into()]);
        assert_eq!(urn.to_string(), "media:json;list;record;textable");
    }

    #[test]
    fn specificity_counts_format_and_flags() {
        let urn = MediaUrn::parse("media:json;list;record;textable").unwrap();
        assert_eq!(urn.specificity(), 4);
        assert_eq!(MediaUrn::wildcard().specificity(), 0);
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!(MediaUrn::parse("cap:op=a").is_err());
    }
}
