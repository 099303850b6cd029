// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Cap definitions: URN, arguments, output, media specs, and metadata.

use std::collections::BTreeMap;

use cb_error::MediaSpecError;
use cb_urn::CapUrn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod host;

pub use host::{
    CapArgument, CapExecutor, CapSetHost, ResponseKind, ResponseWrapper, SettingsProvider,
};

/// Media URNs that resolve to a synthetic schema without needing a local
/// [`MediaSpec`] entry. [`cb-schema`](../cb_schema/index.html) maps each of
/// these to its Draft-7 schema.
pub const BUILTIN_SCALAR_MEDIA: &[&str] = &[
    "media:str",
    "media:int",
    "media:num",
    "media:bool",
    "media:obj",
    "media:str-array",
    "media:binary",
    "media:void",
];

/// Where a cap argument's value comes from when a host invokes the
/// underlying command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgSource {
    /// Passed as `--<name> <value>` on the command line.
    CliFlag {
        /// Flag name, without leading dashes.
        name: String,
    },
    /// Passed as the positional argument at `index`.
    CliPositional {
        /// Zero-based positional index.
        index: usize,
    },
    /// Piped to the process's standard input.
    Stdin,
    /// A fixed value, never supplied by the caller.
    Literal {
        /// The fixed value.
        value: Value,
    },
    /// Read from an environment variable.
    Env {
        /// Environment variable name.
        name: String,
    },
}

/// A single declared argument of a [`Cap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapArg {
    /// The argument's name, referenced by [`Plan`](../cb_plan/struct.Plan.html)
    /// argument bindings.
    pub name: String,
    /// Media URN the argument's value must conform to.
    pub media_urn: String,
    /// Whether a binding (or cap-declared default) is mandatory.
    pub required: bool,
    /// Acceptable ways to supply this argument to the host process.
    pub sources: Vec<ArgSource>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Extra JSON Schema constraints layered on top of the media's schema.
    #[serde(default)]
    pub validation: Option<Value>,
    /// Value used when no binding is present and the argument is optional.
    #[serde(default)]
    pub default_value: Option<Value>,
}

/// The single declared output of a [`Cap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapOutput {
    /// Media URN the output conforms to.
    pub media_urn: String,
    /// Extra JSON Schema constraints layered on top of the media's schema.
    #[serde(default)]
    pub validation: Option<Value>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A named content format: its MIME type, JSON Schema, and extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSpec {
    /// The media URN this spec describes.
    pub urn: String,
    /// MIME type, e.g. `application/pdf`.
    pub media_type: String,
    /// Profile URI, if the format carries one (e.g. a JSON-LD context).
    #[serde(default)]
    pub profile_uri: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Draft-7 JSON Schema describing values of this media, if structured.
    #[serde(default)]
    pub schema: Option<Value>,
    /// Extra JSON Schema constraints layered on `schema`.
    #[serde(default)]
    pub validation: Option<Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Filename extensions associated with this media, without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// An immutable capability definition: a URN, its arguments, its output,
/// and the media specs it relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cap {
    /// The cap's identifying URN.
    pub urn: CapUrn,
    /// Short human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// The command the host runs to invoke this cap.
    #[serde(default)]
    pub command: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Media specs this cap's args/output reference by URN.
    #[serde(default)]
    pub media_specs: Vec<MediaSpec>,
    /// Declared arguments.
    #[serde(default)]
    pub args: Vec<CapArg>,
    /// Declared output, if any.
    #[serde(default)]
    pub output: Option<CapOutput>,
    /// Whether this cap reads its primary input from stdin.
    #[serde(default)]
    pub accepts_stdin: bool,
    /// Opaque metadata blob, preserved but not interpreted by the core.
    #[serde(default)]
    pub metadata_json: Option<Vec<u8>>,
}

impl Cap {
    /// Look up a declared argument by name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&CapArg> {
        self.args.iter().find(|a| a.name == name)
    }

    /// Look up a local media spec by URN.
    #[must_use]
    pub fn media_spec(&self, urn: &str) -> Option<&MediaSpec> {
        self.media_specs.iter().find(|m| m.urn == urn)
    }

    /// `true` iff `media_urn` resolves locally or is a built-in scalar.
    #[must_use]
    pub fn resolves_media(&self, media_urn: &str) -> bool {
        self.media_spec(media_urn).is_some() || BUILTIN_SCALAR_MEDIA.contains(&media_urn)
    }

    /// Check the invariants from the spec's data model:
    ///
    /// - `media_specs` has no duplicate URNs.
    /// - Every arg/output media URN resolves locally or is a built-in
    ///   scalar.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`MediaSpecError`].
    pub fn validate(&self) -> Result<(), MediaSpecError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.media_specs {
            if !seen.insert(spec.urn.as_str()) {
                return Err(MediaSpecError::DuplicateMediaUrn {
                    urn: spec.urn.clone(),
                });
            }
        }
        for arg in &self.args {
            if !self.resolves_media(&arg.media_urn) {
                return Err(MediaSpecError::UnresolvableMediaUrn {
                    urn: arg.media_urn.clone(),
                });
            }
        }
        if let Some(output) = &self.output {
            if !self.resolves_media(&output.media_urn) {
                return Err(MediaSpecError::UnresolvableMediaUrn {
                    urn: output.media_urn.clone(),
                });
            }
        }
        Ok(())
    }
}
