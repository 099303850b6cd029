// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Stable numeric error taxonomy for the capability brokerage core.
//!
//! Every error enum here carries an explicit `#[repr(u16)]` discriminant so
//! the numeric code attached to a variant survives refactors — callers that
//! persist or transmit an error code can rely on the number, not the variant
//! order in source.

use serde::{Deserialize, Serialize};

/// Errors raised while parsing or manipulating a [tagged URN](https://docs.rs)
/// key/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[repr(u16)]
pub enum CapabilityKeyError {
    /// The URN text does not match `prefix:(key=value)(;key=value)*`.
    #[error("invalid URN format")]
    InvalidFormat = 1,
    /// A tag key was empty.
    #[error("tag key must not be empty")]
    EmptyTag = 2,
    /// A tag value contained an unescaped reserved character.
    #[error("tag value contains an invalid character")]
    InvalidCharacter = 3,
    /// A `key=value` pair itself was malformed (e.g. missing `=`).
    #[error("malformed key=value tag")]
    InvalidTagFormat = 4,
}

impl CapabilityKeyError {
    /// The stable numeric code for this error.
    #[must_use]
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Errors raised while validating cap arguments, outputs, or schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[repr(u16)]
pub enum ValidationError {
    /// No cap matched the requested URN pattern.
    #[error("unknown cap: {urn}")]
    UnknownCap {
        /// The requested cap URN pattern.
        urn: String,
    } = 1,
    /// A required argument had no binding and no default.
    #[error("missing required argument `{arg}`")]
    MissingRequiredArgument {
        /// Name of the missing argument.
        arg: String,
    } = 2,
    /// A resolved argument's JSON type did not match the declared media.
    #[error("argument `{arg}` has the wrong type")]
    InvalidArgumentType {
        /// Name of the offending argument.
        arg: String,
    } = 3,
    /// Schema validation rejected an argument value.
    #[error("argument `{arg}` failed schema validation: {violations:?}")]
    ArgumentValidationFailed {
        /// Name of the offending argument.
        arg: String,
        /// All violation messages collected for this argument.
        violations: Vec<String>,
    } = 4,
    /// A cap's declared output did not match its output media type.
    #[error("output has the wrong type")]
    InvalidOutputType = 5,
    /// Schema validation rejected a cap's output.
    #[error("output failed schema validation: {violations:?}")]
    OutputValidationFailed {
        /// All violation messages collected for the output.
        violations: Vec<String>,
    } = 6,
    /// A cap declared a schema that does not itself compile.
    #[error("cap `{urn}` declares an invalid schema: {reason}")]
    InvalidCapSchema {
        /// URN of the offending cap.
        urn: String,
        /// Reason the schema failed to compile.
        reason: String,
    } = 7,
    /// More arguments were bound than the cap declares.
    #[error("too many arguments bound for cap `{urn}`")]
    TooManyArguments {
        /// URN of the offending cap.
        urn: String,
    } = 8,
    /// A value expected to be JSON could not be parsed as JSON.
    #[error("failed to parse JSON: {reason}")]
    JsonParseError {
        /// The underlying parse failure message.
        reason: String,
    } = 9,
}

/// Errors raised while resolving input paths into [`ResolvedInputSet`]s.
///
/// [`ResolvedInputSet`]: https://docs.rs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[repr(u16)]
pub enum InputResolverError {
    /// A requested path does not exist on disk.
    #[error("path not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    } = 1,
    /// Resolution completed but no files survived exclusion filtering.
    #[error("no files resolved from the given inputs")]
    NoFilesResolved = 2,
    /// No input paths were given at all.
    #[error("no input paths were given")]
    EmptyInput = 3,
    /// An I/O error occurred while walking or reading a path.
    #[error("I/O error at {path}: {reason}")]
    IoError {
        /// Path where the I/O error occurred.
        path: String,
        /// Underlying error message.
        reason: String,
    } = 4,
}

/// Errors raised while validating or executing a [`Plan`].
///
/// [`Plan`]: https://docs.rs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[repr(u16)]
pub enum PlannerError {
    /// An invariant the planner assumes was violated; indicates a bug.
    #[error("internal planner error: {reason}")]
    Internal {
        /// Description of the violated invariant.
        reason: String,
    } = 1,
    /// The plan graph contains a cycle.
    #[error("cycle detected at node `{node}`")]
    CycleDetected {
        /// A node id on the detected cycle.
        node: String,
    } = 2,
    /// An edge or binding referenced a node id that is not declared.
    #[error("unknown node id `{node}`")]
    UnknownNode {
        /// The undeclared node id.
        node: String,
    } = 3,
    /// A cap node argument has no binding and the arg is required.
    #[error("missing binding for argument `{arg}` on node `{node}`")]
    MissingBinding {
        /// Node id missing the binding.
        node: String,
        /// Argument name missing the binding.
        arg: String,
    } = 4,
    /// A bound value's media type does not match what the consumer expects.
    #[error("type mismatch at node `{node}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Node id where the mismatch was detected.
        node: String,
        /// Media URN the consumer expected.
        expected: String,
        /// Media URN actually produced.
        actual: String,
    } = 5,
}

/// Errors raised while registering or resolving [`MediaSpec`]s.
///
/// [`MediaSpec`]: https://docs.rs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[repr(u16)]
pub enum MediaSpecError {
    /// Two `MediaSpec`s within the same cap declared the same URN.
    #[error("duplicate media URN: {urn}")]
    DuplicateMediaUrn {
        /// The duplicated URN.
        urn: String,
    } = 1,
    /// A media URN referenced from an arg/output could not be resolved.
    #[error("unresolvable media URN: {urn}")]
    UnresolvableMediaUrn {
        /// The URN that could not be resolved.
        urn: String,
    } = 2,
}
