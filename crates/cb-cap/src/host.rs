// SPDX-License-Identifier: MIT OR Apache-2.0
//! External collaborator interfaces: the cap executor a registered set is
//! dispatched through, and the settings provider consulted when resolving
//! environment-backed arguments.
//!
//! These live in `cb-cap` rather than `cb-exec` so [`cb-registry`'s][reg]
//! `Matrix` can hold a `Box<dyn CapExecutor>` per cap set without creating
//! a dependency cycle (the plan executor also depends on this trait, and
//! would otherwise need to depend on the registry crate that depends on
//! it).
//!
//! [reg]: ../cb_registry/index.html

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::Cap;

/// A single resolved argument passed to [`CapExecutor::execute_cap`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapArgument {
    /// Media URN the value conforms to.
    pub media_urn: String,
    /// The resolved value.
    pub value: Value,
}

/// The interface a plan executor (or any other caller) dispatches caps
/// through.
///
/// Implementations typically wrap a [`cb_registry`](../cb_registry)
/// `Block` or `Matrix`, or a single cap set's host process directly.
#[async_trait]
pub trait CapExecutor: Send + Sync {
    /// `true` iff a cap matching `urn` is known to this executor.
    fn has_cap(&self, urn: &str) -> bool;

    /// Look up the concrete [`Cap`] definition for `urn`.
    ///
    /// # Errors
    ///
    /// Returns an error message if no cap matches.
    fn get_cap(&self, urn: &str) -> Result<Cap, String>;

    /// Dispatch `urn` with the given resolved arguments, returning the
    /// cap's raw output bytes.
    ///
    /// `preferred_cap`, when set, names a concrete cap URN the caller
    /// wants used instead of letting the executor pick the best match.
    ///
    /// # Errors
    ///
    /// Returns an error message on dispatch or execution failure.
    async fn execute_cap(
        &self,
        urn: &str,
        arguments: Vec<CapArgument>,
        preferred_cap: Option<&str>,
    ) -> Result<Vec<u8>, String>;
}

/// The kind of payload a [`CapSetHost`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// UTF-8 text.
    Text,
    /// Opaque binary data.
    Binary,
    /// A JSON document.
    Json,
}

/// The raw response a cap set host process returns before the executor
/// interprets it as a cap's declared output media.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseWrapper {
    /// The kind of payload `data` holds.
    pub kind: ResponseKind,
    /// The raw response bytes.
    pub data: Vec<u8>,
}

/// The lower-level interface a single cap set's backing process exposes:
/// positional/named arguments and optional stdin, one call per cap
/// invocation.
pub trait CapSetHost: Send + Sync {
    /// Invoke `cap_name` with the given positional/named arguments and
    /// optional stdin payload.
    ///
    /// # Errors
    ///
    /// Returns an error message on dispatch or execution failure.
    fn execute_cap(
        &self,
        cap_name: &str,
        positional_args: &[Value],
        named_args: &BTreeMap<String, Value>,
        stdin_data: Option<&[u8]>,
    ) -> Result<ResponseWrapper, String>;
}

/// Consulted before environment variables when resolving a `FromEnv`
/// argument binding.
pub trait SettingsProvider: Send + Sync {
    /// The configured value for `key`, if any.
    fn get_setting(&self, key: &str) -> Option<String>;
}
