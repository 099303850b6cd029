// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Media spec resolution and Draft-7 JSON Schema validation.
//!
//! [`registry::MediaSpecRegistry`] resolves a media URN to the
//! [`cb_cap::MediaSpec`] that describes it, falling back to synthetic
//! schemas for the built-in scalar media. [`resolver::SchemaResolver`]
//! resolves a schema's `$ref`s against caller-supplied storage.
//! [`validator::SchemaValidator`] compiles resolved schemas against Draft-7
//! and validates values against them, caching compiled validators by
//! content hash.

pub mod registry;
pub mod resolver;
pub mod validator;

pub use registry::{builtin_spec, MediaSpecRegistry};
pub use resolver::{FileSchemaResolver, SchemaResolver};
pub use validator::{is_structured_schema, SchemaValidator};
