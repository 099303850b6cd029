// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Matrix (a single registry of cap sets) and Block (an ordered composite
//! of registries), plus the derived capability graph over a block.
//!
//! Neither type synchronizes internally: `register_cap_set` and
//! `add_registry` take `&mut self`, matching the single-writer/multi-reader
//! contract described for this system — callers that need concurrent
//! access wrap a `Block` in their own `Arc<RwLock<_>>`.

use std::collections::BTreeMap;

use cb_cap::{Cap, CapExecutor};
use cb_graph::{Edge, Graph};
use cb_matcher::can_handle;
use cb_urn::CapUrn;
use tracing::{debug, trace};

/// A registered cap set: the executor it dispatches through plus the
/// caps it has advertised.
pub struct CapSetEntry {
    host: Box<dyn CapExecutor>,
    capabilities: Vec<Cap>,
}

impl CapSetEntry {
    /// The caps this set advertises, in registration order.
    #[must_use]
    pub fn capabilities(&self) -> &[Cap] {
        &self.capabilities
    }

    /// The executor this set dispatches through.
    #[must_use]
    pub fn host(&self) -> &dyn CapExecutor {
        self.host.as_ref()
    }
}

/// Errors raised while registering cap sets or registries.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A cap set with this name is already registered.
    #[error("cap set name collision: {name}")]
    NameCollision {
        /// The colliding name.
        name: String,
    },
    /// Two caps within one set declared the same URN.
    #[error("duplicate cap URN `{urn}` within set `{set}`")]
    DuplicateCapUrn {
        /// The set the duplicate was found in.
        set: String,
        /// The duplicated URN.
        urn: String,
    },
    /// A registry with this name is already present in the block.
    #[error("registry name collision: {name}")]
    RegistryNameCollision {
        /// The colliding name.
        name: String,
    },
    /// No registered cap set could handle the request.
    #[error("no cap set found for request `{request}`")]
    NoSetsFound {
        /// The request that found no match.
        request: String,
    },
}

/// A single registry: a named collection of cap sets, each advertising
/// caps through its own [`CapExecutor`].
#[derive(Default)]
pub struct Matrix {
    sets: Vec<(String, CapSetEntry)>,
}

/// The winning cap set, cap, and specificity for a [`Matrix::find_best_cap_set`]
/// or [`Block::find_best_cap_set`] query.
pub struct MatchResult<'a> {
    /// Name of the winning cap set.
    pub set_name: &'a str,
    /// Name of the registry the winning set came from, when queried
    /// through a [`Block`]. Empty when queried directly on a [`Matrix`].
    pub registry_name: &'a str,
    /// The executor backing the winning set.
    pub host: &'a dyn CapExecutor,
    /// The winning cap.
    pub cap: Cap,
    /// The winning cap's specificity against the request.
    pub specificity: usize,
}

impl Matrix {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cap set under `name`, backed by `host`, advertising
    /// `caps`.
    ///
    /// Caps are snapshot-copied; later mutation of the caller's `caps`
    /// vector does not affect the registered set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameCollision`] if `name` is already
    /// registered, or [`RegistryError::DuplicateCapUrn`] if two of
    /// `caps` share a URN.
    pub fn register_cap_set(
        &mut self,
        name: impl Into<String>,
        host: Box<dyn CapExecutor>,
        caps: Vec<Cap>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.sets.iter().any(|(n, _)| n == &name) {
            return Err(RegistryError::NameCollision { name });
        }
        let mut seen = std::collections::HashSet::new();
        for cap in &caps {
            if !seen.insert(cap.urn.to_string()) {
                return Err(RegistryError::DuplicateCapUrn {
                    set: name,
                    urn: cap.urn.to_string(),
                });
            }
        }
        self.sets.push((
            name,
            CapSetEntry {
                host,
                capabilities: caps,
            },
        ));
        Ok(())
    }

    /// Names of registered cap sets, in registration order.
    #[must_use]
    pub fn set_names(&self) -> Vec<&str> {
        self.sets.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a registered cap set by name.
    #[must_use]
    pub fn get_set(&self, name: &str) -> Option<&CapSetEntry> {
        self.sets.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Find the globally most specific cap across every registered set
    /// that can handle `request`.
    ///
    /// Ties are broken by registration order of the set, then by the
    /// order caps were declared within that set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoSetsFound`] if no cap can handle the
    /// request.
    pub fn find_best_cap_set(&self, request: &CapUrn) -> Result<MatchResult<'_>, RegistryError> {
        trace!(request = %request, sets = self.sets.len(), "matrix scan start");
        let mut best: Option<MatchResult<'_>> = None;
        for (set_name, entry) in &self.sets {
            for cap in &entry.capabilities {
                if !can_handle(&cap.urn, request) {
                    continue;
                }
                let specificity = cap.urn.specificity();
                let better = match &best {
                    None => true,
                    Some(current) => specificity > current.specificity,
                };
                if better {
                    best = Some(MatchResult {
                        set_name,
                        registry_name: "",
                        host: entry.host.as_ref(),
                        cap: cap.clone(),
                        specificity,
                    });
                }
            }
        }
        match &best {
            Some(m) => debug!(request = %request, set = m.set_name, specificity = m.specificity, "resolved cap"),
            None => debug!(request = %request, "no cap set found"),
        }
        best.ok_or_else(|| RegistryError::NoSetsFound {
            request: request.to_string(),
        })
    }

    /// Edges this matrix contributes to a graph: one per cap with
    /// non-wildcard `in`/`out` tags, carrying the cap's specificity.
    fn edges(&self, registry_name: &str) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (set_name, entry) in &self.sets {
            for cap in &entry.capabilities {
                let (Some(Ok(in_media)), Some(Ok(out_media))) =
                    (cap.urn.in_media(), cap.urn.out_media())
                else {
                    continue;
                };
                if in_media.is_empty() || out_media.is_empty() {
                    continue;
                }
                edges.push(Edge {
                    from: in_media,
                    to: out_media,
                    cap: cap.urn.clone(),
                    registry_name: registry_name.to_string(),
                    set_name: set_name.clone(),
                    specificity: cap.urn.specificity(),
                });
            }
        }
        edges
    }
}

/// An ordered composite of named [`Matrix`] registries, queried as one.
#[derive(Default)]
pub struct Block {
    registries: Vec<(String, Matrix)>,
}

impl Block {
    /// An empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `matrix` under `name` at the end of the registry order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RegistryNameCollision`] if `name` is
    /// already present.
    pub fn add_registry(&mut self, name: impl Into<String>, matrix: Matrix) -> Result<(), RegistryError> {
        let name = name.into();
        if self.registries.iter().any(|(n, _)| n == &name) {
            return Err(RegistryError::RegistryNameCollision { name });
        }
        self.registries.push((name, matrix));
        Ok(())
    }

    /// Remove the registry named `name`, preserving the order of the
    /// remainder.
    pub fn remove_registry(&mut self, name: &str) -> Option<Matrix> {
        let pos = self.registries.iter().position(|(n, _)| n == name)?;
        Some(self.registries.remove(pos).1)
    }

    /// Registry names, in block order.
    #[must_use]
    pub fn get_registry_names(&self) -> Vec<&str> {
        self.registries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a registry by name.
    #[must_use]
    pub fn get_registry(&self, name: &str) -> Option<&Matrix> {
        self.registries.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// Poll every registry and return the single highest-specificity
    /// match across all of them.
    ///
    /// Ties are broken by registry order in the block, then by each
    /// matrix's own tie-break (registration order of the set, then cap
    /// order).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoSetsFound`] if no registry has a
    /// handler.
    pub fn find_best_cap_set(&self, request: &CapUrn) -> Result<MatchResult<'_>, RegistryError> {
        debug!(request = %request, registries = self.registries.len(), "block scan start");
        let mut best: Option<MatchResult<'_>> = None;
        for (registry_name, matrix) in &self.registries {
            let candidate = match matrix.find_best_cap_set(request) {
                Ok(c) => c,
                Err(RegistryError::NoSetsFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            let better = match &best {
                None => true,
                Some(current) => candidate.specificity > current.specificity,
            };
            if better {
                best = Some(MatchResult {
                    registry_name,
                    ..candidate
                });
            }
        }
        best.ok_or_else(|| RegistryError::NoSetsFound {
            request: request.to_string(),
        })
    }

    /// `true` iff any registered matrix has a cap that can handle
    /// `request`.
    #[must_use]
    pub fn accepts_request(&self, request: &CapUrn) -> bool {
        self.find_best_cap_set(request).is_ok()
    }

    /// Build the derived capability graph from a snapshot of this
    /// block's current registrations. Later mutation of the block does
    /// not affect the returned graph.
    #[must_use]
    pub fn graph(&self) -> Graph {
        let mut edges = Vec::new();
        for (registry_name, matrix) in &self.registries {
            edges.extend(matrix.edges(registry_name));
        }
        Graph::new(edges)
    }
}

/// A map of free-form metadata a registered cap set may attach;
/// currently unused by the core but kept for forward-compatible
/// serialization of `CapSetEntry` summaries.
pub type SetMetadata = BTreeMap<String, String>;
