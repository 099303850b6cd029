// SPDX-License-Identifier: MIT OR Apache-2.0
//! An in-memory [`CapExecutor`] for exercising [`crate::PlanExecutor`]
//! without a real process/IPC transport, the same role
//! `abp-backend-mock` plays for `abp_runtime::Pipeline`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use cb_cap::{Cap, CapArgument, CapExecutor};

/// Serves caps from an in-memory table and echoes back a canned response
/// per cap URN.
#[derive(Debug, Default)]
pub struct StubCapExecutor {
    caps: BTreeMap<String, Cap>,
    responses: BTreeMap<String, Vec<u8>>,
}

impl StubCapExecutor {
    /// An executor with no registered caps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cap` and the raw bytes it returns when dispatched.
    #[must_use]
    pub fn with_cap(mut self, cap: Cap, response: Vec<u8>) -> Self {
        self.responses.insert(cap.urn.to_string(), response);
        self.caps.insert(cap.urn.to_string(), cap);
        self
    }

    /// Register `cap` without a canned response: `has_cap`/`get_cap`
    /// succeed but `execute_cap` fails, simulating a runtime dispatch
    /// failure against an otherwise well-formed plan.
    #[must_use]
    pub fn with_unresponsive_cap(mut self, cap: Cap) -> Self {
        self.caps.insert(cap.urn.to_string(), cap);
        self
    }
}

#[async_trait]
impl CapExecutor for StubCapExecutor {
    fn has_cap(&self, urn: &str) -> bool {
        self.caps.contains_key(urn)
    }

    fn get_cap(&self, urn: &str) -> Result<Cap, String> {
        self.caps
            .get(urn)
            .cloned()
            .ok_or_else(|| format!("no such cap: {urn}"))
    }

    async fn execute_cap(
        &self,
        urn: &str,
        _arguments: Vec<CapArgument>,
        preferred_cap: Option<&str>,
    ) -> Result<Vec<u8>, String> {
        let lookup = preferred_cap.unwrap_or(urn);
        self.responses
            .get(lookup)
            .cloned()
            .ok_or_else(|| format!("no canned response for cap: {lookup}"))
    }
}
