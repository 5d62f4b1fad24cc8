//! Comparison of anonymous and authenticated discovery results.

use super::ToolManifest;
use serde::Serialize;

/// What an authenticated caller gains over an anonymous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryComparison {
    pub unauthenticated_count: usize,
    pub authenticated_count: usize,
    /// Authenticated minus unauthenticated count; negative when the anonymous
    /// manifest is larger.
    pub additional: i64,
    /// Tools visible only with a credential.
    pub hidden_tools: Vec<String>,
    /// Tools visible anonymously but missing from the authenticated manifest.
    pub leaked_tools: Vec<String>,
    /// Anonymous manifest is a subset of the authenticated one.
    pub is_tiered: bool,
}

impl DiscoveryComparison {
    /// Compare two discovery results. A failed fetch counts as zero tools.
    pub fn between(
        unauthenticated: Option<&ToolManifest>,
        authenticated: Option<&ToolManifest>,
    ) -> Self {
        let empty = ToolManifest::default();
        let anon = unauthenticated.unwrap_or(&empty);
        let full = authenticated.unwrap_or(&empty);

        let names = |tools: Vec<&super::ToolDescriptor>| -> Vec<String> {
            tools.into_iter().map(|t| t.name.clone()).collect()
        };

        Self {
            unauthenticated_count: anon.len(),
            authenticated_count: full.len(),
            additional: full.len() as i64 - anon.len() as i64,
            hidden_tools: names(full.tools_not_in(anon)),
            leaked_tools: names(anon.tools_not_in(full)),
            is_tiered: anon.is_subset_of(full),
        }
    }
}
