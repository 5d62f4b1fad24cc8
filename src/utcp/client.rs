//! Manifest fetcher for the UTCP discovery endpoint.

use super::{FetchError, ToolManifest};
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info, warn};

/// Path of the discovery document under the API base URL.
pub const MANIFEST_PATH: &str = "utcp";

/// Client for the tool manifest service.
#[derive(Debug, Clone)]
pub struct ManifestClient {
    base_url: String,
    http: reqwest::Client,
}

impl ManifestClient {
    /// Create a new manifest client.
    pub fn new(base_url: &str) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    /// Create a manifest client sharing an existing HTTP client.
    pub fn with_http(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Full URL of the manifest document.
    pub fn manifest_url(&self) -> String {
        format!("{}/{}", self.base_url, MANIFEST_PATH)
    }

    /// Fetch the manifest, optionally presenting a credential.
    ///
    /// The credential is sent verbatim as the `Authorization` header. Only
    /// HTTP 200 counts as success.
    pub async fn fetch(&self, credential: Option<&str>) -> Result<ToolManifest, FetchError> {
        let url = self.manifest_url();
        debug!(
            "Fetching manifest from {} ({})",
            url,
            if credential.is_some() { "authenticated" } else { "anonymous" }
        );

        let mut request = self.http.get(&url);
        if let Some(token) = credential {
            request = request.header(AUTHORIZATION, token);
        }

        let resp = request.send().await.map_err(FetchError::Transport)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await.map_err(FetchError::Transport)?;
        let manifest = ToolManifest::from_json(&body).map_err(FetchError::Decode)?;

        info!("Discovered {} tools", manifest.len());
        for tool in &manifest.tools {
            debug!(
                "  - {}: {} [tags: {}]",
                tool.name,
                tool.description,
                tool.tags.join(", ")
            );
        }
        let dupes = manifest.duplicate_names();
        if !dupes.is_empty() {
            warn!("Manifest repeats tool names (first wins): {}", dupes.join(", "));
        }

        Ok(manifest)
    }
}
