//! Tool invoker: turns a manifest entry plus arguments into an HTTP call.

use super::{InvokeError, ToolDescriptor, ToolManifest};
use reqwest::header::{HeaderName, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, warn};

/// Argument key the model uses to hand a credential back to a tool.
pub const AUTHORIZATION_ARG: &str = "authorization";

/// A credential bound to the header that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

/// Raw outcome of a tool call that reached the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Invocation {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body parsed as JSON, when it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Body for display: compact JSON when parseable, else raw text.
    pub fn display_body(&self) -> String {
        match self.json() {
            Some(value) => value.to_string(),
            None => self.body.clone(),
        }
    }
}

/// Resolve the auth header for a descriptor.
///
/// Only `location: header` is honored. An explicit credential wins; otherwise
/// a string `authorization` argument supplied by the caller is used.
pub fn resolve_auth(
    descriptor: &ToolDescriptor,
    inputs: &serde_json::Value,
    credential: Option<&str>,
) -> Option<AuthHeader> {
    let name = descriptor.tool_provider.auth_header()?;
    let value = credential
        .map(str::to_string)
        .or_else(|| inputs.get(AUTHORIZATION_ARG).and_then(|v| v.as_str()).map(str::to_string))?;
    Some(AuthHeader {
        name: name.to_string(),
        value,
    })
}

/// Executes tools described by a UTCP manifest.
#[derive(Debug, Clone, Default)]
pub struct ToolInvoker {
    http: reqwest::Client,
}

impl ToolInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Look up `name` in the manifest and call it.
    pub async fn invoke(
        &self,
        manifest: &ToolManifest,
        name: &str,
        inputs: &serde_json::Value,
        credential: Option<&str>,
    ) -> Result<Invocation, InvokeError> {
        let descriptor = manifest
            .find(name)
            .ok_or_else(|| InvokeError::NotFound(name.to_string()))?;
        let auth = resolve_auth(descriptor, inputs, credential);
        self.call(descriptor, inputs, auth.as_ref()).await
    }

    /// Call a descriptor directly with an explicit auth header choice.
    pub async fn call(
        &self,
        descriptor: &ToolDescriptor,
        inputs: &serde_json::Value,
        auth: Option<&AuthHeader>,
    ) -> Result<Invocation, InvokeError> {
        let request = self.build_request(descriptor, inputs, auth)?;

        let resp = request.send().await.map_err(|e| {
            warn!("Tool '{}' request failed: {}", descriptor.name, e);
            InvokeError::Transport(e)
        })?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(InvokeError::Transport)?;

        debug!("Tool '{}' returned {} ({} bytes)", descriptor.name, status, body.len());
        Ok(Invocation {
            status,
            content_type,
            body,
        })
    }

    fn build_request(
        &self,
        descriptor: &ToolDescriptor,
        inputs: &serde_json::Value,
        auth: Option<&AuthHeader>,
    ) -> Result<reqwest::RequestBuilder, InvokeError> {
        let provider = &descriptor.tool_provider;
        let method = Method::from_bytes(provider.http_method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| InvokeError::InvalidMethod(provider.http_method.clone()))?;

        debug!(
            "Invoking '{}': {} {}{}",
            descriptor.name,
            method,
            provider.url,
            if auth.is_some() { " (with credential)" } else { "" }
        );

        let mut request = self
            .http
            .request(method.clone(), &provider.url)
            .header(CONTENT_TYPE, provider.content_type());

        if let Some(auth) = auth {
            let header = HeaderName::from_bytes(auth.name.as_bytes())
                .map_err(|_| InvokeError::InvalidHeader(auth.name.clone()))?;
            request = request.header(header, auth.value.as_str());
        }

        if method != Method::GET {
            request = request.body(inputs.to_string());
        }

        Ok(request)
    }
}
