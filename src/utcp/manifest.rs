//! Typed UTCP tool manifest.
//!
//! The manifest service answers `GET /utcp` with `{"tools": [...]}`. Each
//! entry names a tool, its JSON-schema inputs, and a `tool_provider` block
//! describing the HTTP call that runs it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Content type used when a provider does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A tool manifest as served by the discovery endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// One invocable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema for the invocation arguments, kept verbatim.
    pub inputs: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
    pub tool_provider: ToolProvider,
}

/// How to call a tool over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProvider {
    pub url: String,
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProviderAuth>,
}

/// Where and under which name a credential is injected.
///
/// Auth kinds without a placement (`basic`, `oauth2`) leave `location` unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<AuthLocation>,
    #[serde(default = "default_var_name")]
    pub var_name: String,
}

fn default_var_name() -> String {
    "Authorization".into()
}

/// Credential placement declared by a provider. Matching is exact; any
/// other spelling is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthLocation {
    Header,
    Query,
    Body,
    Other(String),
}

impl From<String> for AuthLocation {
    fn from(value: String) -> Self {
        match value.as_str() {
            "header" => Self::Header,
            "query" => Self::Query,
            "body" => Self::Body,
            _ => Self::Other(value),
        }
    }
}

impl From<AuthLocation> for String {
    fn from(value: AuthLocation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AuthLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Query => write!(f, "query"),
            Self::Body => write!(f, "body"),
            Self::Other(other) => write!(f, "{}", other),
        }
    }
}

impl ToolProvider {
    /// Declared content type, or `application/json`.
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Header that should carry the credential, if the provider asks for one.
    pub fn auth_header(&self) -> Option<&str> {
        match &self.auth {
            Some(ProviderAuth {
                location: Some(AuthLocation::Header),
                var_name,
            }) => Some(var_name.as_str()),
            _ => None,
        }
    }

    /// Whether the provider declares any credential requirement.
    pub fn requires_auth(&self) -> bool {
        self.auth.is_some()
    }
}

impl ToolManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// First descriptor whose name matches exactly.
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Tool names in manifest order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Names that occur more than once, each reported once.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dupes: Vec<&str> = Vec::new();
        for tool in &self.tools {
            if !seen.insert(tool.name.as_str()) && !dupes.contains(&tool.name.as_str()) {
                dupes.push(tool.name.as_str());
            }
        }
        dupes
    }

    /// Whether every tool named here is also named in `other`.
    pub fn is_subset_of(&self, other: &ToolManifest) -> bool {
        let theirs: HashSet<&str> = other.names().into_iter().collect();
        self.tools.iter().all(|t| theirs.contains(t.name.as_str()))
    }

    /// Tools present here whose names are absent from `other`.
    pub fn tools_not_in<'a>(&'a self, other: &ToolManifest) -> Vec<&'a ToolDescriptor> {
        let theirs: HashSet<&str> = other.names().into_iter().collect();
        self.tools
            .iter()
            .filter(|t| !theirs.contains(t.name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> ToolManifest {
        serde_json::from_value(value).unwrap()
    }

    fn tool(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "description": format!("{} tool", name),
            "inputs": {"type": "object"},
            "tags": ["demo"],
            "tool_provider": {"url": format!("http://x/{}", name), "http_method": "GET"}
        })
    }

    #[test]
    fn parses_full_descriptor() {
        let m = manifest(json!({
            "version": "1.0",
            "tools": [{
                "name": "get_protected_data",
                "description": "Protected",
                "inputs": {"type": "object", "properties": {"authorization": {"type": "string"}}},
                "tags": ["protected", "auth"],
                "tool_provider": {
                    "provider_type": "http",
                    "url": "https://api.example/protected",
                    "http_method": "GET",
                    "content_type": "application/json",
                    "auth": {"auth_type": "api_key", "location": "header", "var_name": "Authorization"}
                }
            }]
        }));

        let t = &m.tools[0];
        assert_eq!(t.tags, vec!["protected", "auth"]);
        assert_eq!(t.tool_provider.auth_header(), Some("Authorization"));
        assert!(t.tool_provider.requires_auth());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let m = manifest(json!({
            "tools": [{
                "name": "ping",
                "description": "d",
                "inputs": {},
                "tool_provider": {"url": "http://x/ping", "http_method": "POST", "auth": null}
            }]
        }));

        let provider = &m.tools[0].tool_provider;
        assert_eq!(provider.content_type(), DEFAULT_CONTENT_TYPE);
        assert!(provider.auth.is_none());
        assert!(m.tools[0].tags.is_empty());
    }

    #[test]
    fn auth_without_location_still_decodes() {
        let mut oauth = tool("oauth_tool");
        oauth["tool_provider"]["auth"] = json!({
            "auth_type": "oauth2",
            "token_url": "https://auth.example/token",
            "client_id": "c",
            "client_secret": "s"
        });
        let m = manifest(json!({"tools": [tool("public"), oauth]}));

        assert_eq!(m.names(), vec!["public", "oauth_tool"]);
        let provider = &m.find("oauth_tool").unwrap().tool_provider;
        assert!(provider.requires_auth());
        assert_eq!(provider.auth.as_ref().unwrap().location, None);
        assert_eq!(provider.auth_header(), None);
    }

    #[test]
    fn missing_tools_key_is_empty_manifest() {
        let m = ToolManifest::from_json("{}").unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn descriptor_without_name_is_rejected() {
        let result = serde_json::from_value::<ToolManifest>(json!({
            "tools": [{"description": "d", "inputs": {}, "tool_provider": {"url": "u", "http_method": "GET"}}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn non_header_auth_has_no_header() {
        let m = manifest(json!({
            "tools": [{
                "name": "q",
                "description": "d",
                "inputs": {},
                "tool_provider": {
                    "url": "http://x/q",
                    "http_method": "GET",
                    "auth": {"location": "query", "var_name": "api_key"}
                }
            }]
        }));
        let provider = &m.tools[0].tool_provider;
        assert_eq!(
            provider.auth.as_ref().unwrap().location,
            Some(AuthLocation::Query)
        );
        assert_eq!(provider.auth_header(), None);
    }

    #[test]
    fn find_returns_first_match() {
        let mut first = tool("dup");
        first["description"] = json!("first");
        let m = manifest(json!({"tools": [first, tool("dup"), tool("other")]}));

        assert_eq!(m.find("dup").unwrap().description, "first");
        assert!(m.find("missing").is_none());
        assert_eq!(m.duplicate_names(), vec!["dup"]);
    }

    #[test]
    fn subset_relation_by_name() {
        let public = manifest(json!({"tools": [tool("a")]}));
        let full = manifest(json!({"tools": [tool("a"), tool("b")]}));

        assert!(public.is_subset_of(&full));
        assert!(!full.is_subset_of(&public));
        let hidden: Vec<&str> = full
            .tools_not_in(&public)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(hidden, vec!["b"]);
    }

    #[test]
    fn unknown_auth_location_round_trips_verbatim() {
        let loc = AuthLocation::from("cookie".to_string());
        assert_eq!(loc, AuthLocation::Other("cookie".into()));
        assert_eq!(String::from(loc), "cookie");
    }

    #[test]
    fn location_match_is_case_sensitive() {
        let loc = AuthLocation::from("HEADER".to_string());
        assert_eq!(loc, AuthLocation::Other("HEADER".into()));
        assert_eq!(String::from(loc), "HEADER");

        let mut shouting = tool("shout");
        shouting["tool_provider"]["auth"] = json!({"location": "HEADER", "var_name": "X-Key"});
        let m = manifest(json!({"tools": [shouting]}));
        assert_eq!(m.tools[0].tool_provider.auth_header(), None);
    }
}
