//! Configuration schema for the probe (TOML file + environment overrides).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default Bedrock model, a cross-region Claude inference profile.
pub const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-5-sonnet-20241022-v2:0";

/// Tool expected to be visible without a credential.
pub const DEFAULT_PUBLIC_TOOL: &str = "get_unprotected_data";

/// Tool expected to require a credential.
pub const DEFAULT_PROTECTED_TOOL: &str = "get_protected_data";

/// Root configuration structure.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Base URL of the API serving the UTCP manifest.
    pub api_url: String,

    /// AWS region for Cognito and Bedrock.
    pub region: String,

    /// Cognito user pool identifier.
    pub pool_id: String,

    /// Cognito app client identifier.
    pub client_id: String,

    /// Username (email) for USER_PASSWORD_AUTH.
    pub email: String,

    /// Password for USER_PASSWORD_AUTH.
    pub password: String,

    /// Bedrock API key, sent as a bearer token. When empty, Converse calls
    /// are SigV4-signed with the AWS default credential chain.
    pub bedrock_api_key: String,

    /// Bedrock model or inference profile id.
    pub model_id: String,

    /// Override for the Cognito identity provider endpoint.
    pub cognito_endpoint: Option<String>,

    /// Override for the Bedrock runtime endpoint.
    pub bedrock_endpoint: Option<String>,

    /// Optional system prompt for Converse calls.
    pub system_prompt: Option<String>,

    /// Maximum tokens per model completion.
    pub max_tokens: u32,

    /// Tool round-trips allowed in one conversation.
    pub max_tool_rounds: u32,

    /// Per-request timeout for every HTTP client.
    pub request_timeout_secs: u64,

    /// Tool the probe expects to be publicly visible.
    pub public_tool: String,

    /// Tool the probe expects to require authentication.
    pub protected_tool: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            region: "us-east-1".into(),
            pool_id: String::new(),
            client_id: String::new(),
            email: String::new(),
            password: String::new(),
            bedrock_api_key: String::new(),
            model_id: DEFAULT_MODEL_ID.into(),
            cognito_endpoint: None,
            bedrock_endpoint: None,
            system_prompt: None,
            max_tokens: 1024,
            max_tool_rounds: 1,
            request_timeout_secs: 30,
            public_tool: DEFAULT_PUBLIC_TOOL.into(),
            protected_tool: DEFAULT_PROTECTED_TOOL.into(),
        }
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("api_url", &self.api_url)
            .field("region", &self.region)
            .field("pool_id", &self.pool_id)
            .field("client_id", &self.client_id)
            .field("email", &self.email)
            .field("password", &redact(&self.password))
            .field("bedrock_api_key", &redact(&self.bedrock_api_key))
            .field("model_id", &self.model_id)
            .field("cognito_endpoint", &self.cognito_endpoint)
            .field("bedrock_endpoint", &self.bedrock_endpoint)
            .field("system_prompt", &self.system_prompt)
            .field("max_tokens", &self.max_tokens)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("public_tool", &self.public_tool)
            .field("protected_tool", &self.protected_tool)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl ProbeConfig {
    /// Apply overrides from a variable lookup (normally the process environment).
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe a value from the config file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("API_URL") {
            self.api_url = v;
        }
        if let Some(v) = get("AWS_DEFAULT_REGION") {
            self.region = v;
        }
        if let Some(v) = get("POOL_ID") {
            self.pool_id = v;
        }
        if let Some(v) = get("CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = get("EMAIL") {
            self.email = v;
        }
        if let Some(v) = get("PASSWORD") {
            self.password = v;
        }
        if let Some(v) = get("AWS_BEARER_TOKEN_BEDROCK") {
            self.bedrock_api_key = v;
        }
        if let Some(v) = get("BEDROCK_MODEL_ID") {
            self.model_id = v;
        }
        if let Some(v) = get("COGNITO_ENDPOINT") {
            self.cognito_endpoint = Some(v);
        }
        if let Some(v) = get("BEDROCK_ENDPOINT") {
            self.bedrock_endpoint = Some(v);
        }
    }

    /// Resolved Cognito identity provider endpoint.
    pub fn cognito_url(&self) -> String {
        self.cognito_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", self.region))
    }

    /// Resolved Bedrock runtime endpoint.
    pub fn bedrock_url(&self) -> String {
        self.bedrock_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }

    /// Fail unless the manifest endpoint is configured.
    pub fn require_discovery(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("API_URL is not set");
        }
        Ok(())
    }

    /// Fail unless everything Cognito sign-in needs is configured.
    pub fn require_cognito(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("CLIENT_ID", &self.client_id),
            ("EMAIL", &self.email),
            ("PASSWORD", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            bail!("Missing Cognito settings: {}", missing.join(", "));
        }
        Ok(())
    }

    /// Fail unless a Bedrock model is named. Credentials are resolved when
    /// the client is built.
    pub fn require_bedrock(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            bail!("Bedrock model id is empty");
        }
        Ok(())
    }
}
