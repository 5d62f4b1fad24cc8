//! Model inference via the Bedrock Converse API.
//!
//! Supports tool use in the Converse wire format: tools are offered as
//! `toolSpec` entries and the model answers with `toolUse` content blocks.
//!
//! Requests carry either a Bedrock API key as a bearer token or a SigV4
//! signature over credentials from the standard AWS provider chain
//! (environment, profile, SSO, instance role).

use crate::config::ProbeConfig;
use crate::tools::ToolDefinition;
use crate::types::*;
use anyhow::{anyhow, bail, Context, Result};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningParams, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::{debug, info};

/// Service name Bedrock runtime requests are signed for.
const SIGNING_NAME: &str = "bedrock";

/// How Converse requests are authenticated.
#[derive(Clone)]
pub enum BedrockAuth {
    /// Bedrock API key, sent as `Authorization: Bearer <key>`.
    ApiKey(String),
    /// SigV4 signing with credentials resolved per request.
    SigV4 {
        region: String,
        credentials: SharedCredentialsProvider,
    },
}

impl std::fmt::Debug for BedrockAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::SigV4 { region, .. } => f.debug_struct("SigV4").field("region", region).finish(),
        }
    }
}

/// Client for the Bedrock runtime Converse endpoint.
#[derive(Clone)]
pub struct ConverseClient {
    base_url: String,
    auth: BedrockAuth,
    http: reqwest::Client,
}

impl std::fmt::Debug for ConverseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverseClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

// -- Converse request/response types ------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    messages: Vec<MessagePayload<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfigPayload<'a>>,
    inference_config: InferenceConfigPayload,
}

#[derive(Debug, Serialize)]
struct SystemBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: &'static str,
    content: Vec<ContentPayload<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum ContentPayload<'a> {
    Text(&'a str),
    ToolUse(ToolUsePayload),
    ToolResult(ToolResultPayload<'a>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolUsePayload {
    tool_use_id: String,
    name: String,
    input: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultPayload<'a> {
    tool_use_id: &'a str,
    content: Vec<ToolResultText<'a>>,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ToolResultText<'a> {
    text: &'a str,
}

/// `toolConfig` document offered to the model.
#[derive(Debug, Serialize)]
pub struct ToolConfigPayload<'a> {
    tools: Vec<ToolPayload<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolPayload<'a> {
    tool_spec: ToolSpecPayload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSpecPayload<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: InputSchemaPayload<'a>,
}

#[derive(Debug, Serialize)]
struct InputSchemaPayload<'a> {
    json: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfigPayload {
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: OutputPayload,
    stop_reason: Option<String>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct OutputPayload {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

/// Response content block; kinds other than text and tool use are skipped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBlock {
    text: Option<String>,
    tool_use: Option<ToolUsePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsagePayload {
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u32,
}

/// Pricing per 1M tokens (input, output) in USD.
const MODEL_PRICING: &[(&str, f64, f64)] = &[
    ("claude-3-5-sonnet", 3.00, 15.00),
    ("claude-3-7-sonnet", 3.00, 15.00),
    ("claude-sonnet-4", 3.00, 15.00),
    ("claude-3-5-haiku", 0.80, 4.00),
    ("claude-3-haiku", 0.25, 1.25),
    ("claude-opus-4", 15.00, 75.00),
];

/// Render tool definitions as a Converse `toolConfig`.
pub fn tool_config(tools: &[ToolDefinition]) -> ToolConfigPayload<'_> {
    ToolConfigPayload {
        tools: tools
            .iter()
            .map(|t| ToolPayload {
                tool_spec: ToolSpecPayload {
                    name: &t.name,
                    description: &t.description,
                    input_schema: InputSchemaPayload { json: &t.parameters },
                },
            })
            .collect(),
    }
}

fn message_payload(message: &ChatMessage) -> MessagePayload<'_> {
    let content = message
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text(text) => ContentPayload::Text(text),
            ContentBlock::ToolUse(call) => ContentPayload::ToolUse(ToolUsePayload {
                tool_use_id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            }),
            ContentBlock::ToolResult(result) => ContentPayload::ToolResult(ToolResultPayload {
                tool_use_id: &result.tool_call_id,
                content: vec![ToolResultText {
                    text: &result.output,
                }],
                status: if result.success { "success" } else { "error" },
            }),
        })
        .collect();

    MessagePayload {
        role: message.role.as_str(),
        content,
    }
}

impl ConverseClient {
    /// Create a Converse client authenticating with a Bedrock API key.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_auth(
            base_url,
            BedrockAuth::ApiKey(api_key.to_string()),
            reqwest::Client::new(),
        )
    }

    pub fn with_auth(base_url: &str, auth: BedrockAuth, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http,
        }
    }

    /// Build from the probe config, sharing its HTTP client.
    ///
    /// A configured API key wins. Otherwise credentials come from the AWS
    /// default provider chain and every request is SigV4-signed.
    pub async fn from_config(config: &ProbeConfig, http: reqwest::Client) -> Result<Self> {
        let auth = if !config.bedrock_api_key.trim().is_empty() {
            info!("Bedrock auth: API key");
            BedrockAuth::ApiKey(config.bedrock_api_key.clone())
        } else {
            let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.region.clone()))
                .load()
                .await;
            let credentials = sdk_config.credentials_provider().ok_or_else(|| {
                anyhow!("No AWS credentials provider found; set AWS_BEARER_TOKEN_BEDROCK or configure AWS credentials")
            })?;
            info!("Bedrock auth: SigV4 ({})", config.region);
            BedrockAuth::SigV4 {
                region: config.region.clone(),
                credentials,
            }
        };
        Ok(Self::with_auth(&config.bedrock_url(), auth, http))
    }

    /// SigV4 headers for a JSON POST of `body` to `url`.
    async fn sigv4_headers(
        region: &str,
        credentials: &SharedCredentialsProvider,
        url: &reqwest::Url,
        body: &[u8],
    ) -> Result<Vec<(String, String)>> {
        let credentials = credentials
            .provide_credentials()
            .await
            .context("Failed to load AWS credentials")?;
        let identity: Identity = credentials.into();

        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(region)
            .name(SIGNING_NAME)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .context("Invalid SigV4 signing parameters")?
            .into();

        let signable = SignableRequest::new(
            "POST",
            url.as_str(),
            [("content-type", "application/json")].into_iter(),
            SignableBody::Bytes(body),
        )
        .context("Request cannot be signed")?;

        let (instructions, _signature) = sign(signable, &params)
            .context("SigV4 signing failed")?
            .into_parts();
        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }

    /// `{base}/model/{model_id}/converse`, with the model id path-encoded.
    fn converse_url(&self, model_id: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid Bedrock endpoint: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Bedrock endpoint cannot be a base URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(["model", model_id, "converse"]);
        Ok(url)
    }

    /// Run one Converse call with tool support.
    pub async fn converse(
        &self,
        model_id: &str,
        system: Option<&str>,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        max_tokens: u32,
    ) -> Result<InferenceResponse> {
        let url = self.converse_url(model_id)?;

        let request = ConverseRequest {
            messages: messages.iter().map(message_payload).collect(),
            system: system.map(|text| vec![SystemBlock { text }]).unwrap_or_default(),
            tool_config: if tools.is_empty() {
                None
            } else {
                Some(tool_config(tools))
            },
            inference_config: InferenceConfigPayload {
                max_tokens,
                temperature: 0.0,
            },
        };

        debug!(
            "Converse request to model {} ({} messages, {} tools)",
            model_id,
            messages.len(),
            tools.len()
        );

        let body = serde_json::to_vec(&request).context("Failed to encode Converse request")?;

        let mut builder = self
            .http
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        match &self.auth {
            BedrockAuth::ApiKey(key) => builder = builder.bearer_auth(key),
            BedrockAuth::SigV4 {
                region,
                credentials,
            } => {
                for (name, value) in Self::sigv4_headers(region, credentials, &url, &body).await? {
                    builder = builder.header(name, value);
                }
            }
        }

        let resp = builder
            .body(body)
            .send()
            .await
            .context("Converse request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Converse failed ({}): {}", status, body);
        }

        let body: ConverseResponse = resp
            .json()
            .await
            .context("Failed to parse Converse response")?;

        let blocks = body.output.message.map(|m| m.content).unwrap_or_default();

        let mut content = Vec::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            if let Some(text) = block.text {
                content.push(ContentBlock::Text(text));
            }
            if let Some(tool_use) = block.tool_use {
                let call = ToolCall {
                    id: tool_use.tool_use_id,
                    name: tool_use.name,
                    arguments: tool_use.input,
                };
                tool_calls.push(call.clone());
                content.push(ContentBlock::ToolUse(call));
            }
        }

        let message = ChatMessage {
            role: ChatRole::Assistant,
            content,
        };

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(InferenceResponse {
            content: message.text(),
            tool_calls,
            usage,
            stop_reason: body.stop_reason,
            message,
        })
    }

    /// Estimate the USD cost of a token usage for a given model.
    pub fn estimate_cost(model: &str, usage: &TokenUsage) -> f64 {
        let (prompt_rate, completion_rate) = MODEL_PRICING
            .iter()
            .find(|(name, _, _)| model.contains(name))
            .map(|(_, p, c)| (*p, *c))
            .unwrap_or((3.00, 15.00)); // Default to Sonnet pricing

        let prompt_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * prompt_rate;
        let completion_cost = (usage.completion_tokens as f64 / 1_000_000.0) * completion_rate;
        prompt_cost + completion_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_config_uses_tool_spec_shape() {
        let tools = vec![ToolDefinition {
            name: "get_unprotected_data".into(),
            description: "d".into(),
            parameters: json!({"type": "object"}),
        }];
        let value = serde_json::to_value(tool_config(&tools)).unwrap();
        assert_eq!(
            value,
            json!({"tools": [{"toolSpec": {
                "name": "get_unprotected_data",
                "description": "d",
                "inputSchema": {"json": {"type": "object"}}
            }}]})
        );
    }

    #[test]
    fn tool_results_serialize_as_tool_result_blocks() {
        let msg = ChatMessage::tool_results(vec![ToolResult {
            tool_call_id: "tooluse_1".into(),
            output: "Tool nope not found".into(),
            success: false,
        }]);
        let value = serde_json::to_value(message_payload(&msg)).unwrap();
        assert_eq!(
            value,
            json!({"role": "user", "content": [{"toolResult": {
                "toolUseId": "tooluse_1",
                "content": [{"text": "Tool nope not found"}],
                "status": "error"
            }}]})
        );
    }

    #[test]
    fn assistant_tool_use_round_trips_into_request() {
        let msg = ChatMessage {
            role: ChatRole::Assistant,
            content: vec![
                ContentBlock::Text("Calling it.".into()),
                ContentBlock::ToolUse(ToolCall {
                    id: "tooluse_1".into(),
                    name: "get_protected_data".into(),
                    arguments: json!({"authorization": "tok"}),
                }),
            ],
        };
        let value = serde_json::to_value(message_payload(&msg)).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"][0], json!({"text": "Calling it."}));
        assert_eq!(value["content"][1]["toolUse"]["toolUseId"], "tooluse_1");
        assert_eq!(value["content"][1]["toolUse"]["input"]["authorization"], "tok");
    }

    #[test]
    fn converse_url_encodes_model_id() {
        let client = ConverseClient::new("https://bedrock-runtime.us-east-1.amazonaws.com/", "k");
        let url = client
            .converse_url("arn:aws:bedrock:us-east-1:123:inference-profile/us.anthropic.x")
            .unwrap();
        assert!(url.path().starts_with("/model/arn:aws:bedrock"));
        assert!(url.path().contains("inference-profile%2Fus.anthropic.x"));
        assert!(url.path().ends_with("/converse"));
    }

    #[tokio::test]
    async fn configured_api_key_selects_bearer_auth() {
        let config = ProbeConfig {
            bedrock_api_key: "bedrock-key".into(),
            bedrock_endpoint: Some("http://127.0.0.1:9000/".into()),
            ..ProbeConfig::default()
        };
        let client = ConverseClient::from_config(&config, reqwest::Client::new())
            .await
            .unwrap();
        assert!(matches!(client.auth, BedrockAuth::ApiKey(ref k) if k == "bedrock-key"));
        assert_eq!(client.base_url, "http://127.0.0.1:9000");
        assert!(!format!("{:?}", client).contains("bedrock-key"));
    }

    #[test]
    fn cost_uses_model_rates() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
            total_tokens: 2_000_000,
        };
        let cost = ConverseClient::estimate_cost(
            "us.anthropic.claude-3-5-haiku-20241022-v1:0",
            &usage,
        );
        assert!((cost - 4.80).abs() < 1e-9);
    }
}
