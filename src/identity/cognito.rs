//! Cognito user-pool sign-in via `InitiateAuth` (USER_PASSWORD_AUTH).
//!
//! Talks to the public JSON API directly; app clients without a secret need
//! no request signing for this call.

use super::AuthError;
use crate::config::ProbeConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Cognito sign-in client.
#[derive(Clone)]
pub struct CognitoAuth {
    endpoint: String,
    client_id: String,
    pool_id: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl fmt::Debug for CognitoAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CognitoAuth")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("pool_id", &self.pool_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'a str,
    client_id: &'a str,
    auth_parameters: HashMap<&'a str, &'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// Tokens issued by a successful sign-in.
#[derive(Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl CognitoAuth {
    /// Create a client for an explicit endpoint.
    pub fn new(endpoint: &str, client_id: &str, username: &str, password: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
            pool_id: String::new(),
            username: username.to_string(),
            password: password.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Build from the probe config, sharing its HTTP client.
    pub fn from_config(config: &ProbeConfig, http: reqwest::Client) -> Self {
        Self {
            endpoint: config.cognito_url(),
            client_id: config.client_id.clone(),
            pool_id: config.pool_id.clone(),
            username: config.email.clone(),
            password: config.password.clone(),
            http,
        }
    }

    /// Settings that are blank, named after their environment variables.
    fn missing_settings(&self) -> Vec<&'static str> {
        [
            ("CLIENT_ID", &self.client_id),
            ("EMAIL", &self.username),
            ("PASSWORD", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Exchange username and password for tokens.
    pub async fn initiate_auth(&self) -> Result<AuthTokens, AuthError> {
        let missing = self.missing_settings();
        if !missing.is_empty() {
            return Err(AuthError::NotConfigured(missing.join(", ")));
        }

        debug!(
            "Cognito InitiateAuth for {} (client {}, pool {})",
            self.username, self.client_id, self.pool_id
        );

        let mut params = HashMap::new();
        params.insert("USERNAME", self.username.as_str());
        params.insert("PASSWORD", self.password.as_str());

        let body = InitiateAuthRequest {
            auth_flow: "USER_PASSWORD_AUTH",
            client_id: &self.client_id,
            auth_parameters: params,
        };
        let payload =
            serde_json::to_vec(&body).map_err(|e| AuthError::Decode(e.to_string()))?;

        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .body(payload)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(AuthError::Transport)?;

        if !status.is_success() {
            let err: ErrorResponse = serde_json::from_str(&text).unwrap_or(ErrorResponse {
                kind: String::new(),
                message: text.clone(),
            });
            let kind = err
                .kind
                .rsplit('#')
                .next()
                .filter(|k| !k.is_empty())
                .unwrap_or("HTTP error")
                .to_string();
            return Err(AuthError::Rejected {
                kind: format!("{} ({})", kind, status.as_u16()),
                message: err.message,
            });
        }

        let parsed: InitiateAuthResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Decode(e.to_string()))?;

        match (parsed.authentication_result, parsed.challenge_name) {
            (Some(result), _) => {
                info!("Cognito sign-in succeeded for {}", self.username);
                Ok(AuthTokens {
                    access_token: result.access_token,
                    id_token: result.id_token,
                    refresh_token: result.refresh_token,
                    token_type: result.token_type,
                    expires_at: result
                        .expires_in
                        .map(|secs| Utc::now() + Duration::seconds(secs)),
                })
            }
            (None, Some(challenge)) => Err(AuthError::Challenge(challenge)),
            (None, None) => Err(AuthError::Decode(
                "response has neither AuthenticationResult nor ChallengeName".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_aws_field_names() {
        let mut params = HashMap::new();
        params.insert("USERNAME", "fake@example.com");
        let body = InitiateAuthRequest {
            auth_flow: "USER_PASSWORD_AUTH",
            client_id: "client",
            auth_parameters: params,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["AuthFlow"], "USER_PASSWORD_AUTH");
        assert_eq!(json["ClientId"], "client");
        assert_eq!(json["AuthParameters"]["USERNAME"], "fake@example.com");
    }

    #[test]
    fn tokens_debug_hides_secrets() {
        let tokens = AuthTokens {
            access_token: "secret-access".into(),
            id_token: Some("secret-id".into()),
            refresh_token: None,
            token_type: Some("Bearer".into()),
            expires_at: None,
        };
        let rendered = format!("{:?}", tokens);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-id"));
    }

    #[tokio::test]
    async fn missing_settings_fail_before_any_request() {
        let auth = CognitoAuth::new("http://127.0.0.1:9", "client", "", "");
        match auth.initiate_auth().await {
            Err(AuthError::NotConfigured(missing)) => assert_eq!(missing, "EMAIL, PASSWORD"),
            other => panic!("expected NotConfigured, got {other:?}"),
        }
    }
}
