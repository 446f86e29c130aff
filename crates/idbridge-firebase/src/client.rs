// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Identity Toolkit v1 REST API.

use std::sync::Arc;
use std::time::Duration;

use idbridge_config::model::FirebaseConfig;
use idbridge_core::IdentityError;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credentials::AccessTokenSource;
use crate::errors::ApiFailure;
use crate::types::ApiErrorResponse;

/// Sends admin requests scoped to one project.
#[derive(Clone)]
pub struct FirebaseClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: Option<SecretString>,
    tokens: Arc<dyn AccessTokenSource>,
}

impl FirebaseClient {
    pub fn new(
        config: &FirebaseConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, IdentityError> {
        let project_id = match config.project_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => {
                return Err(IdentityError::Init(
                    "firebase.project_id is required to connect".to_string(),
                ));
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IdentityError::Init(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            project_id,
            api_key: config.api_key.clone().map(SecretString::from),
            tokens,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub(crate) fn tokens(&self) -> &dyn AccessTokenSource {
        self.tokens.as_ref()
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1/projects/{}/{action}", self.base_url, self.project_id)
    }

    /// POSTs `body` to `action` (e.g. `accounts:lookup`) and decodes the reply.
    pub(crate) async fn post<Req, Resp>(&self, action: &str, body: &Req) -> Result<Resp, ApiFailure>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let access_token = self
            .tokens
            .access_token()
            .await
            .map_err(ApiFailure::Credentials)?;

        let mut request = self.http.post(self.endpoint(action));
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.expose_secret())]);
        }
        let response = request
            .bearer_auth(access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        debug!(action, status = %status, "provider response received");

        let text = response
            .text()
            .await
            .map_err(|e| ApiFailure::Transport(format!("failed to read response body: {e}")))?;

        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| ApiFailure::Decode(format!("failed to parse `{action}` response: {e}")));
        }
        Err(failure_from_body(status, &text))
    }
}

fn failure_from_body(status: StatusCode, body: &str) -> ApiFailure {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(envelope) => ApiFailure::from_message(status.as_u16(), &envelope.error.message),
        Err(_) => ApiFailure::Provider {
            status: status.as_u16(),
            reason: status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_owned(),
            detail: None,
        },
    }
}

impl std::fmt::Debug for FirebaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}
