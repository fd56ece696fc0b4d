//! OpenAI Realtime session client
//!
//! Mints an ephemeral client secret via `POST /v1/realtime/sessions`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::realtime::{
    RealtimeError, RealtimeSession, RealtimeSessionProvider, RealtimeSessionRequest,
};

pub const DEFAULT_REALTIME_ENDPOINT: &str = "https://api.openai.com/v1/realtime/sessions";
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct OpenAiRealtimeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl fmt::Debug for OpenAiRealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiRealtimeClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiRealtimeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RealtimeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RealtimeError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            endpoint: DEFAULT_REALTIME_ENDPOINT.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct SessionBody<'a> {
    model: &'a str,
    voice: &'a str,
    instructions: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    client_secret: ClientSecret,
}

#[derive(Deserialize)]
struct ClientSecret {
    value: String,
}

impl RealtimeSessionProvider for OpenAiRealtimeClient {
    async fn create_session(
        &self,
        request: &RealtimeSessionRequest,
    ) -> Result<RealtimeSession, RealtimeError> {
        let body = SessionBody {
            model: &self.model,
            voice: &request.voice,
            instructions: &request.instructions,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RealtimeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealtimeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| RealtimeError::Malformed(e.to_string()))?;

        tracing::debug!(model = %self.model, voice = %request.voice, "Realtime session created");

        Ok(RealtimeSession {
            client_secret: session.client_secret.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_api_key() {
        let client = OpenAiRealtimeClient::new("sk-live-secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-live-secret"));
        assert!(debug.contains(DEFAULT_REALTIME_MODEL));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"id":"sess_1","client_secret":{"value":"ek_abc","expires_at":1}}"#;
        let parsed: SessionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.client_secret.value, "ek_abc");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = OpenAiRealtimeClient::new("key")
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/v1/realtime/sessions");
        let err = client
            .create_session(&RealtimeSessionRequest {
                voice: "shimmer".into(),
                instructions: "hi".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RealtimeError::Transport(_)));
    }
}
