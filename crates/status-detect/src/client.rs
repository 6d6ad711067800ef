//! reqwest-backed implementation of `ApiPort`.

use async_trait::async_trait;
use pilot_core_types::{OnboardingStep, StepCompletionFlags};
use tracing::debug;
use url::Url;

use crate::errors::DetectError;
use crate::ports::{ApiPort, SessionReply, StatusReply};

pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn endpoint(&self, path: &str) -> Result<Url, DetectError> {
        self.base
            .join(path)
            .map_err(|err| DetectError::Network(err.to_string()))
    }

    async fn get_json(&self, path: &str) -> Result<(u16, serde_json::Value), DetectError> {
        let url = self.endpoint(path)?;
        debug!(%url, "api fetch");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| DetectError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| DetectError::Decode(err.to_string()))?;
        Ok((status, body))
    }
}

/// Maps a session response to a reply. Non-2xx means unauthenticated,
/// not an error.
pub fn decode_session(status: u16, body: &serde_json::Value) -> SessionReply {
    if !(200..300).contains(&status) {
        return SessionReply { user: None };
    }
    SessionReply {
        user: body.get("user").filter(|user| !user.is_null()).cloned(),
    }
}

/// Maps a status response to a reply. Shared by every transport that can
/// reach the endpoint.
pub fn decode_status(status: u16, body: &serde_json::Value) -> Result<StatusReply, DetectError> {
    if status == 401 {
        return Ok(StatusReply::AuthenticationRequired);
    }
    if !(200..300).contains(&status) {
        let message = body
            .get("error")
            .and_then(|err| err.as_str())
            .unwrap_or("onboarding status request failed")
            .to_string();
        return Err(DetectError::Http {
            status,
            body: message,
        });
    }

    let user = body.get("user").cloned().unwrap_or_default();
    let flag = |name: &str| {
        user.get(name)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    };
    Ok(StatusReply::Status {
        server_step: body
            .get("currentStep")
            .and_then(|step| step.as_u64())
            .and_then(|step| u8::try_from(step).ok())
            .and_then(OnboardingStep::from_index),
        is_complete: body
            .get("isComplete")
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false),
        flags: StepCompletionFlags {
            personal_info: flag("personal_info_completed"),
            signature: flag("signature_completed"),
            legal_consent: flag("legal_consent_completed"),
            verification: flag("verification_completed"),
        },
    })
}

#[async_trait]
impl ApiPort for HttpApi {
    async fn fetch_session(&self) -> Result<SessionReply, DetectError> {
        let (status, body) = self.get_json("/api/auth/session").await?;
        Ok(decode_session(status, &body))
    }

    async fn fetch_status(&self) -> Result<StatusReply, DetectError> {
        let (status, body) = self.get_json("/api/onboarding/status").await?;
        decode_status(status, &body)
    }
}
