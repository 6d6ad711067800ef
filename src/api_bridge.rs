//! `ApiPort` implemented through the live page.
//!
//! The wizard's backend authenticates with browser session cookies, so
//! status checks issued from outside the browser would always look
//! anonymous. This bridge runs `fetch` inside the page instead, which
//! shares the session the login flow established.

use async_trait::async_trait;
use page_probe::PagePort;
use serde_json::{json, Value};
use status_detect::{decode_session, decode_status, ApiPort, DetectError, SessionReply, StatusReply};
use tracing::debug;

pub struct InPageApi<'a> {
    page: &'a dyn PagePort,
}

impl<'a> InPageApi<'a> {
    pub fn new(page: &'a dyn PagePort) -> Self {
        Self { page }
    }

    async fn fetch_json(&self, path: &str) -> Result<(u16, Value), DetectError> {
        debug!(path, "in-page api fetch");
        let script = fetch_script(path);
        let reply = self
            .page
            .evaluate(&script)
            .await
            .map_err(|err| DetectError::Network(err.to_string()))?;
        parse_fetch_reply(&reply)
    }
}

#[async_trait]
impl ApiPort for InPageApi<'_> {
    async fn fetch_session(&self) -> Result<SessionReply, DetectError> {
        let (status, body) = self.fetch_json("/api/auth/session").await?;
        Ok(decode_session(status, &body))
    }

    async fn fetch_status(&self) -> Result<StatusReply, DetectError> {
        let (status, body) = self.fetch_json("/api/onboarding/status").await?;
        decode_status(status, &body)
    }
}

fn fetch_script(path: &str) -> String {
    let path = serde_json::to_string(path).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(async () => {{\
           try {{\
             const res = await fetch({path}, {{ credentials: 'include' }});\
             let body = null;\
             try {{ body = await res.json(); }} catch (decodeErr) {{ body = null; }}\
             return {{ status: res.status, body }};\
           }} catch (err) {{\
             return {{ networkError: String(err) }};\
           }}\
         }})()"
    )
}

/// The script returns either `{status, body}` or `{networkError}`;
/// anything else means the page context itself is broken.
fn parse_fetch_reply(reply: &Value) -> Result<(u16, Value), DetectError> {
    if let Some(message) = reply.get("networkError").and_then(Value::as_str) {
        return Err(DetectError::Network(message.to_string()));
    }
    let status = reply
        .get("status")
        .and_then(Value::as_u64)
        .ok_or_else(|| DetectError::Decode(format!("unexpected fetch reply: {reply}")))?;
    let body = reply.get("body").cloned().unwrap_or(json!(null));
    Ok((status as u16, body))
}
