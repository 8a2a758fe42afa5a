use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::GithubConfig;
use crate::error::{AppError, Result};
use crate::http;
use crate::inbound::IncomingMessage;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize, Debug)]
pub struct DispatchRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: DispatchInputs,
}

#[derive(Serialize, Debug)]
pub struct DispatchInputs {
    pub message_json: String,
}

/// Triggers a `workflow_dispatch` run carrying one inbound message.
#[derive(Clone, Debug)]
pub struct GithubDispatcher {
    client: Client,
    config: GithubConfig,
}

impl GithubDispatcher {
    pub fn new(config: GithubConfig) -> Self {
        Self::with_client(http::client(), config)
    }

    pub fn with_client(client: Client, mut config: GithubConfig) -> Self {
        config.api_base = http::trim_base(&config.api_base);
        Self { client, config }
    }

    pub fn dispatch_url(&self) -> String {
        format!(
            "{}/repos/{}/actions/workflows/{}/dispatches",
            self.config.api_base, self.config.repo, self.config.workflow
        )
    }

    pub fn build_request(&self, message: &IncomingMessage) -> Result<DispatchRequest> {
        let message_json = serde_json::to_string(message)
            .map_err(|e| AppError::ForwardError(format!("Failed to encode message: {}", e)))?;

        Ok(DispatchRequest {
            git_ref: self.config.git_ref.clone(),
            inputs: DispatchInputs { message_json },
        })
    }

    pub async fn dispatch(&self, message: &IncomingMessage) -> Result<()> {
        let token = self
            .config
            .token
            .as_deref()
            .ok_or_else(|| AppError::ForwardError("GITHUB_TOKEN is not configured".to_string()))?;

        let body = self.build_request(message)?;
        let res = self
            .client
            .post(self.dispatch_url())
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ForwardError(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::ForwardError(format!("GitHub returned {}: {}", status, text)));
        }

        info!("Forwarded {} message from {}", message.msg_type, message.openid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GithubConfig {
        GithubConfig {
            api_base: "https://api.github.com/".into(),
            token: Some("ghp_test".into()),
            repo: "owner/repo".into(),
            workflow: "receive-msg.yml".into(),
            git_ref: "main".into(),
        }
    }

    #[test]
    fn url_targets_workflow_dispatch() {
        let dispatcher = GithubDispatcher::new(config());
        assert_eq!(
            dispatcher.dispatch_url(),
            "https://api.github.com/repos/owner/repo/actions/workflows/receive-msg.yml/dispatches"
        );
    }

    #[test]
    fn message_travels_as_json_string_input() {
        let dispatcher = GithubDispatcher::new(config());
        let message = IncomingMessage::parse("<xml><MsgType>text</MsgType><Content>hi</Content></xml>");
        let body = serde_json::to_value(dispatcher.build_request(&message).unwrap()).unwrap();

        assert_eq!(body["ref"], "main");
        let inner: serde_json::Value =
            serde_json::from_str(body["inputs"]["message_json"].as_str().unwrap()).unwrap();
        assert_eq!(inner["type"], "text");
        assert_eq!(inner["content"], "hi");
    }

    #[tokio::test]
    async fn missing_token_is_forward_error() {
        let mut cfg = config();
        cfg.token = None;
        let message = IncomingMessage::parse("<xml/>");
        let err = GithubDispatcher::new(cfg).dispatch(&message).await.unwrap_err();
        assert!(matches!(err, AppError::ForwardError(_)));
    }
}
