use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};
use crate::http;

/// Lifetime the platform documents for access tokens, used when a grant omits it.
const DEFAULT_TOKEN_TTL_SECS: i64 = 7200;

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// A freshly issued access token and its lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TemplateValue {
    pub value: String,
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self { value }
    }
}

/// Filled-in template message addressed to one subscriber.
#[derive(Serialize, Debug, Clone)]
pub struct TemplateMessage {
    pub touser: String,
    pub template_id: String,
    pub data: TemplateData,
}

#[derive(Serialize, Debug, Clone)]
pub struct TemplateData {
    pub date: TemplateValue,
    pub city: TemplateValue,
    pub weather: TemplateValue,
    pub temperature: TemplateValue,
    pub wind: TemplateValue,
    pub warning: TemplateValue,
    pub tip: TemplateValue,
}

#[derive(Deserialize, Debug)]
struct SendResponse {
    #[serde(default)]
    errcode: i64,
}

/// Client for the official-account REST API.
#[derive(Clone, Debug)]
pub struct WeChatClient {
    client: Client,
    base_url: String,
}

impl WeChatClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(http::client(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: http::trim_base(base_url),
        }
    }

    /// Requests a new access token. A response without a token is an
    /// [`AppError::AuthError`] carrying the provider's body verbatim.
    pub async fn fetch_access_token(&self, appid: &str, secret: &str) -> Result<TokenGrant> {
        let res = self
            .client
            .get(format!("{}/cgi-bin/token", self.base_url))
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", appid),
                ("secret", secret),
            ])
            .send()
            .await?;

        let body = res.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|_| AppError::AuthError(body.clone()))?;

        match parsed.access_token {
            Some(access_token) if !access_token.is_empty() => {
                let expires_in = parsed.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
                info!("Access token issued (expires in {}s)", expires_in);
                Ok(TokenGrant { access_token, expires_in })
            }
            _ => Err(AppError::AuthError(body)),
        }
    }

    pub async fn send_template_message(&self, token: &str, message: &TemplateMessage) -> Result<()> {
        let res = self
            .client
            .post(format!("{}/cgi-bin/message/template/send", self.base_url))
            .query(&[("access_token", token)])
            .json(message)
            .send()
            .await?;

        let body = res.text().await?;
        let parsed: SendResponse = serde_json::from_str(&body)
            .map_err(|_| AppError::SendError(body.clone()))?;

        if parsed.errcode != 0 {
            return Err(AppError::SendError(body));
        }

        info!("Template message delivered to {}", message.touser);
        Ok(())
    }

    /// URL from which the platform serves the media file, token attached.
    pub fn media_download_url(&self, token: &str, media_id: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/cgi-bin/media/get", self.base_url),
            &[("access_token", token), ("media_id", media_id)],
        )
        .map_err(|e| AppError::ConfigError(format!("Invalid WeChat API base: {}", e)))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_carries_token_and_id() {
        let client = WeChatClient::new("https://api.weixin.qq.com/");
        assert_eq!(
            client.media_download_url("tok", "abc_123").unwrap(),
            "https://api.weixin.qq.com/cgi-bin/media/get?access_token=tok&media_id=abc_123"
        );
    }

    #[test]
    fn media_url_escapes_reserved_characters() {
        let client = WeChatClient::new("https://api.weixin.qq.com");
        let url = client.media_download_url("a&b", "x/y").unwrap();
        assert!(url.ends_with("access_token=a%26b&media_id=x%2Fy"));
    }

    #[test]
    fn template_message_serializes_value_wrappers() {
        let message = TemplateMessage {
            touser: "o1".into(),
            template_id: "tpl".into(),
            data: TemplateData {
                date: "2026/10/18".to_string().into(),
                city: "北京".to_string().into(),
                weather: "晴".to_string().into(),
                temperature: "20°C".to_string().into(),
                wind: "北风3级".to_string().into(),
                warning: "暂无预警".to_string().into(),
                tip: "tip".to_string().into(),
            },
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["touser"], "o1");
        assert_eq!(json["data"]["city"]["value"], "北京");
        assert_eq!(json["data"]["temperature"]["value"], "20°C");
    }
}
