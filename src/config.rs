use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use crate::error::{AppError, Result};

pub const DEFAULT_WECHAT_API_BASE: &str = "https://api.weixin.qq.com";
pub const DEFAULT_WEATHER_API_BASE: &str = "https://devapi.qweather.com";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Shared secret configured in the official-account backend.
pub const DEFAULT_WECHAT_TOKEN: &str = "weixin123";

/// Official-account credentials used to obtain access tokens.
#[derive(Clone, Debug, Default)]
pub struct WeChatCredentials {
    pub appid: Option<String>,
    pub secret: Option<String>,
}

/// Where inbound messages are forwarded.
#[derive(Clone, Debug)]
pub struct GithubConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub repo: String,
    pub workflow: String,
    pub git_ref: String,
}

/// Configuration of the webhook server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub wechat_token: String,
    pub wechat_api_base: String,
    pub credentials: WeChatCredentials,
    pub github: GithubConfig,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let host = env_or("HOST", "0.0.0.0");
        let port = env_or("PORT", "10000");
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        Ok(ServerConfig {
            server_addr: SocketAddr::new(ip, port),
            wechat_token: env_or("WECHAT_TOKEN", DEFAULT_WECHAT_TOKEN),
            wechat_api_base: env_or("WECHAT_API_BASE", DEFAULT_WECHAT_API_BASE),
            credentials: WeChatCredentials {
                appid: env_opt("APPID"),
                secret: env_opt("APPSECRET"),
            },
            github: GithubConfig {
                api_base: env_or("GITHUB_API_BASE", DEFAULT_GITHUB_API_BASE),
                token: env_opt("GITHUB_TOKEN"),
                repo: env_or("GITHUB_REPO", "GuHu1/wechat-weather-bot"),
                workflow: env_or("GITHUB_WORKFLOW", "receive-msg.yml"),
                git_ref: env_or("GITHUB_REF", "main"),
            },
        })
    }
}

/// One subscriber and the city whose weather they receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserConfig {
    pub openid: String,
    pub city_id: String,
    pub city_name: String,
}

/// Configuration of a single weather push run.
///
/// `user_config` keeps the raw `USER_CONFIG` string; it is parsed when the run
/// starts so a malformed entry aborts before anything is sent.
#[derive(Clone, Debug)]
pub struct PushConfig {
    pub credentials: WeChatCredentials,
    pub weather_api_key: String,
    pub template_id: String,
    pub user_config: String,
    pub wechat_api_base: String,
    pub weather_api_base: String,
}

impl PushConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            lookup(name).ok_or_else(|| AppError::ConfigError(format!("{} is not set", name)))
        };

        Ok(PushConfig {
            credentials: WeChatCredentials {
                appid: Some(required("APPID")?),
                secret: Some(required("APPSECRET")?),
            },
            weather_api_key: required("WEATHER_API_KEY")?,
            template_id: required("TEMPLATE_ID")?,
            user_config: required("USER_CONFIG")?,
            wechat_api_base: lookup("WECHAT_API_BASE").unwrap_or_else(|| DEFAULT_WECHAT_API_BASE.to_string()),
            weather_api_base: lookup("WEATHER_API_BASE").unwrap_or_else(|| DEFAULT_WEATHER_API_BASE.to_string()),
        })
    }

    pub fn users(&self) -> Result<Vec<UserConfig>> {
        parse_user_configs(&self.user_config)
    }
}

/// Parses `openid:cityId:cityName[,openid:cityId:cityName...]`.
///
/// A single malformed entry rejects the whole string.
pub fn parse_user_configs(raw: &str) -> Result<Vec<UserConfig>> {
    raw.split(',')
        .map(|entry| {
            let mut fields = entry.split(':').map(str::trim);
            let openid = fields.next().unwrap_or_default();
            let city_id = fields.next().unwrap_or_default();
            let city_name = fields.next().unwrap_or_default();

            if openid.is_empty() || city_id.is_empty() || city_name.is_empty() {
                return Err(AppError::ConfigError(format!("Malformed USER_CONFIG entry: {}", entry)));
            }

            Ok(UserConfig {
                openid: openid.to_string(),
                city_id: city_id.to_string(),
                city_name: city_name.to_string(),
            })
        })
        .collect()
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}
