pub mod api;
pub mod config;
pub mod error;
pub mod github;
pub mod http;
pub mod inbound;
pub mod push;
pub mod rules;
pub mod signature;
pub mod token;
pub mod weather;
pub mod wechat;

use std::sync::Arc;
use config::ServerConfig;
use github::GithubDispatcher;
use token::AccessTokenProvider;
use wechat::WeChatClient;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub wechat: WeChatClient,
    pub tokens: Arc<AccessTokenProvider>,
    pub dispatcher: GithubDispatcher,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let wechat = WeChatClient::new(&config.wechat_api_base);
        let tokens = AccessTokenProvider::new(wechat.clone(), config.credentials.clone());
        Self::with_parts(config, wechat, tokens)
    }

    pub fn with_parts(config: ServerConfig, wechat: WeChatClient, tokens: AccessTokenProvider) -> Self {
        let dispatcher = GithubDispatcher::new(config.github.clone());
        Self {
            config: Arc::new(config),
            wechat,
            tokens: Arc::new(tokens),
            dispatcher,
        }
    }
}
