//! Access-token refresh behaviour against a mock token endpoint.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use wechat_weather_bot::config::WeChatCredentials;
use wechat_weather_bot::error::AppError;
use wechat_weather_bot::token::{AccessTokenProvider, Clock};
use wechat_weather_bot::wechat::WeChatClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FakeClock(Mutex<DateTime<Utc>>);

impl FakeClock {
    fn starting_at(at: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(at)))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn credentials() -> WeChatCredentials {
    WeChatCredentials {
        appid: Some("wx_app".into()),
        secret: Some("wx_secret".into()),
    }
}

async fn mount_token(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("grant_type", "client_credential"))
        .and(query_param("appid", "wx_app"))
        .and(query_param("secret", "wx_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token,
            "expires_in": 7200
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_second_call_within_window_uses_cache() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1", 1).await;

    let clock = FakeClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap());
    let provider = AccessTokenProvider::with_clock(WeChatClient::new(&server.uri()), credentials(), clock.clone());

    assert_eq!(provider.get_access_token().await.unwrap(), "tok-1");
    clock.advance(Duration::seconds(6899));
    assert_eq!(provider.get_access_token().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn test_call_after_expiry_refreshes() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-2", 2).await;

    let clock = FakeClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap());
    let provider = AccessTokenProvider::with_clock(WeChatClient::new(&server.uri()), credentials(), clock.clone());

    provider.get_access_token().await.unwrap();
    // Expiry is the provider's TTL minus the five-minute margin.
    clock.advance(Duration::seconds(7200 - 300));
    provider.get_access_token().await.unwrap();
}

#[tokio::test]
async fn test_provider_rejection_is_auth_error_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40013,
            "errmsg": "invalid appid"
        })))
        .mount(&server)
        .await;

    let provider = AccessTokenProvider::new(WeChatClient::new(&server.uri()), credentials());
    match provider.get_access_token().await {
        Err(AppError::AuthError(body)) => assert!(body.contains("40013")),
        other => panic!("expected AuthError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_credentials_never_calls_provider() {
    let server = MockServer::start().await;
    mount_token(&server, "unused", 0).await;

    let provider = AccessTokenProvider::new(WeChatClient::new(&server.uri()), WeChatCredentials::default());
    assert!(matches!(provider.get_access_token().await, Err(AppError::AuthError(_))));
}

#[tokio::test]
async fn test_out_of_range_expiry_is_auth_error_and_not_cached() {
    for expires_in in [9_000_000_000_000_000_i64, i64::MIN] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t",
                "expires_in": expires_in
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider = AccessTokenProvider::new(WeChatClient::new(&server.uri()), credentials());
        for _ in 0..2 {
            match provider.get_access_token().await {
                Err(AppError::AuthError(msg)) => assert!(msg.contains(&expires_in.to_string())),
                other => panic!("expected AuthError for {expires_in}, got {other:?}"),
            }
        }
    }
}
