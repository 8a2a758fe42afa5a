use chrono::{DateTime, FixedOffset, Utc};
use tracing::{error, info};

use crate::config::{PushConfig, UserConfig};
use crate::error::{AppError, Result};
use crate::rules::{generate_tip, warning_labels};
use crate::token::AccessTokenProvider;
use crate::weather::{Warning, WeatherClient, WeatherNow};
use crate::wechat::{TemplateData, TemplateMessage, WeChatClient};

const CHINA_OFFSET_SECS: i32 = 8 * 3600;

/// What happened to one subscriber during a run.
#[derive(Debug)]
pub struct UserOutcome {
    pub openid: String,
    pub city_name: String,
    pub result: Result<()>,
}

#[derive(Debug, Default)]
pub struct PushReport {
    pub outcomes: Vec<UserOutcome>,
}

impl PushReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&UserOutcome, &AppError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }
}

/// Sends the daily weather message to every configured subscriber.
pub struct Pusher {
    wechat: WeChatClient,
    weather: WeatherClient,
    template_id: String,
}

impl Pusher {
    pub fn new(wechat: WeChatClient, weather: WeatherClient, template_id: &str) -> Self {
        Self {
            wechat,
            weather,
            template_id: template_id.to_string(),
        }
    }

    /// Processes users one at a time; a failure is recorded and the run moves on.
    pub async fn run(&self, token: &str, users: &[UserConfig]) -> PushReport {
        let mut report = PushReport::default();

        for user in users {
            info!("📍 {} - {}", user.city_name, user.openid);
            let result = self.push_one(token, user).await;
            if let Err(e) = &result {
                error!("Push to {} failed: {}", user.openid, e);
            }
            report.outcomes.push(UserOutcome {
                openid: user.openid.clone(),
                city_name: user.city_name.clone(),
                result,
            });
        }

        report
    }

    async fn push_one(&self, token: &str, user: &UserConfig) -> Result<()> {
        let (weather, warnings) = tokio::join!(
            self.weather.now(&user.city_id),
            self.weather.warnings(&user.city_id)
        );
        let weather = weather?;
        let tip = generate_tip(&warnings, weather.temperature_celsius());

        info!("  weather: {} {}°C", weather.weather, weather.temperature);
        info!("  warnings: {}", warnings.len());
        info!("  tip: {}", tip.replace('\n', " / "));

        let message = self.compose(user, &weather, &warnings, tip, Utc::now());
        self.wechat.send_template_message(token, &message).await
    }

    pub fn compose(
        &self,
        user: &UserConfig,
        weather: &WeatherNow,
        warnings: &[Warning],
        tip: String,
        now: DateTime<Utc>,
    ) -> TemplateMessage {
        TemplateMessage {
            touser: user.openid.clone(),
            template_id: self.template_id.clone(),
            data: TemplateData {
                date: format_date(now).into(),
                city: user.city_name.clone().into(),
                weather: weather.weather.clone().into(),
                temperature: format!("{}°C", weather.temperature).into(),
                wind: weather.wind.clone().into(),
                warning: warning_labels(warnings).into(),
                tip: tip.into(),
            },
        }
    }
}

/// One complete push run: parse the subscribers, fetch a token, then push.
///
/// Errors from the first two steps abort the run before any message is sent;
/// per-user failures only show up in the report.
pub async fn run(config: PushConfig) -> Result<PushReport> {
    let users = config.users()?;
    info!("Configured {} users", users.len());

    let wechat = WeChatClient::new(&config.wechat_api_base);
    let token = AccessTokenProvider::new(wechat.clone(), config.credentials.clone())
        .get_access_token()
        .await?;

    let weather = WeatherClient::new(&config.weather_api_base, &config.weather_api_key);
    let pusher = Pusher::new(wechat, weather, &config.template_id);

    Ok(pusher.run(&token, &users).await)
}

/// Calendar date in China, formatted the way the zh-CN locale prints it.
pub fn format_date(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(CHINA_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).format("%Y/%-m/%-d").to_string(),
        None => now.format("%Y/%-m/%-d").to_string(),
    }
}
