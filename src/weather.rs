use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::http;

/// Current conditions for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherNow {
    pub weather: String,
    pub temperature: String,
    pub wind: String,
}

impl WeatherNow {
    pub fn temperature_celsius(&self) -> Option<f64> {
        self.temperature.trim().parse().ok()
    }
}

/// An active weather warning as issued by the weather service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Warning {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "typeName")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Warning {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct NowResponse {
    code: String,
    now: Option<NowBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NowBody {
    text: String,
    temp: StringOrNumber,
    wind_dir: String,
    wind_scale: String,
}

/// QWeather documents `temp` as a string, but some responses carry a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Text(text) => text,
            StringOrNumber::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct WarningResponse {
    code: String,
    #[serde(default)]
    warning: Option<Vec<Warning>>,
}

/// QWeather v7 client.
#[derive(Clone, Debug)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_client(http::client(), base_url, api_key)
    }

    pub fn with_client(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: http::trim_base(base_url),
            api_key: api_key.to_string(),
        }
    }

    /// Current conditions. Any failure is a [`AppError::WeatherError`].
    pub async fn now(&self, city_id: &str) -> Result<WeatherNow> {
        let res: NowResponse = self
            .client
            .get(format!("{}/v7/weather/now", self.base_url))
            .query(&[("location", city_id), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::WeatherError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::WeatherError(e.to_string()))?;

        if res.code != "200" {
            return Err(AppError::WeatherError(format!("code {}", res.code)));
        }

        let now = res
            .now
            .ok_or_else(|| AppError::WeatherError("response has no current conditions".to_string()))?;

        Ok(WeatherNow {
            weather: now.text,
            temperature: now.temp.into(),
            wind: format!("{}{}级", now.wind_dir, now.wind_scale),
        })
    }

    /// Active warnings. Never fails: errors are logged and read as "no warnings".
    pub async fn warnings(&self, city_id: &str) -> Vec<Warning> {
        match self.fetch_warnings(city_id).await {
            Ok(warnings) => warnings,
            Err(e) => {
                warn!("Falling back to no warnings for {}: {}", city_id, e);
                Vec::new()
            }
        }
    }

    async fn fetch_warnings(&self, city_id: &str) -> Result<Vec<Warning>> {
        let res: WarningResponse = self
            .client
            .get(format!("{}/v7/warning/now", self.base_url))
            .query(&[("location", city_id), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::WarningFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::WarningFetchError(e.to_string()))?;

        if res.code != "200" {
            return Err(AppError::WarningFetchError(format!("code {}", res.code)));
        }

        Ok(res.warning.unwrap_or_default())
    }
}
