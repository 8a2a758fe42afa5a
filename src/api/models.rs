use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Query string of the platform's server-verification handshake.
#[derive(Deserialize, Debug, Default)]
pub struct VerifyQuery {
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub echostr: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
