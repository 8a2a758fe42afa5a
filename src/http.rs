use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use once_cell::sync::Lazy;

// Create a static client to reuse connections across every outbound API
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

/// Handle to the process-wide HTTP client.
pub fn client() -> Client {
    CLIENT.clone()
}

pub(crate) fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
