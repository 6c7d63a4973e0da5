use std::{env, time::Duration};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8050;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:12500";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub backend_url: String,
    pub request_timeout: Duration,
    pub refresh_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT);

        let backend_url = lookup("PLANS_API_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = parse_or(
            "PLANS_API_TIMEOUT_SECS",
            lookup("PLANS_API_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        );
        let refresh_secs = parse_or(
            "DASHBOARD_REFRESH_SECS",
            lookup("DASHBOARD_REFRESH_SECS"),
            DEFAULT_REFRESH_SECS,
        )
        .max(1);

        Self {
            port,
            backend_url,
            request_timeout: Duration::from_secs(timeout_secs),
            refresh_interval: Duration::from_secs(refresh_secs),
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("ignoring invalid {key}={raw:?}, using default");
                default
            }
        },
    }
}
