use crate::api::ApiClient;
use crate::config::Settings;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            api: ApiClient::new(settings.backend_url.clone(), settings.request_timeout),
            settings: Arc::new(settings),
        }
    }

    pub fn refresh_seconds(&self) -> u64 {
        self.settings.refresh_interval.as_secs()
    }
}
