use crate::errors::ApiError;
use crate::models::{Category, NewPlan, Plan};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the plans backend. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    read_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, read_timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            read_timeout,
        }
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.get_json("/plans").await
    }

    pub async fn plans_by_category(&self, category_id: i64) -> Result<Vec<Plan>, ApiError> {
        self.get_json(&format!("/plans/category/{category_id}")).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("/categories").await
    }

    pub async fn publish_plan(&self, plan: &NewPlan) -> Result<Plan, ApiError> {
        // reqwest's .json() sets Content-Type: application/json
        let request = self.client.post(self.url("/plans/publish")).json(plan);
        let response = send(request, "/plans/publish").await?;
        decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.client.get(self.url(path)).timeout(self.read_timeout);
        let response = send(request, path).await?;
        decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn send(request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(|err| {
        warn!("backend request {path} failed: {err}");
        ApiError::from(err)
    })?;

    let status = response.status();
    debug!("backend {path} -> {status}");
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await;
    warn!("backend {path} returned {status}");
    Err(status_error(status, path, body))
}

fn status_error<E: Display>(status: StatusCode, path: &str, body: Result<String, E>) -> ApiError {
    let body = body.unwrap_or_else(|err| {
        warn!("backend {path} error body could not be read: {err}");
        format!("(response body could not be read: {err})")
    });
    ApiError::Status {
        status: status.as_u16(),
        body,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(ApiError::from)?;
    serde_json::from_slice(&bytes).map_err(|err| {
        warn!("backend sent malformed JSON: {err}");
        ApiError::Decode(err.to_string())
    })
}
