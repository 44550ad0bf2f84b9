use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{
    ApiError, BalanceResponse, ControlResponse, DashboardApi, PrivateKeyRequest, StatsSnapshot,
    WalletResponse,
};
use crate::config::{ApiConfig, StrategySettings};
use crate::types::PrivateKey;

const STATS: &str = "/api/stats";
const CURRENT_SETTINGS: &str = "/api/current_settings";
const START: &str = "/api/start";
const STOP: &str = "/api/stop";
const RESET_STATS: &str = "/api/reset_stats";
const SAVE_SETTINGS: &str = "/api/save_settings";
const SET_PRIVATE_KEY: &str = "/api/set_private_key";
const REFRESH_BALANCES: &str = "/api/refresh_balances";

#[derive(Debug, Clone)]
pub struct HttpDashboardClient {
    client: Client,
    base_url: Url,
}

impl HttpDashboardClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let trimmed = config.base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|e| ApiError::BaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::BaseUrl {
                url: config.base_url.clone(),
                reason: "not an http(s) base URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|source| ApiError::Transport { endpoint: "client", source })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), endpoint)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &'static str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        // The bot reports refusals as JSON with an error status code; prefer
        // its message over the bare status when there is one.
        if !status.is_success() {
            if let Ok(refusal) = serde_json::from_slice::<ControlResponse>(&bytes) {
                if let Some(message) = refusal.message {
                    return Err(ApiError::Rejected(message));
                }
            }
            return Err(ApiError::Status {
                endpoint,
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { endpoint, source })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, endpoint, None).await
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::POST, endpoint, None).await
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardClient {
    async fn stats(&self) -> Result<StatsSnapshot, ApiError> {
        self.get(STATS).await
    }

    async fn current_settings(&self) -> Result<StrategySettings, ApiError> {
        self.get(CURRENT_SETTINGS).await
    }

    async fn start(&self) -> Result<ControlResponse, ApiError> {
        self.post(START).await
    }

    async fn stop(&self) -> Result<ControlResponse, ApiError> {
        self.post(STOP).await
    }

    async fn reset_stats(&self) -> Result<ControlResponse, ApiError> {
        self.post(RESET_STATS).await
    }

    async fn save_settings(&self, settings: &StrategySettings) -> Result<ControlResponse, ApiError> {
        self.request(Method::POST, SAVE_SETTINGS, Some(settings)).await
    }

    async fn set_private_key(&self, key: &PrivateKey) -> Result<WalletResponse, ApiError> {
        let body = PrivateKeyRequest {
            private_key: key.expose(),
        };
        self.request(Method::POST, SET_PRIVATE_KEY, Some(&body)).await
    }

    async fn refresh_balances(&self) -> Result<BalanceResponse, ApiError> {
        self.get(REFRESH_BALANCES).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let client = HttpDashboardClient::new(&config("http://127.0.0.1:5556/")).unwrap();
        assert_eq!(client.url(STATS), "http://127.0.0.1:5556/api/stats");

        let client = HttpDashboardClient::new(&config("https://bot.example.com/dice")).unwrap();
        assert_eq!(client.url(START), "https://bot.example.com/dice/api/start");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = HttpDashboardClient::new(&config("localhost:5556")).unwrap_err();
        assert!(matches!(err, ApiError::BaseUrl { .. }));

        assert!(HttpDashboardClient::new(&config("not a url")).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client = HttpDashboardClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_ms: 500,
        })
        .unwrap();

        let err = client.stats().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { endpoint: STATS, .. }));
    }
}
