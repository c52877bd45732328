// crates/routes/src/hass.rs

use std::time::Duration;

use async_trait::async_trait;
use pipa_config::HomeConfig;
use pipa_core::{
    CalendarEvent, EntityState, ForecastEntry, ForecastGranularity, HomeApi, PipaError,
    PipaResult,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Home Assistant REST client.
pub struct HassClient {
    config: HomeConfig,
    client: Client,
    api_token: Option<String>,
}

impl HassClient {
    pub fn new(config: HomeConfig) -> PipaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()
            .map_err(|e| PipaError::Network(e.to_string()))?;

        let api_token = std::env::var(&config.api_token_env).ok();
        if api_token.is_none() {
            warn!(
                env = %config.api_token_env,
                "Home API token not set, requests will go out unauthenticated"
            );
        }

        Ok(Self {
            config,
            client,
            api_token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Send with a single retry on 429. Requests are rebuilt through the
    /// closure because a RequestBuilder is consumed by send.
    async fn send<F>(&self, build: F) -> PipaResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = self
            .authorize(build())
            .send()
            .await
            .map_err(|e| PipaError::Network(format!("home API request failed: {}", e)))?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return check_status(response);
        }

        let delay_s = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1)
            .min(self.config.max_retry_after_s);
        debug!(delay_s, "Home API rate limited, retrying once");
        tokio::time::sleep(Duration::from_secs(delay_s)).await;

        let retried = self
            .authorize(build())
            .send()
            .await
            .map_err(|e| PipaError::Network(format!("home API retry failed: {}", e)))?;
        check_status(retried)
    }
}

fn check_status(response: Response) -> PipaResult<Response> {
    if !response.status().is_success() {
        return Err(PipaError::Upstream(format!(
            "home API error: {}",
            response.status()
        )));
    }
    Ok(response)
}

#[async_trait]
impl HomeApi for HassClient {
    async fn entity_state(&self, entity_id: &str) -> PipaResult<EntityState> {
        let url = format!("{}/api/states/{}", self.config.api_url, entity_id);
        let response = self.send(|| self.client.get(&url)).await?;
        response
            .json::<EntityState>()
            .await
            .map_err(|e| PipaError::Upstream(format!("invalid state payload: {}", e)))
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        payload: Value,
    ) -> PipaResult<Value> {
        let url = format!(
            "{}/api/services/{}/{}",
            self.config.api_url, domain, service
        );
        let response = self
            .send(|| self.client.post(&url).json(&payload))
            .await?;

        // Service calls answer with the list of changed states; an empty
        // body is fine too.
        let body = response
            .text()
            .await
            .map_err(|e| PipaError::Upstream(format!("unreadable service response: {}", e)))?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    async fn forecast(
        &self,
        entity_id: &str,
        granularity: ForecastGranularity,
    ) -> PipaResult<Vec<ForecastEntry>> {
        let url = format!(
            "{}/api/services/weather/get_forecasts?return_response",
            self.config.api_url
        );
        let payload = json!({
            "entity_id": entity_id,
            "type": granularity.as_str(),
        });
        let response = self
            .send(|| self.client.post(&url).json(&payload))
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| PipaError::Upstream(format!("invalid forecast payload: {}", e)))?;

        let entries = body
            .get("service_response")
            .and_then(|r| r.get(entity_id))
            .and_then(|e| e.get("forecast"))
            .cloned()
            .ok_or_else(|| {
                PipaError::Upstream(format!("no forecast data for {}", entity_id))
            })?;
        serde_json::from_value(entries)
            .map_err(|e| PipaError::Upstream(format!("invalid forecast entries: {}", e)))
    }

    async fn calendar_events(
        &self,
        entity_id: &str,
        start_iso: &str,
        end_iso: &str,
    ) -> PipaResult<Vec<CalendarEvent>> {
        let url = format!(
            "{}/api/calendars/{}?start={}&end={}",
            self.config.api_url,
            entity_id,
            urlencoding::encode(start_iso),
            urlencoding::encode(end_iso)
        );
        let response = self.send(|| self.client.get(&url)).await?;
        response
            .json::<Vec<CalendarEvent>>()
            .await
            .map_err(|e| PipaError::Upstream(format!("invalid calendar payload: {}", e)))
    }
}
