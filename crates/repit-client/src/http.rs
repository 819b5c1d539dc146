//! HTTP client for Repit services with retries and circuit breaking
//!
//! Every request is routed either through the API gateway or straight to the
//! service, guarded by a per-service circuit breaker and retried with
//! exponential backoff on transport errors and 5xx responses.

use std::collections::BTreeMap;
use std::time::Instant;

use dashmap::DashMap;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};

use repit_common::API_PREFIX;

use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerManager};
use crate::config::ServiceClientConfig;
use crate::error::{ClientError, Result};
use crate::registry::ServiceRegistry;

/// Interpret a successful response body
///
/// Empty bodies become `{}`; bodies that are not JSON are wrapped as
/// `{"status": "success", "data": <text>}`.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "status": "success", "data": text }))
}

/// Whether a health payload reports `healthy`, bare or inside a response envelope
fn reports_healthy(body: &Value) -> bool {
    let status = body
        .get("status")
        .or_else(|| body.get("data").and_then(|d| d.get("status")));
    status.and_then(Value::as_str) == Some("healthy")
}

/// Map a non-success status to the matching client error
fn status_error(service: &str, endpoint: &str, status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Authentication(body),
        StatusCode::NOT_FOUND => ClientError::NotFound(format!("{}{}", service, endpoint)),
        StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation(body),
        s => ClientError::Api {
            status: s.as_u16(),
            body,
        },
    }
}

pub struct ServiceHttpClient {
    client: Client,
    config: ServiceClientConfig,
    breakers: CircuitBreakerManager,
    registry: ServiceRegistry,
    /// Bearer tokens keyed by user id
    tokens: DashMap<i64, String>,
}

impl ServiceHttpClient {
    pub fn new(config: ServiceClientConfig) -> Result<Self> {
        Self::with_breaker_config(config, CircuitBreakerConfig::default())
    }

    pub fn with_breaker_config(
        config: ServiceClientConfig,
        breaker_config: CircuitBreakerConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("{}/{}", config.client_name, config.client_version))
            .build()?;

        Ok(Self {
            client,
            config,
            breakers: CircuitBreakerManager::new(breaker_config),
            registry: ServiceRegistry::new(),
            tokens: DashMap::new(),
        })
    }

    pub fn config(&self) -> &ServiceClientConfig {
        &self.config
    }

    pub fn breakers(&self) -> &CircuitBreakerManager {
        &self.breakers
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn set_user_token(&self, user_id: i64, token: &str) {
        self.tokens.insert(user_id, token.to_string());
    }

    pub fn clear_user_token(&self, user_id: i64) {
        self.tokens.remove(&user_id);
    }

    /// Absolute URL for `endpoint` on `service`
    pub fn service_url(&self, service: &str, endpoint: &str) -> Result<String> {
        let base = self
            .config
            .service_urls
            .get(service)
            .ok_or_else(|| ClientError::UnknownService(service.to_string()))?;
        let root = if self.config.use_api_gateway {
            &self.config.api_gateway_url
        } else {
            base
        };
        Ok(format!("{}{}{}", root, API_PREFIX, endpoint))
    }

    fn headers(&self, user_id: Option<i64>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let pairs = [
            ("x-client", self.config.client_name.clone()),
            ("x-client-version", self.config.client_version.clone()),
            ("x-request-time", chrono::Utc::now().to_rfc3339()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        let token = user_id.and_then(|id| self.tokens.get(&id).map(|t| t.value().clone()));
        if let Some(token) = token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!("Skipping malformed token header: {}", e),
            }
        }
        headers
    }

    /// Send a request and return the decoded JSON body
    pub async fn request(
        &self,
        method: Method,
        service: &str,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        user_id: Option<i64>,
    ) -> Result<Value> {
        let response = self
            .send(method, service, endpoint, query, body, user_id)
            .await?;
        Self::read_response(service, endpoint, response).await
    }

    /// GET a binary payload such as a rendered report
    pub async fn download(
        &self,
        service: &str,
        endpoint: &str,
        query: &[(&str, String)],
        user_id: Option<i64>,
    ) -> Result<Response> {
        let response = self
            .send(Method::GET, service, endpoint, query, None, user_id)
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await?;
        Err(status_error(service, endpoint, status, text))
    }

    /// Run the retry loop and hand back the first non-5xx response
    async fn send(
        &self,
        method: Method,
        service: &str,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        user_id: Option<i64>,
    ) -> Result<Response> {
        let url = self.service_url(service, endpoint)?;
        let breaker = self.breakers.get(service);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            if !breaker.allow_request() {
                warn!(service, "Circuit open, request rejected");
                return Err(ClientError::ServiceUnavailable(format!(
                    "{}: circuit breaker is open",
                    service
                )));
            }

            let mut builder = self
                .client
                .request(method.clone(), &url)
                .headers(self.headers(user_id));
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let started = Instant::now();
            let outcome = builder.send().await;
            metrics::histogram!("repit_client_request_duration_seconds", "service" => service.to_string())
                .record(started.elapsed().as_secs_f64());

            match outcome {
                Ok(response) if response.status().is_server_error() => {
                    breaker.record_failure();
                    last_error = format!("{} {} returned {}", method, url, response.status());
                }
                Ok(response) => {
                    breaker.record_success();
                    debug!(service, %method, %url, status = %response.status(), "Request finished");
                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        breaker.record_timeout();
                    } else {
                        breaker.record_failure();
                    }
                    last_error = e.to_string();
                }
            }

            if attempt + 1 < attempts {
                let delay = self.config.backoff(attempt);
                warn!(
                    service,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed, retrying: {}",
                    last_error
                );
                metrics::counter!("repit_client_retries_total", "service" => service.to_string())
                    .increment(1);
                tokio::time::sleep(delay).await;
            }
        }

        Err(ClientError::ServiceUnavailable(format!(
            "{} after {} attempts: {}",
            service, attempts, last_error
        )))
    }

    async fn read_response(service: &str, endpoint: &str, response: Response) -> Result<Value> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(json!({}));
        }
        let text = response.text().await?;

        if status.is_success() {
            Ok(parse_body(&text))
        } else {
            Err(status_error(service, endpoint, status, text))
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        service: &str,
        endpoint: &str,
        user_id: Option<i64>,
    ) -> Result<T> {
        self.get_with_query(service, endpoint, &[], user_id).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        service: &str,
        endpoint: &str,
        query: &[(&str, String)],
        user_id: Option<i64>,
    ) -> Result<T> {
        let value = self
            .request(Method::GET, service, endpoint, query, None, user_id)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        service: &str,
        endpoint: &str,
        body: &B,
        user_id: Option<i64>,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let value = self
            .request(Method::POST, service, endpoint, &[], Some(&body), user_id)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        service: &str,
        endpoint: &str,
        body: &B,
        user_id: Option<i64>,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let value = self
            .request(Method::PUT, service, endpoint, &[], Some(&body), user_id)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        service: &str,
        endpoint: &str,
        user_id: Option<i64>,
    ) -> Result<T> {
        let value = self
            .request(Method::DELETE, service, endpoint, &[], None, user_id)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Check `service` and record the result in the registry
    pub async fn health_check(&self, service: &str) -> bool {
        match self.get::<Value>(service, "/health", None).await {
            Ok(body) if reports_healthy(&body) => {
                self.registry.mark_healthy(service);
                true
            }
            Ok(body) => {
                self.registry
                    .mark_unhealthy(service, &format!("unexpected health payload: {}", body));
                false
            }
            Err(e) => {
                self.registry.mark_unhealthy(service, &e.to_string());
                false
            }
        }
    }

    /// Check every configured service concurrently
    pub async fn health_check_all(&self) -> BTreeMap<String, bool> {
        let names: Vec<String> = self.config.service_urls.keys().cloned().collect();
        let results =
            futures::future::join_all(names.iter().map(|name| self.health_check(name))).await;
        names.into_iter().zip(results).collect()
    }
}
