//! Earth Engine REST client.
//!
//! Exchanges the user's refresh token for an access token, then evaluates
//! expression graphs through `projects/{project}/value:compute`.

use super::expression::{self, Expression, ValueNode};
use super::{CatalogWindow, ImageryService, RegionTable};
use crate::credentials::Credentials;
use crate::error::{ConfigError, ServiceError};
use crate::models::Point;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Refresh the access token this long before it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for [`EarthEngineClient`].
#[derive(Debug, Clone)]
pub struct EarthEngineOptions {
    pub api_url: String,
    pub token_url: String,
    /// Project override; the credentials' project is used otherwise.
    pub project: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EarthEngineOptions {
    fn default() -> Self {
        Self {
            api_url: "https://earthengine.googleapis.com/v1".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            project: None,
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Serialize)]
struct ComputeRequest<'a> {
    expression: &'a Expression,
}

#[derive(Debug, Deserialize)]
struct ComputeResponse {
    result: Value,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: Instant,
}

/// Client for the Earth Engine REST API.
pub struct EarthEngineClient {
    options: EarthEngineOptions,
    project: String,
    credentials: Credentials,
    http_client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl EarthEngineClient {
    /// Create a client from explicit credentials.
    pub fn new(credentials: Credentials, options: EarthEngineOptions) -> Result<Self, ConfigError> {
        let project = options
            .project
            .clone()
            .or_else(|| credentials.project.clone())
            .ok_or(ConfigError::MissingProject)?;

        info!("Initializing Earth Engine client for project {}", project);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            options,
            project,
            credentials,
            http_client,
            token: Mutex::new(None),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn compute_url(&self) -> String {
        format!(
            "{}/projects/{}/value:compute",
            self.options.api_url.trim_end_matches('/'),
            self.project
        )
    }

    fn map_send_error(&self, e: reqwest::Error, target: &str) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.options.timeout_seconds)
        } else if e.is_connect() {
            ServiceError::Connect(target.to_string())
        } else {
            ServiceError::Http(e)
        }
    }

    /// Current access token, refreshed when missing or about to expire.
    async fn access_token(&self) -> Result<String, ServiceError> {
        let mut guard = self.token.lock().await;

        if let Some(ref token) = *guard {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.refresh_token().await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    async fn refresh_token(&self) -> Result<AccessToken, ServiceError> {
        let creds = &self.credentials;
        let missing = |field: &str| ServiceError::Auth(format!("credentials have no {}", field));

        let request = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: creds
                .refresh_token
                .as_deref()
                .ok_or_else(|| missing("refresh_token"))?,
            client_id: creds.client_id.as_deref().ok_or_else(|| missing("client_id"))?,
            client_secret: creds
                .client_secret
                .as_deref()
                .ok_or_else(|| missing("client_secret"))?,
        };

        debug!("Refreshing access token");

        let response = self
            .http_client
            .post(&self.options.token_url)
            .form(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &self.options.token_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Auth(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(format!("token response: {}", e)))?;

        Ok(AccessToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in.unwrap_or(3600)),
        })
    }

    /// Evaluate an expression and return its result value.
    pub async fn compute(&self, root: ValueNode) -> Result<Value, ServiceError> {
        let expression = Expression::new(root);
        let token = self.access_token().await?;
        let url = self.compute_url();

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&ComputeRequest {
                expression: &expression,
            })
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &self.options.api_url))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api { status, body });
        }

        let parsed: ComputeResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        Ok(parsed.result)
    }
}

/// The filtered collection node shared by both queries.
fn window_collection(window: &CatalogWindow) -> ValueNode {
    let collection = expression::load_collection(&window.collection);
    let collection =
        expression::filter_date(collection, window.bucket.start, window.bucket.end);
    expression::filter_less_than(collection, &window.cloud_property, window.max_cloud)
}

#[async_trait]
impl ImageryService for EarthEngineClient {
    async fn count_images(&self, window: &CatalogWindow) -> Result<u64, ServiceError> {
        let result = self
            .compute(expression::size(window_collection(window)))
            .await?;

        result
            .as_u64()
            .or_else(|| result.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
            .ok_or_else(|| {
                ServiceError::MalformedResponse(format!("image count is not a number: {}", result))
            })
    }

    async fn region(
        &self,
        window: &CatalogWindow,
        point: &Point,
        scale: f64,
    ) -> Result<RegionTable, ServiceError> {
        let node = expression::get_region(
            window_collection(window),
            expression::point(point.lon, point.lat),
            scale,
        );
        RegionTable::from_value(self.compute(node).await?)
    }
}
