//! Google Analytics API client
//!
//! Thin wrapper over the Data API (`runReport`) and the Admin API
//! (`accountSummaries`). Authentication is a bearer token obtained elsewhere;
//! this client only attaches it.

use crate::config::ApiConfig;
use crate::models::{
    AccountSummariesPage, ApiErrorBody, PropertySummary, ReportRequest, RunReportResponse,
};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base delay between retries; attempt `n` waits `n` times this
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    http: reqwest::Client,
    data_api_base: String,
    admin_api_base: String,
    access_token: String,
    max_retries: u32,
}

impl AnalyticsClient {
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let access_token = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                anyhow!("No access token configured. Set GA4_ACCESS_TOKEN or api.access_token")
            })?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            data_api_base: config.data_api_base.trim_end_matches('/').to_string(),
            admin_api_base: config.admin_api_base.trim_end_matches('/').to_string(),
            access_token,
            max_retries: config.max_retries,
        })
    }

    pub fn report_url(&self, property_id: &str) -> String {
        format!("{}/properties/{}:runReport", self.data_api_base, property_id)
    }

    pub fn account_summaries_url(&self) -> String {
        format!("{}/accountSummaries", self.admin_api_base)
    }

    /// Run a report against `properties/{property_id}`.
    pub async fn run_report(
        &self,
        property_id: &str,
        request: &ReportRequest,
    ) -> Result<RunReportResponse> {
        let url = self.report_url(property_id);
        debug!(url = %url, dimensions = request.dimensions.len(), metrics = request.metrics.len(), "Running report");

        let response = self
            .send_with_retry(|| self.http.post(&url).json(request))
            .await?;
        let report: RunReportResponse = response
            .json()
            .await
            .context("Failed to parse report response JSON")?;

        info!(rows = report.rows.len(), row_count = report.row_count, "Report fetched");
        Ok(report)
    }

    /// All properties visible to the token, across every account.
    pub async fn list_properties(&self) -> Result<Vec<PropertySummary>> {
        let url = self.account_summaries_url();
        let mut properties = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .send_with_retry(|| {
                    let request = self.http.get(&url).query(&[("pageSize", "200")]);
                    match &page_token {
                        Some(token) => request.query(&[("pageToken", token.as_str())]),
                        None => request,
                    }
                })
                .await?;
            let page: AccountSummariesPage = response
                .json()
                .await
                .context("Failed to parse account summaries JSON")?;

            for account in page.account_summaries {
                properties.extend(account.property_summaries);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(properties = properties.len(), "Listed properties");
        Ok(properties)
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let retries_left = attempt <= self.max_retries;

            match build().bearer_auth(&self.access_token).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if is_transient(response.status()) && retries_left => {
                    warn!(status = %response.status(), attempt, "Transient API error, retrying");
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    bail!("API request failed with status {}: {}", status, error_message(&body));
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && retries_left => {
                    warn!(error = %e, attempt, "API request failed, retrying");
                }
                Err(e) => return Err(e).context("API request failed"),
            }

            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pull the message out of a Google error envelope, falling back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => {
            if parsed.error.status.is_empty() {
                parsed.error.message
            } else {
                format!("{} ({})", parsed.error.message, parsed.error.status)
            }
        }
        _ => body.chars().take(200).collect(),
    }
}
