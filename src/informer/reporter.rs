//! Client that pushes status reports to a collector's ingestion API.

use crate::error::{ApiError, InformerError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const REPORTER_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire form of one status report, shared by the reporter and the ingestion API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub claim_ref: String,
    #[serde(default)]
    pub status_message: String,
}

impl StatusReport {
    pub fn new(
        cluster: impl Into<String>,
        claim_ref: impl Into<String>,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            claim_ref: claim_ref.into(),
            status_message: status_message.into(),
        }
    }

    /// All three fields are required and must be non-empty.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.cluster.is_empty() || self.claim_ref.is_empty() || self.status_message.is_empty() {
            return Err(ApiError::Validation(
                "cluster, claimRef, and statusMessage are required".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct StatusReporter {
    client: Client,
    endpoint: String,
}

impl StatusReporter {
    /// `collector_url` is the collector's base URL, e.g. `http://collector:8095`
    pub fn new(collector_url: &str) -> Result<Self, InformerError> {
        let client = Client::builder()
            .timeout(REPORTER_HTTP_TIMEOUT)
            .build()
            .map_err(|e| InformerError::Post(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/v1/status", collector_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one report. Only `201 Created` counts as success.
    pub async fn send(&self, report: &StatusReport) -> Result<(), InformerError> {
        report
            .validate()
            .map_err(|e| InformerError::Post(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .map_err(|e| InformerError::Post(e.to_string()))?;

        if response.status() != StatusCode::CREATED {
            return Err(InformerError::UnexpectedStatus(response.status().as_u16()));
        }

        info!(
            cluster = %report.cluster,
            claim_ref = %report.claim_ref,
            status = %report.status_message,
            "Status sent"
        );
        Ok(())
    }
}
