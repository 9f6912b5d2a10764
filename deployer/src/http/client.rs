//! HTTP client for the custom resource callback

use std::time::Duration;

use async_trait::async_trait;
use cfn_models::{CustomResourceRequest, CustomResourceResponse};
use reqwest::{header, Client};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::DeployerError;
use crate::services::ResponseSender;

/// Sends the response document to the pre-signed `ResponseURL`
pub struct CallbackClient {
    client: Client,
}

impl CallbackClient {
    /// Create a new callback client
    pub fn new(timeout: Duration) -> Result<Self, DeployerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Make a PUT request with a JSON body.
    ///
    /// The pre-signed S3 URL is signed without a content type, so the header
    /// is sent empty.
    pub async fn put_json(&self, url: &str, body: String) -> Result<(), DeployerError> {
        let url = Url::parse(url)
            .map_err(|e| DeployerError::CallbackError(format!("invalid ResponseURL: {}", e)))?;
        debug!("PUT {}", url.host_str().unwrap_or_default());

        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP PUT failed: {} - {}", status, body);
            return Err(DeployerError::CallbackError(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}

#[async_trait]
impl ResponseSender for CallbackClient {
    async fn send(
        &self,
        request: &CustomResourceRequest,
        response: &CustomResourceResponse,
    ) -> Result<(), DeployerError> {
        let body = serde_json::to_string(response)?;
        self.put_json(&request.response_url, body).await?;
        info!(
            "Reported {:?} for {} ({})",
            response.status, request.logical_resource_id, request.request_id
        );
        Ok(())
    }
}
