//! Deployment request models

use cfn_models::{CustomResourceRequest, RequestType};
use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;

/// Resource properties of the `Custom::LexBot` resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProperties {
    /// Archive key in the bucket
    pub filename: String,

    /// Bucket holding the archive
    pub s3_bucket: String,

    /// Fulfilment function the intents invoke
    pub lambda_function_name: String,

    /// Bot name; the export inside the archive is `{bot_name}_Export.json`
    pub bot_name: String,

    /// Alias to create or move to the new version
    pub bot_alias: String,

    /// CloudWatch log group ARN for conversation logs
    pub log_group: String,

    /// IAM role Lex assumes to write conversation logs
    pub log_role: String,
}

impl ResourceProperties {
    /// Read the properties from a custom resource event.
    ///
    /// `Filename` falls back to `default_filename`; every other property is
    /// required.
    pub fn from_request(
        request: &CustomResourceRequest,
        default_filename: &str,
    ) -> Result<Self, DeployerError> {
        let required = |name: &str| {
            request
                .property(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    DeployerError::RequestError(format!("missing resource property {}", name))
                })
        };

        Ok(Self {
            filename: request
                .property("Filename")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default_filename.to_string()),
            s3_bucket: required("S3Bucket")?,
            lambda_function_name: required("LambdaFunctionName")?,
            bot_name: required("BotName")?,
            bot_alias: required("BotAlias")?,
            log_group: required("LogGroup")?,
            log_role: required("LogRole")?,
        })
    }

    /// Name of the export document inside the archive
    pub fn export_name(&self) -> String {
        format!("{}_Export.json", self.bot_name)
    }
}

/// Request kind plus its properties for a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub kind: RequestType,
    pub properties: ResourceProperties,
}

/// Account and region the handler itself runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationIdentity {
    pub partition: String,
    pub region: String,
    pub account_id: String,
}

impl InvocationIdentity {
    /// Parse `arn:partition:service:region:account-id:resource`
    pub fn from_function_arn(arn: &str) -> Result<Self, DeployerError> {
        let parts: Vec<&str> = arn.split(':').collect();
        if parts.len() < 6 || parts[0] != "arn" {
            return Err(DeployerError::RequestError(format!(
                "invalid function ARN: {}",
                arn
            )));
        }

        let (partition, region, account_id) = (parts[1], parts[3], parts[4]);
        if partition.is_empty() || region.is_empty() || account_id.is_empty() {
            return Err(DeployerError::RequestError(format!(
                "function ARN lacks partition, region or account: {}",
                arn
            )));
        }

        Ok(Self {
            partition: partition.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
        })
    }

    /// Source ARN matching every Lex intent in this account and region
    pub fn intents_source_arn(&self) -> String {
        format!(
            "arn:{}:lex:{}:{}:intent:*",
            self.partition, self.region, self.account_id
        )
    }
}
