//! Lambda permission grants

use async_trait::async_trait;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::Client;
use tracing::debug;

use crate::errors::DeployerError;
use crate::services::{FunctionPermissions, PermissionGrant};

/// Permission manager over a Lambda client
#[derive(Debug, Clone)]
pub struct LambdaPermissions {
    client: Client,
}

impl LambdaPermissions {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionPermissions for LambdaPermissions {
    async fn add_permission(&self, grant: &PermissionGrant) -> Result<(), DeployerError> {
        debug!(
            "AddPermission {} sid={} principal={}",
            grant.function_name, grant.statement_id, grant.principal
        );

        self.client
            .add_permission()
            .function_name(&grant.function_name)
            .statement_id(&grant.statement_id)
            .action(&grant.action)
            .principal(&grant.principal)
            .source_arn(&grant.source_arn)
            .send()
            .await
            .map_err(|e| DeployerError::PermissionError(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
