//! Remote service seams
//!
//! The orchestrator only talks to these traits. The AWS SDK backed
//! implementations live in the submodules; tests substitute fakes.

pub mod lambda;
pub mod lex;
pub mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cfn_models::{CustomResourceRequest, CustomResourceResponse};

use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::models::lex::{
    BotAliasRecord, BotRecord, ImportJob, IntentRecord, PutBotAliasRequest, PutBotRequest,
};

/// Object storage holding the bot archives
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `bucket/key` into `dest`, replacing its contents
    async fn download(&self, bucket: &str, key: &str, dest: &File) -> Result<(), DeployerError>;
}

/// Lex model building operations used by the deployment
#[async_trait]
pub trait BotModels: Send + Sync {
    /// Start a `BOT` import that overwrites `$LATEST`
    async fn start_import(&self, payload: Vec<u8>) -> Result<ImportJob, DeployerError>;

    async fn get_import(&self, import_id: &str) -> Result<ImportJob, DeployerError>;

    async fn get_intent(&self, name: &str, version: &str) -> Result<IntentRecord, DeployerError>;

    async fn create_intent_version(
        &self,
        name: &str,
        checksum: &str,
    ) -> Result<IntentRecord, DeployerError>;

    async fn get_bot(&self, name: &str, version_or_alias: &str)
        -> Result<BotRecord, DeployerError>;

    /// Update `$LATEST` and trigger a build
    async fn put_bot(&self, request: PutBotRequest) -> Result<BotRecord, DeployerError>;

    async fn create_bot_version(
        &self,
        name: &str,
        checksum: &str,
    ) -> Result<BotRecord, DeployerError>;

    async fn get_bot_alias(
        &self,
        name: &str,
        bot_name: &str,
    ) -> Result<BotAliasRecord, DeployerError>;

    async fn put_bot_alias(
        &self,
        request: PutBotAliasRequest,
    ) -> Result<BotAliasRecord, DeployerError>;
}

/// Resource-based policy statement on a Lambda function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub function_name: String,
    pub statement_id: String,
    pub action: String,
    pub principal: String,
    pub source_arn: String,
}

/// Lambda permission management
#[async_trait]
pub trait FunctionPermissions: Send + Sync {
    async fn add_permission(&self, grant: &PermissionGrant) -> Result<(), DeployerError>;
}

/// Delivery of the custom resource response
#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send(
        &self,
        request: &CustomResourceRequest,
        response: &CustomResourceResponse,
    ) -> Result<(), DeployerError>;
}

/// Delay between status polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Every collaborator the orchestrator needs
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn ObjectStore>,
    pub bots: Arc<dyn BotModels>,
    pub permissions: Arc<dyn FunctionPermissions>,
    pub responder: Arc<dyn ResponseSender>,
    pub sleeper: Arc<dyn Sleeper>,
}
