//! Lex model building service over the AWS SDK

use async_trait::async_trait;
use aws_sdk_lexmodelbuilding::error::{BuildError, DisplayErrorContext};
use aws_sdk_lexmodelbuilding::primitives::Blob;
use aws_sdk_lexmodelbuilding::types::{
    self as lex, ContentType, ConversationLogsRequest, Destination, Locale, LogSettingsRequest,
    LogType, MergeStrategy, ProcessBehavior, ResourceType,
};
use aws_sdk_lexmodelbuilding::Client;
use tracing::debug;

use crate::errors::DeployerError;
use crate::models::bot::{Message, Prompt, Statement};
use crate::models::lex::{
    BotAliasRecord, BotIntent, BotRecord, ConversationLogs, ImportJob, IntentRecord,
    PutBotAliasRequest, PutBotRequest,
};
use crate::services::BotModels;

/// Bot models client
#[derive(Debug, Clone)]
pub struct LexModels {
    client: Client,
}

impl LexModels {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn service_error<E>(operation: &str, err: E) -> DeployerError
where
    E: std::error::Error,
{
    DeployerError::BotServiceError(format!("{}: {}", operation, DisplayErrorContext(err)))
}

fn build_error(err: BuildError) -> DeployerError {
    DeployerError::BotServiceError(format!("invalid request: {}", err))
}

fn to_messages(messages: &[Message]) -> Result<Vec<lex::Message>, DeployerError> {
    messages
        .iter()
        .map(|m| {
            lex::Message::builder()
                .content_type(ContentType::from(m.content_type.as_str()))
                .content(&m.content)
                .set_group_number(m.group_number)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn to_statement(statement: &Statement) -> Result<lex::Statement, DeployerError> {
    lex::Statement::builder()
        .set_messages(Some(to_messages(&statement.messages)?))
        .set_response_card(statement.response_card.clone())
        .build()
        .map_err(build_error)
}

fn to_prompt(prompt: &Prompt) -> Result<lex::Prompt, DeployerError> {
    lex::Prompt::builder()
        .set_messages(Some(to_messages(&prompt.messages)?))
        .max_attempts(prompt.max_attempts)
        .set_response_card(prompt.response_card.clone())
        .build()
        .map_err(build_error)
}

fn to_intents(intents: &[BotIntent]) -> Result<Vec<lex::Intent>, DeployerError> {
    intents
        .iter()
        .map(|i| {
            lex::Intent::builder()
                .intent_name(&i.intent_name)
                .intent_version(&i.intent_version)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn to_conversation_logs(logs: &ConversationLogs) -> Result<ConversationLogsRequest, DeployerError> {
    let text_logs = LogSettingsRequest::builder()
        .log_type(LogType::Text)
        .destination(Destination::CloudwatchLogs)
        .resource_arn(&logs.log_group_arn)
        .build()
        .map_err(build_error)?;

    ConversationLogsRequest::builder()
        .log_settings(text_logs)
        .iam_role_arn(&logs.iam_role_arn)
        .build()
        .map_err(build_error)
}

#[async_trait]
impl BotModels for LexModels {
    async fn start_import(&self, payload: Vec<u8>) -> Result<ImportJob, DeployerError> {
        debug!("StartImport ({} bytes)", payload.len());

        let output = self
            .client
            .start_import()
            .payload(Blob::new(payload))
            .resource_type(ResourceType::Bot)
            .merge_strategy(MergeStrategy::OverwriteLatest)
            .send()
            .await
            .map_err(|e| service_error("StartImport", e))?;

        Ok(ImportJob {
            import_id: output.import_id.unwrap_or_default(),
            import_status: output
                .import_status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            failure_reasons: Vec::new(),
        })
    }

    async fn get_import(&self, import_id: &str) -> Result<ImportJob, DeployerError> {
        debug!("GetImport {}", import_id);

        let output = self
            .client
            .get_import()
            .import_id(import_id)
            .send()
            .await
            .map_err(|e| service_error("GetImport", e))?;

        Ok(ImportJob {
            import_id: output.import_id.unwrap_or_else(|| import_id.to_string()),
            import_status: output
                .import_status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            failure_reasons: output.failure_reason.unwrap_or_default(),
        })
    }

    async fn get_intent(&self, name: &str, version: &str) -> Result<IntentRecord, DeployerError> {
        debug!("GetIntent {}:{}", name, version);

        let output = self
            .client
            .get_intent()
            .name(name)
            .version(version)
            .send()
            .await
            .map_err(|e| service_error("GetIntent", e))?;

        Ok(IntentRecord {
            name: output.name.unwrap_or_else(|| name.to_string()),
            version: output.version.unwrap_or_else(|| version.to_string()),
            checksum: output.checksum.unwrap_or_default(),
        })
    }

    async fn create_intent_version(
        &self,
        name: &str,
        checksum: &str,
    ) -> Result<IntentRecord, DeployerError> {
        debug!("CreateIntentVersion {}", name);

        let output = self
            .client
            .create_intent_version()
            .name(name)
            .checksum(checksum)
            .send()
            .await
            .map_err(|e| service_error("CreateIntentVersion", e))?;

        Ok(IntentRecord {
            name: output.name.unwrap_or_else(|| name.to_string()),
            version: output.version.unwrap_or_default(),
            checksum: output.checksum.unwrap_or_default(),
        })
    }

    async fn get_bot(
        &self,
        name: &str,
        version_or_alias: &str,
    ) -> Result<BotRecord, DeployerError> {
        debug!("GetBot {}:{}", name, version_or_alias);

        let output = self
            .client
            .get_bot()
            .name(name)
            .version_or_alias(version_or_alias)
            .send()
            .await
            .map_err(|e| service_error("GetBot", e))?;

        Ok(BotRecord {
            name: output.name.unwrap_or_else(|| name.to_string()),
            version: output.version.unwrap_or_default(),
            status: output
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            checksum: output.checksum.unwrap_or_default(),
            failure_reason: output.failure_reason,
        })
    }

    async fn put_bot(&self, request: PutBotRequest) -> Result<BotRecord, DeployerError> {
        debug!(
            "PutBot {} with {} intents",
            request.name,
            request.intents.len()
        );

        let output = self
            .client
            .put_bot()
            .name(&request.name)
            .process_behavior(ProcessBehavior::Build)
            .locale(Locale::from(request.locale.as_str()))
            .child_directed(request.child_directed)
            .abort_statement(to_statement(&request.abort_statement)?)
            .clarification_prompt(to_prompt(&request.clarification_prompt)?)
            .voice_id(&request.voice_id)
            .idle_session_ttl_in_seconds(request.idle_session_ttl_in_seconds)
            .checksum(&request.checksum)
            .set_intents(Some(to_intents(&request.intents)?))
            .send()
            .await
            .map_err(|e| service_error("PutBot", e))?;

        Ok(BotRecord {
            name: output.name.unwrap_or(request.name),
            version: output.version.unwrap_or_default(),
            status: output
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            checksum: output.checksum.unwrap_or_default(),
            failure_reason: output.failure_reason,
        })
    }

    async fn create_bot_version(
        &self,
        name: &str,
        checksum: &str,
    ) -> Result<BotRecord, DeployerError> {
        debug!("CreateBotVersion {}", name);

        let output = self
            .client
            .create_bot_version()
            .name(name)
            .checksum(checksum)
            .send()
            .await
            .map_err(|e| service_error("CreateBotVersion", e))?;

        Ok(BotRecord {
            name: output.name.unwrap_or_else(|| name.to_string()),
            version: output.version.unwrap_or_default(),
            status: output
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            checksum: output.checksum.unwrap_or_default(),
            failure_reason: output.failure_reason,
        })
    }

    async fn get_bot_alias(
        &self,
        name: &str,
        bot_name: &str,
    ) -> Result<BotAliasRecord, DeployerError> {
        debug!("GetBotAlias {} of {}", name, bot_name);

        let output = self
            .client
            .get_bot_alias()
            .name(name)
            .bot_name(bot_name)
            .send()
            .await
            .map_err(|e| service_error("GetBotAlias", e))?;

        Ok(BotAliasRecord {
            name: output.name.unwrap_or_else(|| name.to_string()),
            bot_name: output.bot_name.unwrap_or_else(|| bot_name.to_string()),
            bot_version: output.bot_version.unwrap_or_default(),
            checksum: output.checksum.unwrap_or_default(),
        })
    }

    async fn put_bot_alias(
        &self,
        request: PutBotAliasRequest,
    ) -> Result<BotAliasRecord, DeployerError> {
        debug!(
            "PutBotAlias {} -> {}:{}",
            request.name, request.bot_name, request.bot_version
        );

        let output = self
            .client
            .put_bot_alias()
            .name(&request.name)
            .description(&request.description)
            .bot_version(&request.bot_version)
            .bot_name(&request.bot_name)
            .set_checksum(request.checksum.clone())
            .conversation_logs(to_conversation_logs(&request.conversation_logs)?)
            .send()
            .await
            .map_err(|e| service_error("PutBotAlias", e))?;

        Ok(BotAliasRecord {
            name: output.name.unwrap_or(request.name),
            bot_name: output.bot_name.unwrap_or(request.bot_name),
            bot_version: output.bot_version.unwrap_or(request.bot_version),
            checksum: output.checksum.unwrap_or_default(),
        })
    }
}
