//! Snapshots and requests exchanged with the Lex model building service

use serde::{Deserialize, Serialize};

use crate::models::bot::{Prompt, Statement};

/// Draft version selector
pub const LATEST: &str = "$LATEST";

/// Import job statuses
pub mod import_status {
    pub const IN_PROGRESS: &str = "IN_PROGRESS";
    pub const FAILED: &str = "FAILED";
}

/// Bot build statuses
pub mod bot_status {
    pub const BUILDING: &str = "BUILDING";
    pub const NOT_BUILT: &str = "NOT_BUILT";
    pub const READY_BASIC_TESTING: &str = "READY_BASIC_TESTING";
    pub const FAILED: &str = "FAILED";
}

/// State of an import job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub import_id: String,
    pub import_status: String,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
}

/// Intent version snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub name: String,
    pub version: String,
    pub checksum: String,
}

/// Bot version snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotRecord {
    pub name: String,
    pub version: String,
    pub status: String,
    pub checksum: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Alias snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotAliasRecord {
    pub name: String,
    pub bot_name: String,
    pub bot_version: String,
    pub checksum: String,
}

/// Intent pinned to a version inside a bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIntent {
    pub intent_name: String,
    pub intent_version: String,
}

/// Arguments of `PutBot`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutBotRequest {
    pub name: String,
    pub locale: String,
    pub child_directed: bool,
    pub abort_statement: Statement,
    pub clarification_prompt: Prompt,
    pub voice_id: String,
    pub idle_session_ttl_in_seconds: i32,
    pub intents: Vec<BotIntent>,
    /// Checksum of the `$LATEST` read that precedes this write
    pub checksum: String,
}

/// Text conversation logs delivered to CloudWatch Logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLogs {
    pub log_group_arn: String,
    pub iam_role_arn: String,
}

/// Arguments of `PutBotAlias`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutBotAliasRequest {
    pub name: String,
    pub bot_name: String,
    pub bot_version: String,
    pub description: String,
    /// Required when the alias already exists, absent when creating it
    pub checksum: Option<String>,
    pub conversation_logs: ConversationLogs,
}
