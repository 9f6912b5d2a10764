//! Bot export document
//!
//! Only the fields re-submitted with `PutBot` are modelled; everything else
//! in the export (slot types, utterances, fulfilment hooks) travels to the
//! service untouched inside the import payload.

use serde::{Deserialize, Serialize};

/// Top level of `{BotName}_Export.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSchema {
    pub resource: BotResource,
}

/// Bot-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotResource {
    #[serde(default)]
    pub name: Option<String>,

    pub locale: String,

    pub child_directed: bool,

    pub abort_statement: Statement,

    pub clarification_prompt: Prompt,

    pub voice_id: String,

    #[serde(rename = "idleSessionTTLInSeconds")]
    pub idle_session_ttl_in_seconds: i32,

    /// Intents in export order
    #[serde(default)]
    pub intents: Vec<IntentDescriptor>,
}

/// Reference to an intent in the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDescriptor {
    pub name: String,
}

/// A single prompt or statement message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_number: Option<i32>,
}

/// Statement delivered when the conversation is aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub messages: Vec<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_card: Option<String>,
}

/// Prompt used when the bot did not understand the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub messages: Vec<Message>,

    pub max_attempts: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_card: Option<String>,
}

impl BotSchema {
    /// Parse the (already patched) export text
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn intent_names(&self) -> impl Iterator<Item = &str> {
        self.resource.intents.iter().map(|intent| intent.name.as_str())
    }
}
