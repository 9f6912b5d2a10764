//! Custom resource wire models

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle operation requested by CloudFormation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Any value CloudFormation may add later; kept verbatim
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
            RequestType::Other(s) => s,
        }
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => RequestType::Create,
            "Update" => RequestType::Update,
            "Delete" => RequestType::Delete,
            _ => RequestType::Other(value),
        }
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered to the handler by CloudFormation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,

    #[serde(rename = "ResponseURL")]
    pub response_url: String,

    pub stack_id: String,

    pub request_id: String,

    #[serde(default)]
    pub resource_type: String,

    pub logical_resource_id: String,

    /// Absent on Create
    #[serde(default)]
    pub physical_resource_id: Option<String>,

    /// Template properties; CloudFormation stringifies scalar values
    #[serde(default)]
    pub resource_properties: HashMap<String, serde_json::Value>,

    /// Only present on Update
    #[serde(default)]
    pub old_resource_properties: Option<HashMap<String, serde_json::Value>>,
}

impl CustomResourceRequest {
    /// Look up a property as a string, accepting numbers and booleans
    pub fn property(&self, name: &str) -> Option<String> {
        match self.resource_properties.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Outcome reported back to CloudFormation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Response document PUT to the pre-signed `ResponseURL`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

/// Payload exposed to the template through `Fn::GetAtt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseData {
    pub result: String,
}

impl CustomResourceResponse {
    /// Build a response that echoes the identifiers of `request`.
    ///
    /// `log_stream` is used both in the reason text and as the physical id
    /// when the request does not carry one yet.
    pub fn for_request(
        request: &CustomResourceRequest,
        status: ResponseStatus,
        result: impl Into<String>,
        log_stream: &str,
    ) -> Self {
        Self {
            status,
            reason: format!("See the details in CloudWatch Log Stream: {}", log_stream),
            physical_resource_id: request
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| log_stream.to_string()),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            no_echo: false,
            data: Some(ResponseData {
                result: result.into(),
            }),
        }
    }
}
