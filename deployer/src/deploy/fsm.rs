//! Finite state machine tracking the deployment stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Nothing started yet
    Pending,

    /// Downloading and patching the archive
    Fetching,

    /// Import job submitted
    Importing,

    /// Publishing intent versions
    VersioningIntents,

    /// Rebuilding `$LATEST` and cutting a bot version
    Building,

    /// Creating or moving the alias
    Publishing,

    /// Alias points at the new version
    Deployed,

    /// Aborted; see [`DeploymentFsm::failed_stage`]
    Failed,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentState::Pending => "pending",
            DeploymentState::Fetching => "fetching",
            DeploymentState::Importing => "importing",
            DeploymentState::VersioningIntents => "versioning intents",
            DeploymentState::Building => "building",
            DeploymentState::Publishing => "publishing",
            DeploymentState::Deployed => "deployed",
            DeploymentState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    Fetch,
    Import,
    VersionIntents,
    Build,
    Publish,
    Complete,
    Fail(String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    state: DeploymentState,
    failed_stage: Option<DeploymentState>,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::Pending,
            failed_stage: None,
            error: None,
        }
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Stage that was running when the deployment failed
    pub fn failed_stage(&self) -> Option<DeploymentState> {
        self.failed_stage
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (self.state, &event) {
            (DeploymentState::Pending, DeploymentEvent::Fetch) => DeploymentState::Fetching,
            (DeploymentState::Fetching, DeploymentEvent::Import) => DeploymentState::Importing,
            (DeploymentState::Importing, DeploymentEvent::VersionIntents) => {
                DeploymentState::VersioningIntents
            }
            (DeploymentState::VersioningIntents, DeploymentEvent::Build) => {
                DeploymentState::Building
            }
            (DeploymentState::Building, DeploymentEvent::Publish) => DeploymentState::Publishing,
            (DeploymentState::Publishing, DeploymentEvent::Complete) => DeploymentState::Deployed,

            // Any stage still running can fail
            (state, DeploymentEvent::Fail(err))
                if state != DeploymentState::Deployed && state != DeploymentState::Failed =>
            {
                self.failed_stage = Some(state);
                self.error = Some(err.clone());
                DeploymentState::Failed
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            DeploymentState::Deployed | DeploymentState::Failed
        )
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
