//! Create/update handler for the `Custom::LexBot` resource
//!
//! A deployment runs these stages in order:
//!
//! 1. download the archive and patch function ARNs to this account
//! 2. grant Lex permission to invoke the fulfilment function (best effort)
//! 3. import the patched export over `$LATEST` and wait for the import
//! 4. publish a version of every intent (failures skip the intent)
//! 5. rebuild `$LATEST` with the versioned intents, wait, cut a bot version
//! 6. create the alias or move it to the new version, wait for its build
//!
//! Whatever happens, exactly one response is sent to CloudFormation.

use cfn_models::{CustomResourceRequest, CustomResourceResponse, RequestType, ResponseStatus};
use tracing::{debug, error, info, warn};

use crate::deploy::archive::{rewrite_function_arns, BotArchive};
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm};
use crate::deploy::waiter::{wait_for_status, PollPolicy};
use crate::errors::DeployerError;
use crate::models::bot::BotSchema;
use crate::models::deployment::{DeploymentRequest, InvocationIdentity, ResourceProperties};
use crate::models::lex::{
    bot_status, import_status, BotIntent, BotRecord, ConversationLogs, ImportJob,
    PutBotAliasRequest, PutBotRequest, LATEST,
};
use crate::services::{PermissionGrant, Services};
use crate::storage::layout::{base_name, ScratchLayout};
use crate::storage::settings::{PollSettings, Settings};
use crate::utils::sha256_hash;

pub const ALIAS_UPDATE_DESCRIPTION: &str = "Update alias";
pub const ALIAS_NEW_DESCRIPTION: &str = "New alias";

const LEX_PRINCIPAL: &str = "lex.amazonaws.com";
const INVOKE_ACTION: &str = "lambda:invokeFunction";

/// Statuses a bot passes through while a build settles
const BUILD_IN_PROGRESS: &[&str] = &[
    bot_status::BUILDING,
    bot_status::NOT_BUILT,
    bot_status::READY_BASIC_TESTING,
];

/// Facts about the running Lambda invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub function_arn: String,
    pub log_stream: String,
    pub request_id: String,
}

/// Orchestrator options
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub layout: ScratchLayout,
    pub default_filename: String,
    pub poll: PollSettings,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for OrchestratorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            layout: ScratchLayout::new(settings.scratch_dir.clone()),
            default_filename: settings.default_filename.clone(),
            poll: settings.poll.clone(),
        }
    }
}

/// Drives one custom resource invocation
pub struct Orchestrator {
    services: Services,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(services: Services, options: OrchestratorOptions) -> Self {
        Self { services, options }
    }

    /// Handle one event and report the outcome to CloudFormation.
    ///
    /// Returns the response that was delivered. An error means the callback
    /// itself could not be sent.
    pub async fn handle(
        &self,
        request: &CustomResourceRequest,
        context: &InvocationContext,
    ) -> Result<CustomResourceResponse, DeployerError> {
        info!(
            "{} request {} for {}",
            request.request_type, request.request_id, request.logical_resource_id
        );

        let (status, result) = match &request.request_type {
            RequestType::Create | RequestType::Update => {
                let verb = request.request_type.as_str().to_lowercase();
                match self.deploy(request, context).await {
                    Ok(()) => (
                        ResponseStatus::Success,
                        format!("Bot has been successfully {}d", verb),
                    ),
                    Err(e) => (
                        ResponseStatus::Failed,
                        format!("Failed to {} bot: {}", verb, e),
                    ),
                }
            }
            other => (
                ResponseStatus::Success,
                format!("Operation {} on bot took no action", other),
            ),
        };

        let response =
            CustomResourceResponse::for_request(request, status, result, &context.log_stream);
        if let Err(e) = self.services.responder.send(request, &response).await {
            error!("Unable to report to CloudFormation: {}", e);
            return Err(e);
        }

        Ok(response)
    }

    async fn deploy(
        &self,
        request: &CustomResourceRequest,
        context: &InvocationContext,
    ) -> Result<(), DeployerError> {
        let mut fsm = DeploymentFsm::new();
        let result = self.run_stages(request, context, &mut fsm).await;

        if let Err(e) = &result {
            if let Err(transition) = fsm.process(DeploymentEvent::Fail(e.to_string())) {
                debug!("{}", transition);
            }
            let stage = fsm
                .failed_stage()
                .map(|s| s.to_string())
                .unwrap_or_else(|| fsm.state().to_string());
            error!(
                "Deployment failed while {}: {}",
                stage,
                fsm.error().unwrap_or("unknown error")
            );
        }

        result
    }

    async fn run_stages(
        &self,
        request: &CustomResourceRequest,
        context: &InvocationContext,
        fsm: &mut DeploymentFsm,
    ) -> Result<(), DeployerError> {
        let deployment = DeploymentRequest {
            kind: request.request_type.clone(),
            properties: ResourceProperties::from_request(request, &self.options.default_filename)?,
        };
        let props = &deployment.properties;
        let identity = InvocationIdentity::from_function_arn(&context.function_arn)?;
        info!(
            "{}: deploying bot {} (alias {}) in {}/{}",
            deployment.kind, props.bot_name, props.bot_alias, identity.account_id, identity.region
        );

        advance(fsm, DeploymentEvent::Fetch)?;
        let patched = self.fetch_export(props, &identity).await?;
        let schema = BotSchema::parse(&patched)?;

        self.grant_invoke_permission(props, &identity).await;

        advance(fsm, DeploymentEvent::Import)?;
        let payload = BotArchive::single_entry(base_name(&props.filename), &patched)?;
        self.import(payload).await?;

        advance(fsm, DeploymentEvent::VersionIntents)?;
        let intents = self.version_intents(&schema).await;

        advance(fsm, DeploymentEvent::Build)?;
        let bot_version = self.build_bot(props, &schema, intents).await?;

        advance(fsm, DeploymentEvent::Publish)?;
        self.publish_alias(props, &bot_version).await?;

        advance(fsm, DeploymentEvent::Complete)?;
        info!(
            "Bot {} version {} is live on alias {}",
            props.bot_name, bot_version, props.bot_alias
        );
        Ok(())
    }

    /// Download the archive and return the export with patched ARNs
    async fn fetch_export(
        &self,
        props: &ResourceProperties,
        identity: &InvocationIdentity,
    ) -> Result<String, DeployerError> {
        let archive_file = self.options.layout.archive_file(&props.filename);
        self.services
            .storage
            .download(&props.s3_bucket, &props.filename, &archive_file)
            .await?;

        let bytes = archive_file.read_bytes().await?;
        if let Err(e) = archive_file.delete().await {
            warn!(
                "Unable to remove {}: {}",
                archive_file.path().display(),
                e
            );
        }

        let export = BotArchive::from_bytes(bytes).read_export(&props.export_name())?;
        Ok(rewrite_function_arns(&export, &identity.account_id).into_owned())
    }

    /// Allow Lex intents to call the fulfilment function; never fatal
    async fn grant_invoke_permission(
        &self,
        props: &ResourceProperties,
        identity: &InvocationIdentity,
    ) {
        let grant = PermissionGrant {
            function_name: props.lambda_function_name.clone(),
            statement_id: format!("{}-intents", props.bot_name),
            action: INVOKE_ACTION.to_string(),
            principal: LEX_PRINCIPAL.to_string(),
            source_arn: identity.intents_source_arn(),
        };

        match self.services.permissions.add_permission(&grant).await {
            Ok(()) => info!("Added permissions to {} function", grant.function_name),
            // Usually the statement already exists from an earlier deployment
            Err(e) => warn!("No permissions added: {}", e),
        }
    }

    async fn import(&self, payload: BotArchive) -> Result<(), DeployerError> {
        debug!("Import payload sha256={}", sha256_hash(payload.as_bytes()));

        let bots = self.services.bots.as_ref();
        let started = bots.start_import(payload.into_bytes()).await?;
        info!("Started import {}", started.import_id);

        let import_id = started.import_id.as_str();
        let policy = self.policy(&[import_status::IN_PROGRESS], &[import_status::FAILED]);
        let job = wait_for_status(
            &policy,
            "importStatus",
            self.services.sleeper.as_ref(),
            move || bots.get_import(import_id),
            |job: &ImportJob| job.import_status.as_str(),
        )
        .await;

        match job {
            Some(job) if job.import_status == import_status::FAILED => {
                Err(DeployerError::BotServiceError(format!(
                    "import {} failed: {}",
                    import_id,
                    job.failure_reasons.join("; ")
                )))
            }
            Some(_) => Ok(()),
            None => {
                warn!("Status of import {} unknown, continuing", import_id);
                Ok(())
            }
        }
    }

    /// Publish a version of every intent in export order.
    ///
    /// An intent that cannot be versioned is left out of the result.
    async fn version_intents(&self, schema: &BotSchema) -> Vec<BotIntent> {
        let mut versioned = Vec::new();

        for name in schema.intent_names() {
            match self.version_intent(name).await {
                Ok(intent) => {
                    info!(
                        "Created version {} of intent {}",
                        intent.intent_version, intent.intent_name
                    );
                    versioned.push(intent);
                }
                Err(e) => warn!("No intent version was added for {}: {}", name, e),
            }
        }

        versioned
    }

    async fn version_intent(&self, name: &str) -> Result<BotIntent, DeployerError> {
        let bots = self.services.bots.as_ref();
        let latest = bots.get_intent(name, LATEST).await?;
        let created = bots.create_intent_version(name, &latest.checksum).await?;

        Ok(BotIntent {
            intent_name: name.to_string(),
            intent_version: created.version,
        })
    }

    /// Rebuild `$LATEST` and return the new bot version
    async fn build_bot(
        &self,
        props: &ResourceProperties,
        schema: &BotSchema,
        intents: Vec<BotIntent>,
    ) -> Result<String, DeployerError> {
        let bots = self.services.bots.as_ref();
        let bot_name = props.bot_name.as_str();

        let current = self
            .wait_for_bot(
                self.policy(&[bot_status::BUILDING], &[bot_status::FAILED]),
                bot_name,
                LATEST,
            )
            .await
            .ok_or_else(|| unreadable_bot(bot_name))?;

        let resource = &schema.resource;
        bots.put_bot(PutBotRequest {
            name: bot_name.to_string(),
            locale: resource.locale.clone(),
            child_directed: resource.child_directed,
            abort_statement: resource.abort_statement.clone(),
            clarification_prompt: resource.clarification_prompt.clone(),
            voice_id: resource.voice_id.clone(),
            idle_session_ttl_in_seconds: resource.idle_session_ttl_in_seconds,
            intents,
            checksum: current.checksum,
        })
        .await?;
        info!("Building bot {}", bot_name);

        let built = self
            .wait_for_bot(
                self.policy(BUILD_IN_PROGRESS, &[bot_status::FAILED]),
                bot_name,
                LATEST,
            )
            .await
            .ok_or_else(|| unreadable_bot(bot_name))?;

        if built.status == bot_status::FAILED {
            return Err(DeployerError::BuildError(format!(
                "{}: {}",
                bot_name,
                built
                    .failure_reason
                    .as_deref()
                    .unwrap_or("no failure reason given")
            )));
        }

        let version = bots.create_bot_version(bot_name, &built.checksum).await?;
        info!("Created version {} of bot {}", version.version, bot_name);
        Ok(version.version)
    }

    /// Create the alias or move it to `bot_version`
    async fn publish_alias(
        &self,
        props: &ResourceProperties,
        bot_version: &str,
    ) -> Result<(), DeployerError> {
        let bots = self.services.bots.as_ref();
        let conversation_logs = ConversationLogs {
            log_group_arn: props.log_group.clone(),
            iam_role_arn: props.log_role.clone(),
        };

        let (description, checksum) =
            match bots.get_bot_alias(&props.bot_alias, &props.bot_name).await {
                Ok(existing) => {
                    info!(
                        "Updating alias {} from version {} to {} with logs in {} via {}",
                        props.bot_alias,
                        existing.bot_version,
                        bot_version,
                        props.log_group,
                        props.log_role
                    );
                    (ALIAS_UPDATE_DESCRIPTION, Some(existing.checksum))
                }
                Err(e) => {
                    debug!("Alias lookup failed, treating it as absent: {}", e);
                    info!(
                        "Publishing alias {} with version {} and logs in {} via {}",
                        props.bot_alias, bot_version, props.log_group, props.log_role
                    );
                    (ALIAS_NEW_DESCRIPTION, None)
                }
            };

        let alias = bots
            .put_bot_alias(PutBotAliasRequest {
                name: props.bot_alias.clone(),
                bot_name: props.bot_name.clone(),
                bot_version: bot_version.to_string(),
                description: description.to_string(),
                checksum,
                conversation_logs,
            })
            .await?;
        debug!("Alias {} now at version {}", alias.name, alias.bot_version);

        let published = self
            .wait_for_bot(
                self.policy(BUILD_IN_PROGRESS, &[bot_status::FAILED]),
                &props.bot_name,
                &props.bot_alias,
            )
            .await;
        if published.is_none() {
            warn!(
                "Status of {} alias {} unknown, continuing",
                props.bot_name, props.bot_alias
            );
        }

        Ok(())
    }

    async fn wait_for_bot(
        &self,
        policy: PollPolicy,
        name: &str,
        version_or_alias: &str,
    ) -> Option<BotRecord> {
        let bots = self.services.bots.as_ref();
        wait_for_status(
            &policy,
            "status",
            self.services.sleeper.as_ref(),
            move || bots.get_bot(name, version_or_alias),
            |bot: &BotRecord| bot.status.as_str(),
        )
        .await
    }

    fn policy(&self, in_progress: &[&str], failed: &[&str]) -> PollPolicy {
        self.options.poll.apply(PollPolicy::new(
            in_progress.iter().copied(),
            failed.iter().copied(),
        ))
    }
}

fn unreadable_bot(bot_name: &str) -> DeployerError {
    DeployerError::BotServiceError(format!("status of bot {} could not be read", bot_name))
}

fn advance(fsm: &mut DeploymentFsm, event: DeploymentEvent) -> Result<(), DeployerError> {
    fsm.process(event).map_err(DeployerError::Internal)?;
    debug!("Stage: {}", fsm.state());
    Ok(())
}
