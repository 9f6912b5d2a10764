//! Lex bot deployer - Lambda entry point
//!
//! Settings, logging and AWS clients are set up once per cold start; every
//! event is then handed to the orchestrator.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use cfn_models::CustomResourceRequest;
use lambda_runtime::{service_fn, LambdaEvent};
use tracing::{error, info};

use lexdeploy::deploy::orchestrator::{InvocationContext, Orchestrator, OrchestratorOptions};
use lexdeploy::http::client::CallbackClient;
use lexdeploy::logs::init_logging;
use lexdeploy::services::lambda::LambdaPermissions;
use lexdeploy::services::lex::LexModels;
use lexdeploy::services::s3::S3Store;
use lexdeploy::services::{Services, TokioSleeper};
use lexdeploy::storage::settings::Settings;
use lexdeploy::utils::version_info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    if let Err(e) = init_logging(settings.log_options()) {
        println!("Failed to initialize logging: {e}");
    }

    let version = version_info();
    info!(
        "Starting Lex bot deployer {} ({}, built {})",
        version.version, version.git_hash, version.build_time
    );
    info!("Settings: {:?}", settings);

    let aws = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let services = Services {
        storage: Arc::new(S3Store::new(aws_sdk_s3::Client::new(&aws))),
        bots: Arc::new(LexModels::new(aws_sdk_lexmodelbuilding::Client::new(&aws))),
        permissions: Arc::new(LambdaPermissions::new(aws_sdk_lambda::Client::new(&aws))),
        responder: Arc::new(CallbackClient::new(settings.callback_timeout())?),
        sleeper: Arc::new(TokioSleeper),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        services,
        OrchestratorOptions::from(&settings),
    ));

    lambda_runtime::run(service_fn(|event: LambdaEvent<CustomResourceRequest>| {
        let orchestrator = Arc::clone(&orchestrator);
        async move { handle_event(&orchestrator, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

async fn handle_event(
    orchestrator: &Orchestrator,
    event: LambdaEvent<CustomResourceRequest>,
) -> Result<serde_json::Value, lambda_runtime::Error> {
    let context = InvocationContext {
        function_arn: event.context.invoked_function_arn.clone(),
        log_stream: event.context.env_config.log_stream.clone(),
        request_id: event.context.request_id.clone(),
    };

    match orchestrator.handle(&event.payload, &context).await {
        Ok(response) => Ok(serde_json::to_value(&response)?),
        Err(e) => {
            error!("Invocation {} ended without a callback: {}", context.request_id, e);
            Err(e.into())
        }
    }
}
