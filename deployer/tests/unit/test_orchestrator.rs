//! End-to-end handler tests against in-memory services

mod fakes;

use std::io::{Cursor, Read};
use std::path::Path;

use cfn_models::{CustomResourceRequest, ResponseStatus};
use serde_json::json;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use fakes::{FakeBots, Harness};
use lexdeploy::deploy::orchestrator::{
    InvocationContext, Orchestrator, OrchestratorOptions, ALIAS_NEW_DESCRIPTION,
    ALIAS_UPDATE_DESCRIPTION,
};
use lexdeploy::models::lex::BotAliasRecord;
use lexdeploy::storage::layout::ScratchLayout;
use lexdeploy::storage::settings::PollSettings;

const BUCKET: &str = "bot-artifacts";
const BOT: &str = "OrderFlowers";
const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:111122223333:function:deployer";
const FOREIGN_ARN: &str = "arn:aws:lambda:us-east-1:999988887777:function:Fulfil";

fn export_document() -> String {
    json!({
        "metadata": {"schemaVersion": "1.0", "importType": "LEX"},
        "resource": {
            "name": BOT,
            "version": "1",
            "locale": "en-US",
            "childDirected": false,
            "voiceId": "Salli",
            "idleSessionTTLInSeconds": 300,
            "abortStatement": {
                "messages": [{"contentType": "PlainText", "content": "Sorry, goodbye."}]
            },
            "clarificationPrompt": {
                "messages": [{"contentType": "PlainText", "content": "Say again?"}],
                "maxAttempts": 2
            },
            "intents": [
                {
                    "name": "OrderFlowers",
                    "fulfillmentActivity": {
                        "type": "CodeHook",
                        "codeHook": {"uri": FOREIGN_ARN, "messageVersion": "1.0"}
                    }
                },
                {"name": "CancelOrder"}
            ]
        }
    })
    .to_string()
}

fn archive_with(entry: &str, content: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(entry, SimpleFileOptions::default()).unwrap();
    std::io::Write::write_all(&mut writer, content.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn request(request_type: &str) -> CustomResourceRequest {
    serde_json::from_value(json!({
        "RequestType": request_type,
        "ResponseURL": "https://cloudformation-custom-resource-response.example/abc",
        "StackId": "arn:aws:cloudformation:us-east-1:111122223333:stack/bots/1",
        "RequestId": "req-1",
        "ResourceType": "Custom::LexBot",
        "LogicalResourceId": "Bot",
        "ResourceProperties": {
            "ServiceToken": FUNCTION_ARN,
            "Filename": "bots/lex.zip",
            "S3Bucket": BUCKET,
            "LambdaFunctionName": "Fulfil",
            "BotName": BOT,
            "BotAlias": "prod",
            "LogGroup": "arn:aws:logs:us-east-1:111122223333:log-group:lex",
            "LogRole": "arn:aws:iam::111122223333:role/lex-logs"
        }
    }))
    .unwrap()
}

fn context() -> InvocationContext {
    InvocationContext {
        function_arn: FUNCTION_ARN.to_string(),
        log_stream: "2024/01/01/[$LATEST]abcdef".to_string(),
        request_id: "lambda-req-1".to_string(),
    }
}

struct Fixture {
    harness: Harness,
    orchestrator: Orchestrator,
    scratch: TempDir,
}

fn fixture(harness: Harness) -> Fixture {
    let scratch = TempDir::new().unwrap();
    harness.store.put(
        BUCKET,
        "bots/lex.zip",
        archive_with(&format!("{}_Export.json", BOT), &export_document()),
    );

    let options = OrchestratorOptions {
        layout: ScratchLayout::new(scratch.path()),
        default_filename: "lex.zip".to_string(),
        poll: PollSettings::default(),
    };
    let orchestrator = Orchestrator::new(harness.services(), options);

    Fixture {
        harness,
        orchestrator,
        scratch,
    }
}

fn unzip_single(payload: &[u8]) -> (String, String) {
    let mut archive = ZipArchive::new(Cursor::new(payload)).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    (entry.name().to_string(), text)
}

#[tokio::test]
async fn test_create_deploys_bot_end_to_end() {
    let f = fixture(Harness::new(FakeBots::default()));

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.data.as_ref().unwrap().result,
        "Bot has been successfully created"
    );
    assert_eq!(f.harness.responder.responses().len(), 1);

    let bots = &f.harness.bots;
    assert_eq!(bots.calls_to("StartImport"), 1);
    assert_eq!(bots.calls_to("CreateIntentVersion"), 2);
    assert_eq!(bots.calls_to("PutBot"), 1);
    assert_eq!(bots.calls_to("PutBotAlias"), 1);
    assert!(bots
        .calls()
        .contains(&"CreateBotVersion OrderFlowers bot-checksum-2".to_string()));
    assert!(bots.calls().contains(&"GetBot OrderFlowers:prod".to_string()));

    let payloads = bots.imported_payloads.lock().unwrap().clone();
    let (entry, text) = unzip_single(&payloads[0]);
    assert_eq!(entry, "lex.zip");
    assert!(text.contains("arn:aws:lambda:us-east-1:111122223333:function:Fulfil"));
    assert!(!text.contains("999988887777"));

    let put_bot = bots.put_bots.lock().unwrap()[0].clone();
    assert_eq!(put_bot.checksum, "bot-checksum-1");
    assert_eq!(put_bot.intents.len(), 2);
    assert_eq!(put_bot.intents[0].intent_name, "OrderFlowers");
    assert_eq!(put_bot.intents[0].intent_version, "3");
    assert_eq!(put_bot.idle_session_ttl_in_seconds, 300);

    let alias = bots.put_aliases.lock().unwrap()[0].clone();
    assert_eq!(alias.description, ALIAS_NEW_DESCRIPTION);
    assert_eq!(alias.checksum, None);
    assert_eq!(alias.bot_version, "7");
    assert_eq!(
        alias.conversation_logs.log_group_arn,
        "arn:aws:logs:us-east-1:111122223333:log-group:lex"
    );

    let grants = f.harness.permissions.grants.lock().unwrap().clone();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].statement_id, "OrderFlowers-intents");
    assert_eq!(
        grants[0].source_arn,
        "arn:aws:lex:us-east-1:111122223333:intent:*"
    );
}

#[tokio::test]
async fn test_update_moves_existing_alias() {
    let bots = FakeBots::default().with_alias(BotAliasRecord {
        name: "prod".to_string(),
        bot_name: BOT.to_string(),
        bot_version: "6".to_string(),
        checksum: "alias-checksum-old".to_string(),
    });
    let f = fixture(Harness::new(bots));

    let response = assert_ok!(f.orchestrator.handle(&request("Update"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.data.unwrap().result,
        "Bot has been successfully updated"
    );
    let alias = f.harness.bots.put_aliases.lock().unwrap()[0].clone();
    assert_eq!(alias.description, ALIAS_UPDATE_DESCRIPTION);
    assert_eq!(alias.checksum.as_deref(), Some("alias-checksum-old"));
}

#[tokio::test]
async fn test_delete_takes_no_action() {
    let f = fixture(Harness::new(FakeBots::default()));

    let response = assert_ok!(f.orchestrator.handle(&request("Delete"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.data.unwrap().result,
        "Operation Delete on bot took no action"
    );
    assert!(f.harness.bots.calls().is_empty());
    assert!(f.harness.permissions.grants.lock().unwrap().is_empty());
    assert_eq!(f.harness.responder.responses().len(), 1);
}

#[tokio::test]
async fn test_intent_that_cannot_be_versioned_is_omitted() {
    let f = fixture(Harness::new(
        FakeBots::default().with_failing_intent("CancelOrder"),
    ));

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    let put_bot = f.harness.bots.put_bots.lock().unwrap()[0].clone();
    let names: Vec<_> = put_bot.intents.iter().map(|i| i.intent_name.as_str()).collect();
    assert_eq!(names, vec!["OrderFlowers"]);
}

#[tokio::test]
async fn test_import_failure_reports_failed() {
    let f = fixture(Harness::new(
        FakeBots::default().with_import_statuses(&["IN_PROGRESS", "FAILED"]),
    ));

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Failed);
    let result = response.data.unwrap().result;
    assert!(result.starts_with("Failed to create bot: "));
    assert!(result.contains("intent slot type missing"));
    assert_eq!(f.harness.bots.calls_to("PutBot"), 0);
    assert_eq!(f.harness.responder.responses().len(), 1);
}

#[tokio::test]
async fn test_build_failure_reports_failed() {
    let f = fixture(Harness::new(
        FakeBots::default().with_bot_statuses(&["READY", "BUILDING", "FAILED"]),
    ));

    let response = assert_ok!(f.orchestrator.handle(&request("Update"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Failed);
    let result = response.data.unwrap().result;
    assert!(result.starts_with("Failed to update bot: Build failed"));
    assert!(result.contains("missing slot"));
    assert_eq!(f.harness.bots.calls_to("CreateBotVersion"), 0);
    assert_eq!(f.harness.bots.calls_to("PutBotAlias"), 0);
}

#[tokio::test]
async fn test_missing_export_reports_failed() {
    let harness = Harness::new(FakeBots::default());
    let f = fixture(harness);
    f.harness.store.put(
        BUCKET,
        "bots/lex.zip",
        archive_with("SomethingElse_Export.json", "{}"),
    );

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Failed);
    assert!(response
        .data
        .unwrap()
        .result
        .contains("OrderFlowers_Export.json not found"));
    assert!(f.harness.bots.calls().is_empty());
}

#[tokio::test]
async fn test_permission_failure_is_ignored() {
    let f = fixture(Harness::new(FakeBots::default()).with_failing_permissions());

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(f.harness.permissions.grants.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_property_reports_failed() {
    let f = fixture(Harness::new(FakeBots::default()));
    let mut event = request("Create");
    event.resource_properties.remove("BotAlias");

    let response = assert_ok!(f.orchestrator.handle(&event, &context()).await);

    assert_eq!(response.status, ResponseStatus::Failed);
    assert!(response
        .data
        .unwrap()
        .result
        .contains("missing resource property BotAlias"));
    assert!(f.harness.bots.calls().is_empty());
}

#[tokio::test]
async fn test_callback_failure_is_returned() {
    let f = fixture(Harness::new(FakeBots::default()).with_failing_responder());

    let err = assert_err!(f.orchestrator.handle(&request("Delete"), &context()).await);

    assert!(err.to_string().contains("403 Forbidden"));
}

#[tokio::test]
async fn test_scratch_archive_is_removed() {
    let f = fixture(Harness::new(FakeBots::default()));

    assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    let scratch_file = f.scratch.path().join("lex.zip");
    assert!(!Path::new(&scratch_file).exists());
    assert_eq!(std::fs::read_dir(f.scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_response_echoes_request_identifiers() {
    let f = fixture(Harness::new(FakeBots::default()));

    let response = assert_ok!(f.orchestrator.handle(&request("Delete"), &context()).await);

    assert_eq!(response.request_id, "req-1");
    assert_eq!(response.logical_resource_id, "Bot");
    assert_eq!(response.physical_resource_id, "2024/01/01/[$LATEST]abcdef");
    assert_eq!(
        response.reason,
        "See the details in CloudWatch Log Stream: 2024/01/01/[$LATEST]abcdef"
    );
}

#[tokio::test]
async fn test_unreadable_alias_status_still_succeeds() {
    let f = fixture(Harness::new(FakeBots::default().with_failing_alias_reads()));

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(f.harness.bots.calls_to("PutBotAlias"), 1);
    let alias_reads = f
        .harness
        .bots
        .calls()
        .iter()
        .filter(|call| call.as_str() == "GetBot OrderFlowers:prod")
        .count();
    assert_eq!(alias_reads, 20);
    assert!(f.harness.sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_unreadable_import_status_continues() {
    let f = fixture(Harness::new(FakeBots::default().with_failing_import_reads()));

    let response = assert_ok!(f.orchestrator.handle(&request("Create"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(f.harness.bots.calls_to("GetImport"), 20);
    assert_eq!(f.harness.bots.calls_to("PutBot"), 1);
    assert_eq!(f.harness.bots.calls_to("PutBotAlias"), 1);
}

#[tokio::test]
async fn test_alias_update_failure_is_fatal() {
    let bots = FakeBots::default()
        .with_alias(BotAliasRecord {
            name: "prod".to_string(),
            bot_name: BOT.to_string(),
            bot_version: "6".to_string(),
            checksum: "alias-checksum-old".to_string(),
        })
        .with_failing_alias_put();
    let f = fixture(Harness::new(bots));

    let response = assert_ok!(f.orchestrator.handle(&request("Update"), &context()).await);

    assert_eq!(response.status, ResponseStatus::Failed);
    assert!(response
        .data
        .unwrap()
        .result
        .contains("PreconditionFailedException"));
    assert_eq!(f.harness.bots.calls_to("PutBotAlias"), 1);
    let aliases = f.harness.bots.put_aliases.lock().unwrap().clone();
    assert!(aliases
        .iter()
        .all(|alias| alias.description == ALIAS_UPDATE_DESCRIPTION));
    assert!(!f.harness.bots.calls().contains(&"GetBot OrderFlowers:prod".to_string()));
}
