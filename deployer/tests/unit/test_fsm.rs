//! FSM unit tests

use lexdeploy::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), DeploymentState::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.failed_stage().is_none());
    assert!(!fsm.is_finished());
}

#[test]
fn test_fsm_stage_order() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Fetch).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Fetching);

    fsm.process(DeploymentEvent::Import).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Importing);

    fsm.process(DeploymentEvent::VersionIntents).unwrap();
    assert_eq!(fsm.state(), DeploymentState::VersioningIntents);

    fsm.process(DeploymentEvent::Build).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Building);

    fsm.process(DeploymentEvent::Publish).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Publishing);

    fsm.process(DeploymentEvent::Complete).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Deployed);
}

#[test]
fn test_fsm_failure_before_any_stage() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Fail("missing BotName".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), DeploymentState::Failed);
    assert_eq!(fsm.failed_stage(), Some(DeploymentState::Pending));
    assert_eq!(fsm.error(), Some("missing BotName"));
}

#[test]
fn test_fsm_failure_during_build() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Fetch).unwrap();
    fsm.process(DeploymentEvent::Import).unwrap();
    fsm.process(DeploymentEvent::VersionIntents).unwrap();
    fsm.process(DeploymentEvent::Build).unwrap();

    fsm.process(DeploymentEvent::Fail("bot FAILED".to_string()))
        .unwrap();

    assert_eq!(fsm.failed_stage(), Some(DeploymentState::Building));
    assert_eq!(fsm.failed_stage().unwrap().to_string(), "building");
    assert!(fsm.is_finished());
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = DeploymentFsm::new();

    // Cannot skip straight to building
    assert!(fsm.process(DeploymentEvent::Build).is_err());
    assert_eq!(fsm.state(), DeploymentState::Pending);
}

#[test]
fn test_fsm_terminal_states_reject_events() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Fail("first".to_string())).unwrap();

    assert!(fsm.process(DeploymentEvent::Fail("second".to_string())).is_err());
    assert!(fsm.process(DeploymentEvent::Fetch).is_err());
    assert_eq!(fsm.error(), Some("first"));
}
