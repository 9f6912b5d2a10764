//! Deployment module

pub mod archive;
pub mod fsm;
pub mod orchestrator;
pub mod waiter;
