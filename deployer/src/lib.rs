//! Lex bot deployer
//!
//! CloudFormation custom resource handler that imports a bot export from
//! S3, builds and versions it, and publishes it behind an alias.

pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
