//! Data models

pub mod bot;
pub mod deployment;
pub mod lex;
