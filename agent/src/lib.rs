//! Jeeves Agent Library
//!
//! Redeploys local checkouts when GitHub reports a push, and reports each
//! deploy stage back as a commit status.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod revision;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
