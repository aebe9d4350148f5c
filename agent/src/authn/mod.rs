//! GitHub authentication

pub mod app_token;
pub mod token_mngr;
pub mod webhook;
