//! Data models

pub mod push;
pub mod status;
