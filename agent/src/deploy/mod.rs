//! Deployment module

pub mod command;
pub mod reporter;
pub mod target;
pub mod workflow;
