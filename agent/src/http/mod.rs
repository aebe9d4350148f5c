//! GitHub API client

pub mod client;
pub mod installations;
pub mod statuses;
