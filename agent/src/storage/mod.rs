//! Persistent storage: layout, settings and the key-value brain

pub mod brain;
pub mod layout;
pub mod settings;
