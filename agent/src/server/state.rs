//! Server state

use secrecy::SecretString;
use tokio::sync::mpsc;

use crate::models::push::PushEvent;
use crate::revision::SelfRevision;

/// Server state shared across handlers
pub struct ServerState {
    /// Revision computed at boot, never changes afterwards
    pub revision: SelfRevision,

    /// Secret GitHub signs deliveries with
    pub webhook_secret: SecretString,

    /// Queue consumed by the deployer worker
    pub push_tx: mpsc::Sender<PushEvent>,
}

impl ServerState {
    pub fn new(
        revision: SelfRevision,
        webhook_secret: SecretString,
        push_tx: mpsc::Sender<PushEvent>,
    ) -> Self {
        Self {
            revision,
            webhook_secret,
            push_tx,
        }
    }
}
