//! Deployer worker: consumes queued push events

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::deploy::workflow::{DeployOutcome, PushDeployer};
use crate::models::push::PushEvent;

/// Deployer worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Pushes buffered before the webhook endpoint starts rejecting deliveries
    pub queue_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

/// Create the queue the webhook endpoint feeds
pub fn channel(options: &Options) -> (mpsc::Sender<PushEvent>, mpsc::Receiver<PushEvent>) {
    mpsc::channel(options.queue_capacity.max(1))
}

/// Run the deployer worker.
///
/// Every push is deployed on its own task, so pushes arriving while a deploy
/// is running are not held back.
pub async fn run(
    deployer: Arc<PushDeployer>,
    mut events: mpsc::Receiver<PushEvent>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Deployer worker starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Deployer worker shutting down...");
                return;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    info!("Push queue closed, deployer worker exiting...");
                    return;
                };

                debug!("Dispatching push for {}@{}", event.full_name(), event.head_sha);
                let deployer = deployer.clone();
                tokio::spawn(async move {
                    let outcome = deployer.handle_push(&event).await;
                    log_outcome(&event, &outcome);
                });
            }
        }
    }
}

fn log_outcome(event: &PushEvent, outcome: &DeployOutcome) {
    match outcome {
        DeployOutcome::Skipped => debug!("Push for {} skipped", event.full_name()),
        DeployOutcome::Deployed => info!("Push for {} deployed", event.full_name()),
        DeployOutcome::Failed(e) => info!("Push for {} failed: {}", event.full_name(), e),
    }
}
