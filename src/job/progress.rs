/*!
 * Progress notification sinks.
 *
 * Sinks are called from inside the job task after every published snapshot,
 * so `on_progress` must return quickly and never block.
 */

use log::{debug, info};
use tokio::sync::broadcast;

use super::models::{Job, JobStatus};

/// Receives job snapshots as they are published
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, job: &Job);
}

/// Fans snapshots out to any number of broadcast receivers
///
/// Slow receivers lag and lose intermediate snapshots; a send without
/// receivers is simply dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Job>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.sender.subscribe()
    }
}

impl ProgressSink for BroadcastSink {
    fn on_progress(&self, job: &Job) {
        let _ = self.sender.send(job.clone());
    }
}

/// Logs status changes at info level and progress at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, job: &Job) {
        match job.status {
            JobStatus::Running => debug!(
                "[{}] {}% ({}/{} strings, {}/{} files)",
                job.id, job.progress, job.translated_strings, job.total_strings, job.files_done, job.total_files
            ),
            status => info!("[{}] Job {}", job.id, status),
        }
    }
}
