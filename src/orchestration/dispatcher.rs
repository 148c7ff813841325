//! # Copy Dispatcher
//!
//! Hands a [`CopyJob`] to whichever executor the deployment is configured
//! for. In `queue` mode the job is published and this call returns once the
//! broker has confirmed it; in `inline` mode the copy runs on a spawned task
//! in this process.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::DispatchMode;
use crate::error::{ReviewError, ReviewResult};
use crate::messaging::{CopyJob, CopyJobQueue};
use crate::worker::CopyWorker;

#[derive(Debug, Clone)]
pub struct CopyDispatcher {
    mode: DispatchMode,
    messaging: Arc<dyn CopyJobQueue>,
    queue_name: String,
    worker: CopyWorker,
}

impl CopyDispatcher {
    pub fn new(
        mode: DispatchMode,
        messaging: Arc<dyn CopyJobQueue>,
        queue_name: impl Into<String>,
        worker: CopyWorker,
    ) -> Self {
        Self {
            mode,
            messaging,
            queue_name: queue_name.into(),
            worker,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub async fn dispatch(&self, job: CopyJob) -> ReviewResult<()> {
        match self.mode {
            DispatchMode::Queue => {
                self.messaging
                    .publish(&self.queue_name, &job)
                    .await
                    .map_err(|e| ReviewError::DispatchFailed {
                        version_id: job.new_version_id,
                        message: e.to_string(),
                    })?;
                debug!(
                    trace_id = %job.trace_id,
                    version_id = job.new_version_id,
                    queue = %self.queue_name,
                    "📤 Copy job published"
                );
            }
            DispatchMode::Inline => {
                let worker = self.worker.clone();
                debug!(trace_id = %job.trace_id, "Running copy job inline");
                tokio::spawn(async move {
                    // execute_copy records the failure flag itself
                    if let Err(e) = worker.execute_copy(&job).await {
                        error!(trace_id = %job.trace_id, error = %e, "Inline copy job failed");
                    }
                });
            }
        }
        Ok(())
    }
}
