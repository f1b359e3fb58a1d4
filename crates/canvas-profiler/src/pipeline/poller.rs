use tracing::{debug, error, info};

use crate::error::Result;
use crate::pipeline::JobProcessor;

impl JobProcessor {
    /// Run sweeps at `poll_interval` until the cancellation token fires.
    ///
    /// Cancellation is observed before each sweep and during the sleep
    /// between sweeps; a sweep in progress always finishes its jobs. Sweep
    /// errors are logged and the loop carries on.
    pub async fn run_poller(&self) -> Result<()> {
        info!(
            "Poller started (interval {:?}, up to {} jobs per sweep)",
            self.config.poll_interval, self.config.jobs_per_sweep
        );

        loop {
            if self.check_cancelled().is_err() {
                break;
            }

            match self.run_sweep().await {
                Ok(summary) if summary.selected > 0 => info!(
                    "Sweep finished: {} completed, {} failed, {} skipped",
                    summary.completed, summary.failed, summary.skipped
                ),
                Ok(_) => debug!("No queued jobs"),
                Err(e) => error!("Sweep failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        info!("Poller stopped");
        Ok(())
    }
}
