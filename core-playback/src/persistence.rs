//! Fire-and-forget persistence worker.
//!
//! Transport calls must never wait on (or fail because of) storage. Writes are
//! queued on an unbounded channel and executed in order by a single task;
//! store errors are logged and dropped.

use bridge_traits::{BookId, ProgressStore, SettingsPatch, SettingsStore};
use core_async::sync::{mpsc, oneshot};
use core_async::task;
use std::sync::Arc;
use tracing::{debug, trace, warn};

enum PersistJob {
    Progress { book_id: BookId, position: f64 },
    Settings(SettingsPatch),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub(crate) struct Persister {
    jobs: mpsc::UnboundedSender<PersistJob>,
}

impl Persister {
    /// Spawn the worker on the current runtime.
    pub(crate) fn spawn(
        progress_store: Arc<dyn ProgressStore>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel();

        task::spawn(async move {
            while let Some(job) = queue.recv().await {
                match job {
                    PersistJob::Progress { book_id, position } => {
                        match progress_store.save(&book_id, position).await {
                            Ok(()) => trace!(book_id = %book_id, position, "Progress saved"),
                            Err(err) => warn!(
                                book_id = %book_id,
                                position,
                                error = %err,
                                "Failed to save progress"
                            ),
                        }
                    }
                    PersistJob::Settings(patch) => {
                        if let Err(err) = settings_store.save(patch).await {
                            warn!(?patch, error = %err, "Failed to save settings");
                        }
                    }
                    PersistJob::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Persistence worker stopped");
        });

        Self { jobs }
    }

    pub(crate) fn save_progress(&self, book_id: BookId, position: f64) {
        self.enqueue(PersistJob::Progress { book_id, position });
    }

    pub(crate) fn save_settings(&self, patch: SettingsPatch) {
        self.enqueue(PersistJob::Settings(patch));
    }

    /// Wait until every job queued before this call has run.
    pub(crate) async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        self.enqueue(PersistJob::Flush(done));
        let _ = finished.await;
    }

    fn enqueue(&self, job: PersistJob) {
        if self.jobs.send(job).is_err() {
            warn!("Persistence worker is gone, dropping write");
        }
    }
}
