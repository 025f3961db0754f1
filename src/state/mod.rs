mod types;

pub use types::*;

use chrono::Utc;
use hlsforge_av::{ProgressSink, ProgressUpdate};
use hlsforge_common::{catalog, EncoderBackend, JobId};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Jobs kept in memory; older jobs are evicted first.
const MAX_TRACKED_JOBS: usize = 16;

#[derive(Default)]
struct Arena {
    jobs: HashMap<JobId, JobProgress>,
    /// Oldest first; the back is the latest job.
    order: VecDeque<JobId>,
}

/// Live progress for recent transcode jobs.
///
/// All state sits behind one lock; readers get cloned snapshots.
pub struct ProgressTracker {
    arena: RwLock<Arena>,
    event_tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressTracker {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            arena: RwLock::new(Arena::default()),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: ProgressEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No subscribers for progress event");
        }
    }

    /// Register a new job with every rendition at 0 and make it the latest.
    pub fn begin_job(&self, job_id: JobId, input: PathBuf, encoder: EncoderBackend) {
        {
            let mut arena = self.arena.write();
            arena
                .jobs
                .insert(job_id, JobProgress::new(job_id, input.clone(), encoder));
            arena.order.push_back(job_id);

            while arena.order.len() > MAX_TRACKED_JOBS {
                if let Some(evicted) = arena.order.pop_front() {
                    arena.jobs.remove(&evicted);
                }
            }
        }

        self.broadcast(ProgressEvent::JobStarted {
            job_id,
            input,
            encoder,
        });
    }

    /// Apply a live update to one rendition.
    pub fn report(&self, job_id: JobId, rendition: &str, update: ProgressUpdate) {
        let changed = {
            let mut arena = self.arena.write();
            arena
                .jobs
                .get_mut(&job_id)
                .and_then(|job| job.entry_mut(rendition))
                .and_then(|entry| entry.apply(update).then(|| entry.clone()))
        };

        if let Some(progress) = changed {
            self.broadcast(ProgressEvent::Rendition { job_id, progress });
        }
    }

    /// Force a rendition to 100 with its final status.
    pub fn finish_rendition(&self, job_id: JobId, rendition: &str, success: bool) {
        let finished = {
            let mut arena = self.arena.write();
            arena
                .jobs
                .get_mut(&job_id)
                .and_then(|job| job.entry_mut(rendition))
                .map(|entry| {
                    entry.finish(success);
                    entry.clone()
                })
        };

        match finished {
            Some(progress) => self.broadcast(ProgressEvent::Rendition { job_id, progress }),
            None => tracing::warn!(%job_id, rendition, "Finished rendition for unknown job"),
        }
    }

    /// Mark the job as done. Returns the labels of failed renditions.
    pub fn finish_job(&self, job_id: JobId) -> Vec<String> {
        let failed = {
            let mut arena = self.arena.write();
            match arena.jobs.get_mut(&job_id) {
                Some(job) => {
                    job.finished_at = Some(Utc::now());
                    job.failed()
                }
                None => return Vec::new(),
            }
        };

        self.broadcast(ProgressEvent::JobFinished {
            job_id,
            failed: failed.clone(),
        });
        failed
    }

    /// Snapshot of the latest job, or all renditions pending if none has run.
    pub fn latest(&self) -> Vec<RenditionProgress> {
        let arena = self.arena.read();
        arena
            .order
            .back()
            .and_then(|id| arena.jobs.get(id))
            .map(|job| job.renditions.clone())
            .unwrap_or_else(|| {
                catalog()
                    .iter()
                    .map(|r| RenditionProgress::pending(r.label))
                    .collect()
            })
    }

    pub fn latest_job_id(&self) -> Option<JobId> {
        self.arena.read().order.back().copied()
    }

    /// Snapshot of one job, if it is still tracked.
    pub fn job(&self, job_id: JobId) -> Option<JobProgress> {
        self.arena.read().jobs.get(&job_id).cloned()
    }

    /// Number of jobs currently held.
    pub fn tracked_jobs(&self) -> usize {
        self.arena.read().jobs.len()
    }

    /// A [`ProgressSink`] that feeds updates into `job_id`.
    pub fn sink(self: &Arc<Self>, job_id: JobId) -> Arc<dyn ProgressSink> {
        Arc::new(JobSink {
            tracker: Arc::clone(self),
            job_id,
        })
    }
}

struct JobSink {
    tracker: Arc<ProgressTracker>,
    job_id: JobId,
}

impl ProgressSink for JobSink {
    fn report(&self, rendition: &str, update: ProgressUpdate) {
        self.tracker.report(self.job_id, rendition, update);
    }
}
