use chrono::{DateTime, Utc};
use hlsforge_av::ProgressUpdate;
use hlsforge_common::{catalog, EncoderBackend, JobId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenditionStatus {
    Pending,
    Running,
    /// ffmpeg is running but its last status line had no usable time.
    Unknown,
    Completed,
    Failed,
}

impl RenditionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenditionStatus::Completed | RenditionStatus::Failed)
    }
}

/// Progress of one rendition, as served by the progress endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionProgress {
    pub rendition: String,
    pub percent: f64,
    pub status: RenditionStatus,
}

impl RenditionProgress {
    pub fn pending(label: &str) -> Self {
        Self {
            rendition: label.to_string(),
            percent: 0.0,
            status: RenditionStatus::Pending,
        }
    }

    /// Apply a live update. Returns whether anything changed.
    ///
    /// Percent never decreases, and terminal entries are frozen.
    pub fn apply(&mut self, update: ProgressUpdate) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        let before = (self.percent, self.status);
        match update {
            ProgressUpdate::Percent(pct) => {
                self.percent = self.percent.max(pct.clamp(0.0, 100.0));
                self.status = RenditionStatus::Running;
            }
            ProgressUpdate::Unknown => self.status = RenditionStatus::Unknown,
        }
        before != (self.percent, self.status)
    }

    /// Force to 100 with a terminal status.
    pub fn finish(&mut self, success: bool) {
        self.percent = 100.0;
        self.status = if success {
            RenditionStatus::Completed
        } else {
            RenditionStatus::Failed
        };
    }
}

/// Progress for every rendition of one transcode job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: JobId,
    pub input: PathBuf,
    pub encoder: EncoderBackend,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// One entry per catalog rendition, in catalog order.
    pub renditions: Vec<RenditionProgress>,
}

impl JobProgress {
    pub fn new(job_id: JobId, input: PathBuf, encoder: EncoderBackend) -> Self {
        Self {
            job_id,
            input,
            encoder,
            started_at: Utc::now(),
            finished_at: None,
            renditions: catalog()
                .iter()
                .map(|r| RenditionProgress::pending(r.label))
                .collect(),
        }
    }

    pub fn entry_mut(&mut self, label: &str) -> Option<&mut RenditionProgress> {
        self.renditions.iter_mut().find(|r| r.rendition == label)
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Labels of renditions that ended in failure.
    pub fn failed(&self) -> Vec<String> {
        self.renditions
            .iter()
            .filter(|r| r.status == RenditionStatus::Failed)
            .map(|r| r.rendition.clone())
            .collect()
    }
}

/// Event broadcast to progress stream subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProgressEvent {
    JobStarted {
        job_id: JobId,
        input: PathBuf,
        encoder: EncoderBackend,
    },
    Rendition {
        job_id: JobId,
        #[serde(flatten)]
        progress: RenditionProgress,
    },
    JobFinished {
        job_id: JobId,
        failed: Vec<String>,
    },
}
