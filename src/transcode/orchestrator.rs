use crate::config::Config;
use crate::error::{Error, Result};
use crate::state::ProgressTracker;
use crate::transcode::input::{explicit_input, resolve_input};
use crate::transcode::manifest::write_manifest;
use hlsforge_av::{
    get_tool_path, probe_media, CapabilityProbe, EncodeSettings, FfmpegCapabilityProbe,
    FfmpegTimeParser, ProgressParser, RenditionJob,
};
use hlsforge_common::{catalog, EncoderBackend, JobId, RenditionSpec};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// How one rendition ended.
#[derive(Debug, Clone, Serialize)]
pub struct RenditionOutcome {
    pub rendition: &'static str,
    pub encoder: EncoderBackend,
    /// `None` on success.
    pub error: Option<String>,
}

impl RenditionOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one full transcode.
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeOutcome {
    pub job_id: JobId,
    pub input: PathBuf,
    pub encoder: EncoderBackend,
    pub duration: f64,
    pub has_audio: bool,
    /// In catalog order.
    pub renditions: Vec<RenditionOutcome>,
    /// Where the master playlist was written, if writing succeeded.
    pub manifest: Option<PathBuf>,
}

impl TranscodeOutcome {
    pub fn failed(&self) -> impl Iterator<Item = &RenditionOutcome> {
        self.renditions.iter().filter(|r| !r.succeeded())
    }
}

/// Runs one transcode at a time: probe, fan out every rendition, join, write the manifest.
pub struct Transcoder {
    config: Arc<Config>,
    settings: EncodeSettings,
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    capabilities: Arc<dyn CapabilityProbe>,
    parser: Arc<dyn ProgressParser>,
    tracker: Arc<ProgressTracker>,
    running: Mutex<()>,
    shutdown: CancellationToken,
}

impl Transcoder {
    pub fn new(config: Arc<Config>, tracker: Arc<ProgressTracker>) -> anyhow::Result<Self> {
        let settings = config.encode_settings()?;
        let ffmpeg = resolve_tool("ffmpeg", config.tools.ffmpeg_path.as_deref());
        let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());
        let capabilities = Arc::new(FfmpegCapabilityProbe::new(ffmpeg.clone()));

        Ok(Self {
            config,
            settings,
            ffmpeg,
            ffprobe,
            capabilities,
            parser: Arc::new(FfmpegTimeParser),
            tracker,
            running: Mutex::new(()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Replace the encoder capability source.
    pub fn with_capability_probe(mut self, probe: Arc<dyn CapabilityProbe>) -> Self {
        self.capabilities = probe;
        self
    }

    /// Replace the stderr progress parser handed to every rendition job.
    pub fn with_progress_parser(mut self, parser: Arc<dyn ProgressParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    /// Whether a transcode is in flight.
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Kill every running encode. Later transcodes are cancelled immediately.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Backend for the next job: the configured one, or whatever the host supports.
    pub async fn select_backend(&self) -> EncoderBackend {
        match self.config.encoder.backend.pinned() {
            Some(backend) => backend,
            None => self.capabilities.detect_backend().await,
        }
    }

    /// Transcode the first configured input candidate.
    pub async fn run(&self) -> Result<TranscodeOutcome> {
        self.run_with_input(None).await
    }

    /// Run a transcode on its own task.
    ///
    /// The job keeps going if the returned handle is dropped, so an HTTP
    /// caller that disconnects does not cancel its encodes.
    pub fn spawn_run(
        self: &Arc<Self>,
        input: Option<PathBuf>,
    ) -> JoinHandle<Result<TranscodeOutcome>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_with_input(input.as_deref()).await })
    }

    /// Transcode `input`, or the first configured candidate when `None`.
    ///
    /// Fails with [`Error::Conflict`] if another transcode is in flight.
    pub async fn run_with_input(&self, input: Option<&Path>) -> Result<TranscodeOutcome> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| Error::Conflict("a transcode is already running".into()))?;

        let input = match input {
            Some(path) => explicit_input(path)?,
            None => resolve_input(&self.config.input.candidates)?,
        };

        let media = probe_media(&self.ffprobe, &input).await?;
        let encoder = self.select_backend().await;
        let job_id = JobId::new();

        tracing::info!(
            %job_id,
            encoder = %encoder,
            duration = media.duration,
            has_audio = media.has_audio,
            "Starting transcode of {}",
            input.display()
        );

        self.tracker.begin_job(job_id, input.clone(), encoder);
        let renditions = self
            .run_renditions(job_id, &input, encoder, media.duration, media.has_audio)
            .await;

        let manifest_path = self.config.output.manifest_path();
        let listed: Vec<&RenditionSpec> = catalog()
            .iter()
            .filter(|spec| {
                !self.config.transcode.omit_failed_renditions
                    || renditions
                        .iter()
                        .any(|r| r.rendition == spec.label && r.succeeded())
            })
            .collect();

        let manifest = match write_manifest(&manifest_path, listed).await {
            Ok(()) => Some(manifest_path),
            Err(e) => {
                tracing::error!(%job_id, "Failed to write master playlist {}: {}", manifest_path.display(), e);
                None
            }
        };

        let failed = self.tracker.finish_job(job_id);
        if failed.is_empty() {
            tracing::info!(%job_id, "Transcode complete");
        } else {
            tracing::warn!(%job_id, "Transcode complete with failed renditions: {}", failed.join(", "));
        }

        Ok(TranscodeOutcome {
            job_id,
            input,
            encoder,
            duration: media.duration,
            has_audio: media.has_audio,
            renditions,
            manifest,
        })
    }

    /// Launch one job per catalog entry and wait for all of them.
    async fn run_renditions(
        &self,
        job_id: JobId,
        input: &Path,
        encoder: EncoderBackend,
        duration: f64,
        has_audio: bool,
    ) -> Vec<RenditionOutcome> {
        let cancel = self.shutdown.child_token();
        let timeout = self.config.transcode.job_timeout();
        let mut set = JoinSet::new();

        for spec in catalog() {
            let job = RenditionJob::new(
                *spec,
                input,
                &self.config.output.dir,
                encoder,
                has_audio,
                duration,
                self.settings.clone(),
            )
            .with_parser(Arc::clone(&self.parser));
            let sink = self.tracker.sink(job_id);
            let ffmpeg = self.ffmpeg.clone();
            let cancel = cancel.clone();

            tracing::debug!(rendition = job.label(), encoder = %job.backend, "Launching rendition");
            set.spawn(async move {
                let result = job.run(&ffmpeg, sink, cancel, timeout).await;
                RenditionOutcome {
                    rendition: job.label(),
                    encoder: job.backend,
                    error: result.err().map(|e| e.to_string()),
                }
            });
        }

        let mut outstanding: HashSet<&'static str> = catalog().iter().map(|r| r.label).collect();
        let mut outcomes = Vec::with_capacity(catalog().len());

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => {
                    match &outcome.error {
                        None => tracing::info!(
                            rendition = outcome.rendition,
                            encoder = %outcome.encoder,
                            "Rendition complete"
                        ),
                        Some(e) => tracing::error!(
                            rendition = outcome.rendition,
                            encoder = %outcome.encoder,
                            "Rendition failed: {}",
                            e
                        ),
                    }
                    self.tracker
                        .finish_rendition(job_id, outcome.rendition, outcome.succeeded());
                    outstanding.remove(outcome.rendition);
                    outcomes.push(outcome);
                }
                Err(e) => tracing::error!(%job_id, "Rendition task aborted: {}", e),
            }
        }

        // Tasks that panicked never reported back.
        for spec in catalog() {
            if outstanding.contains(spec.label) {
                let backend = spec.effective_backend(encoder);
                self.tracker.finish_rendition(job_id, spec.label, false);
                outcomes.push(RenditionOutcome {
                    rendition: spec.label,
                    encoder: backend,
                    error: Some("rendition task panicked".into()),
                });
            }
        }

        outcomes.sort_by_key(|o| catalog().iter().position(|r| r.label == o.rendition));
        outcomes
    }
}

/// Configured path if it exists, else PATH lookup, else the bare name.
///
/// A missing tool is reported when a transcode needs it, not at startup.
fn resolve_tool(name: &str, configured: Option<&Path>) -> PathBuf {
    match get_tool_path(name, configured) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("{}; transcodes will fail until it is installed", e);
            PathBuf::from(name)
        }
    }
}
