use crate::error::Error;
use crate::server::error::AppError;
use crate::server::AppContext;
use crate::state::{ProgressEvent, RenditionProgress};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use hlsforge_common::JobId;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

pub fn progress_routes() -> Router<AppContext> {
    Router::new()
        .route("/progress", get(latest_progress))
        .route("/progress/events", get(progress_events))
        .route("/progress/:job_id", get(job_progress))
}

/// One polled progress entry.
#[derive(Debug, Serialize)]
pub struct ProgressEntry {
    #[serde(flatten)]
    pub progress: RenditionProgress,
    /// Legacy key for `rendition`.
    pub flavor: String,
}

impl From<RenditionProgress> for ProgressEntry {
    fn from(progress: RenditionProgress) -> Self {
        let flavor = progress.rendition.clone();
        Self { progress, flavor }
    }
}

fn entries(renditions: Vec<RenditionProgress>) -> Vec<ProgressEntry> {
    renditions.into_iter().map(ProgressEntry::from).collect()
}

/// Per-rendition progress of the most recent job.
pub async fn latest_progress(State(ctx): State<AppContext>) -> Json<Vec<ProgressEntry>> {
    Json(entries(ctx.tracker.latest()))
}

/// Per-rendition progress of a job still held in memory.
pub async fn job_progress(
    State(ctx): State<AppContext>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<ProgressEntry>>, AppError> {
    let id: JobId = job_id
        .parse()
        .map_err(|_| Error::not_found("job", &job_id))?;

    let job = ctx
        .tracker
        .job(id)
        .ok_or_else(|| Error::not_found("job", &job_id))?;

    Ok(Json(entries(job.renditions)))
}

/// Server-sent progress events. The stream ends when the server shuts down.
pub async fn progress_events(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.tracker.subscribe();
    let shutdown = ctx.transcoder.shutdown_token();

    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event: ProgressEvent| {
            let data = serde_json::to_string(&event).unwrap_or_else(|e| {
                format!(r#"{{"error": "serialization failed: {}"}}"#, e)
            });

            Ok(Event::default().data(data))
        });

    let heartbeat = IntervalStream::new(tokio::time::interval(Duration::from_secs(30))).map(|_| {
        Ok(Event::default()
            .event("heartbeat")
            .data(r#"{"event_type":"heartbeat"}"#))
    });

    let events = futures::StreamExt::take_until(stream.merge(heartbeat), shutdown.cancelled_owned());

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
