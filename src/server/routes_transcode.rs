use crate::error::Error;
use crate::server::error::AppError;
use crate::server::AppContext;
use axum::{
    extract::State,
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Response header carrying the id of the job a trigger ran.
pub const JOB_ID_HEADER: HeaderName = HeaderName::from_static("x-job-id");

pub fn transcode_routes() -> Router<AppContext> {
    Router::new().route("/transcode", get(trigger_transcode).post(trigger_transcode))
}

/// Run a full transcode and answer once every rendition has finished.
///
/// The transcode runs detached from the request, so it completes even if
/// the client goes away before the response is ready.
pub async fn trigger_transcode(State(ctx): State<AppContext>) -> Result<Response, AppError> {
    let outcome = ctx
        .transcoder
        .spawn_run(None)
        .await
        .map_err(|e| Error::Internal(format!("transcode task failed: {e}")))??;

    let failed: Vec<&str> = outcome.failed().map(|r| r.rendition).collect();
    let message = if failed.is_empty() {
        "Transcoding finished successfully.\n".to_string()
    } else {
        format!(
            "Transcoding finished; {} of {} renditions failed: {}\n",
            failed.len(),
            outcome.renditions.len(),
            failed.join(", ")
        )
    };

    Ok(([(JOB_ID_HEADER, outcome.job_id.to_string())], message).into_response())
}
