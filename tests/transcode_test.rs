//! Transcode trigger integration tests.

#![cfg(unix)]

mod common;

use common::{url, FakeTools, TestHarness};
use hlsforge::error::Error;
use hlsforge::state::RenditionStatus;
use hlsforge_av::{FfmpegTimeParser, ProgressParser, ProgressSample};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

const LABELS: [&str; 6] = ["2160p", "1080p", "720p", "480p", "360p", "180p"];

#[tokio::test]
async fn test_trigger_completes_every_rendition() {
    let harness = TestHarness::new();
    let addr = harness.serve().await;

    let response = reqwest::get(url(addr, "/transcode")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-job-id"));
    let body = response.text().await.unwrap();
    assert!(body.contains("finished successfully"), "{body}");

    let progress: Vec<serde_json::Value> = reqwest::get(url(addr, "/progress"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress.len(), 6);
    for (entry, label) in progress.iter().zip(LABELS) {
        assert_eq!(entry["rendition"], label);
        assert_eq!(entry["percent"], 100.0);
        assert_eq!(entry["status"], "completed");
    }

    for label in LABELS {
        assert!(harness.output_dir().join(label).join("prog.m3u8").is_file());
        assert!(harness.output_dir().join(label).join("file_000.ts").is_file());
    }
}

#[tokio::test]
async fn test_post_trigger_is_accepted() {
    let harness = TestHarness::new();
    let addr = harness.serve().await;

    let response = reqwest::Client::new()
        .post(url(addr, "/transcode"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_manifest_lists_full_ladder() {
    let harness = TestHarness::new();
    harness.ctx.transcoder.run().await.unwrap();

    let manifest = harness.manifest();
    assert!(manifest.starts_with("#EXTM3U\n"));
    assert!(manifest.contains("#EXT-X-STREAM-INF:BANDWIDTH=6000000,RESOLUTION=1920x1080\n1080p/prog.m3u8\n"));
    assert!(manifest.contains("#EXT-X-STREAM-INF:BANDWIDTH=300000,RESOLUTION=320x180\n180p/prog.m3u8\n"));
    assert_eq!(manifest.matches("#EXT-X-STREAM-INF").count(), 6);
}

#[tokio::test]
async fn test_sequential_triggers_write_identical_manifests() {
    let harness = TestHarness::new();

    let first = harness.ctx.transcoder.run().await.unwrap();
    let manifest_a = harness.manifest();
    let second = harness.ctx.transcoder.run().await.unwrap();
    let manifest_b = harness.manifest();

    assert_ne!(first.job_id, second.job_id);
    assert_eq!(manifest_a, manifest_b);
}

#[tokio::test]
async fn test_failed_rendition_is_isolated() {
    let harness = TestHarness::with_tools(
        FakeTools {
            fail_rendition: Some("720p"),
            ..Default::default()
        },
        |_| {},
    );
    let addr = harness.serve().await;

    let response = reqwest::get(url(addr, "/transcode")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("720p"), "{body}");

    let progress = harness.ctx.tracker.latest();
    for entry in &progress {
        assert_eq!(entry.percent, 100.0);
        let expected = if entry.rendition == "720p" {
            RenditionStatus::Failed
        } else {
            RenditionStatus::Completed
        };
        assert_eq!(entry.status, expected, "{}", entry.rendition);
    }

    // All six are still advertised.
    assert!(harness.manifest().contains("720p/prog.m3u8"));
    assert_eq!(harness.manifest().matches("#EXT-X-STREAM-INF").count(), 6);
}

#[tokio::test]
async fn test_omit_failed_renditions_from_manifest() {
    let harness = TestHarness::with_tools(
        FakeTools {
            fail_rendition: Some("720p"),
            ..Default::default()
        },
        |config| config.transcode.omit_failed_renditions = true,
    );

    let outcome = harness.ctx.transcoder.run().await.unwrap();
    assert_eq!(outcome.failed().count(), 1);

    let manifest = harness.manifest();
    assert!(!manifest.contains("720p/prog.m3u8"));
    assert_eq!(manifest.matches("#EXT-X-STREAM-INF").count(), 5);
}

#[tokio::test]
async fn test_no_audio_disables_audio_everywhere() {
    let harness = TestHarness::with_tools(
        FakeTools {
            has_audio: false,
            ..Default::default()
        },
        |_| {},
    );

    let outcome = harness.ctx.transcoder.run().await.unwrap();
    assert!(!outcome.has_audio);

    for label in LABELS {
        let args = harness.ffmpeg_args(label);
        assert!(args.contains("-an"), "{label}: {args}");
        assert!(!args.contains("-c:a"), "{label}: {args}");
    }
}

#[tokio::test]
async fn test_low_renditions_use_software_with_hardware_backend() {
    let harness = TestHarness::with_tools(FakeTools::default(), |config| {
        config.encoder.backend = hlsforge::config::BackendChoice::Nvenc;
    });

    let outcome = harness.ctx.transcoder.run().await.unwrap();
    assert_eq!(outcome.encoder.as_str(), "nvenc");

    assert!(harness.ffmpeg_args("1080p").contains("h264_nvenc"));
    assert!(harness.ffmpeg_args("360p").contains("libx264"));
    assert!(harness.ffmpeg_args("180p").contains("libx264"));
}

#[tokio::test]
async fn test_missing_input_is_500() {
    let harness = TestHarness::new();
    harness.remove_input();
    let addr = harness.serve().await;

    let response = reqwest::get(url(addr, "/transcode")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "input_not_found");
    assert!(!harness.manifest_path().exists());
}

#[tokio::test]
async fn test_zero_duration_is_probe_error() {
    let harness = TestHarness::with_tools(
        FakeTools {
            duration: "0.000000",
            ..Default::default()
        },
        |_| {},
    );

    let err = harness.ctx.transcoder.run().await.unwrap_err();
    assert!(matches!(err, Error::Probe(_)), "{err}");
    // No jobs were launched.
    assert!(!harness.output_dir().join("720p").exists());
}

#[tokio::test]
async fn test_overlapping_trigger_is_409() {
    let harness = TestHarness::with_tools(
        FakeTools {
            encode_delay_secs: 2,
            ..Default::default()
        },
        |_| {},
    );
    let addr = harness.serve().await;

    let first = tokio::spawn(reqwest::get(url(addr, "/transcode")));

    let mut waited = Duration::ZERO;
    while !harness.ctx.transcoder.is_running() {
        assert!(waited < Duration::from_secs(5), "first trigger never started");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    let second = reqwest::get(url(addr, "/transcode")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["code"], "conflict");

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_job_timeout_fails_rendition() {
    let harness = TestHarness::with_tools(
        FakeTools {
            encode_delay_secs: 30,
            ..Default::default()
        },
        |config| config.transcode.job_timeout_secs = Some(1),
    );

    let outcome = harness.ctx.transcoder.run().await.unwrap();
    assert_eq!(outcome.failed().count(), 6);
    assert!(harness
        .ctx
        .tracker
        .latest()
        .iter()
        .all(|r| r.percent == 100.0 && r.status == RenditionStatus::Failed));
}

#[tokio::test]
async fn test_shutdown_cancels_running_encodes() {
    let harness = TestHarness::with_tools(
        FakeTools {
            encode_delay_secs: 30,
            ..Default::default()
        },
        |_| {},
    );

    let transcoder = harness.ctx.transcoder.clone();
    let run = tokio::spawn(async move { transcoder.run().await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    harness.ctx.transcoder.shutdown();

    let outcome = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("cancelled transcode did not return")
        .unwrap()
        .unwrap();
    assert_eq!(outcome.failed().count(), 6);
}

#[tokio::test]
async fn test_transcode_survives_client_disconnect() {
    let harness = TestHarness::with_tools(
        FakeTools {
            encode_delay_secs: 2,
            ..Default::default()
        },
        |_| {},
    );
    let addr = harness.serve().await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let result = client.get(url(addr, "/transcode")).send().await;
    assert!(result.is_err(), "request should time out before the encodes finish");

    let mut waited = Duration::ZERO;
    loop {
        let latest = harness.ctx.tracker.latest();
        let done = latest.len() == 6
            && latest
                .iter()
                .all(|r| r.percent == 100.0 && r.status == RenditionStatus::Completed);
        if done && harness.manifest_path().exists() {
            break;
        }
        assert!(waited < Duration::from_secs(15), "abandoned transcode never finished: {latest:?}");
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }

    assert!(!harness.ctx.transcoder.is_running());
    for label in LABELS {
        assert!(harness.output_dir().join(label).join("file_001.ts").is_file());
    }
}

/// Panics on any line naming the 720p output directory.
struct PanicOn720p;

impl ProgressParser for PanicOn720p {
    fn parse_line(&self, line: &str) -> ProgressSample {
        if line.contains("/720p/") {
            panic!("unexpected status line: {line}");
        }
        FfmpegTimeParser.parse_line(line)
    }
}

#[tokio::test]
async fn test_panicking_rendition_is_recorded_as_failed() {
    let harness = TestHarness::with_transcoder(FakeTools::default(), |_| {}, |transcoder| {
        transcoder.with_progress_parser(Arc::new(PanicOn720p))
    });

    let outcome = harness.ctx.transcoder.run().await.unwrap();
    let failed: Vec<&str> = outcome.failed().map(|r| r.rendition).collect();
    assert_eq!(failed, ["720p"]);
    assert_eq!(outcome.renditions.len(), 6);

    let progress = harness.ctx.tracker.latest();
    assert_eq!(progress.len(), 6);
    for entry in &progress {
        assert_eq!(entry.percent, 100.0, "{}", entry.rendition);
        let expected = if entry.rendition == "720p" {
            RenditionStatus::Failed
        } else {
            RenditionStatus::Completed
        };
        assert_eq!(entry.status, expected, "{}", entry.rendition);
    }

    assert_eq!(harness.manifest().matches("#EXT-X-STREAM-INF").count(), 6);
    assert!(!harness.ctx.transcoder.is_running());
}
