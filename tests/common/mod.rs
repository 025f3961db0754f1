//! Shared test harness for integration tests.
//!
//! [`TestHarness`] lays out a temporary working tree with an input file and
//! fake `ffmpeg`/`ffprobe` shell scripts, builds a [`Config`] pointing at it,
//! and wires a full [`AppContext`]. [`TestHarness::serve`] starts Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hlsforge::config::{BackendChoice, Config};
use hlsforge::server::{create_router, AppContext};
use hlsforge::state::ProgressTracker;
use hlsforge::transcode::Transcoder;
use hlsforge_av::StaticCapabilityProbe;
use hlsforge_common::EncoderBackend;
use tempfile::TempDir;

/// Behaviour of the fake tools.
#[derive(Debug, Clone)]
pub struct FakeTools {
    /// ffprobe's `format=duration` output.
    pub duration: &'static str,
    pub has_audio: bool,
    /// Rendition label whose encode exits non-zero.
    pub fail_rendition: Option<&'static str>,
    /// Seconds each encode sleeps before writing output.
    pub encode_delay_secs: u32,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            duration: "20.0",
            has_audio: true,
            fail_rendition: None,
            encode_delay_secs: 0,
        }
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] over a temp dir.
pub struct TestHarness {
    pub dir: TempDir,
    pub ctx: AppContext,
}

impl TestHarness {
    /// Default fake tools, default config.
    pub fn new() -> Self {
        Self::with_tools(FakeTools::default(), |_| {})
    }

    /// Custom fake tools, with a hook to adjust the config.
    pub fn with_tools(tools: FakeTools, configure: impl FnOnce(&mut Config)) -> Self {
        Self::with_transcoder(tools, configure, |transcoder| transcoder)
    }

    /// Like [`TestHarness::with_tools`], with a final hook on the transcoder.
    pub fn with_transcoder(
        tools: FakeTools,
        configure: impl FnOnce(&mut Config),
        customize: impl FnOnce(Transcoder) -> Transcoder,
    ) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path();

        std::fs::create_dir_all(root.join("input")).unwrap();
        std::fs::write(root.join("input/input.mp4"), b"not really video").unwrap();
        std::fs::create_dir_all(root.join("bin")).unwrap();

        let ffprobe = write_script(&root.join("bin/ffprobe"), &ffprobe_script(&tools));
        let ffmpeg = write_script(&root.join("bin/ffmpeg"), &ffmpeg_script(&tools));

        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.static_root = root.to_path_buf();
        config.input.candidates = vec![root.join("input/input.mp4"), root.join("input/input.ts")];
        config.output.dir = root.join("output");
        config.tools.ffmpeg_path = Some(ffmpeg);
        config.tools.ffprobe_path = Some(ffprobe);
        config.encoder.backend = BackendChoice::Auto;
        configure(&mut config);

        let config = Arc::new(config);
        let tracker = ProgressTracker::new();
        let transcoder = Transcoder::new(config.clone(), tracker.clone())
            .expect("failed to build transcoder")
            .with_capability_probe(Arc::new(StaticCapabilityProbe::only(
                EncoderBackend::Software,
            )));

        let ctx = AppContext {
            config,
            tracker,
            transcoder: Arc::new(customize(transcoder)),
        };

        Self { dir, ctx }
    }

    /// Start an Axum server on a random port and return its address.
    pub async fn serve(&self) -> SocketAddr {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("output")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir().join("master.m3u8")
    }

    pub fn manifest(&self) -> String {
        std::fs::read_to_string(self.manifest_path()).expect("manifest was not written")
    }

    /// Arguments the fake ffmpeg was invoked with for `label`.
    pub fn ffmpeg_args(&self, label: &str) -> String {
        std::fs::read_to_string(self.output_dir().join(label).join("ffmpeg.args"))
            .expect("ffmpeg was not run for rendition")
    }

    pub fn remove_input(&self) {
        std::fs::remove_file(self.root().join("input/input.mp4")).unwrap();
    }
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}

fn write_script(path: &Path, body: &str) -> PathBuf {
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

fn ffprobe_script(tools: &FakeTools) -> String {
    let audio = if tools.has_audio { "echo 1" } else { "true" };
    format!(
        r#"case "$*" in
  *format=duration*) echo "{duration}" ;;
  *select_streams*) {audio} ;;
  *) exit 1 ;;
esac"#,
        duration = tools.duration,
    )
}

/// The last argument is the variant playlist path. `sleep` must not hold the
/// stderr pipe, or a killed encode would look alive to the reader.
fn ffmpeg_script(tools: &FakeTools) -> String {
    let fail = match tools.fail_rendition {
        Some(label) => format!(
            r#"case "$last" in
  */{label}/*) echo 'Error while opening encoder for output stream' >&2; exit 1 ;;
esac"#
        ),
        None => String::new(),
    };

    format!(
        r#"for last; do :; done
dir=$(dirname "$last")
echo "$*" > "$dir/ffmpeg.args"
{fail}
printf "Output #0, hls, to '%s':\n" "$last" >&2
printf 'frame=1 time=00:00:05.00 bitrate=N/A\r' >&2
sleep {delay} 2>/dev/null
printf 'frame=2 time=00:00:10.00 bitrate=N/A\r' >&2
printf 'data' > "$dir/file_000.ts"
printf 'data' > "$dir/file_001.ts"
printf '#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.000000,\nfile_000.ts\n#EXTINF:4.000000,\nfile_001.ts\n#EXT-X-ENDLIST\n' > "$last""#,
        delay = tools.encode_delay_secs,
    )
}
