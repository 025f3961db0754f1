mod cli;

use hlsforge::{config, server, transcode::TranscodeOutcome};
use hlsforge_av::{check_tools, CapabilityProbe, FfmpegCapabilityProbe, Platform};
use hlsforge_common::{EncoderBackend, VARIANT_PLAYLIST};
use hlsforge_media::MediaPlaylist;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tracing_subscriber::EnvFilter;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting hlsforge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let ctx = server::AppContext::new(config)?;
    server::start_server(ctx).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on the verbose flag
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("hlsforge=trace,hlsforge_av=trace,hlsforge_media=trace,tower_http=debug")
        } else {
            EnvFilter::new("hlsforge=debug,hlsforge_av=debug,hlsforge_media=debug,tower_http=info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Run { input } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_once(input.as_deref(), cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools_cmd(cli.config.as_deref()),
        Commands::DetectEncoder => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(detect_encoder(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlsforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_once(input: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    config::validate_config(&config)?;

    let ctx = server::AppContext::new(config)?;
    let transcoder = ctx.transcoder.clone();

    let ctrl_c = {
        let transcoder = transcoder.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping encodes");
                transcoder.shutdown();
            }
        })
    };

    let result = transcoder.run_with_input(input).await;
    ctrl_c.abort();

    let outcome = result?;
    print_summary(&outcome);

    if outcome.failed().next().is_some() {
        anyhow::bail!("{} rendition(s) failed", outcome.failed().count());
    }
    Ok(())
}

fn print_summary(outcome: &TranscodeOutcome) {
    println!("Job: {}", outcome.job_id);
    println!("Input: {}", outcome.input.display());
    println!("Duration: {:.2}s", outcome.duration);
    println!("Audio: {}", if outcome.has_audio { "yes" } else { "no" });
    println!("Encoder: {}", outcome.encoder);
    println!();

    for rendition in &outcome.renditions {
        match &rendition.error {
            None => {
                let segments = outcome
                    .manifest
                    .as_deref()
                    .and_then(Path::parent)
                    .map(|root| root.join(rendition.rendition).join(VARIANT_PLAYLIST))
                    .and_then(|path| MediaPlaylist::read(&path).ok())
                    .map(|playlist| {
                        format!(
                            ", {} segments, {:.1}s",
                            playlist.segments.len(),
                            playlist.total_duration()
                        )
                    })
                    .unwrap_or_default();
                println!(
                    "✓ {} ({}{})",
                    rendition.rendition, rendition.encoder, segments
                );
            }
            Some(e) => println!("✗ {} ({}): {}", rendition.rendition, rendition.encoder, e),
        }
    }

    println!();
    match &outcome.manifest {
        Some(path) => println!("Manifest: {}", path.display()),
        None => println!("Manifest was not written"),
    }
}

fn check_tools_cmd(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let ffmpeg = hlsforge_av::get_tool_path("ffmpeg", config.tools.ffmpeg_path.as_deref())
        .unwrap_or_else(|_| "ffmpeg".into());
    let ffprobe = hlsforge_av::get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())
        .unwrap_or_else(|_| "ffprobe".into());

    let tools = check_tools(&ffmpeg, &ffprobe);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("Some tools are missing. Install ffmpeg to enable transcoding.")
    }
}

async fn detect_encoder(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ffmpeg = hlsforge_av::get_tool_path("ffmpeg", config.tools.ffmpeg_path.as_deref())?;

    let probe = FfmpegCapabilityProbe::new(ffmpeg);
    let caps = probe.capabilities().await;
    let platform = probe.platform();

    println!("Platform: {:?}", platform);
    for backend in [
        EncoderBackend::VideoToolbox,
        EncoderBackend::Nvenc,
        EncoderBackend::Qsv,
        EncoderBackend::Vaapi,
    ] {
        let mark = if caps.lists(backend) { "✓" } else { "✗" };
        println!("{} {} ({})", mark, backend, backend.ffmpeg_encoder());
    }
    println!(
        "{} NVIDIA driver",
        if caps.nvidia_driver { "✓" } else { "✗" }
    );

    let detected = hlsforge_av::select_backend(&caps, platform);
    println!();
    println!("Detected backend: {}", detected);
    if let Some(pinned) = config.encoder.backend.pinned() {
        println!("Configured backend: {} (overrides detection)", pinned);
    }
    if platform == Platform::MacOs && detected != EncoderBackend::VideoToolbox {
        println!("VideoToolbox not listed by this ffmpeg build");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    config::validate_config(&config)?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Static root: {}", config.server.static_root.display());
    println!("  Input candidates: {}", config.input.candidates.len());
    println!("  Manifest: {}", config.output.manifest_path().display());
    println!("  Encoder: {:?}", config.encoder.backend);
    println!("  Segment length: {}s", config.transcode.segment_seconds);
    if let Some(timeout) = config.transcode.job_timeout() {
        println!("  Job timeout: {}s", timeout.as_secs());
    }

    Ok(())
}
