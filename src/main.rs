mod cli;

use stromboli::{
    classify::{self, PlayDecision},
    config,
    probe::{self, AudioCodecProbe},
    server,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

async fn start_server(
    dir: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(dir) = dir {
        config.server.root = dir;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Stromboli");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "stromboli=trace,stromboli_av=debug,tower_http=debug".to_string()
        } else {
            "stromboli=info,stromboli_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { dir, port, host } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(dir, host, port, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("stromboli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ProbeReport {
    file: PathBuf,
    extension: Option<String>,
    by_extension: PlayDecision,
    audio_codec: Option<String>,
    probe_error: Option<String>,
    decision: PlayDecision,
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let prober = AudioCodecProbe::new(stromboli_av::resolve_tool(
        "ffprobe",
        config.tools.ffprobe.as_deref(),
    ))
    .with_timeout(Duration::from_secs(config.probe.timeout_secs));

    let classification = classify::inspect(file, file.is_dir(), &prober).await;

    // Converting containers skip the prober; probe them anyway so the report
    // shows the codec.
    let probed = match classification.probed {
        Some(probed) => probed.map_err(|e| e.to_string()),
        None if !file.is_dir() && classification.by_extension.is_media() => {
            prober.audio_codec(file).await.map_err(|e| e.to_string())
        }
        None => Ok(None),
    };
    let (audio_codec, probe_error) = match probed {
        Ok(codec) => (codec, None),
        Err(e) => (None, Some(e)),
    };

    let report = ProbeReport {
        file: file.to_path_buf(),
        extension: classify::extension_of(file),
        by_extension: classification.by_extension,
        audio_codec,
        probe_error,
        decision: classification.decision,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("File: {}", report.file.display());
        println!(
            "Extension: {} ({})",
            report.extension.as_deref().unwrap_or("none"),
            report.by_extension
        );
        match (&report.audio_codec, &report.probe_error) {
            (Some(codec), _) => println!("Audio: {}", codec),
            (None, Some(err)) => println!("Audio: probe failed ({})", err),
            (None, None) => println!("Audio: none"),
        }
        println!("Decision: {}", report.decision);
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = probe::check_tools(
        config.tools.ffmpeg.as_deref(),
        config.tools.ffprobe.as_deref(),
    );
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
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Direct playback still works; conversion needs ffmpeg and ffprobe.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Root: {}", config.server.root.display());
            println!(
                "  Transcode: {} {} crf {}",
                config.transcode.video_codec, config.transcode.preset, config.transcode.crf
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
