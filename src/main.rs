mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
};
use yt_dlp_front::config::Preferences;
use yt_dlp_front::downloader::{DownloadError, ToolManager};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(exit_code(&e));
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let prefs_path = args.config.clone().or_else(Preferences::default_path);
    let prefs = match &prefs_path {
        Some(path) => Preferences::load(path)?,
        None => Preferences::default(),
    };
    debug!("Preferences ({:?}): {:?}", prefs_path, prefs);

    let quiet = args.quiet;
    let tool_overrides = (args.yt_dlp, args.ffmpeg);
    let executor = move |prefs: Preferences, prefs_path: Option<PathBuf>| {
        let tools = ToolManager::new().resolve_paths(
            tool_overrides.0.as_deref().or(prefs.downloader_path.as_deref()),
            tool_overrides.1.as_deref().or(prefs.transcoder_path.as_deref()),
        );
        debug!("Using tools: {:?}", tools);
        CommandExecutor::new(prefs, prefs_path, tools, quiet)
    };

    match args.command {
        Commands::FetchFormats { url, json } => {
            executor(prefs, prefs_path).fetch_formats(&url, json).await?
        }
        Commands::Download {
            url,
            video_id,
            audio_id,
            out,
        } => {
            executor(prefs, prefs_path)
                .download(&url, video_id, audio_id, out)
                .await?
        }
        Commands::DownloadAudio { url, out } => {
            executor(prefs, prefs_path).download_audio(&url, out).await?
        }
        Commands::Tools => executor(prefs, prefs_path).tools(),
        Commands::Config {
            show,
            set_default_folder,
            reset,
        } => configure(prefs, prefs_path.as_deref(), show, set_default_folder, reset)?,
    }

    Ok(())
}

fn configure(
    mut prefs: Preferences,
    path: Option<&Path>,
    show: bool,
    set_default_folder: Option<PathBuf>,
    reset: bool,
) -> Result<()> {
    let path = path.context("No preferences path available; pass --config")?;
    if reset {
        prefs = Preferences::default();
        prefs.save(path)?;
        println!("✓ Preferences reset to defaults");
    }
    if let Some(dir) = &set_default_folder {
        prefs.default_download_folder = Some(dir.clone());
        prefs.save(path)?;
        println!("✓ Default download folder set to {}", dir.display());
    }
    if show || (!reset && set_default_folder.is_none()) {
        println!("# {}", path.display());
        println!("{}", prefs.show()?);
    }
    Ok(())
}

/// Mirror yt-dlp's exit code when it was the one that failed
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<DownloadError>()
        .map(DownloadError::exit_code)
        .unwrap_or(1)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(filter)
        .init();
}
