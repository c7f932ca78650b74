//! Command line entry point for the plugin build pipeline.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use riptide_build::config::BuildConfig;
use riptide_build::pipeline;

#[derive(Parser, Debug)]
#[command(name = "riptide-build")]
#[command(about = "Compile player plugins and themes into distributable artifacts", long_about = None)]
#[command(version)]
struct Args {
    /// Directory containing plugin sources
    #[arg(long, value_name = "PATH")]
    plugins_dir: Option<PathBuf>,

    /// Directory containing theme stylesheets
    #[arg(long, value_name = "PATH")]
    themes_dir: Option<PathBuf>,

    /// Output directory for built artifacts
    #[arg(long, value_name = "PATH")]
    out_dir: Option<PathBuf>,

    /// Build configuration file (defaults to riptide.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip whitespace minification of built artifacts
    #[arg(long)]
    no_minify: bool,

    /// Build only the plugin directory with this name
    #[arg(long, value_name = "NAME")]
    only: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Log to stderr so artifacts piped from stdout stay clean.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "build aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        // An explicitly named file must exist and parse.
        Some(path) => BuildConfig::load_from_file(path)?,
        None => {
            let default_path = Path::new("riptide.toml");
            if default_path.is_file() {
                BuildConfig::load_from_file(default_path)?
            } else {
                BuildConfig::default()
            }
        }
    };

    if let Some(dir) = args.plugins_dir {
        config.plugins_dir = dir;
    }
    if let Some(dir) = args.themes_dir {
        config.themes_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        config.out_dir = dir;
    }
    if args.no_minify {
        config.minify = false;
    }

    let summary = pipeline::build_all(&config, args.only.as_deref()).await?;
    tracing::info!(
        plugins = summary.plugins.len(),
        themes = summary.themes.len(),
        failures = summary.failures.len(),
        "build finished"
    );
    Ok(summary.is_success())
}
