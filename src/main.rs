//! Flight Track Viewer
//!
//! CLI commands:
//! - view: Launch the native map viewer (default)
//! - check: Load the track and report problems
//! - pips: List the pips with their captions
//! - init-config: Write a default viewer.yaml

mod captions;
mod config;
mod gui;
mod keys;
mod loader;
mod logging;
mod navigation;
mod panel;
mod path;
mod photo;
mod pips;
mod projection;
mod state;
mod track;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use captions::CaptionTable;
use config::{Settings, ViewerConfig};
use loader::LoadError;
use projection::PlotViewport;
use state::Viewer;
use track::Track;

#[derive(Parser)]
#[command(name = "flight_track_viewer")]
#[command(about = "Interactive flight track map with captioned points of interest")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to viewer.yaml config
    #[arg(short, long, default_value = "viewer.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native map viewer
    View,

    /// Load the track and report problems without opening a window
    Check,

    /// List pips with their coordinates and captions
    Pips {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "viewer.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();

    // Initialize logging first
    let _log_guard = logging::init_logging(&settings.log_dir)?;
    tracing::info!("Flight Track Viewer starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    match cli.command.unwrap_or(Commands::View) {
        Commands::View => {
            let session = Session::open(&cli.config, &settings).await?;
            let Session { config, captions, track, .. } = session;
            let (viewer, status) = match track {
                Ok(track) => {
                    let viewport = PlotViewport::new(config.map.backend());
                    let viewer = Viewer::new(track, captions, &config.style, viewport);
                    (Some(viewer), String::new())
                }
                Err(e) => {
                    log_error!(e, source = ?config.track);
                    (None, format!("Track could not be loaded: {}", e))
                }
            };
            tracing::info!("Launching native GUI viewer");
            gui::run_viewer(config, settings, viewer, status)?;
        }

        Commands::Check => {
            let session = Session::open(&cli.config, &settings).await?;
            check(&session.track?, &session.captions, &session.data_dir);
        }

        Commands::Pips { json } => {
            let session = Session::open(&cli.config, &settings).await?;
            list_pips(&session.track?, &session.captions, json)?;
        }

        Commands::InitConfig { output } => init_config(&output)?,
    }

    Ok(())
}

/// Config, captions and the (possibly failed) track load
struct Session {
    config: ViewerConfig,
    captions: CaptionTable,
    data_dir: PathBuf,
    track: Result<Track, LoadError>,
}

impl Session {
    async fn open(config_path: &Path, settings: &Settings) -> anyhow::Result<Self> {
        let mut config = if config_path.exists() {
            tracing::info!("Loading config from {:?}", config_path);
            ViewerConfig::load(config_path)?
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", config_path);
            ViewerConfig::default()
        };
        settings.apply(&mut config);

        let data_dir = PathBuf::from(&settings.data_dir);
        let track = loader::load_track(&config.track, &config.pips, &data_dir).await;
        let captions = CaptionTable::new(
            config.captions.clone(),
            config.images.template.clone(),
            config.images.placeholder.clone(),
            &data_dir,
        );

        Ok(Self {
            config,
            captions,
            data_dir,
            track,
        })
    }
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{:?} already exists", output);
    }
    std::fs::write(output, ViewerConfig::default().to_yaml()?)?;
    println!("Wrote default config to {:?}", output);
    Ok(())
}

/// Print a track summary and anything that will look wrong in the viewer
fn check(track: &Track, captions: &CaptionTable, data_dir: &Path) {
    println!("Track: {} points, {} pips", track.points().len(), track.pip_count());
    if let Some(seconds) = track.duration_seconds() {
        println!("Duration: {}m {:02}s", seconds / 60, seconds % 60);
    }

    let missing = captions.missing_captions(track);
    if missing.is_empty() {
        println!("All pips have captions");
    } else {
        println!("Pips without captions ({}): {:?}", missing.len(), missing);
    }

    let missing_images: Vec<_> = track
        .pips()
        .iter()
        .filter(|&&pip| captions.image_path(pip).is_some_and(|p| !p.exists()))
        .collect();
    if !missing_images.is_empty() {
        println!(
            "Pips without images in {:?} ({}): {:?}",
            data_dir,
            missing_images.len(),
            missing_images
        );
    }
    match captions.placeholder_image() {
        Some(p) if !p.exists() => println!("Placeholder image missing: {:?}", p),
        _ => {}
    }
}

/// List pips as text or JSON
fn list_pips(track: &Track, captions: &CaptionTable, json: bool) -> anyhow::Result<()> {
    let rows: Vec<_> = track
        .pips()
        .iter()
        .enumerate()
        .filter_map(|(slot, &pip)| Some((slot, pip, track.pip_point(slot)?)))
        .map(|(slot, pip, point)| {
            serde_json::json!({
                "slot": slot,
                "pip": pip,
                "time": point.time,
                "coord": point.coord,
                "caption": captions.caption(pip),
                "image": captions.image_path(pip),
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Pips ({}):", rows.len());
    for (slot, &pip) in track.pips().iter().enumerate() {
        let Some(point) = track.pip_point(slot) else {
            continue;
        };
        println!(
            "  {:>3}. #{} at {} - {}",
            slot + 1,
            pip,
            point.coord,
            captions.caption(pip).unwrap_or("(no caption)")
        );
    }
    Ok(())
}
