//! Configuration loader - YAML viewer file + .env settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::keys::KeyConfig;
use crate::path::MAX_PATH_SAMPLES;
use crate::pips::MarkerStyle;
use crate::projection::MapBackend;
use crate::track::PipIndex;

/// Main configuration loaded from viewer.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_title")]
    pub title: String,
    pub track: TrackSource,
    pub map: MapConfig,
    #[serde(default)]
    pub pips: PipSelection,
    #[serde(default)]
    pub captions: BTreeMap<PipIndex, String>,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub keys: KeyConfig,
}

/// Where the track comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackSource {
    /// CSV with Time, Latitude, Longitude columns; local path or http(s) URL
    Csv { source: String },
    /// Geographic points written into the config
    Inline { points: Vec<InlinePoint> },
    /// Image pixel points written into the config
    Pixels { points: Vec<PixelPoint> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePoint {
    #[serde(default)]
    pub time: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// Explicit pip list, or every track point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipSelection {
    All(AllPips),
    Indices(Vec<PipIndex>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllPips {
    All,
}

impl Default for PipSelection {
    fn default() -> Self {
        PipSelection::All(AllPips::All)
    }
}

/// Map surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapConfig {
    Mercator {
        /// [lat, lon]
        center: [f64; 2],
        zoom: f64,
        #[serde(default = "default_min_zoom")]
        min_zoom: f64,
        #[serde(default = "default_max_zoom")]
        max_zoom: f64,
    },
    Image {
        path: Option<PathBuf>,
        width: f64,
        height: f64,
    },
}

impl MapConfig {
    pub fn backend(&self) -> MapBackend {
        match self {
            MapConfig::Mercator { min_zoom, max_zoom, .. } => MapBackend::Mercator {
                min_zoom: *min_zoom,
                max_zoom: *max_zoom,
            },
            MapConfig::Image { width, height, .. } => MapBackend::Image {
                width: *width,
                height: *height,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Photo path template, `{index}` replaced by the pip index
    pub template: Option<String>,
    pub placeholder: Option<PathBuf>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            template: Some("images/image-{index}.jpg".to_string()),
            placeholder: Some(PathBuf::from("images/image-placeholder.jpg")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub markers: MarkerStyle,
    pub path_color: [u8; 3],
    pub path_width: f32,
    /// Interpolated samples per track segment (1 = straight lines)
    pub path_samples: usize,
    pub show_grid: bool,
}

impl StyleConfig {
    /// Cap interpolation so path building stays bounded
    pub fn limit_samples(&mut self) {
        if self.path_samples > MAX_PATH_SAMPLES {
            tracing::warn!(
                "path_samples {} too large, using {}",
                self.path_samples,
                MAX_PATH_SAMPLES
            );
            self.path_samples = MAX_PATH_SAMPLES;
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            markers: MarkerStyle::default(),
            path_color: [0, 255, 0], // lime
            path_width: 2.0,
            path_samples: 8,
            show_grid: true,
        }
    }
}

fn default_title() -> String {
    "Flight Track".to_string()
}

fn default_min_zoom() -> f64 {
    7.0
}

fn default_max_zoom() -> f64 {
    11.0
}

impl ViewerConfig {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: ViewerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.style.limit_samples();
        config.warn_on_mismatch();
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Pixel tracks on a Mercator map (or the reverse) still draw, but rarely
    /// mean what the author wanted
    fn warn_on_mismatch(&self) {
        match (&self.track, &self.map) {
            (TrackSource::Pixels { .. }, MapConfig::Mercator { .. }) => {
                tracing::warn!("Pixel track on a Mercator map: pixels are drawn as world units");
            }
            (TrackSource::Csv { .. } | TrackSource::Inline { .. }, MapConfig::Image { .. }) => {
                tracing::warn!("Geographic track on an image map: lon/lat are used as x/y");
            }
            _ => {}
        }
    }
}

impl Default for ViewerConfig {
    /// CSV track over a Mercator map centred on Washington, DC
    fn default() -> Self {
        Self {
            title: default_title(),
            track: TrackSource::Csv {
                source: "flight-track.csv".to_string(),
            },
            map: MapConfig::Mercator {
                center: [38.88989877057183, -77.03688209146726],
                zoom: 7.0,
                min_zoom: default_min_zoom(),
                max_zoom: default_max_zoom(),
            },
            pips: PipSelection::default(),
            captions: BTreeMap::new(),
            images: ImageConfig::default(),
            style: StyleConfig::default(),
            keys: KeyConfig::default(),
        }
    }
}

/// Settings loaded from .env / the environment
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub data_dir: String,
    pub log_dir: String,
    pub track_source: Option<String>,
}

impl Settings {
    /// Load settings from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Settings {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            track_source: std::env::var("TRACK_SOURCE").ok(),
        }
    }

    /// Apply the TRACK_SOURCE override to a CSV track
    pub fn apply(&self, config: &mut ViewerConfig) {
        if let (Some(source), TrackSource::Csv { source: current }) =
            (&self.track_source, &mut config.track)
        {
            tracing::info!("TRACK_SOURCE overrides track source: {}", source);
            *current = source.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_config() {
        let yaml = r#"
track:
  kind: csv
  source: https://example.org/data/flight-track.csv
map:
  kind: mercator
  center: [38.9, -77.0]
  zoom: 8
pips: [1, 14, 44]
captions:
  1: Departure
  44: Landing
keys:
  next: [ArrowRight, N]
"#;
        let config: ViewerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.track,
            TrackSource::Csv { source: "https://example.org/data/flight-track.csv".to_string() }
        );
        assert_eq!(config.pips, PipSelection::Indices(vec![1, 14, 44]));
        assert_eq!(config.captions.get(&44).map(String::as_str), Some("Landing"));
        assert_eq!(config.keys.next, vec!["ArrowRight", "N"]);
        assert_eq!(config.keys.dismiss, vec!["Escape"]);
        assert_eq!(
            config.map.backend(),
            MapBackend::Mercator { min_zoom: 7.0, max_zoom: 11.0 }
        );
    }

    #[test]
    fn test_pixel_config_with_all_pips() {
        let yaml = r#"
track:
  kind: pixels
  points:
    - { x: 10, y: 20 }
    - { x: 30.5, y: 40 }
map:
  kind: image
  path: map.png
  width: 1024
  height: 768
pips: all
"#;
        let config: ViewerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pips, PipSelection::All(AllPips::All));
        match &config.track {
            TrackSource::Pixels { points } => assert_eq!(points[1], PixelPoint { x: 30.5, y: 40.0 }),
            other => panic!("unexpected track source {:?}", other),
        }
        assert_eq!(config.map.backend(), MapBackend::Image { width: 1024.0, height: 768.0 });
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = ViewerConfig::default().to_yaml().unwrap();
        let config: ViewerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.track, ViewerConfig::default().track);
        assert_eq!(config.style, StyleConfig::default());
    }

    #[test]
    fn test_track_source_override() {
        let settings = Settings {
            track_source: Some("other.csv".to_string()),
            ..Default::default()
        };
        let mut config = ViewerConfig::default();
        settings.apply(&mut config);
        assert_eq!(config.track, TrackSource::Csv { source: "other.csv".to_string() });
    }

    #[test]
    fn test_load_caps_path_samples() {
        let path = std::env::temp_dir().join(format!("flight_track_config_{}.yaml", std::process::id()));
        let yaml = r#"
track:
  kind: pixels
  points: [{ x: 0, y: 0 }]
map:
  kind: image
  width: 10
  height: 10
style:
  path_samples: 18446744073709551615
"#;
        std::fs::write(&path, yaml).unwrap();
        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.style.path_samples, MAX_PATH_SAMPLES);
        std::fs::remove_file(&path).ok();
    }
}
