//! Track loader - fetch and parse track data
//!
//! Sources:
//! - CSV from a local file or an http(s) URL (columns Time, Latitude, Longitude)
//! - geographic points inline in the config
//! - pixel points inline in the config
//!
//! Whatever the source, the result is a validated [`Track`]. A failure leaves
//! the viewer without a track; nothing is retried.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{PipSelection, TrackSource};
use crate::track::{Coord, Track, TrackError, TrackPoint};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV is missing the '{0}' column")]
    MissingColumn(&'static str),
    #[error("Row {row}: '{value}' is not a valid {column}")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("Invalid track: {0}")]
    Track(#[from] TrackError),
}

/// Load the configured track and place its pips
pub async fn load_track(
    source: &TrackSource,
    pips: &PipSelection,
    data_dir: &Path,
) -> Result<Track, LoadError> {
    let points = match source {
        TrackSource::Csv { source } => {
            let text = fetch_text(source, data_dir).await?;
            parse_csv(&text)?
        }
        TrackSource::Inline { points } => points
            .iter()
            .map(|p| TrackPoint {
                time: p.time.clone(),
                coord: Coord::Geo { lat: p.lat, lon: p.lon },
            })
            .collect(),
        TrackSource::Pixels { points } => points
            .iter()
            .map(|p| TrackPoint::pixel(p.x, p.y))
            .collect(),
    };
    tracing::info!("Loaded {} track points", points.len());

    let track = match pips {
        PipSelection::All(_) => Track::with_all_pips(points)?,
        PipSelection::Indices(indices) => Track::new(points, indices.clone())?,
    };
    tracing::info!("Track ready: {} pips", track.pip_count());
    Ok(track)
}

/// Read a local file or GET an http(s) URL
pub async fn fetch_text(source: &str, data_dir: &Path) -> Result<String, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        tracing::debug!("Fetching track from: {}", source);
        let client = reqwest::Client::new();
        let response = client
            .get(source)
            .header("User-Agent", "FlightTrackViewer/0.1")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LoadError::Status(response.status()));
        }

        let text = response.text().await?;
        tracing::debug!("Downloaded {} bytes of track data", text.len());
        Ok(text)
    } else {
        let path = resolve(source, data_dir);
        tracing::debug!("Reading track from {:?}", path);
        let result = tokio::fs::read_to_string(&path).await;
        result.map_err(|source| LoadError::Io { path, source })
    }
}

fn resolve(source: &str, data_dir: &Path) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

/// Parse Time, Latitude, Longitude rows. Header names are matched
/// case-insensitively; other columns are ignored.
pub fn parse_csv(text: &str) -> Result<Vec<TrackPoint>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))
    };
    let time_col = column("Time")?;
    let lat_col = column("Latitude")?;
    let lon_col = column("Longitude")?;

    let mut points = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let number = |col: usize, column: &'static str| {
            let value = record.get(col).unwrap_or_default();
            value.parse::<f64>().map_err(|_| LoadError::BadNumber {
                row,
                column,
                value: value.to_string(),
            })
        };
        let lat = number(lat_col, "Latitude")?;
        let lon = number(lon_col, "Longitude")?;
        let time = record.get(time_col).unwrap_or_default().to_string();
        points.push(TrackPoint::geo(time, lat, lon));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllPips, PixelPoint};

    const CSV: &str = "Time,Latitude,Longitude,Altitude\n\
        14:00:00,38.8898,-77.0368,120\n\
        14:00:10,38.9012,-77.0201,180\n\
        14:00:20,38.9150,-77.0005,240\n";

    #[test]
    fn test_parse_csv() {
        let points = parse_csv(CSV).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], TrackPoint::geo("14:00:10", 38.9012, -77.0201));
    }

    #[test]
    fn test_parse_csv_case_insensitive_headers() {
        let points = parse_csv("latitude, longitude, time\n1.5, 2.5, t0\n").unwrap();
        assert_eq!(points, vec![TrackPoint::geo("t0", 1.5, 2.5)]);
    }

    #[test]
    fn test_missing_column() {
        let err = parse_csv("Time,Lat,Longitude\n1,2,3\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Latitude")));
    }

    #[test]
    fn test_bad_number() {
        let err = parse_csv("Time,Latitude,Longitude\n14:00,abc,3\n").unwrap_err();
        match err {
            LoadError::BadNumber { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Latitude");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_csv_file() {
        let dir = std::env::temp_dir().join(format!("flight_track_loader_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("track.csv"), CSV).unwrap();

        let source = TrackSource::Csv { source: "track.csv".to_string() };
        let track = load_track(&source, &PipSelection::Indices(vec![0, 2]), &dir)
            .await
            .unwrap();
        assert_eq!(track.points().len(), 3);
        assert_eq!(track.pips(), &[0, 2]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let source = TrackSource::Csv { source: "definitely-missing.csv".to_string() };
        let err = load_track(&source, &PipSelection::default(), &std::env::temp_dir())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_pixels_with_all_pips() {
        let source = TrackSource::Pixels {
            points: vec![PixelPoint { x: 1.0, y: 2.0 }, PixelPoint { x: 3.0, y: 4.0 }],
        };
        let track = load_track(&source, &PipSelection::All(AllPips::All), Path::new("."))
            .await
            .unwrap();
        assert_eq!(track.pips(), &[0, 1]);
        assert_eq!(track.points()[1].coord, Coord::Pixel { x: 3.0, y: 4.0 });
    }

    #[tokio::test]
    async fn test_invalid_pips_fail() {
        let source = TrackSource::Pixels {
            points: vec![PixelPoint { x: 1.0, y: 2.0 }],
        };
        let err = load_track(&source, &PipSelection::Indices(vec![3]), Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Track(TrackError::PipOutOfRange { pip: 3, len: 1 })));
    }

    #[test]
    fn test_empty_csv_fails() {
        let err = parse_csv("Time,Latitude,Longitude\n")
            .map_err(LoadError::from)
            .and_then(|points| Track::new(points, vec![]).map_err(LoadError::from))
            .unwrap_err();
        assert!(matches!(err, LoadError::Track(TrackError::Empty)));
    }
}
