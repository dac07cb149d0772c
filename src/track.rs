//! Track Store - ordered track points and the pips placed on them
//!
//! A track is immutable once built. Its point order is chronological and is
//! also the order in which pips are navigated.

use chrono::{DateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of a track point that carries a pip
pub type PipIndex = usize;

/// A position on the map, either geographic or in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Geo { lat: f64, lon: f64 },
    Pixel { x: f64, y: f64 },
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Coord::Geo { lat, lon } => write!(f, "{:.5}, {:.5}", lat, lon),
            Coord::Pixel { x, y } => write!(f, "x={:.1} y={:.1}", x, y),
        }
    }
}

/// A single recorded sample
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub time: Option<String>,
    pub coord: Coord,
}

impl TrackPoint {
    pub fn geo(time: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            time: Some(time.into()),
            coord: Coord::Geo { lat, lon },
        }
    }

    pub fn pixel(x: f64, y: f64) -> Self {
        Self {
            time: None,
            coord: Coord::Pixel { x, y },
        }
    }

    /// Seconds since midnight (clock times) or since the epoch (RFC 3339)
    pub fn seconds(&self) -> Option<i64> {
        let time = self.time.as_deref()?.trim();
        if let Ok(t) = NaiveTime::parse_from_str(time, "%H:%M:%S") {
            return Some(i64::from(chrono::Timelike::num_seconds_from_midnight(&t)));
        }
        DateTime::parse_from_rfc3339(time).ok().map(|dt| dt.timestamp())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TrackError {
    #[error("Track has no points")]
    Empty,
    #[error("Pip {pip} is outside the track (0..{len})")]
    PipOutOfRange { pip: PipIndex, len: usize },
    #[error("Pips must be strictly increasing: {previous} is followed by {pip}")]
    PipOrder { previous: PipIndex, pip: PipIndex },
}

/// Loaded track plus its pip indices
#[derive(Debug, Clone)]
pub struct Track {
    points: Vec<TrackPoint>,
    pips: Vec<PipIndex>,
}

impl Track {
    /// Build a track, checking that every pip references a point and that
    /// pips are strictly increasing
    pub fn new(points: Vec<TrackPoint>, pips: Vec<PipIndex>) -> Result<Self, TrackError> {
        if points.is_empty() {
            return Err(TrackError::Empty);
        }

        let mut previous: Option<PipIndex> = None;
        for &pip in &pips {
            if pip >= points.len() {
                return Err(TrackError::PipOutOfRange { pip, len: points.len() });
            }
            if let Some(prev) = previous {
                if pip <= prev {
                    return Err(TrackError::PipOrder { previous: prev, pip });
                }
            }
            previous = Some(pip);
        }

        Ok(Self { points, pips })
    }

    /// Every point is a pip
    pub fn with_all_pips(points: Vec<TrackPoint>) -> Result<Self, TrackError> {
        let pips = (0..points.len()).collect();
        Self::new(points, pips)
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn pips(&self) -> &[PipIndex] {
        &self.pips
    }

    pub fn pip_count(&self) -> usize {
        self.pips.len()
    }

    /// Track point under the pip at navigation slot `slot`
    pub fn pip_point(&self, slot: usize) -> Option<&TrackPoint> {
        self.pips.get(slot).and_then(|&pip| self.points.get(pip))
    }

    /// Elapsed seconds between the first and last timestamped points
    pub fn duration_seconds(&self) -> Option<i64> {
        let first = self.points.iter().find_map(TrackPoint::seconds)?;
        let last = self.points.iter().rev().find_map(TrackPoint::seconds)?;
        Some(last - first)
    }
}
