//! Path Renderer - smooth flight path through every track point

use egui::{Color32, Pos2, Shape, Stroke};

use crate::projection::{MapBackend, MapViewport, PlanePoint};
use crate::track::Track;

/// Upper bound on interpolated samples per track segment
pub const MAX_PATH_SAMPLES: usize = 64;

/// Flight path geometry
///
/// Plane samples are built once; `relayout` only refreshes screen positions.
pub struct FlightPath {
    plane: Vec<PlanePoint>,
    screen: Vec<Pos2>,
}

impl FlightPath {
    /// Interpolate through the track with `samples` points per segment, at
    /// most [`MAX_PATH_SAMPLES`]. `samples <= 1` keeps straight segments.
    pub fn new(track: &Track, backend: &MapBackend, samples: usize) -> Self {
        let points: Vec<PlanePoint> = track
            .points()
            .iter()
            .map(|p| backend.to_plane(p.coord))
            .collect();
        let plane = monotone_cubic(&points, samples);
        tracing::debug!(
            "Flight path built: {} track points -> {} samples",
            points.len(),
            plane.len()
        );
        Self {
            screen: Vec::with_capacity(plane.len()),
            plane,
        }
    }

    /// Re-project every sample for the current view
    pub fn relayout(&mut self, viewport: &dyn MapViewport) {
        self.screen.clear();
        self.screen
            .extend(self.plane.iter().map(|&p| viewport.plane_to_screen(p)));
    }

    #[cfg(test)]
    pub fn plane_samples(&self) -> &[PlanePoint] {
        &self.plane
    }

    #[cfg(test)]
    pub fn screen_points(&self) -> &[Pos2] {
        &self.screen
    }

    pub fn shape(&self, color: Color32, width: f32) -> Shape {
        Shape::line(self.screen.clone(), Stroke::new(width, color))
    }
}

/// Monotone cubic through `points`, parameterised by point index
///
/// Tangents follow Steffen's rule, so every coordinate stays between the two
/// endpoints of its segment: the curve never doubles back past a point.
fn monotone_cubic(points: &[PlanePoint], samples: usize) -> Vec<PlanePoint> {
    let samples = samples.min(MAX_PATH_SAMPLES);
    if points.len() < 3 || samples <= 1 {
        return points.to_vec();
    }

    let tangents = [0, 1].map(|k| {
        let values: Vec<f64> = points.iter().map(|p| p[k]).collect();
        steffen_tangents(&values)
    });

    let last = points.len() - 1;
    let mut out = Vec::with_capacity(last * samples + 1);
    for i in 0..last {
        for s in 0..samples {
            let t = s as f64 / samples as f64;
            let axis = |k: usize| {
                hermite(points[i][k], points[i + 1][k], tangents[k][i], tangents[k][i + 1], t)
            };
            out.push([axis(0), axis(1)]);
        }
    }
    out.push(points[last]);
    out
}

fn steffen_tangents(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let d: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    let mut m = vec![0.0; n];
    m[0] = d[0];
    m[n - 1] = d[n - 2];
    for i in 1..n - 1 {
        let (a, b) = (d[i - 1], d[i]);
        if a * b > 0.0 {
            let p = 0.5 * (a + b);
            m[i] = (a.signum() + b.signum()) * a.abs().min(b.abs()).min(0.5 * p.abs());
        }
    }
    m
}

fn hermite(y0: f64, y1: f64, m0: f64, m1: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * y0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * y1
        + (t3 - t2) * m1
}
