//! Coordinate Projector
//!
//! Two stages: a [`MapBackend`] turns a track coordinate into a point on the
//! map plane (y up, as `egui_plot` draws it), and a [`MapViewport`] turns a
//! plane point into a screen position for the current pan/zoom.
//!
//! - Mercator: Web-Mercator world units, 256 per world width at zoom 0
//! - Image: image pixels; geographic coordinates use lon as x and lat as y

use egui::{Pos2, Rect};
use std::f64::consts::PI;

use crate::track::Coord;

/// Web-Mercator world size at zoom 0
pub const TILE_SIZE: f64 = 256.0;

/// Mercator latitude limit
const MAX_LAT: f64 = 85.051_128_78;

/// Point on the map plane
pub type PlanePoint = [f64; 2];

/// How track coordinates are laid out on the map plane
#[derive(Debug, Clone, PartialEq)]
pub enum MapBackend {
    Mercator { min_zoom: f64, max_zoom: f64 },
    Image { width: f64, height: f64 },
}

impl MapBackend {
    pub fn to_plane(&self, coord: Coord) -> PlanePoint {
        match (self, coord) {
            (MapBackend::Mercator { .. }, Coord::Geo { lat, lon }) => {
                [lon_to_x(lon), TILE_SIZE - lat_to_y(lat)]
            }
            (MapBackend::Image { .. }, Coord::Geo { lat, lon }) => [lon, lat],
            (_, Coord::Pixel { x, y }) => [x, -y],
        }
    }

    /// Clamp a zoom level to what the backend allows
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        match self {
            MapBackend::Mercator { min_zoom, max_zoom } => zoom.clamp(*min_zoom, *max_zoom),
            MapBackend::Image { .. } => zoom,
        }
    }
}

pub fn lon_to_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0 * TILE_SIZE
}

pub fn lat_to_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * TILE_SIZE
}

/// Screen-space view onto the map plane
///
/// Implementations own the current pan/zoom. `pan_to` is a request; it may be
/// applied on the next frame.
pub trait MapViewport {
    fn backend(&self) -> &MapBackend;

    fn plane_to_screen(&self, p: PlanePoint) -> Pos2;

    fn pan_to_plane(&mut self, p: PlanePoint);

    fn project_to_screen(&self, coord: Coord) -> Pos2 {
        self.plane_to_screen(self.backend().to_plane(coord))
    }

    fn pan_to(&mut self, coord: Coord) {
        let p = self.backend().to_plane(coord);
        self.pan_to_plane(p);
    }
}

/// Viewport backed by the bounds `egui_plot` reported for the last frame
#[derive(Debug, Clone)]
pub struct PlotViewport {
    backend: MapBackend,
    frame: Rect,
    min: PlanePoint,
    max: PlanePoint,
    pending_pan: Option<PlanePoint>,
    /// Fraction of the frame, per side, a pip may sit in before we recentre
    pub margin: f32,
}

impl PlotViewport {
    pub fn new(backend: MapBackend) -> Self {
        Self {
            backend,
            frame: Rect::NOTHING,
            min: [0.0, 0.0],
            max: [1.0, 1.0],
            pending_pan: None,
            margin: 0.1,
        }
    }

    /// Record the bounds drawn this frame. Returns true if the view changed.
    pub fn update(&mut self, frame: Rect, min: PlanePoint, max: PlanePoint) -> bool {
        let changed = frame != self.frame || min != self.min || max != self.max;
        self.frame = frame;
        self.min = min;
        self.max = max;
        changed
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn bounds(&self) -> (PlanePoint, PlanePoint) {
        (self.min, self.max)
    }

    pub fn center(&self) -> PlanePoint {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    /// Mercator zoom level of the current bounds
    pub fn zoom(&self) -> f64 {
        let width = self.max[0] - self.min[0];
        if width <= 0.0 || self.frame.width() <= 0.0 {
            return 0.0;
        }
        (self.frame.width() as f64 / width).log2()
    }

    /// Plane bounds of `frame` centred on `center` at `zoom`
    pub fn bounds_for(frame: Rect, center: PlanePoint, zoom: f64) -> (PlanePoint, PlanePoint) {
        let scale = 2f64.powf(zoom);
        let half_w = frame.width() as f64 / scale / 2.0;
        let half_h = frame.height() as f64 / scale / 2.0;
        (
            [center[0] - half_w, center[1] - half_h],
            [center[0] + half_w, center[1] + half_h],
        )
    }

    /// Take the pan request made since the last frame, if any
    pub fn take_pending_pan(&mut self) -> Option<PlanePoint> {
        self.pending_pan.take()
    }

    fn comfortably_visible(&self, pos: Pos2) -> bool {
        let inset = self.frame.size() * self.margin;
        self.frame.shrink2(inset).contains(pos)
    }
}

impl MapViewport for PlotViewport {
    fn backend(&self) -> &MapBackend {
        &self.backend
    }

    fn plane_to_screen(&self, p: PlanePoint) -> Pos2 {
        let w = self.max[0] - self.min[0];
        let h = self.max[1] - self.min[1];
        if w <= 0.0 || h <= 0.0 {
            return self.frame.center();
        }
        let fx = (p[0] - self.min[0]) / w;
        let fy = (p[1] - self.min[1]) / h;
        Pos2::new(
            self.frame.left() + (fx * self.frame.width() as f64) as f32,
            self.frame.bottom() - (fy * self.frame.height() as f64) as f32,
        )
    }

    fn pan_to_plane(&mut self, p: PlanePoint) {
        if self.comfortably_visible(self.plane_to_screen(p)) {
            return;
        }
        tracing::debug!("Recentring viewport on [{:.3}, {:.3}]", p[0], p[1]);
        self.pending_pan = Some(p);
    }
}
