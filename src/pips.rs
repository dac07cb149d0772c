//! Pip Registry - one interactive marker per pip
//!
//! Markers are addressed by their navigation slot (position in the pip list).
//! The registry only stores and paints marker state; which marker is active or
//! hovered is decided by the navigator and the viewer.

use egui::{Color32, Painter, Pos2, Stroke};
use serde::{Deserialize, Serialize};

use crate::projection::MapViewport;
use crate::track::{Coord, PipIndex, Track};

/// Visual state of a single marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerState {
    #[default]
    Idle,
    Hovered,
    Active,
}

/// Radius and colour for one marker state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerLook {
    pub radius: f32,
    pub color: [u8; 3],
}

impl MarkerLook {
    pub fn color32(&self) -> Color32 {
        Color32::from_rgb(self.color[0], self.color[1], self.color[2])
    }
}

/// Marker appearance per state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub idle: MarkerLook,
    pub hovered: MarkerLook,
    pub active: MarkerLook,
    /// Extra pixels around a marker that still count as a hit
    pub hit_tolerance: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            idle: MarkerLook { radius: 5.0, color: [211, 211, 211] },    // lightgrey
            hovered: MarkerLook { radius: 7.0, color: [255, 165, 0] },   // orange
            active: MarkerLook { radius: 10.0, color: [255, 165, 0] },
            hit_tolerance: 3.0,
        }
    }
}

impl MarkerStyle {
    pub fn look(&self, state: MarkerState) -> MarkerLook {
        match state {
            MarkerState::Idle => self.idle,
            MarkerState::Hovered => self.hovered,
            MarkerState::Active => self.active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Marker {
    pub pip: PipIndex,
    pub coord: Coord,
    pub screen: Pos2,
    pub state: MarkerState,
    pub radius: f32,
    pub color: Color32,
}

/// All markers of the current track
pub struct PipRegistry {
    markers: Vec<Marker>,
    style: MarkerStyle,
}

impl PipRegistry {
    /// Create one `Idle` marker per pip, in pip order
    pub fn new(track: &Track, style: MarkerStyle) -> Self {
        let idle = style.look(MarkerState::Idle);
        let markers = track
            .pips()
            .iter()
            .map(|&pip| Marker {
                pip,
                coord: track.points()[pip].coord,
                screen: Pos2::ZERO,
                state: MarkerState::Idle,
                radius: idle.radius,
                color: idle.color32(),
            })
            .collect::<Vec<_>>();
        tracing::debug!("Created {} pip markers", markers.len());
        Self { markers, style }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, slot: usize) -> Option<&Marker> {
        self.markers.get(slot)
    }

    /// Navigation slot of a pip index
    #[cfg(test)]
    pub fn slot_of(&self, pip: PipIndex) -> Option<usize> {
        self.markers.binary_search_by_key(&pip, |m| m.pip).ok()
    }

    #[cfg(test)]
    pub fn state(&self, slot: usize) -> Option<MarkerState> {
        self.markers.get(slot).map(|m| m.state)
    }

    /// Apply a visual state; unknown slots are ignored
    pub fn set_visual_state(&mut self, slot: usize, state: MarkerState) {
        let look = self.style.look(state);
        if let Some(marker) = self.markers.get_mut(slot) {
            marker.state = state;
            marker.radius = look.radius;
            marker.color = look.color32();
        }
    }

    /// Recompute screen positions; states are left alone
    pub fn relayout(&mut self, viewport: &dyn MapViewport) {
        for marker in &mut self.markers {
            marker.screen = viewport.project_to_screen(marker.coord);
        }
    }

    /// Nearest marker under `pos`, if any
    pub fn hit_test(&self, pos: Pos2) -> Option<usize> {
        self.markers
            .iter()
            .enumerate()
            .filter_map(|(slot, m)| {
                let d = m.screen.distance(pos);
                (d <= m.radius + self.style.hit_tolerance).then_some((slot, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(slot, _)| slot)
    }

    /// Number of markers currently `Active`
    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.markers
            .iter()
            .filter(|m| m.state == MarkerState::Active)
            .count()
    }

    /// Paint markers, active one last so it sits on top
    pub fn paint(&self, painter: &Painter) {
        let outline = Stroke::new(1.0, Color32::from_black_alpha(160));
        let mut order: Vec<&Marker> = self.markers.iter().collect();
        order.sort_by_key(|m| m.state != MarkerState::Idle);
        order.sort_by_key(|m| m.state == MarkerState::Active);
        for m in order {
            painter.circle(m.screen, m.radius, m.color, outline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{MapBackend, PlotViewport};
    use crate::track::TrackPoint;
    use egui::Rect;

    fn registry() -> PipRegistry {
        let points = (0..50).map(|i| TrackPoint::pixel(i as f64 * 2.0, 10.0)).collect();
        let track = Track::new(points, vec![1, 14, 44]).unwrap();
        PipRegistry::new(&track, MarkerStyle::default())
    }

    fn viewport() -> PlotViewport {
        let mut vp = PlotViewport::new(MapBackend::Image { width: 100.0, height: 100.0 });
        vp.update(
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 100.0)),
            [0.0, -100.0],
            [100.0, 0.0],
        );
        vp
    }

    #[test]
    fn test_one_idle_marker_per_pip() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert!(reg.markers().iter().all(|m| m.state == MarkerState::Idle));
        assert_eq!(reg.slot_of(14), Some(1));
        assert_eq!(reg.slot_of(15), None);
    }

    #[test]
    fn test_visual_state_changes_look() {
        let mut reg = registry();
        let style = MarkerStyle::default();
        reg.set_visual_state(0, MarkerState::Hovered);
        reg.set_visual_state(1, MarkerState::Active);
        assert_eq!(reg.get(0).unwrap().radius, style.hovered.radius);
        assert_eq!(reg.get(1).unwrap().radius, style.active.radius);
        assert_eq!(reg.get(2).unwrap().radius, style.idle.radius);
        assert!(style.idle.radius < style.hovered.radius);
        assert!(style.hovered.radius < style.active.radius);
        assert_eq!(reg.active_count(), 1);
    }

    #[test]
    fn test_unknown_slot_ignored() {
        let mut reg = registry();
        reg.set_visual_state(7, MarkerState::Active);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn test_relayout_and_hit_test() {
        let mut reg = registry();
        reg.relayout(&viewport());
        let pip14 = reg.get(1).unwrap().screen;
        assert!(pip14.distance(Pos2::new(28.0, 10.0)) < 1e-3);

        assert_eq!(reg.hit_test(Pos2::new(29.0, 11.0)), Some(1));
        assert_eq!(reg.hit_test(Pos2::new(60.0, 60.0)), None);
    }

    #[test]
    fn test_relayout_keeps_state() {
        let mut reg = registry();
        reg.set_visual_state(2, MarkerState::Active);
        reg.relayout(&viewport());
        assert_eq!(reg.state(2), Some(MarkerState::Active));
        assert_eq!(reg.len(), 3);
    }
}
