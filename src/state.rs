//! Viewer State - Single Source of Truth (SSOT)
//!
//! Owns the track, markers, path, navigator and info panel. Every pointer,
//! keyboard and viewport event goes through here and is handled to completion
//! before the next one.
//!
//! Precedence between inputs is "last action wins": a marker click moves the
//! navigation cursor to that marker, and keyboard navigation continues from
//! there. Hover never displaces a persistent panel.

use egui::Pos2;

use crate::captions::CaptionTable;
use crate::config::StyleConfig;
use crate::keys::NavCommand;
use crate::navigation::{NavContext, NavState, Navigator};
use crate::panel::{InfoPanel, PanelClick, PANEL_OFFSET};
use crate::path::FlightPath;
use crate::pips::{MarkerState, PipRegistry};
use crate::projection::MapViewport;
use crate::track::Track;

pub struct Viewer<V: MapViewport> {
    track: Track,
    captions: CaptionTable,
    markers: PipRegistry,
    path: FlightPath,
    nav: Navigator,
    panel: InfoPanel,
    viewport: V,
    hovered: Option<usize>,
}

impl<V: MapViewport> Viewer<V> {
    pub fn new(track: Track, captions: CaptionTable, style: &StyleConfig, viewport: V) -> Self {
        let markers = PipRegistry::new(&track, style.markers.clone());
        let path = FlightPath::new(&track, viewport.backend(), style.path_samples);
        let nav = Navigator::new(track.pip_count());
        let mut viewer = Self {
            track,
            captions,
            markers,
            path,
            nav,
            panel: InfoPanel::new(),
            viewport,
            hovered: None,
        };
        viewer.viewport_changed();
        viewer
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn captions(&self) -> &CaptionTable {
        &self.captions
    }

    pub fn markers(&self) -> &PipRegistry {
        &self.markers
    }

    pub fn path(&self) -> &FlightPath {
        &self.path
    }

    pub fn panel(&self) -> &InfoPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut InfoPanel {
        &mut self.panel
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn nav_state(&self) -> NavState {
        self.nav.state()
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Re-project path and markers after a pan or zoom. Marker states and the
    /// active pip are untouched; a persistent panel follows its marker.
    pub fn viewport_changed(&mut self) {
        self.path.relayout(&self.viewport);
        self.markers.relayout(&self.viewport);

        if let (Some(slot), true) = (self.nav.active(), self.panel.is_persistent()) {
            if let Some(marker) = self.markers.get(slot) {
                self.panel.move_to(marker.screen + PANEL_OFFSET);
            }
        }
    }

    /// Pointer moved to `pos` (None when it left the map)
    pub fn pointer_moved(&mut self, pos: Option<Pos2>) {
        let hit = pos.and_then(|p| self.markers.hit_test(p));
        if hit == self.hovered {
            return;
        }
        if let Some(old) = self.hovered.take() {
            self.hover_leave(old);
        }
        if let (Some(slot), Some(p)) = (hit, pos) {
            self.hover_enter(slot, p);
        }
    }

    fn hover_enter(&mut self, slot: usize, pointer: Pos2) {
        self.hovered = Some(slot);
        if self.nav.active() != Some(slot) {
            self.markers.set_visual_state(slot, MarkerState::Hovered);
        }
        if !self.panel.is_persistent() {
            if let Some(marker) = self.markers.get(slot) {
                let content = self.captions.content_for(&self.track, marker.pip);
                self.panel.show(content, false, pointer + PANEL_OFFSET);
            }
        }
    }

    fn hover_leave(&mut self, slot: usize) {
        if self.nav.active() != Some(slot) {
            self.markers.set_visual_state(slot, MarkerState::Idle);
        }
        if self.panel.is_visible() && !self.panel.is_persistent() {
            self.panel.hide();
        }
    }

    /// Primary click at `pos`
    pub fn click(&mut self, pos: Pos2) {
        if self.panel.click(pos) == PanelClick::Inside {
            return;
        }
        match self.markers.hit_test(pos) {
            Some(slot) => self.activate(slot),
            None => {
                tracing::debug!("Map background clicked");
                self.deactivate();
            }
        }
    }

    pub fn command(&mut self, command: NavCommand) {
        match command {
            NavCommand::Next => self.next(),
            NavCommand::Previous => self.previous(),
            NavCommand::Dismiss => {
                self.deactivate();
                self.panel.hide();
            }
        }
    }

    pub fn activate(&mut self, slot: usize) {
        self.navigate(|nav, cx| nav.activate(slot, cx));
    }

    pub fn next(&mut self) {
        self.navigate(|nav, cx| nav.next(cx));
    }

    pub fn previous(&mut self) {
        self.navigate(|nav, cx| nav.previous(cx));
    }

    pub fn deactivate(&mut self) {
        self.navigate(|nav, cx| nav.deactivate(cx));
    }

    fn navigate(&mut self, f: impl FnOnce(&mut Navigator, &mut NavContext<'_>)) {
        let mut cx = NavContext {
            track: &self.track,
            captions: &self.captions,
            markers: &mut self.markers,
            panel: &mut self.panel,
            viewport: &mut self.viewport,
        };
        f(&mut self.nav, &mut cx);

        // a marker the pointer still rests on shows as hovered once it is no
        // longer active
        if let Some(slot) = self.hovered {
            if self.nav.active() != Some(slot) {
                self.markers.set_visual_state(slot, MarkerState::Hovered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{MapBackend, PlotViewport};
    use crate::track::TrackPoint;
    use egui::Rect;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    const PIPS: [usize; 3] = [1, 14, 44];

    fn viewer() -> Viewer<PlotViewport> {
        // 50 points along a diagonal, 2 px apart
        let points = (0..50)
            .map(|i| TrackPoint::pixel(i as f64 * 2.0, i as f64 * 2.0))
            .collect();
        let track = Track::new(points, PIPS.to_vec()).unwrap();

        let mut captions = BTreeMap::new();
        captions.insert(1, "Takeoff".to_string());
        captions.insert(14, "Coastline".to_string());
        // no caption for 44
        let captions = CaptionTable::new(captions, Some("image-{index}.jpg".to_string()), None, "data");

        let mut viewport = PlotViewport::new(MapBackend::Image { width: 100.0, height: 100.0 });
        viewport.update(
            Rect::from_min_max(Pos2::ZERO, Pos2::new(100.0, 100.0)),
            [0.0, -100.0],
            [100.0, 0.0],
        );
        Viewer::new(track, captions, &StyleConfig::default(), viewport)
    }

    fn states(v: &Viewer<PlotViewport>) -> Vec<MarkerState> {
        v.markers().markers().iter().map(|m| m.state).collect()
    }

    fn screen_of(v: &Viewer<PlotViewport>, slot: usize) -> Pos2 {
        v.markers().get(slot).unwrap().screen
    }

    #[test]
    fn test_keyboard_scenario() {
        let mut v = viewer();
        assert_eq!(v.nav_state(), NavState::NoneActive);

        v.command(NavCommand::Next);
        assert_eq!(v.nav_state(), NavState::ActiveAt(0));
        assert_eq!(states(&v)[0], MarkerState::Active);
        assert!(v.panel().is_persistent());
        assert_eq!(v.panel().content().caption, "Takeoff");

        v.command(NavCommand::Next);
        assert_eq!(v.nav_state(), NavState::ActiveAt(1));
        assert_eq!(states(&v), vec![MarkerState::Idle, MarkerState::Active, MarkerState::Idle]);

        v.command(NavCommand::Previous);
        assert_eq!(v.nav_state(), NavState::ActiveAt(0));
        v.command(NavCommand::Previous);
        assert_eq!(v.nav_state(), NavState::ActiveAt(2));
        assert_eq!(states(&v), vec![MarkerState::Idle, MarkerState::Idle, MarkerState::Active]);
    }

    #[test]
    fn test_click_switches_active_pip() {
        let mut v = viewer();
        v.activate(0);

        let pip44 = screen_of(&v, 2);
        v.click(pip44);
        assert_eq!(v.nav_state(), NavState::ActiveAt(2));
        assert_eq!(states(&v), vec![MarkerState::Idle, MarkerState::Idle, MarkerState::Active]);
        assert!(v.panel().is_persistent());
        assert_eq!(v.panel().content().caption, "");
        assert_eq!(v.panel().content().image, Some(PathBuf::from("data/image-44.jpg")));

        // keyboard continues from the clicked pip
        v.command(NavCommand::Next);
        assert_eq!(v.nav_state(), NavState::ActiveAt(0));
    }

    #[test]
    fn test_click_active_pip_stays_active() {
        let mut v = viewer();
        v.activate(1);
        v.click(screen_of(&v, 1));
        assert_eq!(v.nav_state(), NavState::ActiveAt(1));
        assert_eq!(states(&v)[1], MarkerState::Active);
    }

    #[test]
    fn test_hover_active_pip_keeps_active() {
        let mut v = viewer();
        v.activate(1);
        v.pointer_moved(Some(screen_of(&v, 1)));
        assert_eq!(states(&v)[1], MarkerState::Active);
        v.pointer_moved(None);
        assert_eq!(states(&v)[1], MarkerState::Active);
        assert!(v.panel().is_persistent());
    }

    #[test]
    fn test_hover_shows_transient_panel() {
        let mut v = viewer();
        let pos = screen_of(&v, 1);
        v.pointer_moved(Some(pos));
        assert_eq!(v.hovered(), Some(1));
        assert_eq!(states(&v)[1], MarkerState::Hovered);
        assert!(v.panel().is_visible());
        assert!(!v.panel().is_persistent());
        assert_eq!(v.panel().screen_pos(), pos + PANEL_OFFSET);
        assert_eq!(v.panel().live_subscriptions(), 1);

        v.pointer_moved(Some(Pos2::new(99.0, 1.0)));
        assert_eq!(states(&v)[1], MarkerState::Idle);
        assert!(!v.panel().is_visible());
        assert_eq!(v.panel().live_subscriptions(), 0);
    }

    #[test]
    fn test_hover_does_not_replace_persistent_panel() {
        let mut v = viewer();
        v.activate(0);
        v.pointer_moved(Some(screen_of(&v, 1)));
        assert_eq!(states(&v)[1], MarkerState::Hovered);
        assert_eq!(v.panel().content().caption, "Takeoff");
        assert!(v.panel().is_persistent());

        v.pointer_moved(None);
        assert_eq!(states(&v)[1], MarkerState::Idle);
        assert!(v.panel().is_persistent());
    }

    #[test]
    fn test_background_click_deactivates() {
        let mut v = viewer();
        v.activate(2);
        v.click(Pos2::new(90.0, 5.0));
        assert_eq!(v.nav_state(), NavState::NoneActive);
        assert_eq!(states(&v), vec![MarkerState::Idle; 3]);
        assert!(!v.panel().is_visible());
    }

    #[test]
    fn test_outside_click_closes_transient_panel() {
        let mut v = viewer();
        v.pointer_moved(Some(screen_of(&v, 0)));
        assert!(v.panel().is_visible());
        v.click(Pos2::new(90.0, 5.0));
        assert!(!v.panel().is_visible());
        assert_eq!(v.panel().live_subscriptions(), 0);
    }

    #[test]
    fn test_click_inside_panel_is_ignored() {
        let mut v = viewer();
        v.activate(0);
        let rect = Rect::from_min_size(Pos2::new(60.0, 60.0), egui::Vec2::new(30.0, 30.0));
        v.panel_mut().set_rect(rect);
        v.click(Pos2::new(70.0, 70.0));
        assert_eq!(v.nav_state(), NavState::ActiveAt(0));
        assert!(v.panel().is_persistent());
    }

    #[test]
    fn test_viewport_change_reprojects_only_geometry() {
        let mut v = viewer();
        v.activate(1);
        v.pointer_moved(Some(screen_of(&v, 0)));
        let before_states = states(&v);
        let before = screen_of(&v, 2);

        // pan 20 plane units to the right
        let frame = v.viewport().frame();
        let changed = v.viewport_mut().update(frame, [20.0, -100.0], [120.0, 0.0]);
        assert!(changed);
        v.viewport_changed();

        for (slot, marker) in v.markers().markers().iter().enumerate() {
            let expected = v.viewport().project_to_screen(marker.coord);
            assert_eq!(v.markers().get(slot).unwrap().screen, expected);
        }
        assert!((screen_of(&v, 2).x - (before.x - 20.0)).abs() < 1e-3);

        let first_sample = v.path().plane_samples()[0];
        assert_eq!(v.path().screen_points()[0], v.viewport().plane_to_screen(first_sample));
        assert_eq!(v.path().screen_points().len(), v.path().plane_samples().len());

        assert_eq!(states(&v), before_states);
        assert_eq!(v.nav_state(), NavState::ActiveAt(1));
        assert_eq!(v.panel().screen_pos(), screen_of(&v, 1) + PANEL_OFFSET);
    }

    #[test]
    fn test_missing_caption_renders_idle() {
        let v = viewer();
        assert_eq!(v.captions().missing_captions(v.track()), vec![44]);
        assert_eq!(states(&v)[2], MarkerState::Idle);
    }

    #[test]
    fn test_dismiss_command() {
        let mut v = viewer();
        v.command(NavCommand::Previous);
        v.command(NavCommand::Dismiss);
        assert_eq!(v.nav_state(), NavState::NoneActive);
        assert!(!v.panel().is_visible());
    }

    #[test]
    fn test_hovered_marker_restored_after_navigation() {
        let mut v = viewer();
        v.activate(1);
        v.pointer_moved(Some(screen_of(&v, 1)));
        v.command(NavCommand::Next);
        assert_eq!(states(&v)[1], MarkerState::Hovered);
        assert_eq!(states(&v)[2], MarkerState::Active);
        assert_eq!(v.markers().active_count(), 1);
    }
}
