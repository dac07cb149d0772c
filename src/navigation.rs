//! Navigation State Machine
//!
//! Owns the single active-pip cursor. The cursor is a slot in the pip list,
//! not a track index. All side effects of a transition go through
//! [`NavContext`], in this order: old marker reset, new marker set, panel
//! shown, viewport panned.

use crate::captions::CaptionTable;
use crate::panel::{InfoPanel, PANEL_OFFSET};
use crate::pips::{MarkerState, PipRegistry};
use crate::projection::MapViewport;
use crate::track::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    NoneActive,
    ActiveAt(usize),
}

/// Collaborators a transition acts on
pub struct NavContext<'a> {
    pub track: &'a Track,
    pub captions: &'a CaptionTable,
    pub markers: &'a mut PipRegistry,
    pub panel: &'a mut InfoPanel,
    pub viewport: &'a mut dyn MapViewport,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    active: Option<usize>,
    len: usize,
}

impl Navigator {
    pub fn new(len: usize) -> Self {
        Self { active: None, len }
    }

    pub fn state(&self) -> NavState {
        match self.active {
            Some(i) => NavState::ActiveAt(i),
            None => NavState::NoneActive,
        }
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Make slot `slot` the active pip
    pub fn activate(&mut self, slot: usize, cx: &mut NavContext<'_>) {
        if slot >= self.len {
            tracing::warn!("Ignoring activation of pip slot {} (only {} pips)", slot, self.len);
            return;
        }

        if let Some(previous) = self.active {
            if previous != slot {
                cx.markers.set_visual_state(previous, MarkerState::Idle);
            }
        }
        cx.markers.set_visual_state(slot, MarkerState::Active);
        self.active = Some(slot);

        let Some(marker) = cx.markers.get(slot) else {
            return;
        };
        let (pip, coord, screen) = (marker.pip, marker.coord, marker.screen);
        let content = cx.captions.content_for(cx.track, pip);
        cx.panel.show(content, true, screen + PANEL_OFFSET);
        cx.viewport.pan_to(coord);

        tracing::debug!("Pip slot {} (track index {}) active", slot, pip);
    }

    pub fn next(&mut self, cx: &mut NavContext<'_>) {
        if self.len == 0 {
            return;
        }
        let slot = match self.active {
            None => 0,
            Some(i) => (i + 1) % self.len,
        };
        self.activate(slot, cx);
    }

    pub fn previous(&mut self, cx: &mut NavContext<'_>) {
        if self.len == 0 {
            return;
        }
        let slot = match self.active {
            None => self.len - 1,
            Some(i) => (i + self.len - 1) % self.len,
        };
        self.activate(slot, cx);
    }

    /// Clear the active pip and hide the panel; no-op when nothing is active
    pub fn deactivate(&mut self, cx: &mut NavContext<'_>) {
        let Some(slot) = self.active.take() else {
            return;
        };
        cx.markers.set_visual_state(slot, MarkerState::Idle);
        cx.panel.hide();
        tracing::debug!("Pip slot {} deactivated", slot);
    }
}
