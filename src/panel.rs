//! Info Panel Controller
//!
//! The floating panel showing a pip's photo and caption. A panel is either
//! transient (opened by hover, closed on pointer-leave or any outside click)
//! or persistent (opened by activation, closed only by deactivation or a map
//! background click).
//!
//! Outside-click dismissal of a transient panel is held as a
//! [`DismissSubscription`]; dropping it is the release.

use egui::{Pos2, Rect, Vec2};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

/// Offset from the pointer (or marker) to the panel's top-left corner
pub const PANEL_OFFSET: Vec2 = Vec2::new(10.0, -50.0);

/// What the panel displays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelContent {
    pub image: Option<PathBuf>,
    pub caption: String,
}

/// Live outside-click subscription; released on drop
#[derive(Debug)]
pub struct DismissSubscription {
    live: Rc<Cell<usize>>,
}

impl Drop for DismissSubscription {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
        tracing::trace!("Outside-click subscription released");
    }
}

/// Outcome of a click routed through the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelClick {
    /// Click landed on the panel itself
    Inside,
    /// A transient panel was closed by the click
    Dismissed,
    /// Panel did not react
    Ignored,
}

#[derive(Debug, Default)]
pub struct InfoPanel {
    visible: bool,
    persistent: bool,
    content: PanelContent,
    screen_pos: Pos2,
    /// Area the panel was drawn in last frame
    rect: Option<Rect>,
    subscription: Option<DismissSubscription>,
    live: Rc<Cell<usize>>,
}

impl InfoPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, content: PanelContent, persistent: bool, screen_pos: Pos2) {
        self.visible = true;
        self.persistent = persistent;
        self.content = content;
        self.screen_pos = screen_pos;
        self.rect = None;

        if persistent {
            self.subscription = None;
        } else if self.subscription.is_none() {
            self.live.set(self.live.get() + 1);
            self.subscription = Some(DismissSubscription { live: self.live.clone() });
        }
    }

    /// Hide the panel; content stays for the next `show`
    pub fn hide(&mut self) {
        self.visible = false;
        self.persistent = false;
        self.rect = None;
        self.subscription = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_persistent(&self) -> bool {
        self.visible && self.persistent
    }

    pub fn content(&self) -> &PanelContent {
        &self.content
    }

    pub fn screen_pos(&self) -> Pos2 {
        self.screen_pos
    }

    /// Reposition; the drawn rect is stale until the next `set_rect`
    pub fn move_to(&mut self, screen_pos: Pos2) {
        self.screen_pos = screen_pos;
        self.rect = None;
    }

    /// Record where the panel was drawn so clicks can be tested against it
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = Some(rect);
    }

    pub fn contains(&self, pos: Pos2) -> bool {
        self.visible && self.rect.is_some_and(|r| r.contains(pos))
    }

    /// Outside-click subscriptions currently held
    #[cfg(test)]
    pub fn live_subscriptions(&self) -> usize {
        self.live.get()
    }

    /// Route a click; a transient panel closes on any click outside it
    pub fn click(&mut self, pos: Pos2) -> PanelClick {
        if self.contains(pos) {
            return PanelClick::Inside;
        }
        if self.subscription.is_some() {
            self.hide();
            return PanelClick::Dismissed;
        }
        PanelClick::Ignored
    }
}
