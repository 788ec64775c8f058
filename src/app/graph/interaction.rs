use eframe::egui::{Pos2, Rect, Vec2};
use tracing::{debug, warn};

use super::build::GraphScene;

/// Screen radii of the node circles; independent of zoom.
pub(in crate::app) const ACTIVE_RADIUS: f32 = 9.0;
pub(in crate::app) const GROUP_RADIUS: f32 = 7.5;
pub(in crate::app) const MEMBER_RADIUS: f32 = 6.0;
const HIT_SLOP: f32 = 3.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum ClickOutcome {
    /// The clicked node is already the focus.
    Ignored,
    Recenter(String),
    MissingIdentity,
}

impl GraphScene {
    pub(in crate::app) fn screen_radius(&self, index: usize) -> f32 {
        match self.model.node(index) {
            Some(_) if index == self.model.active_index() => ACTIVE_RADIUS,
            Some(node) if node.is_group() => GROUP_RADIUS,
            _ => MEMBER_RADIUS,
        }
    }

    /// Topmost node under `pointer`, if any.
    pub(in crate::app) fn node_at(&self, rect: Rect, pointer: Pos2) -> Option<usize> {
        self.engine
            .nodes()
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let screen = self.transform.world_to_screen(rect, node.position);
                let distance = screen.distance(pointer);
                (distance <= self.screen_radius(index) + HIT_SLOP).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Freezes the rest of the layout and picks up `index` where it is.
    /// The active node stays pinned at the center and cannot be picked up.
    pub(in crate::app) fn begin_drag(&mut self, index: usize) {
        if index == self.model.active_index() {
            return;
        }
        let Some(grabbed) = self.position(index) else {
            return;
        };

        let frozen = self
            .engine
            .nodes()
            .iter()
            .map(|node| node.position)
            .enumerate()
            .filter(|(other, _)| *other != index)
            .collect::<Vec<_>>();
        for (other, position) in frozen {
            self.engine.pin(other, position);
        }
        self.engine.pin(index, grabbed);

        let target = self.engine.config().drag_alpha_target;
        self.engine.reheat(target);
        self.dragging = Some(index);
        debug!(node = index, "drag started");
    }

    pub(in crate::app) fn drag_to(&mut self, world: Vec2) {
        if let Some(index) = self.dragging {
            self.engine.pin(index, world);
        }
    }

    /// The dragged node stays where it was released; the layout coasts.
    pub(in crate::app) fn end_drag(&mut self) {
        if self.dragging.take().is_some() {
            self.engine.set_alpha_target(0.0);
        }
    }

    pub(in crate::app) fn click(&self, index: usize) -> ClickOutcome {
        let Some(node) = self.model.node(index) else {
            return ClickOutcome::Ignored;
        };
        if node.name.trim().is_empty() {
            warn!(id = %node.id, "clicked node has no name or group category");
            return ClickOutcome::MissingIdentity;
        }
        if index == self.model.active_index() {
            return ClickOutcome::Ignored;
        }
        ClickOutcome::Recenter(node.name.clone())
    }

    pub(in crate::app) fn zoom_at(&mut self, rect: Rect, pointer: Pos2, factor: f32) {
        self.transform.zoom_about(rect, pointer, factor);
        self.follow_layout = false;
    }

    pub(in crate::app) fn pan(&mut self, delta: Vec2) {
        self.transform.pan(delta);
        self.follow_layout = false;
    }

    /// Lets every node but the active one move again and restarts.
    pub(in crate::app) fn reshuffle(&mut self) {
        self.dragging = None;
        self.engine.unpin_all_but_active();
        self.engine.set_alpha_target(0.0);
        self.engine.restart();
        self.follow_layout = true;
    }
}
