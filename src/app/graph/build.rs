use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use tracing::info;

use crate::hierarchy::GraphModel;
use crate::util::stable_pair;

use super::super::physics::{
    LayoutConfig, LayoutEngine, LayoutLink, LayoutNode, SimulationState,
};
use super::super::viewport::{ViewTransform, ViewportFollower, fit_nodes, padding_for};

const INITIAL_RING_RADIUS: f32 = 100.0;
const INITIAL_JITTER: f32 = 4.0;

/// One rendered graph: the model, its simulation and the view onto it.
/// Rebuilt from scratch for every new model.
pub(in crate::app) struct GraphScene {
    pub(in crate::app) model: GraphModel,
    pub(in crate::app) engine: LayoutEngine,
    pub(in crate::app) transform: ViewTransform,
    pub(in crate::app) container: Vec2,
    pub(in crate::app) aggregation: bool,
    /// Member nodes; groups never count towards the fit or its padding.
    pub(in crate::app) framed: Vec<usize>,
    pub(in crate::app) dragging: Option<usize>,
    /// Cleared once the user zooms or pans, until the next restart.
    pub(in crate::app) follow_layout: bool,
}

impl GraphScene {
    pub(in crate::app) fn new(
        model: GraphModel,
        canvas: Vec2,
        config: LayoutConfig,
        aggregation: bool,
    ) -> Self {
        let center = canvas * 0.5;
        let count = model.nodes().len().max(1) as f32;
        let active = model.active_index();

        let nodes = model
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let mut layout_node = if index == active {
                    let mut pinned = LayoutNode::new(center, config.collision_radius);
                    pinned.fixed_x = Some(center.x);
                    pinned.fixed_y = Some(center.y);
                    pinned.is_active = true;
                    pinned
                } else {
                    let angle = TAU * index as f32 / count;
                    let (jx, jy) = stable_pair(&node.id);
                    let position = center
                        + vec2(angle.cos(), angle.sin()) * INITIAL_RING_RADIUS
                        + vec2(jx, jy) * INITIAL_JITTER;
                    LayoutNode::new(position, config.collision_radius)
                };
                layout_node.cluster = Some(node.category);
                layout_node
            })
            .collect::<Vec<_>>();

        let links = model
            .links()
            .iter()
            .map(|link| LayoutLink {
                source: link.source,
                target: link.target,
            })
            .collect();

        info!(
            nodes = model.nodes().len(),
            links = model.links().len(),
            active = %model.active().name,
            "rendering graph"
        );

        let mut framed = model
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_group())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if framed.is_empty() {
            framed = (0..model.nodes().len()).collect();
        }

        let engine = LayoutEngine::new(
            nodes,
            links,
            canvas,
            Some(model.home_category()),
            config,
        );

        let mut scene = Self {
            model,
            engine,
            transform: ViewTransform::default(),
            container: canvas,
            aggregation,
            framed,
            dragging: None,
            follow_layout: true,
        };
        scene.fit_now();
        scene
    }

    pub(in crate::app) fn padding(&self) -> f32 {
        padding_for(self.framed.len(), self.aggregation)
    }

    pub(in crate::app) fn fit_now(&mut self) {
        let nodes = self.engine.nodes();
        if let Some(transform) = fit_nodes(nodes, &self.framed, self.container, self.padding()) {
            self.transform = transform;
        }
    }

    /// Refits when the drawing area changed size.
    pub(in crate::app) fn set_container(&mut self, container: Vec2) {
        if (container - self.container).length_sq() > 0.25 {
            self.container = container;
            self.fit_now();
        }
    }

    /// One simulation step with the view following it.
    pub(in crate::app) fn step(&mut self) -> SimulationState {
        let padding = self.padding();
        let mut follower = ViewportFollower {
            transform: &mut self.transform,
            container: self.container,
            padding,
            framed: &self.framed,
            follow: self.follow_layout && self.dragging.is_none(),
        };
        self.engine.tick(&mut follower)
    }

    pub(in crate::app) fn position(&self, index: usize) -> Option<Vec2> {
        self.engine.node(index).map(|node| node.position)
    }
}

#[cfg(test)]
pub(in crate::app) mod tests {
    use super::*;
    use crate::app::viewport::clamp_padding;
    use crate::hierarchy::{BuildOptions, CategoryVisibility, RawNode};

    pub(in crate::app) const CANVAS: Vec2 = vec2(800.0, 600.0);

    pub(in crate::app) fn scene() -> GraphScene {
        let raw = RawNode::member("Payroll", "Applications").with_children(vec![
            RawNode::member("Ada", "People"),
            RawNode::member("Grace", "People"),
            RawNode::member("Postgres", "Technology"),
            RawNode::member("Ledger", "Data"),
        ]);
        let model = GraphModel::build(
            &raw,
            &CategoryVisibility::default(),
            BuildOptions::default(),
        )
        .expect("model builds");
        GraphScene::new(model, CANVAS, LayoutConfig::default(), false)
    }

    #[test]
    fn active_node_starts_pinned_at_the_canvas_center() {
        let scene = scene();
        let active = scene.model.active_index();
        let node = scene.engine.node(active).expect("active node");
        assert_eq!(node.position, CANVAS * 0.5);
        assert!(node.is_active && node.is_pinned());

        for (index, node) in scene.engine.nodes().iter().enumerate() {
            if index == active {
                continue;
            }
            assert!(!node.is_pinned());
            let distance = (node.position - CANVAS * 0.5).length();
            assert!((distance - INITIAL_RING_RADIUS).abs() <= INITIAL_JITTER * 1.5);
        }
    }

    #[test]
    fn settling_leaves_the_whole_graph_in_view() {
        let mut scene = scene();
        let mut ticks = 0;
        while scene.step() != SimulationState::Settled {
            ticks += 1;
            assert!(ticks < 1_000);
        }
        assert_eq!(scene.engine.nodes()[scene.model.active_index()].position, CANVAS * 0.5);

        let padding = clamp_padding(CANVAS, scene.padding());
        for node in scene.engine.nodes() {
            let screen = scene.transform.world_to_screen(
                eframe::egui::Rect::from_min_size(eframe::egui::Pos2::ZERO, CANVAS),
                node.position,
            );
            assert!(screen.x >= padding.x - 0.5 && screen.x <= CANVAS.x - padding.x + 0.5);
            assert!(screen.y >= padding.y - 0.5 && screen.y <= CANVAS.y - padding.y + 0.5);
        }
    }

    #[test]
    fn groups_are_left_out_of_the_fit() {
        let raw = RawNode::member("Payroll", "Applications").with_children(vec![
            RawNode::group("People").with_children(vec![
                RawNode::member("Ada", "People"),
                RawNode::member("Grace", "People"),
            ]),
            RawNode::group("Technology")
                .with_children(vec![RawNode::member("Postgres", "Technology")]),
        ]);
        let options = BuildOptions {
            aggregation: true,
            indirect_links: false,
        };
        let model =
            GraphModel::build(&raw, &CategoryVisibility::default(), options).expect("model builds");
        let mut scene = GraphScene::new(model, CANVAS, LayoutConfig::default(), true);

        assert_eq!(scene.model.nodes().len(), 6);
        assert_eq!(scene.framed.len(), 4);
        assert_eq!(scene.padding(), padding_for(4, true));

        let group = scene
            .model
            .nodes()
            .iter()
            .position(|node| node.is_group())
            .expect("group node");
        assert!(!scene.framed.contains(&group));

        let before = scene.transform;
        scene.engine.pin(group, vec2(50_000.0, -50_000.0));
        scene.fit_now();
        assert_eq!(scene.transform, before);
    }

    #[test]
    fn resize_refits() {
        let mut scene = scene();
        let before = scene.transform;
        scene.set_container(vec2(1600.0, 1200.0));
        assert_ne!(scene.transform, before);
        assert_eq!(scene.container, vec2(1600.0, 1200.0));
    }
}
