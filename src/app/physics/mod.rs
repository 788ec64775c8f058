mod cluster;
mod forces;
mod quadtree;

use eframe::egui::Vec2;
use tracing::{debug, trace};

use crate::hierarchy::Category;
use cluster::ClusterForce;
use forces::{
    ChargeParams, LinkParams, accumulate_charge_for_node, accumulate_collisions, apply_center,
    apply_links,
};
use quadtree::BodyTree;

/// Every parameter of one simulation; replaces chained force setup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutConfig {
    pub(in crate::app) link_distance: f32,
    /// Distance for links touching the active node.
    pub(in crate::app) active_link_distance: f32,
    /// `None` uses `1 / min(degree)` of the two endpoints.
    pub(in crate::app) link_strength: Option<f32>,
    pub(in crate::app) charge_strength: f32,
    pub(in crate::app) charge_distance_min: f32,
    pub(in crate::app) charge_distance_max: Option<f32>,
    pub(in crate::app) theta: f32,
    pub(in crate::app) centering: bool,
    pub(in crate::app) collision_radius: f32,
    pub(in crate::app) collision_strength: f32,
    pub(in crate::app) cluster_strength: f32,
    pub(in crate::app) alpha_decay: f32,
    pub(in crate::app) velocity_decay: f32,
    pub(in crate::app) settle_threshold: f32,
    pub(in crate::app) drag_alpha_target: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 100.0,
            active_link_distance: 120.0,
            link_strength: None,
            charge_strength: -300.0,
            charge_distance_min: 1.0,
            charge_distance_max: None,
            theta: 0.9,
            centering: true,
            collision_radius: 12.0,
            collision_strength: 1.0,
            cluster_strength: cluster::DEFAULT_CLUSTER_STRENGTH,
            alpha_decay: 1.0 - 0.001_f32.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            settle_threshold: 0.05,
            drag_alpha_target: 0.1,
        }
    }
}

#[derive(Clone, Debug)]
pub(in crate::app) struct LayoutNode {
    pub(in crate::app) position: Vec2,
    pub(in crate::app) velocity: Vec2,
    pub(in crate::app) fixed_x: Option<f32>,
    pub(in crate::app) fixed_y: Option<f32>,
    pub(in crate::app) radius: f32,
    pub(in crate::app) cluster: Option<Category>,
    pub(in crate::app) is_active: bool,
}

impl LayoutNode {
    pub(in crate::app) fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            fixed_x: None,
            fixed_y: None,
            radius,
            cluster: None,
            is_active: false,
        }
    }

    pub(in crate::app) fn is_pinned(&self) -> bool {
        self.fixed_x.is_some() || self.fixed_y.is_some()
    }

    fn pin_at(&mut self, position: Vec2) {
        self.fixed_x = Some(position.x);
        self.fixed_y = Some(position.y);
        self.position = position;
        self.velocity = Vec2::ZERO;
    }

    fn unpin(&mut self) {
        self.fixed_x = None;
        self.fixed_y = None;
    }
}

/// Undirected simulated link between two node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct LayoutLink {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum SimulationState {
    Cold,
    Running,
    Settled,
}

/// What one step hands to its consumer.
pub(in crate::app) struct TickFrame<'a> {
    pub(in crate::app) nodes: &'a [LayoutNode],
    pub(in crate::app) alpha: f32,
    /// Set on the step that crossed the settle threshold.
    pub(in crate::app) settled: bool,
}

/// Position consumer, called synchronously exactly once per step.
pub(in crate::app) trait TickObserver {
    fn on_tick(&mut self, frame: TickFrame<'_>);
}

impl<F> TickObserver for F
where
    F: FnMut(TickFrame<'_>),
{
    fn on_tick(&mut self, frame: TickFrame<'_>) {
        self(frame);
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    deltas: Vec<Vec2>,
}

pub(in crate::app) struct LayoutEngine {
    config: LayoutConfig,
    nodes: Vec<LayoutNode>,
    links: Vec<LayoutLink>,
    link_params: Vec<LinkParams>,
    cluster: ClusterForce,
    home: Option<Category>,
    canvas: Vec2,
    alpha: f32,
    alpha_target: f32,
    state: SimulationState,
    scratch: PhysicsScratch,
}

impl LayoutEngine {
    pub(in crate::app) fn new(
        nodes: Vec<LayoutNode>,
        links: Vec<LayoutLink>,
        canvas: Vec2,
        home: Option<Category>,
        config: LayoutConfig,
    ) -> Self {
        let links = links
            .into_iter()
            .filter(|link| {
                link.source != link.target
                    && link.source < nodes.len()
                    && link.target < nodes.len()
            })
            .collect::<Vec<_>>();

        let mut engine = Self {
            config,
            nodes,
            links,
            link_params: Vec::new(),
            cluster: ClusterForce::default(),
            home,
            canvas,
            alpha: 1.0,
            alpha_target: 0.0,
            state: SimulationState::Cold,
            scratch: PhysicsScratch::default(),
        };
        engine.rebuild_forces();
        engine
    }

    fn rebuild_forces(&mut self) {
        let mut degree = vec![0usize; self.nodes.len()];
        for link in &self.links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }

        self.link_params = self
            .links
            .iter()
            .map(|link| {
                let source_degree = degree[link.source] as f32;
                let target_degree = degree[link.target] as f32;
                let touches_active =
                    self.nodes[link.source].is_active || self.nodes[link.target].is_active;
                LinkParams {
                    source: link.source,
                    target: link.target,
                    distance: if touches_active {
                        self.config.active_link_distance
                    } else {
                        self.config.link_distance
                    },
                    strength: self
                        .config
                        .link_strength
                        .unwrap_or_else(|| 1.0 / source_degree.min(target_degree)),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        let categories = self
            .nodes
            .iter()
            .filter(|node| !node.is_active)
            .filter_map(|node| node.cluster)
            .collect::<Vec<_>>();
        self.cluster = ClusterForce::build(
            &categories,
            self.home,
            self.canvas,
            self.config.cluster_strength,
        );
    }

    pub(in crate::app) fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub(in crate::app) fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub(in crate::app) fn node(&self, index: usize) -> Option<&LayoutNode> {
        self.nodes.get(index)
    }

    #[cfg(test)]
    pub(in crate::app) fn links(&self) -> &[LayoutLink] {
        &self.links
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    #[cfg(test)]
    pub(in crate::app) fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub(in crate::app) fn state(&self) -> SimulationState {
        self.state
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.state != SimulationState::Settled
    }

    /// Full restart: alpha back to 1.
    pub(in crate::app) fn restart(&mut self) {
        self.alpha = 1.0;
        self.state = SimulationState::Running;
        debug!(nodes = self.nodes.len(), "layout restarted");
    }

    /// Partial restart used while dragging.
    pub(in crate::app) fn reheat(&mut self, target: f32) {
        self.alpha_target = target;
        self.alpha = self.alpha.max(target);
        self.state = SimulationState::Running;
    }

    pub(in crate::app) fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target;
        if self.state == SimulationState::Settled && target >= self.config.settle_threshold {
            self.state = SimulationState::Running;
        }
    }

    pub(in crate::app) fn pin(&mut self, index: usize, position: Vec2) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pin_at(position);
            self.wake();
        }
    }

    /// Unpins everything except the active node.
    pub(in crate::app) fn unpin_all_but_active(&mut self) {
        for node in self.nodes.iter_mut().filter(|node| !node.is_active) {
            node.unpin();
        }
        self.wake();
    }

    pub(in crate::app) fn reconfigure(&mut self, config: LayoutConfig) {
        self.config = config;
        self.rebuild_forces();
        self.restart();
    }

    fn wake(&mut self) {
        if self.state == SimulationState::Settled {
            self.state = SimulationState::Running;
        }
    }

    /// Advances one step and reports it to `observer`. A settled engine
    /// does nothing and calls nobody.
    pub(in crate::app) fn tick(&mut self, observer: &mut dyn TickObserver) -> SimulationState {
        if self.state == SimulationState::Settled {
            return self.state;
        }
        self.state = SimulationState::Running;

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        apply_links(&mut self.nodes, &self.link_params, alpha);
        self.apply_charge_and_collision(alpha);
        self.cluster.apply(&mut self.nodes, alpha);
        if self.config.centering {
            apply_center(&mut self.nodes, self.canvas * 0.5);
        }
        self.integrate();

        let threshold = self.config.settle_threshold;
        let settled = self.alpha < threshold && self.alpha_target < threshold;
        trace!(alpha, "layout tick");

        observer.on_tick(TickFrame {
            nodes: &self.nodes,
            alpha,
            settled,
        });

        if settled {
            self.state = SimulationState::Settled;
            debug!(alpha, "layout settled");
        }
        self.state
    }

    fn apply_charge_and_collision(&mut self, alpha: f32) {
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.radii.push(node.radius);
        }

        let Some(tree) = BodyTree::build(&scratch.positions, &scratch.radii) else {
            return;
        };

        let distance_min = self.config.charge_distance_min;
        let charge = ChargeParams {
            strength: self.config.charge_strength * alpha,
            distance_min_sq: distance_min * distance_min,
            distance_max_sq: self
                .config
                .charge_distance_max
                .map_or(f32::INFINITY, |distance| distance * distance),
            theta_sq: self.config.theta * self.config.theta,
        };
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let velocity = &mut node.velocity;
            accumulate_charge_for_node(&tree, index, &scratch.positions, charge, velocity);
        }

        if self.config.collision_strength <= 0.0 || scratch.radii.iter().all(|radius| *radius <= 0.0) {
            return;
        }

        // Collision works on positions predicted from the current velocity.
        for (position, node) in scratch.positions.iter_mut().zip(&self.nodes) {
            *position = node.position + node.velocity;
        }
        let Some(predicted) = BodyTree::build(&scratch.positions, &scratch.radii) else {
            return;
        };

        scratch.deltas.clear();
        scratch.deltas.resize(self.nodes.len(), Vec2::ZERO);
        accumulate_collisions(
            &predicted,
            &scratch.positions,
            &scratch.radii,
            self.config.collision_strength,
            &mut scratch.deltas,
        );
        for (node, delta) in self.nodes.iter_mut().zip(&scratch.deltas) {
            node.velocity += *delta;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            match node.fixed_x {
                Some(x) => {
                    node.position.x = x;
                    node.velocity.x = 0.0;
                }
                None => {
                    node.velocity.x *= keep;
                    node.position.x += node.velocity.x;
                }
            }
            match node.fixed_y {
                Some(y) => {
                    node.position.y = y;
                    node.velocity.y = 0.0;
                }
                None => {
                    node.velocity.y *= keep;
                    node.position.y += node.velocity.y;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    const CANVAS: Vec2 = vec2(800.0, 600.0);

    fn star(count: usize) -> LayoutEngine {
        let mut nodes = vec![LayoutNode::new(CANVAS * 0.5, 12.0)];
        nodes[0].is_active = true;
        nodes[0].pin_at(CANVAS * 0.5);
        let mut links = Vec::new();
        for index in 1..=count {
            let angle = index as f32;
            let mut node =
                LayoutNode::new(CANVAS * 0.5 + vec2(angle.cos(), angle.sin()) * 30.0, 12.0);
            node.cluster = Some(if index % 2 == 0 {
                Category::People
            } else {
                Category::Technology
            });
            nodes.push(node);
            links.push(LayoutLink {
                source: 0,
                target: index,
            });
        }
        LayoutEngine::new(nodes, links, CANVAS, None, LayoutConfig::default())
    }

    fn run_to_rest(engine: &mut LayoutEngine) -> usize {
        let mut ticks = 0;
        while engine.tick(&mut |_: TickFrame<'_>| {}) != SimulationState::Settled {
            ticks += 1;
            assert!(ticks < 10_000, "simulation never settled");
        }
        ticks
    }

    #[test]
    fn default_decay_settles_in_about_three_hundred_ticks() {
        let mut engine = star(6);
        assert_eq!(engine.state(), SimulationState::Cold);
        let ticks = run_to_rest(&mut engine);
        assert!((120..=300).contains(&ticks), "{ticks}");
        assert!(engine.alpha() < 0.05);
    }

    #[test]
    fn observer_runs_once_per_tick_and_sees_the_settle() {
        let mut engine = star(4);
        let mut calls = 0usize;
        let mut settled_calls = 0usize;
        let mut observer = |frame: TickFrame<'_>| {
            calls += 1;
            if frame.settled {
                settled_calls += 1;
            }
            assert_eq!(frame.nodes.len(), 5);
        };

        let mut ticks = 0usize;
        loop {
            let state = engine.tick(&mut observer);
            ticks += 1;
            if state == SimulationState::Settled {
                break;
            }
        }
        assert_eq!(engine.tick(&mut observer), SimulationState::Settled);
        assert_eq!(calls, ticks);
        assert_eq!(settled_calls, 1);
    }

    #[test]
    fn pinned_axis_never_moves() {
        let mut engine = star(8);
        engine.pin(3, vec2(50.0, 60.0));
        engine.nodes[3].fixed_y = None;

        for _ in 0..40 {
            engine.tick(&mut |_: TickFrame<'_>| {});
            assert_eq!(engine.nodes()[3].position.x, 50.0);
            assert_eq!(engine.nodes()[0].position, CANVAS * 0.5);
        }
        assert_ne!(engine.nodes()[3].position.y, 60.0);
    }

    #[test]
    fn unlinked_nodes_repel() {
        let nodes = vec![
            LayoutNode::new(vec2(395.0, 300.0), 1.0),
            LayoutNode::new(vec2(405.0, 300.0), 1.0),
        ];
        let config = LayoutConfig {
            cluster_strength: 0.0,
            ..LayoutConfig::default()
        };
        let mut engine = LayoutEngine::new(nodes, Vec::new(), CANVAS, None, config);
        for _ in 0..20 {
            engine.tick(&mut |_: TickFrame<'_>| {});
        }
        let gap = engine.nodes()[1].position.x - engine.nodes()[0].position.x;
        assert!(gap > 10.0, "{gap}");
    }

    #[test]
    fn reheat_keeps_running_until_target_drops() {
        let mut engine = star(3);
        run_to_rest(&mut engine);

        engine.reheat(0.1);
        assert_eq!(engine.state(), SimulationState::Running);
        assert!(engine.alpha() >= 0.1);
        for _ in 0..500 {
            assert_eq!(
                engine.tick(&mut |_: TickFrame<'_>| {}),
                SimulationState::Running
            );
        }

        engine.set_alpha_target(0.0);
        run_to_rest(&mut engine);
        assert_eq!(engine.alpha_target(), 0.0);
    }

    #[test]
    fn restart_resets_alpha_and_unpin_wakes_a_settled_engine() {
        let mut engine = star(3);
        run_to_rest(&mut engine);

        engine.unpin_all_but_active();
        assert_eq!(engine.state(), SimulationState::Running);

        engine.restart();
        assert_eq!(engine.alpha(), 1.0);
        assert!(engine.nodes()[0].is_pinned());
        assert!(engine.nodes()[1..].iter().all(|node| !node.is_pinned()));
    }

    #[test]
    fn default_link_strength_follows_lowest_degree() {
        let engine = star(4);
        assert_eq!(engine.link_params.len(), 4);
        for params in &engine.link_params {
            assert_eq!(params.strength, 1.0);
            assert_eq!(params.distance, 120.0);
            assert!((params.bias - 0.8).abs() < 1e-6);
        }
    }

    #[test]
    fn reconfigure_rebuilds_forces_and_restarts() {
        let mut engine = star(2);
        run_to_rest(&mut engine);
        engine.reconfigure(LayoutConfig {
            active_link_distance: 200.0,
            link_strength: Some(0.5),
            ..LayoutConfig::default()
        });
        assert_eq!(engine.state(), SimulationState::Running);
        assert_eq!(engine.alpha(), 1.0);
        assert!(
            engine
                .link_params
                .iter()
                .all(|params| params.distance == 200.0 && params.strength == 0.5)
        );
    }

    #[test]
    fn self_and_dangling_links_are_ignored() {
        let nodes = vec![
            LayoutNode::new(vec2(0.0, 0.0), 1.0),
            LayoutNode::new(vec2(1.0, 0.0), 1.0),
        ];
        let links = vec![
            LayoutLink {
                source: 0,
                target: 0,
            },
            LayoutLink {
                source: 0,
                target: 9,
            },
            LayoutLink {
                source: 0,
                target: 1,
            },
        ];
        let engine = LayoutEngine::new(nodes, links, CANVAS, None, LayoutConfig::default());
        assert_eq!(engine.links().len(), 1);
    }
}
