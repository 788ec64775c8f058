use eframe::egui::{Pos2, Rect, Vec2};

use super::physics::{LayoutNode, TickFrame, TickObserver};

pub(in crate::app) const MIN_ZOOM: f32 = 0.05;
pub(in crate::app) const MAX_ZOOM: f32 = 10.0;
/// Below this alpha the view follows the cooling layout every tick.
pub(in crate::app) const REFIT_BELOW_ALPHA: f32 = 0.3;
/// Largest share of each container axis a fit spends on one side's padding.
const MAX_PADDING_SHARE: f32 = 0.25;

/// World to panel-local screen mapping: `screen = rect.min + translate + world * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ViewTransform {
    pub(in crate::app) scale: f32,
    pub(in crate::app) translate: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub(in crate::app) fn world_to_screen(self, rect: Rect, world: Vec2) -> Pos2 {
        rect.min + self.translate + world * self.scale
    }

    pub(in crate::app) fn screen_to_world(self, rect: Rect, screen: Pos2) -> Vec2 {
        (screen - rect.min - self.translate) / self.scale
    }

    /// Zooms by `factor` while keeping the world point under `pointer` still.
    pub(in crate::app) fn zoom_about(&mut self, rect: Rect, pointer: Pos2, factor: f32) {
        let world_before = self.screen_to_world(rect, pointer);
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.translate = pointer - rect.min - world_before * self.scale;
    }

    pub(in crate::app) fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }
}

/// Fits every position inside `container` leaving `padding` on each side.
/// Returns `None` when there is nothing to fit.
pub(in crate::app) fn fit(
    positions: impl IntoIterator<Item = Vec2>,
    container: Vec2,
    padding: f32,
) -> Option<ViewTransform> {
    let mut positions = positions
        .into_iter()
        .filter(|point| point.x.is_finite() && point.y.is_finite());
    let first = positions.next()?;
    let (min, max) = positions.fold((first, first), |(min, max), point| {
        (min.min(point), max.max(point))
    });

    let extent = max - min;
    let center = (min + max) * 0.5;
    let available = (container - clamp_padding(container, padding) * 2.0).max(Vec2::splat(1.0));

    let scale_x = (extent.x > f32::EPSILON).then(|| available.x / extent.x);
    let scale_y = (extent.y > f32::EPSILON).then(|| available.y / extent.y);
    let scale = match (scale_x, scale_y) {
        (None, None) => 1.0,
        (Some(scale), None) | (None, Some(scale)) => scale.min(MAX_ZOOM),
        (Some(x), Some(y)) => x.min(y).min(MAX_ZOOM),
    };

    Some(ViewTransform {
        scale,
        translate: container * 0.5 - center * scale,
    })
}

/// Per-axis padding [`fit`] actually leaves: the policy padding, cut down on
/// any axis too small to afford it.
pub(in crate::app) fn clamp_padding(container: Vec2, padding: f32) -> Vec2 {
    Vec2::splat(padding.max(0.0)).min(container * MAX_PADDING_SHARE)
}

/// Keeps a transform fitted to the layout: every tick once it has cooled
/// below [`REFIT_BELOW_ALPHA`], and always on the settling tick.
pub(in crate::app) struct ViewportFollower<'a> {
    pub(in crate::app) transform: &'a mut ViewTransform,
    pub(in crate::app) container: Vec2,
    pub(in crate::app) padding: f32,
    /// Indices of the nodes the view keeps in frame.
    pub(in crate::app) framed: &'a [usize],
    pub(in crate::app) follow: bool,
}

impl TickObserver for ViewportFollower<'_> {
    fn on_tick(&mut self, frame: TickFrame<'_>) {
        let cooling = self.follow && frame.alpha < REFIT_BELOW_ALPHA;
        if !frame.settled && !cooling {
            return;
        }
        if let Some(transform) = fit_nodes(frame.nodes, self.framed, self.container, self.padding) {
            *self.transform = transform;
        }
    }
}

/// [`fit`] over the `framed` subset of `nodes`.
pub(in crate::app) fn fit_nodes(
    nodes: &[LayoutNode],
    framed: &[usize],
    container: Vec2,
    padding: f32,
) -> Option<ViewTransform> {
    let positions = framed
        .iter()
        .filter_map(|&index| nodes.get(index))
        .map(|node| node.position);
    fit(positions, container, padding)
}

/// Padding for a fit, by how many nodes are on screen.
pub(in crate::app) fn padding_for(node_count: usize, aggregation: bool) -> f32 {
    match node_count {
        count if count > 50 => 75.0,
        count if count > 20 => {
            if aggregation {
                100.0
            } else {
                120.0
            }
        }
        count if count > 5 => 225.0,
        4 | 5 => 275.0,
        _ => 300.0,
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn single_node_is_centered_at_unit_scale() {
        let transform = fit([vec2(10.0, 10.0)], vec2(400.0, 300.0), 75.0).expect("one node");
        assert_eq!(transform.scale, 1.0);

        let rect = Rect::from_min_size(Pos2::ZERO, vec2(400.0, 300.0));
        assert_eq!(transform.world_to_screen(rect, vec2(10.0, 10.0)), pos2(200.0, 150.0));
    }

    #[test]
    fn coincident_nodes_take_the_degenerate_branch() {
        let transform = fit([vec2(3.0, 4.0); 4], vec2(400.0, 300.0), 75.0).expect("nodes");
        assert_eq!(transform.scale, 1.0);
        assert!(transform.translate.x.is_finite() && transform.translate.y.is_finite());
    }

    #[test]
    fn collinear_nodes_fit_along_their_only_axis() {
        let transform = fit(
            [vec2(0.0, 50.0), vec2(100.0, 50.0)],
            vec2(400.0, 300.0),
            100.0,
        )
        .expect("nodes");
        assert_eq!(transform.scale, 2.0);
        assert_eq!(transform.translate, vec2(100.0, 50.0));
    }

    #[test]
    fn small_container_caps_the_padding_instead_of_collapsing_the_graph() {
        let points = [vec2(0.0, 0.0), vec2(120.0, 45.0), vec2(60.0, 90.0)];
        let container = vec2(560.0, 480.0);
        let padding = padding_for(points.len(), false);
        assert_eq!(clamp_padding(container, padding), vec2(140.0, 120.0));

        let transform = fit(points, container, padding).expect("nodes");
        assert!((transform.scale - 280.0 / 120.0).abs() < 1e-4);

        let rect = Rect::from_min_size(Pos2::ZERO, container);
        let left = transform.world_to_screen(rect, points[0]).x;
        let right = transform.world_to_screen(rect, points[1]).x;
        assert!((right - left - 280.0).abs() < 1e-3);
        assert!((left - 140.0).abs() < 1e-3);
    }

    #[test]
    fn roomy_container_keeps_the_policy_padding() {
        assert_eq!(clamp_padding(vec2(1600.0, 1200.0), 300.0), vec2(300.0, 300.0));
        assert_eq!(clamp_padding(vec2(0.0, 0.0), 75.0), Vec2::ZERO);
    }

    #[test]
    fn nothing_to_fit() {
        assert!(fit(std::iter::empty(), vec2(400.0, 300.0), 75.0).is_none());
    }

    #[test]
    fn zoom_keeps_the_point_under_the_pointer() {
        let rect = Rect::from_min_size(pos2(20.0, 10.0), vec2(400.0, 300.0));
        let mut transform = ViewTransform::default();
        let pointer = pos2(120.0, 90.0);
        let before = transform.screen_to_world(rect, pointer);

        transform.zoom_about(rect, pointer, 1.5);
        let after = transform.screen_to_world(rect, pointer);
        assert!((before - after).length() < 1e-4);

        for _ in 0..100 {
            transform.zoom_about(rect, pointer, 1.5);
        }
        assert_eq!(transform.scale, MAX_ZOOM);
        for _ in 0..200 {
            transform.zoom_about(rect, pointer, 0.5);
        }
        assert_eq!(transform.scale, MIN_ZOOM);
    }

    #[test]
    fn padding_shrinks_as_the_graph_grows() {
        assert_eq!(padding_for(1, false), 300.0);
        assert_eq!(padding_for(3, true), 300.0);
        assert_eq!(padding_for(4, false), 275.0);
        assert_eq!(padding_for(5, false), 275.0);
        assert_eq!(padding_for(6, false), 225.0);
        assert_eq!(padding_for(21, false), 120.0);
        assert_eq!(padding_for(21, true), 100.0);
        assert_eq!(padding_for(51, true), 75.0);
    }

    #[test]
    fn follower_refits_only_when_cool_or_settled() {
        let nodes = vec![
            LayoutNode::new(vec2(0.0, 0.0), 1.0),
            LayoutNode::new(vec2(100.0, 100.0), 1.0),
        ];
        let container = vec2(400.0, 300.0);
        let mut transform = ViewTransform::default();

        let mut follower = ViewportFollower {
            transform: &mut transform,
            container,
            padding: 50.0,
            framed: &[0, 1],
            follow: true,
        };
        follower.on_tick(TickFrame {
            nodes: &nodes,
            alpha: 0.8,
            settled: false,
        });
        assert_eq!(*follower.transform, ViewTransform::default());

        follower.on_tick(TickFrame {
            nodes: &nodes,
            alpha: 0.2,
            settled: false,
        });
        assert_eq!(follower.transform.scale, 2.0);

        *follower.transform = ViewTransform::default();
        follower.follow = false;
        follower.on_tick(TickFrame {
            nodes: &nodes,
            alpha: 0.2,
            settled: false,
        });
        assert_eq!(*follower.transform, ViewTransform::default());

        follower.on_tick(TickFrame {
            nodes: &nodes,
            alpha: 0.04,
            settled: true,
        });
        assert_eq!(transform.scale, 2.0);
    }

    proptest! {
        #[test]
        fn fit_respects_both_axes_and_centers_the_box(
            points in prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 2..40),
            width in 300.0f32..1600.0,
            height in 300.0f32..1200.0,
            padding in 0.0f32..140.0,
        ) {
            let points = points.into_iter().map(|(x, y)| vec2(x, y)).collect::<Vec<_>>();
            let min = points.iter().fold(Vec2::splat(f32::INFINITY), |min, point| min.min(*point));
            let max = points.iter().fold(Vec2::splat(f32::NEG_INFINITY), |max, point| max.max(*point));
            let extent = max - min;
            prop_assume!(extent.x > 1.0 && extent.y > 1.0);

            let container = vec2(width, height);
            let transform = fit(points.iter().copied(), container, padding).expect("points");

            let padding = clamp_padding(container, padding);
            let tolerance = 1e-3;
            prop_assert!(transform.scale <= (width - 2.0 * padding.x) / extent.x * (1.0 + tolerance));
            prop_assert!(transform.scale <= (height - 2.0 * padding.y) / extent.y * (1.0 + tolerance));

            let rect = Rect::from_min_size(Pos2::ZERO, container);
            let screen_center = transform.world_to_screen(rect, (min + max) * 0.5);
            prop_assert!((screen_center - rect.center()).length() < 0.05);
        }
    }
}
