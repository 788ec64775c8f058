use eframe::egui::{Vec2, vec2};

use super::LayoutNode;
use super::quadtree::BodyTree;

/// Tiny deterministic nudge used when two points coincide.
pub(super) fn jiggle(seed: usize) -> Vec2 {
    let angle = ((seed as f32) * 0.618_034 + 0.37).fract() * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

#[derive(Clone, Copy, Debug)]
pub(super) struct LinkParams {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
    /// Share of the correction taken by the target.
    pub(super) bias: f32,
}

/// Spring toward `distance`, applied sequentially on predicted positions.
pub(super) fn apply_links(nodes: &mut [LayoutNode], links: &[LinkParams], alpha: f32) {
    for (index, link) in links.iter().enumerate() {
        let source = &nodes[link.source];
        let target = &nodes[link.target];
        let mut delta =
            (target.position + target.velocity) - (source.position + source.velocity);
        if delta.length_sq() <= f32::EPSILON {
            delta = jiggle(index);
        }

        let length = delta.length();
        let correction = delta * ((length - link.distance) / length * alpha * link.strength);

        nodes[link.target].velocity -= correction * link.bias;
        nodes[link.source].velocity += correction * (1.0 - link.bias);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    /// Strength already scaled by alpha; negative repels.
    pub(super) strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) distance_max_sq: f32,
    pub(super) theta_sq: f32,
}

fn charge_between(delta: Vec2, distance_sq: f32, weight: f32, params: ChargeParams) -> Vec2 {
    let mut distance_sq = distance_sq;
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    delta * (params.strength * weight / distance_sq)
}

/// Many-body force on one node; cells far enough away act through their
/// centroid.
pub(super) fn accumulate_charge_for_node(
    tree: &BodyTree,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    let point = positions[index];
    tree.visit(|cell| {
        if cell.is_leaf() {
            for &other in tree.bodies(cell) {
                if other == index {
                    continue;
                }
                let mut delta = positions[other] - point;
                let mut distance_sq = delta.length_sq();
                if distance_sq >= params.distance_max_sq {
                    continue;
                }
                if distance_sq <= f32::EPSILON {
                    delta = jiggle(index * 31 + other);
                    distance_sq = delta.length_sq();
                }
                *velocity += charge_between(delta, distance_sq, 1.0, params);
            }
            return false;
        }

        let delta = cell.centroid - point;
        let distance_sq = delta.length_sq();
        let far_enough = !cell.contains(point)
            && distance_sq > f32::EPSILON
            && cell.size * cell.size < params.theta_sq * distance_sq;
        if !far_enough {
            return true;
        }
        if distance_sq < params.distance_max_sq {
            *velocity += charge_between(delta, distance_sq, cell.mass, params);
        }
        false
    });
}

fn collide_pair(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    deltas: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut delta = positions[from] - positions[to];
    let mut distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }
    if distance_sq <= f32::EPSILON {
        delta = jiggle(from * 17 + to);
        distance_sq = delta.length_sq();
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };

    deltas[from] += push * share;
    deltas[to] -= push * (1.0 - share);
}

/// Overlap corrections for every body, written to `deltas`. A cell is
/// skipped once it lies farther than the body's radius plus the cell's
/// largest radius; each pair is resolved once, from its lower index.
pub(super) fn accumulate_collisions(
    tree: &BodyTree,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    deltas: &mut [Vec2],
) {
    for (index, &point) in positions.iter().enumerate() {
        let radius = radii[index];
        tree.visit(|cell| {
            if !cell.reaches(point, radius + cell.max_radius) {
                return false;
            }
            if !cell.is_leaf() {
                return true;
            }
            for &other in tree.bodies(cell) {
                if other > index {
                    collide_pair(index, other, positions, radii, strength, deltas);
                }
            }
            false
        });
    }
}

/// Translates every node so the mean position sits on `center`.
pub(super) fn apply_center(nodes: &mut [LayoutNode], center: Vec2) {
    if nodes.is_empty() {
        return;
    }
    let total = nodes
        .iter()
        .fold(Vec2::ZERO, |total, node| total + node.position);
    let mean = total / nodes.len() as f32;
    let shift = center - mean;
    for node in nodes {
        node.position += shift;
    }
}
