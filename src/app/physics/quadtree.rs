use std::ops::Range;

use eframe::egui::{Vec2, vec2};

const LEAF_BODIES: usize = 4;
const MAX_DEPTH: u32 = 16;

/// One square of the tree. Inner cells and leaves alike know which bodies
/// they cover.
#[derive(Clone, Debug)]
pub(super) struct Cell {
    /// Top-left corner.
    pub(super) origin: Vec2,
    pub(super) size: f32,
    pub(super) mass: f32,
    pub(super) centroid: Vec2,
    /// Largest body radius inside; bounds how far a collision can reach.
    pub(super) max_radius: f32,
    span: Range<usize>,
    children: [Option<usize>; 4],
}

impl Cell {
    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn contains(&self, point: Vec2) -> bool {
        self.reaches(point, 0.0)
    }

    /// Whether `point` lies within `margin` of this square.
    pub(super) fn reaches(&self, point: Vec2, margin: f32) -> bool {
        let min = self.origin - Vec2::splat(margin);
        let max = self.origin + Vec2::splat(self.size + margin);
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }
}

/// Bit 0 set for the right half, bit 1 for the bottom half.
fn quadrant(origin: Vec2, half: f32, point: Vec2) -> usize {
    usize::from(point.x >= origin.x + half) | (usize::from(point.y >= origin.y + half) << 1)
}

fn quadrant_origin(origin: Vec2, half: f32, quadrant: usize) -> Vec2 {
    origin
        + vec2(
            if quadrant & 1 == 0 { 0.0 } else { half },
            if quadrant & 2 == 0 { 0.0 } else { half },
        )
}

/// Barnes-Hut tree over the bodies of one tick, stored flat with the root
/// at cell 0. Bodies are reordered so each cell covers one contiguous run.
pub(super) struct BodyTree {
    cells: Vec<Cell>,
    order: Vec<usize>,
}

impl BodyTree {
    /// `None` for an empty set or any non-finite position.
    pub(super) fn build(positions: &[Vec2], radii: &[f32]) -> Option<Self> {
        let first = *positions.first()?;
        if positions
            .iter()
            .any(|point| !point.x.is_finite() || !point.y.is_finite())
        {
            return None;
        }

        let (min, max) = positions
            .iter()
            .fold((first, first), |(min, max), &point| (min.min(point), max.max(point)));
        let size = (max - min).max_elem().max(1.0);

        let mut tree = Self {
            cells: Vec::new(),
            order: (0..positions.len()).collect(),
        };
        tree.split(positions, radii, min, size, 0..positions.len(), 0);
        Some(tree)
    }

    fn split(
        &mut self,
        positions: &[Vec2],
        radii: &[f32],
        origin: Vec2,
        size: f32,
        span: Range<usize>,
        depth: u32,
    ) -> usize {
        let bodies = &self.order[span.clone()];
        let count = bodies.len();
        let centroid = bodies
            .iter()
            .fold(Vec2::ZERO, |sum, &body| sum + positions[body])
            / count as f32;
        let max_radius = bodies
            .iter()
            .map(|&body| radii.get(body).copied().unwrap_or(0.0))
            .fold(0.0, f32::max);
        let coincident = bodies
            .iter()
            .all(|&body| positions[body] == positions[bodies[0]]);

        let id = self.cells.len();
        self.cells.push(Cell {
            origin,
            size,
            mass: count as f32,
            centroid,
            max_radius,
            span: span.clone(),
            children: [None; 4],
        });
        if count <= LEAF_BODIES || depth >= MAX_DEPTH || coincident {
            return id;
        }

        let half = size * 0.5;
        self.order[span.clone()].sort_by_key(|&body| quadrant(origin, half, positions[body]));

        let mut start = span.start;
        for quad in 0..4 {
            let end = start
                + self.order[start..span.end]
                    .iter()
                    .take_while(|&&body| quadrant(origin, half, positions[body]) == quad)
                    .count();
            if end > start {
                let child = self.split(
                    positions,
                    radii,
                    quadrant_origin(origin, half, quad),
                    half,
                    start..end,
                    depth + 1,
                );
                self.cells[id].children[quad] = Some(child);
            }
            start = end;
        }
        id
    }

    pub(super) fn bodies(&self, cell: &Cell) -> &[usize] {
        &self.order[cell.span.clone()]
    }

    /// Depth-first walk from the root; `descend` decides whether a cell's
    /// children are visited.
    pub(super) fn visit(&self, mut descend: impl FnMut(&Cell) -> bool) {
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let Some(cell) = self.cells.get(id) else {
                continue;
            };
            if descend(cell) {
                stack.extend(cell.children.iter().flatten().copied());
            }
        }
    }

    #[cfg(test)]
    fn leaves(&self) -> Vec<&Cell> {
        self.cells.iter().filter(|cell| cell.is_leaf()).collect()
    }
}
