use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::hierarchy::Category;

use super::LayoutNode;

pub(in crate::app) const DEFAULT_CLUSTER_STRENGTH: f32 = 0.05;

/// Pulls every non-active node toward the centroid of its category.
///
/// Centroids sit evenly on a circle of radius `min(width, height) / 2`
/// around the canvas center, the k-th of N categories at angle `2πk/N`.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct ClusterForce {
    centroids: Vec<(Category, Vec2)>,
    strength: f32,
}

impl ClusterForce {
    pub(in crate::app) fn build(
        categories: &[Category],
        home: Option<Category>,
        canvas: Vec2,
        strength: f32,
    ) -> Self {
        let clustered = categories
            .iter()
            .copied()
            .filter(|category| Some(*category) != home)
            .fold(Vec::new(), |mut unique, category| {
                if !unique.contains(&category) {
                    unique.push(category);
                }
                unique
            });

        let center = canvas * 0.5;
        let radius = canvas.min_elem() * 0.5;
        let count = clustered.len() as f32;
        let centroids = clustered
            .into_iter()
            .enumerate()
            .map(|(index, category)| {
                let angle = TAU * index as f32 / count;
                (category, center + vec2(angle.cos(), angle.sin()) * radius)
            })
            .collect();

        Self {
            centroids,
            strength,
        }
    }

    pub(in crate::app) fn centroid(&self, category: Category) -> Option<Vec2> {
        self.centroids
            .iter()
            .find(|(candidate, _)| *candidate == category)
            .map(|(_, centroid)| *centroid)
    }

    #[cfg(test)]
    pub(in crate::app) fn centroids(&self) -> &[(Category, Vec2)] {
        &self.centroids
    }

    pub(in crate::app) fn apply(&self, nodes: &mut [LayoutNode], alpha: f32) {
        if self.strength == 0.0 {
            return;
        }

        for node in nodes.iter_mut().filter(|node| !node.is_active) {
            let Some(centroid) = node.cluster.and_then(|category| self.centroid(category)) else {
                continue;
            };
            node.velocity -= (node.position - centroid) * (alpha * self.strength);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Vec2 = vec2(800.0, 600.0);

    #[test]
    fn centroids_are_evenly_spread_on_one_circle() {
        let categories = [
            Category::People,
            Category::Technology,
            Category::Data,
            Category::Applications,
            Category::Facilities,
        ];
        let force = ClusterForce::build(&categories, None, CANVAS, DEFAULT_CLUSTER_STRENGTH);
        let center = CANVAS * 0.5;

        assert_eq!(force.centroids().len(), categories.len());
        for (index, (category, centroid)) in force.centroids().iter().enumerate() {
            assert_eq!(*category, categories[index]);
            let offset = *centroid - center;
            assert!((offset.length() - 300.0).abs() < 1e-3);

            let expected = TAU * index as f32 / categories.len() as f32;
            let angle = offset.y.atan2(offset.x).rem_euclid(TAU);
            let difference = (angle - expected).abs();
            assert!(difference < 1e-4 || (TAU - difference) < 1e-4, "{angle} vs {expected}");
        }
    }

    #[test]
    fn home_category_gets_no_centroid() {
        let force = ClusterForce::build(
            &[Category::Organization, Category::People, Category::People],
            Some(Category::Organization),
            CANVAS,
            DEFAULT_CLUSTER_STRENGTH,
        );
        assert!(force.centroid(Category::Organization).is_none());
        assert_eq!(force.centroids().len(), 1);
        assert_eq!(force.centroid(Category::People), Some(vec2(700.0, 300.0)));
    }

    #[test]
    fn nodes_accelerate_toward_their_centroid_except_the_active_one() {
        let force = ClusterForce::build(
            &[Category::Data],
            None,
            CANVAS,
            DEFAULT_CLUSTER_STRENGTH,
        );
        let mut member = LayoutNode::new(vec2(400.0, 300.0), 10.0);
        member.cluster = Some(Category::Data);
        let mut active = member.clone();
        active.is_active = true;
        let mut nodes = vec![member, active];

        force.apply(&mut nodes, 0.5);
        assert!((nodes[0].velocity.x - 7.5).abs() < 1e-4, "{:?}", nodes[0].velocity);
        assert_eq!(nodes[0].velocity.y, 0.0);
        assert_eq!(nodes[1].velocity, Vec2::ZERO);
    }
}
