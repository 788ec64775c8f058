use std::collections::BTreeMap;

use eframe::egui::{self, RichText, Ui};

use crate::hierarchy::{Category, GraphModel};

use super::super::ViewModel;
use super::super::render_utils::category_color;

/// Names directly below the active node, bucketed by category. Group nodes
/// contribute their members under the group's own label.
fn children_by_category(model: &GraphModel) -> BTreeMap<String, (Category, Vec<String>)> {
    let mut buckets: BTreeMap<String, (Category, Vec<String>)> = BTreeMap::new();
    for &child in &model.active().children {
        let Some(node) = model.node(child) else {
            continue;
        };
        if node.is_group() {
            let members = node
                .children
                .iter()
                .filter_map(|&member| model.node(member))
                .map(|member| member.name.clone());
            buckets
                .entry(node.name.clone())
                .or_insert_with(|| (node.category, Vec::new()))
                .1
                .extend(members);
        } else {
            buckets
                .entry(node.category.label().to_owned())
                .or_insert_with(|| (node.category, Vec::new()))
                .1
                .push(node.name.clone());
        }
    }
    for (_, names) in buckets.values_mut() {
        names.sort_by_key(|name| name.to_lowercase());
        names.dedup();
    }
    buckets
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let Some(scene) = self.scene.as_ref() else {
            ui.label("Every node is hidden by the current filters.");
            return;
        };

        let active = scene.model.active();
        ui.label(RichText::new(active.name.as_str()).strong());
        if let Some(type_label) = active.type_label.as_deref() {
            ui.small(type_label);
        }
        ui.add_space(6.0);

        if let Some(description) = active.description.as_deref() {
            ui.label(description);
        }
        if let Some(relationship) = active.relationship.as_deref() {
            ui.label(format!("Relationship: {relationship}"));
        }
        if let Some(total) = scene.model.total_nodes_displayed() {
            ui.label(format!("Nodes in hierarchy: {total}"));
        }
        ui.label(format!(
            "Shown: {} nodes, {} links",
            scene.model.nodes().len(),
            scene.model.links().len()
        ));

        ui.horizontal_wrapped(|ui| {
            for category in scene.model.categories() {
                ui.label(RichText::new(category.label()).color(category_color(category)));
            }
        });

        let buckets = children_by_category(&scene.model);
        let mut recenter = None;

        ui.separator();
        ui.label(RichText::new("Connected").strong());
        if buckets.is_empty() {
            ui.label("No visible children.");
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (label, (category, names)) in &buckets {
                    let header = RichText::new(format!("{label} ({})", names.len()))
                        .color(category_color(*category));
                    if ui
                        .link(header)
                        .on_hover_text("Recenter on this group")
                        .clicked()
                    {
                        recenter = Some(label.clone());
                    }
                    ui.indent(label.as_str(), |ui| {
                        for name in names {
                            if ui.link(name.as_str()).clicked() {
                                recenter = Some(name.clone());
                            }
                        }
                    });
                    ui.add_space(4.0);
                }
            });

        if let Some(name) = recenter {
            self.request_recenter(&name);
        }
    }
}
