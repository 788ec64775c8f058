use eframe::egui::{self, Color32, Key, RichText, Ui};

use crate::hierarchy::Category;

use super::super::physics::LayoutConfig;
use super::super::{MAX_DEPTH, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Explore");
        ui.separator();
        ui.add_space(4.0);

        self.draw_search(ui);
        ui.separator();

        let depth_slider = ui
            .add(egui::Slider::new(&mut self.settings.depth, 0..=MAX_DEPTH).text("Depth"))
            .on_hover_text("How many levels around the active node the backend returns.");
        if depth_slider.drag_stopped() || (depth_slider.changed() && !depth_slider.dragged()) {
            self.request_refetch();
        }

        ui.horizontal(|ui| {
            if ui
                .button("Home")
                .on_hover_text("Recenter on the node this session started with.")
                .clicked()
            {
                let home = self.home.clone();
                self.request_recenter(&home);
            }
            if ui
                .button("Reshuffle")
                .on_hover_text("Release every dragged node and run the layout again.")
                .clicked()
                && let Some(scene) = self.scene.as_mut()
            {
                scene.reshuffle();
            }
        });

        ui.separator();

        let mut rebuild = false;
        rebuild |= ui
            .checkbox(&mut self.settings.aggregation, "Group by category")
            .on_hover_text("Keep one group node per category instead of listing members.")
            .changed();
        let indirect_available = self.indirect_links_available();
        let indirect =
            egui::Checkbox::new(&mut self.settings.indirect_links, "Indirect relationships");
        rebuild |= ui
            .add_enabled(indirect_available, indirect)
            .on_hover_text("Draw dashed links for indirect relationships.")
            .on_disabled_hover_text("This hierarchy has no indirect relationships.")
            .changed();
        ui.checkbox(&mut self.settings.show_member_circles, "Member circles")
            .on_hover_text("Hide to show only labels for member nodes.");

        ui.separator();
        ui.label(RichText::new("Categories").strong());
        for category in Category::ALL {
            let mut visible = self.settings.visibility.is_visible(category);
            if ui.checkbox(&mut visible, category.label()).changed() {
                self.settings.visibility.set(category, visible);
                rebuild = true;
            }
        }
        if ui.button("Show all").clicked() && self.settings.visibility.hidden().next().is_some() {
            self.settings.visibility.show_all();
            rebuild = true;
        }

        if rebuild {
            self.rebuild_scene();
        }

        ui.separator();
        ui.collapsing("Layout tuning", |ui| self.draw_layout_tuning(ui));
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search").on_hover_text("Recenter on a node by its name.");

        let mut submit = false;
        ui.horizontal(|ui| {
            let field = ui.text_edit_singleline(&mut self.search);
            if field.changed() {
                self.search_message = None;
            }
            if field.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter)) {
                submit = true;
            }
            if ui.button("Go").clicked() {
                submit = true;
            }
            if !self.search.is_empty() && ui.button("Clear").clicked() {
                self.search.clear();
                self.search_message = None;
            }
        });
        if submit {
            self.submit_search();
        }

        if let Some(message) = &self.search_message {
            ui.label(RichText::new(message).color(Color32::from_rgb(240, 120, 100)));
        }

        let mut chosen = None;
        for suggestion in self.search_suggestions() {
            if ui.link(suggestion.as_str()).clicked() {
                chosen = Some(suggestion);
            }
        }
        if let Some(name) = chosen {
            self.search.clear();
            self.request_recenter(&name);
        }
    }

    fn draw_layout_tuning(&mut self, ui: &mut Ui) {
        let mut config = self.layout_config;
        let mut changed = false;

        changed |= ui
            .add(egui::Slider::new(&mut config.link_distance, 20.0..=300.0).text("Link distance"))
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut config.active_link_distance, 20.0..=300.0)
                    .text("Active link distance"),
            )
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut config.charge_strength, -1500.0..=0.0).text("Charge"))
            .on_hover_text("Negative values push nodes apart.")
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut config.cluster_strength, 0.0..=0.3)
                    .text("Category pull"),
            )
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut config.velocity_decay, 0.05..=0.9)
                    .text("Velocity decay"),
            )
            .changed();
        changed |= ui.checkbox(&mut config.centering, "Center force").changed();

        if ui.button("Defaults").clicked() {
            config = LayoutConfig::default();
            changed = true;
        }

        if changed {
            self.layout_config = config;
            if let Some(scene) = self.scene.as_mut() {
                scene.engine.reconfigure(config);
                scene.follow_layout = true;
            }
        }
    }
}
