use std::collections::BTreeMap;

use eframe::egui::{self, Align, Color32, Context, Layout, RichText, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::{debug, warn};

use crate::hierarchy::{GraphError, GraphModel, HierarchyQuery, RawNode};

use super::super::graph::GraphScene;
use super::super::loader::LoadResponse;
use super::super::physics::{LayoutConfig, SimulationState};
use super::super::{ExploreSettings, ViewModel};

const MAX_SUGGESTIONS: usize = 8;
const STATUS_COLOR: Color32 = Color32::from_rgb(240, 120, 100);

impl ViewModel {
    pub(in crate::app) fn new(
        settings: ExploreSettings,
        raw: RawNode,
        canvas: Vec2,
    ) -> Result<Self, GraphError> {
        let mut model = Self {
            settings,
            layout_config: LayoutConfig::default(),
            raw,
            scene: None,
            canvas,
            home: String::new(),
            active_name: String::new(),
            known_names: BTreeMap::new(),
            search: String::new(),
            search_message: None,
            status: None,
            pending_query: None,
        };
        model.try_rebuild_scene()?;
        model.home = model.active_name.clone();
        Ok(model)
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        requested: &mut Option<HierarchyQuery>,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("dependency-atlas");
                    ui.separator();
                    ui.label(format!("active: {}", self.active_name));
                    ui.label(format!("depth: {}", self.settings.depth));
                    if let Some(scene) = &self.scene {
                        ui.label(format!("nodes: {}", scene.model.nodes().len()));
                        ui.label(format!("links: {}", scene.model.links().len()));
                        let layout = match scene.engine.state() {
                            SimulationState::Running => {
                                format!("layout: cooling ({:.2})", scene.engine.alpha())
                            }
                            SimulationState::Settled => "layout: settled".to_owned(),
                            SimulationState::Cold => "layout: idle".to_owned(),
                        };
                        ui.label(layout);
                    }
                    if is_loading {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(status) = &self.status {
                            ui.label(RichText::new(status).color(STATUS_COLOR));
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));

        if let Some(query) = self.pending_query.take() {
            *requested = Some(query);
        }
    }

    /// A response to the latest request: a new scene, or a message next to
    /// the scene that stays on screen.
    pub(in crate::app) fn apply_response(&mut self, response: LoadResponse) {
        match response.result {
            Ok(raw) => {
                let previous = std::mem::replace(&mut self.raw, raw);
                if let Err(error) = self.try_rebuild_scene() {
                    warn!(%error, "hierarchy could not be turned into a graph");
                    self.status = Some(error.to_string());
                    self.raw = previous;
                }
            }
            Err(error) => {
                warn!(
                    %error,
                    active_node = %response.query.active_node,
                    "hierarchy fetch failed"
                );
                self.status = Some(error.to_string());
            }
        }
    }

    /// Rebuilds from the retained payload with the current settings.
    pub(in crate::app) fn rebuild_scene(&mut self) {
        if let Err(error) = self.try_rebuild_scene() {
            warn!(%error, "hierarchy could not be turned into a graph");
            self.status = Some(error.to_string());
        }
    }

    fn try_rebuild_scene(&mut self) -> Result<(), GraphError> {
        let model = GraphModel::build(
            &self.raw,
            &self.settings.visibility,
            self.settings.build_options(),
        )?;

        self.active_name = model.active().name.clone();
        for name in model.node_names() {
            self.known_names
                .entry(name.to_lowercase())
                .or_insert_with(|| name.to_owned());
        }
        self.scene = Some(GraphScene::new(
            model,
            self.canvas,
            self.layout_config,
            self.settings.aggregation,
        ));
        self.status = None;
        Ok(())
    }

    /// The indirect-links toggle only means something when the current
    /// payload carries indirect relationships somewhere.
    pub(in crate::app) fn indirect_links_available(&self) -> bool {
        self.raw.has_indirect_relationships()
    }

    pub(in crate::app) fn request_recenter(&mut self, name: &str) {
        if name == self.active_name {
            return;
        }
        debug!(name, "recentering");
        self.search_message = None;
        self.pending_query = Some(HierarchyQuery::new(self.settings.depth, name));
    }

    pub(in crate::app) fn request_refetch(&mut self) {
        self.pending_query = Some(HierarchyQuery::new(
            self.settings.depth,
            self.active_name.clone(),
        ));
    }

    pub(in crate::app) fn submit_search(&mut self) {
        let query = self.search.trim();
        if query.is_empty() {
            return;
        }
        match self.known_names.get(&query.to_lowercase()).cloned() {
            Some(name) => {
                self.search.clear();
                self.request_recenter(&name);
            }
            None => {
                self.search_message = Some(format!("{query} does not exist."));
            }
        }
    }

    pub(in crate::app) fn search_suggestions(&self) -> Vec<String> {
        let query = self.search.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default().ignore_case();
        let mut scored = self
            .known_names
            .values()
            .filter_map(|name| {
                matcher
                    .fuzzy_match(name, query)
                    .map(|score| (score, name.as_str()))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, name)| name.to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::app::loader::RequestId;
    use crate::hierarchy::{Category, FetchError};

    fn payload() -> RawNode {
        RawNode::member("Payroll", "Applications").with_children(vec![
            RawNode::member("Ada Lovelace", "People"),
            RawNode::member("Postgres", "Technology"),
        ])
    }

    fn view() -> ViewModel {
        ViewModel::new(ExploreSettings::new(2), payload(), vec2(800.0, 600.0))
            .expect("view builds")
    }

    #[test]
    fn exact_search_recenters_regardless_of_case() {
        let mut view = view();
        view.search = "  ada lovelace ".to_owned();
        view.submit_search();
        assert_eq!(
            view.pending_query,
            Some(HierarchyQuery::new(2, "Ada Lovelace"))
        );
        assert!(view.search_message.is_none());
    }

    #[test]
    fn unknown_search_reports_and_requests_nothing() {
        let mut view = view();
        view.search = "Nobody".to_owned();
        view.submit_search();
        assert!(view.pending_query.is_none());
        assert_eq!(view.search_message.as_deref(), Some("Nobody does not exist."));
    }

    #[test]
    fn suggestions_are_fuzzy() {
        let mut view = view();
        view.search = "pgres".to_owned();
        assert_eq!(view.search_suggestions(), vec!["Postgres".to_owned()]);
    }

    #[test]
    fn recentering_on_the_active_node_does_nothing() {
        let mut view = view();
        view.request_recenter("Payroll");
        assert!(view.pending_query.is_none());
    }

    #[test]
    fn failed_fetch_keeps_the_current_scene() {
        let mut view = view();
        view.apply_response(LoadResponse {
            id: RequestId::first(),
            query: HierarchyQuery::new(2, "Ghost"),
            result: Err(FetchError::Backend("Ghost not found".to_owned())),
        });
        assert_eq!(view.active_name, "Payroll");
        assert!(view.scene.is_some());
        assert!(view.status.as_deref().is_some_and(|status| status.contains("Ghost")));
    }

    #[test]
    fn filter_change_rebuilds_without_refetching() {
        let mut view = view();
        view.settings.visibility.set(Category::People, false);
        view.rebuild_scene();
        let scene = view.scene.as_ref().expect("scene");
        assert!(scene.model.index_of("Ada Lovelace").is_none());
        assert!(view.pending_query.is_none());
        assert!(view.known_names.contains_key("ada lovelace"));
    }

    #[test]
    fn indirect_toggle_follows_the_payload() {
        let mut view = view();
        assert!(!view.indirect_links_available());

        let mut raw = payload();
        raw.children[0]
            .indirect_relationships
            .push(serde_json::from_str(r#"{"name": "Badge System"}"#).expect("indirect"));
        view.apply_response(LoadResponse {
            id: RequestId::first(),
            query: HierarchyQuery::new(2, "Payroll"),
            result: Ok(raw),
        });
        assert!(view.indirect_links_available());
    }

    #[test]
    fn new_payload_replaces_the_scene_and_keeps_home() {
        let mut view = view();
        view.apply_response(LoadResponse {
            id: RequestId::first(),
            query: HierarchyQuery::new(2, "Postgres"),
            result: Ok(RawNode::member("Postgres", "Technology")
                .with_children(vec![RawNode::member("Ledger", "Data")])),
        });
        assert_eq!(view.active_name, "Postgres");
        assert_eq!(view.home, "Payroll");
        assert!(view.known_names.contains_key("ledger"));
    }
}
