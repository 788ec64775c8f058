use std::collections::BTreeMap;
use std::sync::Arc;

use eframe::egui::{self, Context, Vec2};
use tracing::warn;

use crate::hierarchy::{
    BuildOptions, CategoryVisibility, HierarchyQuery, HierarchySource, RawNode,
};

mod graph;
mod loader;
mod physics;
mod render_utils;
mod ui;
mod viewport;

use graph::GraphScene;
use loader::{LoadResponse, Loader};
use physics::LayoutConfig;

pub const MAX_DEPTH: u32 = 6;
const DEFAULT_CANVAS: Vec2 = egui::vec2(1000.0, 720.0);

/// What the user asked to see; survives every refetch and rebuild.
#[derive(Clone, Debug)]
pub struct ExploreSettings {
    pub depth: u32,
    pub visibility: CategoryVisibility,
    pub aggregation: bool,
    pub indirect_links: bool,
    pub show_member_circles: bool,
}

impl ExploreSettings {
    pub fn new(depth: u32) -> Self {
        Self {
            depth: depth.min(MAX_DEPTH),
            visibility: CategoryVisibility::default(),
            aggregation: false,
            indirect_links: true,
            show_member_circles: true,
        }
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            aggregation: self.aggregation,
            indirect_links: self.indirect_links,
        }
    }
}

pub struct DependencyAtlasApp {
    loader: Loader,
    settings: ExploreSettings,
    last_query: HierarchyQuery,
    state: AppState,
}

enum AppState {
    Loading,
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    settings: ExploreSettings,
    layout_config: LayoutConfig,
    raw: RawNode,
    scene: Option<GraphScene>,
    canvas: Vec2,
    home: String,
    active_name: String,
    /// Every name seen this session, keyed by its lowercase form.
    known_names: BTreeMap<String, String>,
    search: String,
    search_message: Option<String>,
    status: Option<String>,
    pending_query: Option<HierarchyQuery>,
}

impl DependencyAtlasApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        source: Arc<dyn HierarchySource>,
        settings: ExploreSettings,
        active_node: String,
    ) -> Self {
        let mut loader = Loader::new(source);
        let last_query = HierarchyQuery::new(settings.depth, active_node);
        loader.request(last_query.clone());

        Self {
            loader,
            settings,
            last_query,
            state: AppState::Loading,
        }
    }

    fn request(&mut self, query: HierarchyQuery) {
        self.last_query = query.clone();
        self.loader.request(query);
    }

    fn first_view(settings: &ExploreSettings, response: LoadResponse) -> AppState {
        let raw = match response.result {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "hierarchy fetch failed");
                return AppState::Error(error.to_string());
            }
        };

        match ViewModel::new(settings.clone(), raw, DEFAULT_CANVAS) {
            Ok(model) => AppState::Ready(Box::new(model)),
            Err(error) => {
                warn!(%error, "hierarchy could not be turned into a graph");
                AppState::Error(error.to_string())
            }
        }
    }
}

impl eframe::App for DependencyAtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let response = self.loader.poll();
        if self.loader.is_pending() {
            ctx.request_repaint();
        }

        let mut transition = None;
        let mut requested = None;

        match &mut self.state {
            AppState::Loading => {
                if let Some(response) = response {
                    transition = Some(Self::first_view(&self.settings, response));
                } else {
                    egui::CentralPanel::default().show(ctx, |ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(120.0);
                            ui.heading("Loading dependency graph...");
                            ui.add_space(8.0);
                            ui.spinner();
                        });
                    });
                }
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the dependency graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        requested = Some(self.last_query.clone());
                        transition = Some(AppState::Loading);
                    }
                });
            }
            AppState::Ready(model) => {
                if let Some(response) = response {
                    model.apply_response(response);
                }
                model.show(ctx, &mut requested, self.loader.is_pending());
            }
        }

        if let Some(query) = requested {
            self.request(query);
        }
        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
