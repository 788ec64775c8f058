use eframe::egui::{self, Align2, Color32, FontId, PointerButton, Sense, Shape, Stroke, Ui, vec2};

use crate::hierarchy::LinkKind;

use super::super::render_utils::{
    blend_color, category_color, circle_visible, draw_background, edge_visible,
};
use super::super::ViewModel;
use super::interaction::ClickOutcome;

const LINK_COLOR: Color32 = Color32::from_rgb(133, 146, 158);
const INDIRECT_LINK_COLOR: Color32 = Color32::from_rgb(201, 160, 96);
const LINK_WIDTH: f32 = 1.0;
const INDIRECT_LINK_WIDTH: f32 = 1.2;
const LABEL_SIZE: f32 = 12.0;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.canvas = rect.size();

        let show_member_circles = self.settings.show_member_circles;
        let Some(scene) = self.scene.as_mut() else {
            painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));
            ui.label("Nothing to show for the current filters.");
            return;
        };

        scene.set_container(rect.size());
        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered = pointer.and_then(|pointer| scene.node_at(rect, pointer));

        if response.drag_started_by(PointerButton::Primary) {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .or(pointer);
            if let Some(index) = origin.and_then(|origin| scene.node_at(rect, origin)) {
                scene.begin_drag(index);
            }
        }
        if response.dragged_by(PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            let world = scene.transform.screen_to_world(rect, pointer);
            scene.drag_to(world);
        }
        if response.drag_stopped() {
            scene.end_drag();
        }

        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            scene.pan(response.drag_delta());
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
                scene.zoom_at(rect, pointer.unwrap_or_else(|| rect.center()), factor);
            }
        }

        let mut recenter = None;
        if response.clicked_by(PointerButton::Primary)
            && let Some(index) = hovered
        {
            match scene.click(index) {
                ClickOutcome::Recenter(name) => recenter = Some(name),
                ClickOutcome::Ignored | ClickOutcome::MissingIdentity => {}
            }
        }

        if scene.engine.is_running() {
            scene.step();
            ui.ctx().request_repaint();
        }

        draw_background(&painter, rect, scene.transform);

        let screen = scene
            .engine
            .nodes()
            .iter()
            .map(|node| scene.transform.world_to_screen(rect, node.position))
            .collect::<Vec<_>>();

        for link in scene.model.hierarchy_links().chain(scene.model.cross_links()) {
            let (Some(&start), Some(&end)) = (screen.get(link.source), screen.get(link.target))
            else {
                continue;
            };
            if !edge_visible(rect, start, end, 2.0) {
                continue;
            }
            if link.kind == LinkKind::Indirect {
                let stroke = Stroke::new(INDIRECT_LINK_WIDTH, INDIRECT_LINK_COLOR);
                painter.extend(Shape::dashed_line(
                    &[start, end],
                    stroke,
                    INDIRECT_LINK_WIDTH,
                    INDIRECT_LINK_WIDTH * 5.0,
                ));
            } else {
                painter.line_segment([start, end], Stroke::new(LINK_WIDTH, LINK_COLOR));
            }
        }

        let active = scene.model.active_index();
        for (index, node) in scene.model.nodes().iter().enumerate() {
            let Some(&position) = screen.get(index) else {
                continue;
            };
            let radius = scene.screen_radius(index);
            if !circle_visible(rect, position, radius + 80.0) {
                continue;
            }

            let is_hovered = hovered == Some(index);
            let draw_circle = show_member_circles || node.is_group() || index == active;
            if draw_circle {
                let base = category_color(node.category);
                let fill = if is_hovered {
                    blend_color(base, Color32::WHITE, 0.35)
                } else {
                    base
                };
                painter.circle_filled(position, radius, fill);
                let pinned = scene.engine.node(index).is_some_and(|node| node.is_pinned());
                let outline = if index == active || scene.dragging == Some(index) {
                    Stroke::new(2.0, Color32::from_rgb(245, 206, 93))
                } else if pinned {
                    Stroke::new(1.5, Color32::from_gray(235))
                } else {
                    Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
                };
                painter.circle_stroke(position, radius, outline);
            }

            painter.text(
                position - vec2(0.0, radius + 3.0),
                Align2::CENTER_BOTTOM,
                node.name.as_str(),
                FontId::proportional(LABEL_SIZE),
                if is_hovered || index == active {
                    Color32::WHITE
                } else {
                    Color32::from_gray(215)
                },
            );
        }

        if let Some(index) = hovered {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
            if let Some(node) = scene.model.node(index) {
                let mut text = format!("{}  |  {}", node.name, node.category);
                if let Some(parent) = node.parent.and_then(|parent| scene.model.node(parent)) {
                    text.push_str(&format!("  |  under {} (level {})", parent.name, node.depth));
                }
                if let Some(description) = node.description.as_deref() {
                    text.push_str("  |  ");
                    text.push_str(description);
                }
                painter.text(
                    rect.left_top() + vec2(10.0, 10.0),
                    Align2::LEFT_TOP,
                    text,
                    FontId::proportional(13.0),
                    Color32::from_gray(240),
                );
            }
        }

        if let Some(name) = recenter {
            self.request_recenter(&name);
        }
    }
}
