use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::hierarchy::Category;

use super::viewport::ViewTransform;

/// Mixes `overlay` into `base`; used to lift the active node and hovered
/// groups off their category color.
pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    base.lerp_to_gamma(overlay, amount.clamp(0.0, 1.0))
}

pub(super) fn category_color(category: Category) -> Color32 {
    match category {
        Category::Organization => Color32::from_rgb(74, 126, 232),
        Category::Applications => Color32::from_rgb(163, 102, 224),
        Category::People => Color32::from_rgb(240, 150, 62),
        Category::Technology => Color32::from_rgb(86, 184, 102),
        Category::Data => Color32::from_rgb(52, 178, 178),
        Category::Procurements => Color32::from_rgb(232, 118, 178),
        Category::Facilities => Color32::from_rgb(160, 110, 72),
        Category::Server => Color32::from_rgb(222, 78, 72),
        Category::Network | Category::Unknown => Color32::from_rgb(236, 212, 72),
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, transform: ViewTransform) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * transform.scale.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + transform.translate;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Whether the segment `start..end` touches `rect` grown by `padding`.
/// Clips the segment parametrically against each slab of the rectangle.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let bounds = rect.expand(padding);
    let delta = end - start;
    let mut enter = 0.0_f32;
    let mut exit = 1.0_f32;

    let slabs = [
        (-delta.x, start.x - bounds.left()),
        (delta.x, bounds.right() - start.x),
        (-delta.y, start.y - bounds.top()),
        (delta.y, bounds.bottom() - start.y),
    ];

    for (direction, distance) in slabs {
        if direction == 0.0 {
            if distance < 0.0 {
                return false;
            }
            continue;
        }

        let t = distance / direction;
        if direction < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return false;
        }
    }

    true
}
