use eframe::egui;
use image::RgbaImage;

/// Display side of the pipeline: the GPU texture for the current working
/// bitmap plus the user-drawn selection rectangle. Exactly one texture is
/// alive at a time; uploading a new frame replaces the old allocation.
pub struct CanvasView {
    texture: Option<egui::TextureHandle>,
    selection: Option<egui::Rect>,
    drag_anchor: Option<egui::Pos2>,
}

impl CanvasView {
    pub fn new() -> Self {
        Self { texture: None, selection: None, drag_anchor: None }
    }

    /// The canvas occupies a centered rectangle of half the viewport in each
    /// dimension.
    pub fn screen_rect(viewport: egui::Rect) -> egui::Rect {
        egui::Rect::from_center_size(viewport.center(), viewport.size() * 0.5)
    }

    /// Replace the display texture with the given working bitmap. The
    /// previous texture is released by the texture manager when the handle is
    /// overwritten; a zero-area bitmap uploads an empty texture that simply
    /// is not drawn.
    pub fn upload(&mut self, ctx: &egui::Context, working: &RgbaImage) {
        let (w, h) = (working.width() as usize, working.height() as usize);
        let color_image: egui::ColorImage = egui::ColorImage {
            size: [w, h],
            source_size: egui::vec2(w as f32, h as f32),
            pixels: working
                .pixels()
                .map(|p| egui::Color32::from_rgba_unmultiplied(p.0[0], p.0[1], p.0[2], p.0[3]))
                .collect(),
        };

        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("canvas", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }

    /// The current texture, if it has drawable area.
    pub fn texture(&self) -> Option<&egui::TextureHandle> {
        self.texture.as_ref().filter(|t| {
            let [w, h] = t.size();
            w > 0 && h > 0
        })
    }

    pub fn selection(&self) -> Option<egui::Rect> {
        self.selection
    }

    /// Window resizes invalidate canvas-space coordinates, so the selection
    /// resets to empty.
    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.drag_anchor = None;
    }

    /// Track the crop-intent rectangle from raw pointer state. A primary
    /// press inside the canvas anchors a new selection; while the button is
    /// held the selection is the normalized bounding box of the anchor and
    /// the clamped pointer. The rectangle persists after release until the
    /// next drag or a window resize.
    pub fn update_selection(
        &mut self,
        canvas_rect: egui::Rect,
        pointer: Option<egui::Pos2>,
        pressed: bool,
        down: bool,
    ) {
        let Some(pos) = pointer else { return };
        if !canvas_rect.contains(pos) {
            return;
        }
        let clamped: egui::Pos2 = clamp_to_rect(pos, canvas_rect);

        if pressed {
            self.drag_anchor = Some(clamped);
        }
        if down {
            if let Some(anchor) = self.drag_anchor {
                self.selection = Some(selection_rect(anchor, clamped, canvas_rect));
            }
        }
    }
}

/// Clamp a point into a rectangle, inclusive of its edges.
fn clamp_to_rect(pos: egui::Pos2, rect: egui::Rect) -> egui::Pos2 {
    egui::pos2(pos.x.clamp(rect.min.x, rect.max.x), pos.y.clamp(rect.min.y, rect.max.y))
}

/// The normalized bounding box of two corners, clamped into `bounds`. Drag
/// direction does not matter.
fn selection_rect(anchor: egui::Pos2, current: egui::Pos2, bounds: egui::Rect) -> egui::Rect {
    let a: egui::Pos2 = clamp_to_rect(anchor, bounds);
    let b: egui::Pos2 = clamp_to_rect(current, bounds);
    egui::Rect::from_two_pos(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> egui::Rect {
        egui::Rect::from_min_max(egui::pos2(100.0, 100.0), egui::pos2(400.0, 300.0))
    }

    #[test]
    fn drag_direction_does_not_matter() {
        let a = egui::pos2(150.0, 260.0);
        let b = egui::pos2(320.0, 130.0);
        assert_eq!(selection_rect(a, b, bounds()), selection_rect(b, a, bounds()));
    }

    #[test]
    fn selection_is_clamped_to_canvas() {
        let inside = egui::pos2(200.0, 200.0);
        let outside = egui::pos2(1000.0, -50.0);
        let rect = selection_rect(inside, outside, bounds());
        assert!(bounds().contains_rect(rect));
        assert_eq!(rect.max.x, 400.0);
        assert_eq!(rect.min.y, 100.0);
    }

    #[test]
    fn press_anchors_and_drag_updates() {
        let mut view = CanvasView::new();
        let canvas = bounds();

        view.update_selection(canvas, Some(egui::pos2(150.0, 150.0)), true, true);
        view.update_selection(canvas, Some(egui::pos2(250.0, 220.0)), false, true);

        let selection = view.selection().expect("selection after drag");
        assert_eq!(selection.min, egui::pos2(150.0, 150.0));
        assert_eq!(selection.max, egui::pos2(250.0, 220.0));

        // Release keeps the rectangle in place.
        view.update_selection(canvas, Some(egui::pos2(260.0, 230.0)), false, false);
        assert_eq!(view.selection(), Some(selection));
    }

    #[test]
    fn pointer_outside_canvas_is_ignored() {
        let mut view = CanvasView::new();
        view.update_selection(bounds(), Some(egui::pos2(0.0, 0.0)), true, true);
        assert!(view.selection().is_none());
    }

    #[test]
    fn resize_clears_selection() {
        let mut view = CanvasView::new();
        let canvas = bounds();
        view.update_selection(canvas, Some(egui::pos2(150.0, 150.0)), true, true);
        view.update_selection(canvas, Some(egui::pos2(200.0, 200.0)), false, true);
        assert!(view.selection().is_some());

        view.clear_selection();
        assert!(view.selection().is_none());
    }

    #[test]
    fn canvas_rect_is_centered_half_size() {
        let viewport = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(800.0, 600.0));
        let canvas = CanvasView::screen_rect(viewport);
        assert_eq!(canvas.center(), viewport.center());
        assert_eq!(canvas.size(), egui::vec2(400.0, 300.0));
    }
}
