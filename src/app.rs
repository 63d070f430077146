use std::time::{Duration, Instant};

use eframe::egui;
use log::error;

use crate::canvas::CanvasView;
use crate::pipeline::{BLUR_MAX, BLUR_MIN, BRIGHTNESS_MAX, BRIGHTNESS_MIN};
use crate::session::EditSession;
use crate::settings::{AppSettings, ThemePreference};
use crate::style::{self, ThemeMode};

const ADD_TEXT_MAX_LEN: usize = 40;

pub struct RetouchApp {
    session: EditSession,
    canvas: CanvasView,

    theme_mode: ThemeMode,
    theme_preference: ThemePreference,

    show_add_text_dialog: bool,
    add_text_buf: String,
    show_info_dialog: bool,
    show_close_dialog: bool,
    error_message: Option<String>,

    last_viewport: Option<egui::Vec2>,
    canvas_rect: egui::Rect,
    allow_close: bool,
}

impl RetouchApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let theme_mode = resolve_theme(&cc.egui_ctx, settings.theme_preference);
        style::apply_theme(&cc.egui_ctx, theme_mode);

        Self {
            session: EditSession::new(),
            canvas: CanvasView::new(),
            theme_mode,
            theme_preference: settings.theme_preference,
            show_add_text_dialog: false,
            add_text_buf: String::new(),
            show_info_dialog: false,
            show_close_dialog: false,
            error_message: None,
            last_viewport: None,
            canvas_rect: egui::Rect::NOTHING,
            allow_close: false,
        }
    }

    fn modal_open(&self) -> bool {
        self.show_add_text_dialog
            || self.show_info_dialog
            || self.show_close_dialog
            || self.error_message.is_some()
    }

    fn save_settings(&self, ctx: &egui::Context) {
        let size: egui::Vec2 = ctx.content_rect().size();
        AppSettings {
            theme_preference: self.theme_preference,
            window_width: size.x,
            window_height: size.y,
        }
        .save();
    }

    fn open_image_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg"])
            .pick_file();
        if let Some(path) = picked {
            if let Err(err) = self.session.load_image(&path) {
                error!("load failed: {err}");
                self.error_message = Some(err.to_string());
            }
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("Open Image").clicked() {
                    self.open_image_dialog();
                }

                ui.checkbox(&mut self.session.params.snap_pixels, "Pixel Perfect");

                // TODO: wire the selection rect into an actual crop stage.
                let _ = ui.button("Crop");

                if ui
                    .add_enabled(self.session.is_loaded(), egui::Button::new("Add Text"))
                    .clicked()
                {
                    self.show_add_text_dialog = true;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("About").clicked() {
                        self.show_info_dialog = true;
                    }

                    let previous: ThemePreference = self.theme_preference;
                    egui::ComboBox::from_id_salt("theme_preference")
                        .width(90.0)
                        .selected_text(match self.theme_preference {
                            ThemePreference::System => "System",
                            ThemePreference::Light => "Light",
                            ThemePreference::Dark => "Dark",
                        })
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut self.theme_preference, ThemePreference::System, "System");
                            ui.selectable_value(&mut self.theme_preference, ThemePreference::Light, "Light");
                            ui.selectable_value(&mut self.theme_preference, ThemePreference::Dark, "Dark");
                        });
                    if previous != self.theme_preference {
                        self.theme_mode = resolve_theme(ctx, self.theme_preference);
                        style::apply_theme(ctx, self.theme_mode);
                        self.save_settings(ctx);
                    }

                    if ui.button("Reset").clicked() {
                        self.session.reset();
                    }
                });
            });
            ui.add_space(4.0);
        });
    }

    fn adjustments_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("adjustments")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.label("Blur");
                ui.add(egui::Slider::new(&mut self.session.params.blur_radius, BLUR_MIN..=BLUR_MAX));
                ui.add_space(8.0);
                ui.label("Brightness");
                ui.add(egui::Slider::new(
                    &mut self.session.params.brightness,
                    BRIGHTNESS_MIN..=BRIGHTNESS_MAX,
                ));
            });
    }

    fn central_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect: egui::Rect = CanvasView::screen_rect(response.rect);
            self.canvas_rect = canvas_rect;

            // Drive change detection; when something applied, rebuild the
            // working bitmap and replace the display texture.
            if self.session.tick(Instant::now()) {
                let target = (
                    canvas_rect.width().max(0.0).round() as u32,
                    canvas_rect.height().max(0.0).round() as u32,
                );
                if let Some(working) = self.session.rebuild(target) {
                    self.canvas.upload(ctx, working);
                }
            }

            if self.session.is_loaded() {
                if let Some(texture) = self.canvas.texture() {
                    let uv: egui::Rect =
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    painter.image(texture.id(), canvas_rect, uv, egui::Color32::WHITE);
                }
            } else {
                let hint = ui.visuals().weak_text_color();
                painter.rect_stroke(canvas_rect, 2.0, egui::Stroke::new(1.0, hint), egui::StrokeKind::Middle);
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No Image",
                    egui::FontId::proportional(16.0),
                    hint,
                );
            }

            if !self.modal_open() {
                let (pointer, pressed, down) = ctx.input(|i| {
                    (i.pointer.latest_pos(), i.pointer.primary_pressed(), i.pointer.primary_down())
                });
                self.canvas.update_selection(canvas_rect, pointer, pressed, down);
            }
            if let Some(selection) = self.canvas.selection() {
                painter.rect_filled(selection, 0.0, egui::Color32::from_black_alpha(50));
                painter.rect_stroke(
                    selection,
                    0.0,
                    egui::Stroke::new(2.0, egui::Color32::BLACK),
                    egui::StrokeKind::Middle,
                );
            }
        });
    }

    fn render_add_text_dialog(&mut self, ctx: &egui::Context) {
        if !self.show_add_text_dialog {
            return;
        }
        let theme: ThemeMode = self.theme_mode;
        let mut add_clicked = false;
        let mut cancel_clicked = false;
        let mut buf: String = std::mem::take(&mut self.add_text_buf);

        modal_window(ctx, theme, "Add Text", |ui| {
            ui.label("Add text to display");
            ui.add_space(8.0);
            let edit = ui.add(
                egui::TextEdit::singleline(&mut buf)
                    .char_limit(ADD_TEXT_MAX_LEN)
                    .desired_width(240.0),
            );
            edit.request_focus();
            ui.add_space(16.0);
            ui.horizontal(|ui| {
                if style::primary_button(ui, "Add", theme).clicked()
                    || ui.input(|i| i.key_pressed(egui::Key::Enter))
                {
                    add_clicked = true;
                }
                if style::secondary_button(ui, "Cancel", theme).clicked() {
                    cancel_clicked = true;
                }
            });
        });

        self.add_text_buf = buf;
        if add_clicked {
            let text: String = self.add_text_buf.trim().to_string();
            let bounds = (self.canvas_rect.width().max(0.0), self.canvas_rect.height().max(0.0));
            self.session.add_annotation(text, bounds);
            self.add_text_buf.clear();
            self.show_add_text_dialog = false;
        } else if cancel_clicked {
            self.add_text_buf.clear();
            self.show_add_text_dialog = false;
        }
    }

    fn render_error_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = self.error_message.clone() else {
            return;
        };
        let theme: ThemeMode = self.theme_mode;
        let mut close_clicked = false;

        modal_window(ctx, theme, "Error", |ui| {
            ui.label(message);
            ui.add_space(16.0);
            ui.vertical_centered(|ui| {
                if style::secondary_button(ui, "Close", theme).clicked() {
                    close_clicked = true;
                }
            });
        });

        if close_clicked {
            self.error_message = None;
        }
    }

    fn render_info_dialog(&mut self, ctx: &egui::Context) {
        if !self.show_info_dialog {
            return;
        }
        let theme: ThemeMode = self.theme_mode;
        let mut ok_clicked = false;

        modal_window(ctx, theme, "About", |ui| {
            ui.label(format!("Retouch v{}", env!("CARGO_PKG_VERSION")));
            ui.label("A tiny non-destructive image editor.");
            ui.add_space(16.0);
            ui.vertical_centered(|ui| {
                if style::primary_button(ui, "OK", theme).clicked() {
                    ok_clicked = true;
                }
            });
        });

        if ok_clicked {
            self.show_info_dialog = false;
        }
    }

    fn render_close_dialog(&mut self, ctx: &egui::Context) {
        if !self.show_close_dialog {
            return;
        }
        let theme: ThemeMode = self.theme_mode;
        let mut stay_clicked = false;
        let mut close_clicked = false;

        modal_window(ctx, theme, "Close Application?", |ui| {
            ui.label("Are you sure you want to close this application?");
            ui.add_space(16.0);
            ui.horizontal(|ui| {
                if style::secondary_button(ui, "Stay", theme).clicked() {
                    stay_clicked = true;
                }
                if style::primary_button(ui, "Close", theme).clicked() {
                    close_clicked = true;
                }
            });
        });

        if stay_clicked {
            self.show_close_dialog = false;
        }
        if close_clicked {
            self.save_settings(ctx);
            self.allow_close = true;
            self.show_close_dialog = false;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

impl eframe::App for RetouchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.allow_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_close_dialog = true;
        }

        // A resize invalidates canvas-space state: the selection clears and
        // the working bitmap is regenerated for the new target size.
        let viewport_size: egui::Vec2 = ctx.content_rect().size();
        if self.last_viewport != Some(viewport_size) {
            if self.last_viewport.is_some() {
                self.canvas.clear_selection();
                self.session.request_rebuild();
            }
            self.last_viewport = Some(viewport_size);
        }

        self.top_bar(ctx);
        self.adjustments_panel(ctx);
        self.central_canvas(ctx);

        self.render_add_text_dialog(ctx);
        self.render_error_dialog(ctx);
        self.render_info_dialog(ctx);
        self.render_close_dialog(ctx);

        // Keep frames coming while a slider change waits out its debounce.
        if self.session.debounce_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn resolve_theme(ctx: &egui::Context, preference: ThemePreference) -> ThemeMode {
    match preference {
        ThemePreference::Light => ThemeMode::Light,
        ThemePreference::Dark => ThemeMode::Dark,
        ThemePreference::System => match ctx.theme() {
            egui::Theme::Dark => ThemeMode::Dark,
            egui::Theme::Light => ThemeMode::Light,
        },
    }
}

fn modal_window(
    ctx: &egui::Context,
    theme: ThemeMode,
    title: &str,
    add_contents: impl FnOnce(&mut egui::Ui),
) {
    use crate::style::ColorPalette;

    let (bg_color, border_color, overlay_color) = match theme {
        ThemeMode::Dark => (
            ColorPalette::ZINC_800,
            ColorPalette::ZINC_700,
            egui::Color32::from_rgba_premultiplied(0, 0, 0, 200),
        ),
        ThemeMode::Light => (
            egui::Color32::WHITE,
            ColorPalette::GRAY_300,
            egui::Color32::from_rgba_premultiplied(0, 0, 0, 150),
        ),
    };

    egui::Area::new(egui::Id::new(("modal_overlay", title)))
        .fixed_pos(egui::pos2(0.0, 0.0))
        .order(egui::Order::Foreground)
        .interactable(false)
        .show(ctx, |ui| {
            let screen_rect: egui::Rect = ctx.content_rect();
            ui.painter().rect_filled(screen_rect, 0.0, overlay_color);
        });

    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .order(egui::Order::Tooltip)
        .frame(
            egui::Frame::new()
                .fill(bg_color)
                .stroke(egui::Stroke::new(1.0, border_color))
                .corner_radius(8.0)
                .inner_margin(24.0),
        )
        .show(ctx, |ui| {
            add_contents(ui);
        });
}
