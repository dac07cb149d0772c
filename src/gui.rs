//! Native GUI viewer using egui
//!
//! The map is an `egui_plot` plot: it owns pan and zoom, and its bounds are
//! copied into a [`PlotViewport`] every frame. The flight path, the pip markers
//! and the info panel are painted on top from the [`Viewer`] state.

use eframe::egui;
use egui_plot::{PlotBounds, PlotImage, PlotPoint};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{MapConfig, Settings, StyleConfig, ViewerConfig};
use crate::keys::{KeyBindings, NavCommand};
use crate::navigation::NavState;
use crate::photo::PhotoCache;
use crate::projection::{MapViewport, PlanePoint, PlotViewport};
use crate::state::Viewer;

const PANEL_IMAGE_WIDTH: f32 = 240.0;

/// Run the native GUI viewer. `viewer` is `None` when the track failed to
/// load; the window then shows the empty map and `status`.
pub fn run_viewer(
    config: ViewerConfig,
    settings: Settings,
    viewer: Option<Viewer<PlotViewport>>,
    status: String,
) -> anyhow::Result<()> {
    let title = config.title.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(cc, config, settings, viewer, status)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

struct ViewerApp {
    map: MapConfig,
    style: StyleConfig,
    keys: KeyBindings,
    data_dir: PathBuf,
    viewer: Option<Viewer<PlotViewport>>,
    /// Used for the empty map when there is no track
    idle_viewport: PlotViewport,
    status: String,
    photos: PhotoCache,
    /// Bounds to apply on the next frame
    bounds_request: Option<(PlanePoint, PlanePoint)>,
    initial_view: bool,
}

impl ViewerApp {
    fn new(
        cc: &eframe::CreationContext<'_>,
        config: ViewerConfig,
        settings: Settings,
        viewer: Option<Viewer<PlotViewport>>,
        status: String,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        match &viewer {
            Some(v) => info!("Viewer ready with {} pips", v.markers().len()),
            None => info!("Viewer started without a track"),
        }

        Self {
            idle_viewport: PlotViewport::new(config.map.backend()),
            keys: KeyBindings::from_config(&config.keys),
            map: config.map,
            style: config.style,
            data_dir: PathBuf::from(settings.data_dir),
            viewer,
            status,
            photos: PhotoCache::new(),
            bounds_request: None,
            initial_view: true,
        }
    }

    fn viewport(&self) -> &PlotViewport {
        match &self.viewer {
            Some(viewer) => viewer.viewport(),
            None => &self.idle_viewport,
        }
    }

    fn viewport_mut(&mut self) -> &mut PlotViewport {
        match &mut self.viewer {
            Some(viewer) => viewer.viewport_mut(),
            None => &mut self.idle_viewport,
        }
    }

    fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Bounds of the configured starting view for a plot filling `frame`
    fn initial_bounds(&self, frame: egui::Rect) -> (PlanePoint, PlanePoint) {
        match &self.map {
            MapConfig::Mercator { center, zoom, .. } => {
                let backend = self.map.backend();
                let c = backend.to_plane(crate::track::Coord::Geo {
                    lat: center[0],
                    lon: center[1],
                });
                PlotViewport::bounds_for(frame, c, backend.clamp_zoom(*zoom))
            }
            MapConfig::Image { width, height, .. } => ([0.0, -height], [*width, 0.0]),
        }
    }

    /// Work out the bounds to force this frame, if any
    fn take_bounds_request(&mut self, frame: egui::Rect) -> Option<(PlanePoint, PlanePoint)> {
        if self.initial_view {
            self.initial_view = false;
            return Some(self.initial_bounds(frame));
        }
        if let Some(bounds) = self.bounds_request.take() {
            return Some(bounds);
        }
        let vp = self.viewport_mut();
        let target = vp.take_pending_pan()?;
        let (min, max) = vp.bounds();
        let half = [(max[0] - min[0]) / 2.0, (max[1] - min[1]) / 2.0];
        Some((
            [target[0] - half[0], target[1] - half[1]],
            [target[0] + half[0], target[1] + half[1]],
        ))
    }

    /// Keep Mercator zoom inside the configured range
    fn clamp_zoom(&mut self) {
        let vp = self.viewport();
        if vp.frame().width() <= 0.0 {
            return;
        }
        let zoom = vp.zoom();
        let clamped = vp.backend().clamp_zoom(zoom);
        if (clamped - zoom).abs() > 1e-6 {
            debug!("Zoom {:.2} outside range, clamping to {:.2}", zoom, clamped);
            self.bounds_request = Some(PlotViewport::bounds_for(vp.frame(), vp.center(), clamped));
        }
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("pips_panel").min_width(230.0).show(ctx, |ui| {
            ui.heading("Flight Track");
            ui.separator();

            let Some(viewer) = self.viewer.as_mut() else {
                ui.colored_label(egui::Color32::LIGHT_RED, &self.status);
                return;
            };

            let track = viewer.track();
            ui.label(format!("{} points, {} pips", track.points().len(), track.pip_count()));
            if let Some(seconds) = track.duration_seconds() {
                ui.label(format!("Duration: {}m {:02}s", seconds / 60, seconds % 60));
            }

            ui.separator();
            let mut command = None;
            ui.horizontal(|ui| {
                if ui.button("◀ Previous").clicked() {
                    command = Some(NavCommand::Previous);
                }
                if ui.button("Next ▶").clicked() {
                    command = Some(NavCommand::Next);
                }
                if ui.button("Clear").clicked() {
                    command = Some(NavCommand::Dismiss);
                }
            });

            let active = match viewer.nav_state() {
                NavState::ActiveAt(slot) => Some(slot),
                NavState::NoneActive => None,
            };

            match active.and_then(|slot| viewer.markers().get(slot)) {
                Some(marker) => ui.label(format!("Active: pip #{} at {}", marker.pip, marker.coord)),
                None => ui.weak("No pip selected"),
            };

            if viewer.markers().is_empty() {
                ui.weak("This track has no pips");
            }

            let hovered = viewer.hovered();
            let mut to_activate = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (slot, marker) in viewer.markers().markers().iter().enumerate() {
                    let caption = viewer.captions().caption(marker.pip).unwrap_or_default();
                    let mut label = egui::RichText::new(format!("#{} {}", marker.pip, caption));
                    if hovered == Some(slot) {
                        label = label.strong();
                    }
                    if ui.selectable_label(active == Some(slot), label).clicked() {
                        to_activate = Some(slot);
                    }
                }
            });

            if let Some(command) = command {
                viewer.command(command);
            }
            if let Some(slot) = to_activate {
                viewer.activate(slot);
            }
        });
    }

    fn map_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let request = self.take_bounds_request(ui.available_rect_before_wrap());
            let backdrop = self.backdrop(ctx);

            let plot = egui_plot::Plot::new("map")
                .data_aspect(1.0)
                .allow_drag(true)
                .allow_zoom(true)
                .allow_scroll(true)
                .allow_double_click_reset(false)
                .allow_boxed_zoom(false)
                .show_axes(false)
                .show_x(false)
                .show_y(false)
                .show_grid(self.style.show_grid);

            let plot_response = plot.show(ui, |plot_ui| {
                if let Some((min, max)) = request {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
                }
                if let Some((texture, width, height)) = &backdrop {
                    plot_ui.image(PlotImage::new(
                        texture.id(),
                        PlotPoint::new(width / 2.0, -height / 2.0),
                        egui::Vec2::new(*width as f32, *height as f32),
                    ));
                }
            });

            let transform = plot_response.transform;
            let frame = *transform.frame();
            let bounds = transform.bounds();
            let changed = self.viewport_mut().update(frame, bounds.min(), bounds.max());
            if changed {
                self.clamp_zoom();
            }

            let response = plot_response.response;
            let events = ctx.input(|i| i.events.clone());
            let commands = self.keys.commands(&events);

            let Some(viewer) = self.viewer.as_mut() else {
                return;
            };

            if changed {
                viewer.viewport_changed();
            }

            viewer.pointer_moved(response.hover_pos());
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    viewer.click(pos);
                }
            } else if ctx.input(|i| i.pointer.primary_clicked()) {
                // clicks outside the map still close a transient panel
                if let Some(pos) = ctx.input(|i| i.pointer.interact_pos()) {
                    viewer.panel_mut().click(pos);
                }
            }
            for command in commands {
                viewer.command(command);
            }

            let painter = ui.painter_at(frame);
            let [r, g, b] = self.style.path_color;
            painter.add(
                viewer
                    .path()
                    .shape(egui::Color32::from_rgb(r, g, b), self.style.path_width),
            );
            viewer.markers().paint(&painter);
        });
    }

    /// Backdrop texture and its size in plane units, for image maps
    fn backdrop(&mut self, ctx: &egui::Context) -> Option<(egui::TextureHandle, f64, f64)> {
        let MapConfig::Image { path: Some(path), width, height } = &self.map else {
            return None;
        };
        let (width, height) = (*width, *height);
        let path = self.resolve(path);
        let texture = self.photos.get(ctx, &path)?.clone();
        Some((texture, width, height))
    }

    fn info_panel(&mut self, ctx: &egui::Context) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        if !viewer.panel().is_visible() {
            return;
        }

        let content = viewer.panel().content().clone();
        let candidates: Vec<PathBuf> = content
            .image
            .iter()
            .cloned()
            .chain(viewer.captions().placeholder_image())
            .collect();
        let texture = self.photos.first_available(ctx, &candidates);

        let area = egui::Area::new(egui::Id::new("info_panel"))
            .fixed_pos(viewer.panel().screen_pos())
            .order(egui::Order::Foreground)
            .constrain(true)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(PANEL_IMAGE_WIDTH);
                    if let Some(texture) = &texture {
                        ui.add(egui::Image::new(texture).max_width(PANEL_IMAGE_WIDTH));
                    }
                    if !content.caption.is_empty() {
                        ui.label(&content.caption);
                    }
                });
            });
        viewer.panel_mut().set_rect(area.response.rect);
    }

    fn status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let vp = self.viewport();
                if matches!(self.map, MapConfig::Mercator { .. }) {
                    ui.label(format!("Zoom {:.1}", vp.zoom()));
                    ui.separator();
                }
                ui.label("Drag: pan | Ctrl+scroll: zoom | ←/→: previous/next pip | Esc: close");
            });
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.status_bar(ctx);
        self.side_panel(ctx);
        self.map_panel(ctx);
        self.info_panel(ctx);
    }
}
