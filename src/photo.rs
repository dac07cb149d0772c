//! Photo and backdrop textures
//!
//! Images are decoded with the `image` crate once per path and kept as egui
//! textures. A path that fails to load is remembered as missing so it is not
//! decoded again every frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use eframe::egui;
use tracing::{debug, warn};

/// Decode an image file into an egui image
pub fn load_color_image(path: &Path) -> Result<egui::ColorImage> {
    let img = image::open(path)?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw()))
}

#[derive(Default)]
pub struct PhotoCache {
    textures: HashMap<PathBuf, Option<egui::TextureHandle>>,
}

impl PhotoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture for `path`, loading it on first use
    pub fn get(&mut self, ctx: &egui::Context, path: &Path) -> Option<&egui::TextureHandle> {
        self.textures
            .entry(path.to_path_buf())
            .or_insert_with(|| match load_color_image(path) {
                Ok(image) => {
                    debug!("Loaded image {:?} ({}x{})", path, image.size[0], image.size[1]);
                    Some(ctx.load_texture(
                        path.to_string_lossy(),
                        image,
                        egui::TextureOptions::LINEAR,
                    ))
                }
                Err(e) => {
                    warn!("Failed to load image {:?}: {}", path, e);
                    None
                }
            })
            .as_ref()
    }

    /// First of `paths` that loads
    pub fn first_available(
        &mut self,
        ctx: &egui::Context,
        paths: &[PathBuf],
    ) -> Option<egui::TextureHandle> {
        paths.iter().find_map(|p| self.get(ctx, p).cloned())
    }
}
