use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eframe::egui;

use super::brightness::{TextTone, tone_for_image};

/// Lazily loads slide images relative to the deck file and keeps them as
/// egui textures. Failed loads are cached too so a missing file is logged
/// once, not every frame.
pub struct ImageCache {
    base_path: PathBuf,
    textures: RefCell<HashMap<PathBuf, Option<egui::TextureHandle>>>,
    tones: RefCell<HashMap<PathBuf, TextTone>>,
}

impl ImageCache {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            textures: RefCell::new(HashMap::new()),
            tones: RefCell::new(HashMap::new()),
        }
    }

    pub fn texture(&self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        if let Some(entry) = self.textures.borrow().get(path) {
            return entry.clone();
        }
        let loaded = self.load(ctx, path);
        self.textures
            .borrow_mut()
            .insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    /// Text tone for the header/footer over this image. Defaults to dark
    /// text until the image has been loaded.
    pub fn tone(&self, path: &Path) -> TextTone {
        self.tones.borrow().get(path).copied().unwrap_or_default()
    }

    fn load(&self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        let full = self.base_path.join(path);
        let image = match image::open(&full) {
            Ok(image) => image.into_rgba8(),
            Err(err) => {
                tracing::warn!(path = %full.display(), %err, "could not load slide image");
                return None;
            }
        };

        self.tones
            .borrow_mut()
            .insert(path.to_path_buf(), tone_for_image(&image));

        let size = [image.width() as usize, image.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        Some(ctx.load_texture(
            full.to_string_lossy().to_string(),
            color_image,
            egui::TextureOptions::LINEAR,
        ))
    }
}
