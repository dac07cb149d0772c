//! Captions and photo paths keyed by pip index

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::panel::PanelContent;
use crate::track::{PipIndex, Track};

/// Placeholder in image templates replaced by the pip index
pub const INDEX_PLACEHOLDER: &str = "{index}";

#[derive(Debug, Clone, Default)]
pub struct CaptionTable {
    captions: BTreeMap<PipIndex, String>,
    image_template: Option<String>,
    placeholder_image: Option<PathBuf>,
    base_dir: PathBuf,
}

impl CaptionTable {
    pub fn new(
        captions: BTreeMap<PipIndex, String>,
        image_template: Option<String>,
        placeholder_image: Option<PathBuf>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            captions,
            image_template,
            placeholder_image,
            base_dir: base_dir.into(),
        }
    }

    pub fn caption(&self, pip: PipIndex) -> Option<&str> {
        self.captions.get(&pip).map(String::as_str)
    }

    /// Photo path for a pip, relative paths resolved against the data dir
    pub fn image_path(&self, pip: PipIndex) -> Option<PathBuf> {
        let path = match &self.image_template {
            Some(template) => PathBuf::from(template.replace(INDEX_PLACEHOLDER, &pip.to_string())),
            None => self.placeholder_image.clone()?,
        };
        Some(self.resolve(&path))
    }

    pub fn placeholder_image(&self) -> Option<PathBuf> {
        self.placeholder_image.as_deref().map(|p| self.resolve(p))
    }

    /// Panel content for a pip. A missing caption falls back to the point's
    /// time, or an empty caption.
    pub fn content_for(&self, track: &Track, pip: PipIndex) -> PanelContent {
        let caption = match self.caption(pip) {
            Some(text) => text.to_string(),
            None => {
                tracing::debug!("No caption for pip {}, using placeholder", pip);
                track
                    .points()
                    .get(pip)
                    .and_then(|p| p.time.as_deref())
                    .map(|t| format!("Time: {}", t))
                    .unwrap_or_default()
            }
        };
        PanelContent {
            image: self.image_path(pip),
            caption,
        }
    }

    /// Configured pips without a caption entry
    pub fn missing_captions(&self, track: &Track) -> Vec<PipIndex> {
        track
            .pips()
            .iter()
            .copied()
            .filter(|pip| !self.captions.contains_key(pip))
            .collect()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
