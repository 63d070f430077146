use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ab_glyph::FontArc;
use image::RgbaImage;
use log::{info, warn};
use thiserror::Error;

use crate::annotations::AnnotationStore;
use crate::pipeline::{self, AdjustParams};
use crate::text;

/// How long a parameter must sit still before its change is applied.
/// Rebuilding the full bitmap on every slider tick is prohibitively slow.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Accepted file suffixes, matched literally and case-sensitively.
const SUPPORTED_SUFFIXES: [&str; 3] = [".png", ".jpg", ".jpeg"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported format: {} (expected .png, .jpg or .jpeg)", .path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("could not decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The pristine decoded bitmap. Never mutated after load; every rebuild
/// starts from a fresh copy of `pixels`.
pub struct SourceImage {
    pub pixels: RgbaImage,
    pub path: PathBuf,
    pub extension: String,
}

/// Change tracking for one adjustment parameter: the value the pipeline last
/// ran with, the value the UI currently shows, and when the latter last
/// moved.
#[derive(Debug, Clone, Copy)]
struct Debounced<T: Copy + PartialEq> {
    applied: T,
    pending: T,
    changed_at: Option<Instant>,
}

impl<T: Copy + PartialEq> Debounced<T> {
    fn new(value: T) -> Self {
        Self { applied: value, pending: value, changed_at: None }
    }

    fn observe(&mut self, value: T, now: Instant) {
        if value != self.pending {
            self.pending = value;
            self.changed_at = Some(now);
        }
    }

    fn has_pending(&self) -> bool {
        self.pending != self.applied
    }

    fn ready(&self, now: Instant) -> bool {
        self.has_pending()
            && self
                .changed_at
                .is_none_or(|at| now.duration_since(at) >= DEBOUNCE_WINDOW)
    }

    fn commit(&mut self) {
        self.applied = self.pending;
        self.changed_at = None;
    }

    fn force(&mut self, value: T) {
        self.applied = value;
        self.pending = value;
        self.changed_at = None;
    }

    fn applied(&self) -> T {
        self.applied
    }
}

/// One editing session: the source image and everything derived from it.
/// Owned by the application root and driven once per frame through `tick`.
pub struct EditSession {
    source: Option<SourceImage>,
    working: Option<RgbaImage>,
    pub annotations: AnnotationStore,
    /// Live values the UI widgets bind to. Applied to the pipeline only via
    /// the per-parameter debounce in `tick`.
    pub params: AdjustParams,
    blur: Debounced<f32>,
    brightness: Debounced<f32>,
    snap: Debounced<bool>,
    font: Option<FontArc>,
    force_rebuild: bool,
}

impl EditSession {
    pub fn new() -> Self {
        let font: Option<FontArc> = text::load_label_font();
        if font.is_none() {
            warn!("no system font found; text labels will not be drawn");
        }
        let defaults = AdjustParams::default();
        Self {
            source: None,
            working: None,
            annotations: AnnotationStore::new(),
            params: defaults,
            blur: Debounced::new(defaults.blur_radius),
            brightness: Debounced::new(defaults.brightness),
            snap: Debounced::new(defaults.snap_pixels),
            font,
            force_rebuild: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn working(&self) -> Option<&RgbaImage> {
        self.working.as_ref()
    }

    /// Load a new image, replacing the previous session state wholesale.
    /// Rejected paths (wrong suffix, undecodable file) leave the existing
    /// image, parameters and annotations untouched.
    pub fn load_image(&mut self, path: &Path) -> Result<(), LoadError> {
        let name: String = path.to_string_lossy().into_owned();
        let Some(suffix) = SUPPORTED_SUFFIXES.iter().find(|s| name.ends_with(**s)) else {
            return Err(LoadError::UnsupportedFormat { path: path.to_path_buf() });
        };

        let decoded = image::open(path)
            .map_err(|source| LoadError::Decode { path: path.to_path_buf(), source })?;
        let pixels: RgbaImage = decoded.to_rgba8();
        info!("loaded {} ({}x{})", path.display(), pixels.width(), pixels.height());

        // Decode succeeded: drop the previous triple and start fresh.
        self.source = Some(SourceImage {
            pixels,
            path: path.to_path_buf(),
            extension: suffix.trim_start_matches('.').to_string(),
        });
        self.working = None;
        self.reset();
        Ok(())
    }

    /// Append a text label placed randomly within `bounds`. Ignored when no
    /// image is loaded. Returns whether a rebuild was queued.
    pub fn add_annotation(&mut self, text: String, bounds: (f32, f32)) -> bool {
        if !self.is_loaded() || text.is_empty() {
            return false;
        }
        self.annotations.append(text, bounds);
        self.force_rebuild = true;
        true
    }

    /// Restore default parameters and drop all annotations. Rebuilds
    /// immediately, bypassing the debounce, when an image is loaded.
    pub fn reset(&mut self) {
        let defaults = AdjustParams::default();
        self.params = defaults;
        self.blur.force(defaults.blur_radius);
        self.brightness.force(defaults.brightness);
        self.snap.force(defaults.snap_pixels);
        self.annotations.clear();
        if self.is_loaded() {
            self.force_rebuild = true;
        }
    }

    /// Queue an immediate rebuild (window resize, fresh load). Bypasses the
    /// debounce timers.
    pub fn request_rebuild(&mut self) {
        if self.is_loaded() {
            self.force_rebuild = true;
        }
    }

    /// Whether some parameter change is waiting out its debounce window. Used
    /// to keep repaints scheduled while the user lets a slider settle.
    pub fn debounce_pending(&self) -> bool {
        self.is_loaded()
            && (self.blur.has_pending() || self.brightness.has_pending() || self.snap.has_pending())
    }

    /// Per-frame change detection. Feeds the live parameter values into the
    /// per-parameter debounce and reports whether the pipeline should run.
    /// Forced rebuilds commit every pending value at once (last-write-wins);
    /// otherwise only parameters that have been stable for the full window
    /// are committed, so a slider still being dragged never blocks another
    /// parameter from applying.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.blur.observe(self.params.blur_radius, now);
        self.brightness.observe(self.params.brightness, now);
        self.snap.observe(self.params.snap_pixels, now);

        if self.source.is_none() {
            self.force_rebuild = false;
            return false;
        }

        if self.force_rebuild {
            self.blur.commit();
            self.brightness.commit();
            self.snap.commit();
            self.force_rebuild = false;
            return true;
        }

        let mut run = false;
        if self.blur.ready(now) {
            self.blur.commit();
            run = true;
        }
        if self.brightness.ready(now) {
            self.brightness.commit();
            run = true;
        }
        if self.snap.ready(now) {
            self.snap.commit();
            run = true;
        }
        run
    }

    /// The parameter snapshot the pipeline last committed.
    pub fn applied_params(&self) -> AdjustParams {
        AdjustParams {
            blur_radius: self.blur.applied(),
            brightness: self.brightness.applied(),
            snap_pixels: self.snap.applied(),
        }
    }

    /// Regenerate the working bitmap for the given target size, replacing the
    /// previous one. Returns the fresh bitmap for upload.
    pub fn rebuild(&mut self, target: (u32, u32)) -> Option<&RgbaImage> {
        let source = self.source.as_ref()?;
        let params: AdjustParams = self.applied_params();
        let working: RgbaImage = pipeline::rebuild(
            &source.pixels,
            self.annotations.as_slice(),
            self.font.as_ref(),
            &params,
            target,
        );
        self.working = Some(working);
        self.working.as_ref()
    }
}
