use ab_glyph::FontArc;
use image::{imageops, RgbaImage};

use crate::annotations::Annotation;
use crate::text;

pub const BLUR_MIN: f32 = 0.0;
pub const BLUR_MAX: f32 = 20.0;
pub const BRIGHTNESS_MIN: f32 = -100.0;
pub const BRIGHTNESS_MAX: f32 = 100.0;

/// Adjustment parameters applied on top of the pristine source image.
/// Defaults are the identity: a rebuild with default parameters reproduces
/// the source (modulo the resize to the canvas).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustParams {
    pub blur_radius: f32,
    pub brightness: f32,
    pub snap_pixels: bool,
}

impl Default for AdjustParams {
    fn default() -> Self {
        Self { blur_radius: 0.0, brightness: 0.0, snap_pixels: false }
    }
}

impl AdjustParams {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Rebuild the working bitmap from scratch.
///
/// Stage order is fixed: copy, annotate, blur, brighten, resize. The source
/// is never mutated; every call allocates a fresh working buffer. A zero-area
/// target yields an empty image. Zero blur and zero brightness are identity
/// transforms.
pub fn rebuild(
    source: &RgbaImage,
    annotations: &[Annotation],
    font: Option<&FontArc>,
    params: &AdjustParams,
    target: (u32, u32),
) -> RgbaImage {
    let (tw, th) = target;
    if tw == 0 || th == 0 {
        return RgbaImage::new(0, 0);
    }

    let mut working: RgbaImage = source.clone();

    if let Some(font) = font {
        for note in annotations {
            text::stamp_label(&mut working, font, &note.text, note.pos);
        }
    }

    if params.blur_radius > 0.0 {
        working = imageops::blur(&working, params.blur_radius.min(BLUR_MAX));
    }

    if params.brightness != 0.0 {
        apply_brightness(&mut working, params.brightness);
    }

    let filter: imageops::FilterType = if params.snap_pixels {
        imageops::FilterType::Nearest
    } else {
        imageops::FilterType::Lanczos3
    };
    imageops::resize(&working, tw, th, filter)
}

/// Add `amount` to each color channel, clamped to the valid range. Alpha is
/// left untouched.
pub(crate) fn apply_brightness(buf: &mut RgbaImage, amount: f32) {
    let amount: f32 = amount.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
    for pixel in buf.pixels_mut() {
        for i in 0..3 {
            let val: f32 = pixel[i] as f32;
            pixel[i] = (val + amount).clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checkerboard(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([200, 120, 40, 255])
            } else {
                Rgba([10, 60, 220, 255])
            }
        })
    }

    fn note(text: &str, pos: (f32, f32)) -> Annotation {
        Annotation { id: 0, text: text.to_string(), pos }
    }

    #[test]
    fn default_params_are_identity() {
        let params = AdjustParams::default();
        assert!(params.is_default());
        assert_eq!(params.blur_radius, 0.0);
        assert_eq!(params.brightness, 0.0);
        assert!(!params.snap_pixels);
    }

    #[test]
    fn rebuild_is_deterministic() {
        let source = checkerboard(32, 24);
        let notes = vec![note("hello", (4.0, 4.0))];
        let params = AdjustParams { blur_radius: 3.0, brightness: 25.0, snap_pixels: false };

        let a = rebuild(&source, &notes, None, &params, (16, 12));
        let b = rebuild(&source, &notes, None, &params, (16, 12));
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn rebuild_does_not_mutate_source() {
        let source = checkerboard(16, 16);
        let pristine = source.clone();
        let params = AdjustParams { blur_radius: 5.0, brightness: -40.0, snap_pixels: true };
        let _ = rebuild(&source, &[], None, &params, (8, 8));
        assert_eq!(source.as_raw(), pristine.as_raw());
    }

    #[test]
    fn zero_area_target_yields_empty_image() {
        let source = checkerboard(16, 16);
        let params = AdjustParams::default();
        for target in [(0, 0), (0, 10), (10, 0)] {
            let out = rebuild(&source, &[], None, &params, target);
            assert_eq!((out.width(), out.height()), (0, 0));
        }
    }

    #[test]
    fn zero_adjustments_are_identity_at_source_size() {
        // Nearest-neighbor resampling at the source size is an exact copy,
        // so a default rebuild with snapping must reproduce the source.
        let source = checkerboard(20, 14);
        let params = AdjustParams { snap_pixels: true, ..AdjustParams::default() };
        let out = rebuild(&source, &[], None, &params, (20, 14));
        assert_eq!(out.as_raw(), source.as_raw());
    }

    #[test]
    fn brightness_shifts_channels_and_clamps() {
        let mut buf = RgbaImage::from_pixel(4, 4, Rgba([100, 200, 0, 128]));
        apply_brightness(&mut buf, 80.0);
        let p = buf.get_pixel(0, 0);
        assert_eq!(p.0, [180, 255, 80, 128]);

        let mut buf = RgbaImage::from_pixel(4, 4, Rgba([100, 200, 0, 128]));
        apply_brightness(&mut buf, -120.0);
        let p = buf.get_pixel(0, 0);
        assert_eq!(p.0, [0, 100, 0, 128]);
    }

    #[test]
    fn blur_changes_pixels_and_zero_blur_does_not() {
        let source = checkerboard(16, 16);
        let blurred = rebuild(
            &source,
            &[],
            None,
            &AdjustParams { blur_radius: 4.0, snap_pixels: true, ..AdjustParams::default() },
            (16, 16),
        );
        assert_ne!(blurred.as_raw(), source.as_raw());

        let untouched = rebuild(
            &source,
            &[],
            None,
            &AdjustParams { blur_radius: 0.0, snap_pixels: true, ..AdjustParams::default() },
            (16, 16),
        );
        assert_eq!(untouched.as_raw(), source.as_raw());
    }

    #[test]
    fn snap_selects_nearest_neighbor_resampling() {
        let source = checkerboard(8, 8);
        let snapped = rebuild(
            &source,
            &[],
            None,
            &AdjustParams { snap_pixels: true, ..AdjustParams::default() },
            (16, 16),
        );
        // Nearest-neighbor upscaling only ever reproduces source colors.
        for pixel in snapped.pixels() {
            assert!(
                pixel.0 == [200, 120, 40, 255] || pixel.0 == [10, 60, 220, 255],
                "unexpected interpolated color {:?}",
                pixel.0
            );
        }
    }

    #[test]
    fn annotation_replay_is_pure() {
        // Whether or not a system font resolves, replaying the same sequence
        // over a fresh copy twice must produce identical pixels.
        let font = crate::text::load_label_font();
        let source = checkerboard(64, 48);
        let notes = vec![note("abc", (2.0, 2.0)), note("xyz", (20.0, 10.0))];
        let params = AdjustParams { snap_pixels: true, ..AdjustParams::default() };

        let a = rebuild(&source, &notes, font.as_ref(), &params, (64, 48));
        let b = rebuild(&source, &notes, font.as_ref(), &params, (64, 48));
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
