use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use font_kit::family_name::FamilyName;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use image::{Rgba, RgbaImage};

/// Fixed pixel size for stamped labels.
pub const LABEL_PX: f32 = 40.0;
const LABEL_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Resolve a system sans-serif for stamping labels onto bitmaps. No font is
/// bundled with the binary; when nothing resolves the caller skips label
/// drawing entirely.
pub fn load_label_font() -> Option<FontArc> {
    let source = SystemSource::new();
    let handle = source
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let bytes: Vec<u8> = (*font.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// Rasterize a single-line label into `buf` with its top-left corner at
/// `pos`. Glyphs are alpha-blended; anything falling outside the buffer is
/// clipped.
pub fn stamp_label(buf: &mut RgbaImage, font: &FontArc, text: &str, pos: (f32, f32)) {
    let scale: PxScale = PxScale::from(LABEL_PX);
    let scaled = font.as_scaled(scale);
    let base_y: f32 = pos.1 + scaled.ascent();

    let mut cursor_x: f32 = pos.0;
    let mut last: Option<ab_glyph::GlyphId> = None;
    for ch in text.chars() {
        let gid: ab_glyph::GlyphId = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, gid);
        }
        let glyph: ab_glyph::Glyph = gid.with_scale_and_position(scale, ab_glyph::point(cursor_x, base_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds: ab_glyph::Rect = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px: i32 = bounds.min.x as i32 + gx as i32;
                let py: i32 = bounds.min.y as i32 + gy as i32;
                blend_coverage(buf, px, py, coverage);
            });
        }
        cursor_x += scaled.h_advance(gid);
        last = Some(gid);
    }
}

fn blend_coverage(buf: &mut RgbaImage, x: i32, y: i32, coverage: f32) {
    if x < 0 || y < 0 || x >= buf.width() as i32 || y >= buf.height() as i32 {
        return;
    }
    let src_a: f32 = coverage.clamp(0.0, 1.0) * (LABEL_COLOR[3] as f32 / 255.0);
    if src_a <= 0.0 {
        return;
    }

    let dst: &mut Rgba<u8> = buf.get_pixel_mut(x as u32, y as u32);
    for i in 0..3 {
        let s: f32 = LABEL_COLOR[i] as f32 / 255.0;
        let d: f32 = dst[i] as f32 / 255.0;
        dst[i] = ((s * src_a + d * (1.0 - src_a)) * 255.0).round() as u8;
    }
    let da: f32 = dst[3] as f32 / 255.0;
    dst[3] = ((src_a + da * (1.0 - src_a)) * 255.0).min(255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn stamping_is_deterministic() {
        let Some(font) = load_label_font() else {
            // Headless machines without fonts skip the rasterization checks.
            return;
        };
        let mut a = white(200, 80);
        let mut b = white(200, 80);
        stamp_label(&mut a, &font, "hello", (5.0, 5.0));
        stamp_label(&mut b, &font, "hello", (5.0, 5.0));
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn stamping_marks_pixels() {
        let Some(font) = load_label_font() else {
            return;
        };
        let pristine = white(200, 80);
        let mut stamped = pristine.clone();
        stamp_label(&mut stamped, &font, "hello", (5.0, 5.0));
        assert_ne!(stamped.as_raw(), pristine.as_raw());
    }

    #[test]
    fn out_of_bounds_labels_are_clipped() {
        let Some(font) = load_label_font() else {
            return;
        };
        let mut buf = white(40, 40);
        // Far outside the buffer on every side; must not panic.
        stamp_label(&mut buf, &font, "clip", (-500.0, -500.0));
        stamp_label(&mut buf, &font, "clip", (500.0, 500.0));
    }

    #[test]
    fn coverage_blend_clips_and_darkens() {
        let mut buf = white(4, 4);
        blend_coverage(&mut buf, -1, 0, 1.0);
        blend_coverage(&mut buf, 0, 10, 1.0);
        assert_eq!(buf.get_pixel(0, 0).0, [255, 255, 255, 255]);

        blend_coverage(&mut buf, 1, 1, 1.0);
        assert_eq!(buf.get_pixel(1, 1).0, [0, 0, 0, 255]);

        blend_coverage(&mut buf, 2, 2, 0.5);
        let p = buf.get_pixel(2, 2).0;
        assert!(p[0] > 100 && p[0] < 160, "expected mid-gray, got {:?}", p);
    }
}
