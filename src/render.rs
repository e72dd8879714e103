//! Render cache and compositor.
//!
//! Re-running per-pixel effect work (especially sepia, which has no cheap
//! native equivalent) on every interactive frame would make dragging stutter.
//! The cache therefore fingerprints every field that affects pixel content
//! *except* the pan offset: panning reuses the cached bitmap and the
//! composite step only translates it, so the hit path stays O(1) relative to
//! effect cost.
//!
//! The cache is a single slot owned by the editor session — only one image
//! is edited at a time, so there is nothing to gain from an LRU.

use image::{Rgba, RgbaImage, imageops};
use palette::{Hsl, IntoColor, Srgb};

use crate::transform::{CanvasStyle, EffectKind, EffectSettings, FilterPreset, Transform};

// ============================================================================
// Fingerprint
// ============================================================================

/// Key for the cached effect render.
///
/// Covers scale, rotation, mirror flags, the canonical effect values, the
/// filter preset, and the source image identity. Float fields are compared
/// through their bit patterns. Pan offsets are deliberately excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    source_id: u64,
    scale_bits: u32,
    rotation_bits: u32,
    mirror_x: bool,
    mirror_y: bool,
    effect_bits: [u32; 4],
    preset: FilterPreset,
}

impl Fingerprint {
    /// Derives the fingerprint for a source image and its current settings.
    pub fn compute(
        source_id: u64,
        transform: &Transform,
        effects: &EffectSettings,
        preset: FilterPreset,
    ) -> Self {
        let values = effects.canonical_values();
        Self {
            source_id,
            scale_bits: transform.scale.to_bits(),
            rotation_bits: transform.rotation_degrees.to_bits(),
            mirror_x: transform.mirror_x,
            mirror_y: transform.mirror_y,
            effect_bits: values.map(f32::to_bits),
            preset,
        }
    }
}

// ============================================================================
// RenderCache
// ============================================================================

/// One-slot memo of the most recent effect render.
///
/// Owned by the editor session rather than shared module state, so its
/// lifetime is explicit and it can be exercised directly in tests.
#[derive(Debug, Default)]
pub struct RenderCache {
    slot: Option<(Fingerprint, RgbaImage)>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rendered bitmap for the given settings, computing it only
    /// when the fingerprint differs from the cached one.
    pub fn get_or_render(
        &mut self,
        source_id: u64,
        source: &RgbaImage,
        transform: &Transform,
        effects: &EffectSettings,
        preset: FilterPreset,
    ) -> &RgbaImage {
        let fingerprint = Fingerprint::compute(source_id, transform, effects, preset);
        let hit = matches!(&self.slot, Some((stored, _)) if *stored == fingerprint);

        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
            log::debug!("render cache miss, re-rendering source {source_id}");
            let rendered = render_photo(source, transform, effects, preset);
            self.slot = Some((fingerprint, rendered));
        }

        // Populated just above on the miss path.
        &self.slot.as_ref().unwrap().1
    }

    /// Drops the cached bitmap. Called when the source image changes.
    pub fn invalidate(&mut self) {
        if self.slot.take().is_some() {
            log::debug!("render cache invalidated");
        }
    }

    /// Number of fingerprint hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of fingerprint misses since creation.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders the source through the full effect pipeline: mirror, scale,
/// rotation into the rotated bounding box, then the per-pixel effects.
pub fn render_photo(
    source: &RgbaImage,
    transform: &Transform,
    effects: &EffectSettings,
    preset: FilterPreset,
) -> RgbaImage {
    let mut image = source.clone();

    if transform.mirror_x {
        image = imageops::flip_horizontal(&image);
    }
    if transform.mirror_y {
        image = imageops::flip_vertical(&image);
    }

    if transform.scale > 0.0 && (transform.scale - 1.0).abs() > f32::EPSILON {
        let width = ((image.width() as f32 * transform.scale).round() as u32).max(1);
        let height = ((image.height() as f32 * transform.scale).round() as u32).max(1);
        image = imageops::resize(&image, width, height, imageops::FilterType::Triangle);
    }

    let rotation = transform.rotation_degrees.rem_euclid(360.0);
    if rotation != 0.0 {
        image = rotate_into_bounding_box(&image, rotation);
    }

    apply_effects(&mut image, effects, preset);
    image
}

/// Rotates the image by an arbitrary angle, sizing the output to the rotated
/// bounding box. Pixels outside the source map to transparent.
fn rotate_into_bounding_box(source: &RgbaImage, degrees: f32) -> RgbaImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (src_w, src_h) = (source.width() as f32, source.height() as f32);

    let out_w = ((src_w * cos.abs() + src_h * sin.abs()).ceil() as u32).max(1);
    let out_h = ((src_w * sin.abs() + src_h * cos.abs()).ceil() as u32).max(1);

    let (src_cx, src_cy) = (src_w / 2.0, src_h / 2.0);
    let (out_cx, out_cy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);

    let mut out = RgbaImage::new(out_w, out_h);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        // Inverse-map the output pixel back into source space.
        let dx = x as f32 + 0.5 - out_cx;
        let dy = y as f32 + 0.5 - out_cy;
        let sx = dx * cos + dy * sin + src_cx;
        let sy = -dx * sin + dy * cos + src_cy;

        if sx >= 0.0 && sy >= 0.0 {
            let (sx, sy) = (sx as u32, sy as u32);
            if sx < source.width() && sy < source.height() {
                *pixel = *source.get_pixel(sx, sy);
            }
        }
    }
    out
}

/// Applies the effect list and filter preset per-pixel.
///
/// Preset semantics: `None` renders the stored brightness/contrast/saturate
/// values plus any stored sepia amount; `Grayscale` and `Sepia` override the
/// adjustable effects without rewriting their stored values. The sepia
/// preset reads the dedicated sepia value, treating unset (0) as full
/// strength.
fn apply_effects(image: &mut RgbaImage, effects: &EffectSettings, preset: FilterPreset) {
    let brightness = effects.value(EffectKind::Brightness) / 100.0;
    let contrast = effects.value(EffectKind::Contrast) / 100.0;
    let saturate = effects.value(EffectKind::Saturate) / 100.0;
    let sepia = match preset {
        FilterPreset::None => effects.value(EffectKind::Sepia) / 100.0,
        FilterPreset::Sepia => {
            let stored = effects.value(EffectKind::Sepia);
            if stored > 0.0 { stored / 100.0 } else { 1.0 }
        }
        FilterPreset::Grayscale => 0.0,
    };
    let adjustable = preset == FilterPreset::None;

    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }

        let mut rgb = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0];

        if adjustable {
            if brightness != 1.0 {
                for channel in &mut rgb {
                    *channel *= brightness;
                }
            }
            if contrast != 1.0 {
                for channel in &mut rgb {
                    *channel = (*channel - 0.5) * contrast + 0.5;
                }
            }
            if saturate != 1.0 {
                rgb = scale_saturation(rgb, saturate);
            }
        }

        if preset == FilterPreset::Grayscale {
            let luma = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
            rgb = [luma, luma, luma];
        }

        if sepia > 0.0 {
            rgb = blend_sepia(rgb, sepia);
        }

        pixel.0 = [to_channel(rgb[0]), to_channel(rgb[1]), to_channel(rgb[2]), a];
    }
}

/// Scales saturation in HSL space.
fn scale_saturation(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    let srgb = Srgb::new(rgb[0], rgb[1], rgb[2]);
    let mut hsl: Hsl = srgb.into_color();
    hsl.saturation = (hsl.saturation * factor).clamp(0.0, 1.0);
    let adjusted: Srgb = hsl.into_color();
    [adjusted.red, adjusted.green, adjusted.blue]
}

/// Weighted RGB sepia mix, blended against the original by `amount` (0-1).
fn blend_sepia(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let [r, g, b] = rgb;
    let sepia_r = 0.393 * r + 0.769 * g + 0.189 * b;
    let sepia_g = 0.349 * r + 0.686 * g + 0.168 * b;
    let sepia_b = 0.272 * r + 0.534 * g + 0.131 * b;
    [
        r + (sepia_r - r) * amount,
        g + (sepia_g - g) * amount,
        b + (sepia_b - b) * amount,
    ]
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

// ============================================================================
// Compositing
// ============================================================================

/// Places a rendered bitmap onto a styled canvas at the live pan offset.
///
/// This is the cache hit path: background fill, border ring, and a
/// translated copy of `rendered` — no per-pixel effect work.
pub fn composite(
    rendered: &RgbaImage,
    style: &CanvasStyle,
    canvas_width: u32,
    canvas_height: u32,
    offset_x: f32,
    offset_y: f32,
) -> RgbaImage {
    let mut canvas =
        RgbaImage::from_pixel(canvas_width, canvas_height, Rgba(style.background_color));

    // Centered placement plus the live offset.
    let left = (canvas_width as f32 - rendered.width() as f32) / 2.0 + offset_x;
    let top = (canvas_height as f32 - rendered.height() as f32) / 2.0 + offset_y;
    overlay_at(&mut canvas, rendered, left.round() as i64, top.round() as i64);

    if style.border_width_px > 0 {
        draw_border(&mut canvas, style.border_color, style.border_width_px);
    }

    canvas
}

/// Alpha-over composite of `src` onto `dst` at a signed position, clipping
/// whatever falls outside the canvas.
fn overlay_at(dst: &mut RgbaImage, src: &RgbaImage, left: i64, top: i64) {
    for (x, y, src_pixel) in src.enumerate_pixels() {
        let dx = left + x as i64;
        let dy = top + y as i64;
        if dx < 0 || dy < 0 || dx >= dst.width() as i64 || dy >= dst.height() as i64 {
            continue;
        }

        let alpha = src_pixel[3] as u32;
        if alpha == 0 {
            continue;
        }
        let dst_pixel = dst.get_pixel_mut(dx as u32, dy as u32);
        if alpha == 255 {
            *dst_pixel = *src_pixel;
            continue;
        }
        let inv = 255 - alpha;
        for channel in 0..3 {
            let blended = (src_pixel[channel] as u32 * alpha
                + dst_pixel[channel] as u32 * inv)
                / 255;
            dst_pixel[channel] = blended as u8;
        }
        dst_pixel[3] = (alpha + dst_pixel[3] as u32 * inv / 255) as u8;
    }
}

/// Draws an inset rectangular border ring of the given width.
fn draw_border(canvas: &mut RgbaImage, color: [u8; 4], width: u32) {
    let (w, h) = (canvas.width(), canvas.height());
    let width = width.min(w / 2).min(h / 2);
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if x < width || y < width || x >= w - width || y >= h - width {
            *pixel = Rgba(color);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn offset_change_keeps_fingerprint() {
        let fx = EffectSettings::new();
        let a = Transform::default().with_offset(0.0, 0.0);
        let b = Transform::default().with_offset(42.0, -17.0);

        let fp_a = Fingerprint::compute(1, &a, &fx, FilterPreset::None);
        let fp_b = Fingerprint::compute(1, &b, &fx, FilterPreset::None);
        assert_eq!(fp_a, fp_b);
    }

    #[test]
    fn non_offset_changes_break_fingerprint() {
        let fx = EffectSettings::new();
        let base = Transform::default();
        let base_fp = Fingerprint::compute(1, &base, &fx, FilterPreset::None);

        let scaled = Transform {
            scale: 2.0,
            ..base
        };
        assert_ne!(base_fp, Fingerprint::compute(1, &scaled, &fx, FilterPreset::None));

        let rotated = Transform {
            rotation_degrees: 90.0,
            ..base
        };
        assert_ne!(base_fp, Fingerprint::compute(1, &rotated, &fx, FilterPreset::None));

        let mirrored = Transform {
            mirror_x: true,
            ..base
        };
        assert_ne!(base_fp, Fingerprint::compute(1, &mirrored, &fx, FilterPreset::None));

        let mut brightened = EffectSettings::new();
        brightened.set(EffectKind::Brightness, 150.0);
        assert_ne!(
            base_fp,
            Fingerprint::compute(1, &base, &brightened, FilterPreset::None)
        );

        assert_ne!(
            base_fp,
            Fingerprint::compute(1, &base, &fx, FilterPreset::Grayscale)
        );
        assert_ne!(base_fp, Fingerprint::compute(2, &base, &fx, FilterPreset::None));
    }

    #[test]
    fn cache_hits_on_pan_and_misses_on_edit() {
        let source = solid(8, 8, [200, 50, 50, 255]);
        let fx = EffectSettings::new();
        let mut cache = RenderCache::new();

        let t = Transform::default();
        cache.get_or_render(1, &source, &t, &fx, FilterPreset::None);
        assert_eq!(cache.misses(), 1);

        // Pan only: fingerprint unchanged, must hit.
        let panned = t.with_offset(30.0, 12.0);
        cache.get_or_render(1, &source, &panned, &fx, FilterPreset::None);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);

        // Scale change: must miss.
        let scaled = Transform {
            scale: 1.5,
            ..t
        };
        cache.get_or_render(1, &source, &scaled, &fx, FilterPreset::None);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn invalidate_forces_rerender() {
        let source = solid(4, 4, [10, 20, 30, 255]);
        let fx = EffectSettings::new();
        let t = Transform::default();
        let mut cache = RenderCache::new();

        cache.get_or_render(1, &source, &t, &fx, FilterPreset::None);
        cache.invalidate();
        cache.get_or_render(1, &source, &t, &fx, FilterPreset::None);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn rotation_uses_bounding_box() {
        let source = solid(40, 20, [255, 255, 255, 255]);
        let t = Transform {
            rotation_degrees: 90.0,
            ..Transform::default()
        };
        let out = render_photo(&source, &t, &EffectSettings::new(), FilterPreset::None);

        // 90 degrees swaps the dimensions (within rounding).
        assert!(out.width() >= 20 && out.width() <= 21);
        assert!(out.height() >= 40 && out.height() <= 41);
    }

    #[test]
    fn mirror_flips_pixels() {
        let mut source = solid(2, 1, [0, 0, 0, 255]);
        source.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let t = Transform {
            mirror_x: true,
            ..Transform::default()
        };
        let out = render_photo(&source, &t, &EffectSettings::new(), FilterPreset::None);
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn sepia_matches_weighted_mix() {
        let source = solid(1, 1, [100, 150, 200, 255]);
        let mut fx = EffectSettings::new();
        fx.set(EffectKind::Sepia, 100.0);

        let out = render_photo(&source, &Transform::default(), &fx, FilterPreset::None);
        let [r, g, b, _] = out.get_pixel(0, 0).0;

        let expect = |weights: [f32; 3]| -> u8 {
            let v = weights[0] * (100.0 / 255.0)
                + weights[1] * (150.0 / 255.0)
                + weights[2] * (200.0 / 255.0);
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        assert_eq!(r, expect([0.393, 0.769, 0.189]));
        assert_eq!(g, expect([0.349, 0.686, 0.168]));
        assert_eq!(b, expect([0.272, 0.534, 0.131]));
    }

    #[test]
    fn sepia_preset_defaults_to_full_strength() {
        let source = solid(1, 1, [0, 128, 255, 255]);
        let fx = EffectSettings::new(); // sepia value unset (0)

        let plain = render_photo(&source, &Transform::default(), &fx, FilterPreset::None);
        let toned = render_photo(&source, &Transform::default(), &fx, FilterPreset::Sepia);

        assert_eq!(plain.get_pixel(0, 0).0, [0, 128, 255, 255]);
        assert_ne!(toned.get_pixel(0, 0).0, [0, 128, 255, 255]);
    }

    #[test]
    fn grayscale_preset_equalizes_channels() {
        let source = solid(1, 1, [255, 0, 0, 255]);
        let out = render_photo(
            &source,
            &Transform::default(),
            &EffectSettings::new(),
            FilterPreset::Grayscale,
        );
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn brightness_scales_channels() {
        let source = solid(1, 1, [100, 100, 100, 255]);
        let mut fx = EffectSettings::new();
        fx.set(EffectKind::Brightness, 50.0);

        let out = render_photo(&source, &Transform::default(), &fx, FilterPreset::None);
        assert_eq!(out.get_pixel(0, 0).0[0], 50);
    }

    #[test]
    fn composite_translates_by_offset() {
        let rendered = solid(2, 2, [255, 0, 0, 255]);
        let style = CanvasStyle::default();

        let centered = composite(&rendered, &style, 10, 10, 0.0, 0.0);
        assert_eq!(centered.get_pixel(4, 4).0, [255, 0, 0, 255]);
        assert_eq!(centered.get_pixel(0, 0).0, [255, 255, 255, 255]);

        let panned = composite(&rendered, &style, 10, 10, 3.0, 0.0);
        assert_eq!(panned.get_pixel(4, 4).0, [255, 255, 255, 255]);
        assert_eq!(panned.get_pixel(7, 4).0, [255, 0, 0, 255]);
    }

    #[test]
    fn composite_draws_border_ring() {
        let rendered = solid(2, 2, [0, 255, 0, 255]);
        let style = CanvasStyle {
            border_color: [0, 0, 0, 255],
            border_width_px: 1,
            ..CanvasStyle::default()
        };

        let out = composite(&rendered, &style, 8, 8, 0.0, 0.0);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(7, 7).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(4, 4).0, [0, 255, 0, 255]);
    }
}
