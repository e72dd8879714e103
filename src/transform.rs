//! Transform and effect primitives.
//!
//! These are the pure value types the editors mutate and the render cache
//! fingerprints: the geometric [`Transform`], the one-entry-per-kind
//! [`EffectSettings`] list, the derived [`FilterPreset`] shorthand, and the
//! cosmetic [`CanvasStyle`] framing. All of them serialize to camelCase JSON
//! because they cross the persistence and sync boundary as part of a saved
//! customization.

use serde::{Deserialize, Serialize};

// ============================================================================
// Transform
// ============================================================================

/// Geometric transform applied to the working photo.
///
/// `offset_x`/`offset_y` are the pan position and are mutated live during
/// drag interaction; they deliberately do not participate in the render
/// cache fingerprint (see [`crate::render::Fingerprint`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Uniform scale factor (> 0).
    pub scale: f32,
    /// Rotation in degrees, normalized to 0-360 at construction.
    pub rotation_degrees: f32,
    /// Mirror across the vertical axis.
    pub mirror_x: bool,
    /// Mirror across the horizontal axis.
    pub mirror_y: bool,
    /// Horizontal pan offset in canvas pixels.
    pub offset_x: f32,
    /// Vertical pan offset in canvas pixels.
    pub offset_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation_degrees: 0.0,
            mirror_x: false,
            mirror_y: false,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Transform {
    /// Creates an identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the rotation normalized to the 0-360 range.
    pub fn normalized(mut self) -> Self {
        self.rotation_degrees = self.rotation_degrees.rem_euclid(360.0);
        self
    }

    /// Returns a copy with the given pan offset.
    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// True if this transform leaves the image untouched.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Effects
// ============================================================================

/// The adjustable per-pixel effect kinds.
///
/// Values are percentages: 100 is neutral for brightness, contrast, and
/// saturate; 0 is neutral for sepia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    Brightness,
    Contrast,
    Saturate,
    Sepia,
}

impl EffectKind {
    /// The value at which this effect leaves pixels unchanged.
    pub fn neutral(self) -> f32 {
        match self {
            EffectKind::Brightness | EffectKind::Contrast | EffectKind::Saturate => 100.0,
            EffectKind::Sepia => 0.0,
        }
    }
}

/// One effect entry: a kind plus its percentage value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub kind: EffectKind,
    pub value: f32,
}

/// Ordered effect list with one canonical entry per kind.
///
/// Kinds that were never set render at their neutral value. Setting a kind
/// that already has an entry overwrites it in place, preserving order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectSettings {
    entries: Vec<Effect>,
}

impl EffectSettings {
    /// Creates an empty effect list (everything neutral).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the canonical value for a kind, overwriting any existing entry.
    pub fn set(&mut self, kind: EffectKind, value: f32) {
        match self.entries.iter_mut().find(|e| e.kind == kind) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Effect { kind, value }),
        }
    }

    /// Returns the value for a kind, or its neutral value if unset.
    pub fn value(&self, kind: EffectKind) -> f32 {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.value)
            .unwrap_or_else(|| kind.neutral())
    }

    /// Iterates the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.entries.iter()
    }

    /// True if every stored entry is at its neutral value (or the list is empty).
    pub fn is_neutral(&self) -> bool {
        self.entries.iter().all(|e| e.value == e.kind.neutral())
    }

    /// Canonical values in fixed kind order, for fingerprinting.
    pub(crate) fn canonical_values(&self) -> [f32; 4] {
        [
            self.value(EffectKind::Brightness),
            self.value(EffectKind::Contrast),
            self.value(EffectKind::Saturate),
            self.value(EffectKind::Sepia),
        ]
    }
}

// ============================================================================
// Filter Presets
// ============================================================================

/// Derived filter shorthand.
///
/// A preset changes how the effect list is *rendered* without rewriting the
/// stored values: `Grayscale` replaces the adjustable effects with a luma
/// mix, and `Sepia` renders the dedicated sepia value (full strength when
/// that value is unset). Switching back to `None` restores the stored
/// effect rendering untouched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum FilterPreset {
    #[default]
    None,
    Grayscale,
    Sepia,
}

// ============================================================================
// Canvas Style
// ============================================================================

/// Cosmetic framing around the photo, independent of the photo transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasStyle {
    /// RGBA background fill behind the photo.
    pub background_color: [u8; 4],
    /// RGBA border color.
    pub border_color: [u8; 4],
    /// Border thickness in pixels; 0 disables the border.
    pub border_width_px: u32,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            background_color: [255, 255, 255, 255],
            border_color: [255, 255, 255, 255],
            border_width_px: 0,
        }
    }
}

// ============================================================================
// Print Dimensions
// ============================================================================

/// Physical output size of a print, handed in by the cart layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintDimensions {
    pub width_inches: f32,
    pub height_inches: f32,
    pub dpi: u32,
}

impl PrintDimensions {
    pub fn new(width_inches: f32, height_inches: f32, dpi: u32) -> Self {
        Self {
            width_inches,
            height_inches,
            dpi,
        }
    }

    /// Export width in pixels.
    pub fn pixel_width(&self) -> u32 {
        (self.width_inches * self.dpi as f32).round() as u32
    }

    /// Export height in pixels.
    pub fn pixel_height(&self) -> u32 {
        (self.height_inches * self.dpi as f32).round() as u32
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        assert!(Transform::default().is_identity());
        assert!(!Transform::default().with_offset(4.0, 0.0).is_identity());
    }

    #[test]
    fn transform_normalizes_rotation() {
        let t = Transform {
            rotation_degrees: 450.0,
            ..Transform::default()
        }
        .normalized();
        assert_eq!(t.rotation_degrees, 90.0);

        let t = Transform {
            rotation_degrees: -90.0,
            ..Transform::default()
        }
        .normalized();
        assert_eq!(t.rotation_degrees, 270.0);
    }

    #[test]
    fn effect_settings_one_entry_per_kind() {
        let mut fx = EffectSettings::new();
        fx.set(EffectKind::Brightness, 120.0);
        fx.set(EffectKind::Brightness, 80.0);

        assert_eq!(fx.iter().count(), 1);
        assert_eq!(fx.value(EffectKind::Brightness), 80.0);
    }

    #[test]
    fn unset_effects_read_as_neutral() {
        let fx = EffectSettings::new();
        assert_eq!(fx.value(EffectKind::Contrast), 100.0);
        assert_eq!(fx.value(EffectKind::Sepia), 0.0);
        assert!(fx.is_neutral());
    }

    #[test]
    fn preset_does_not_rewrite_stored_values() {
        // The preset is carried separately; stored effect values survive it.
        let mut fx = EffectSettings::new();
        fx.set(EffectKind::Saturate, 140.0);
        let preset = FilterPreset::Grayscale;

        assert_eq!(preset, FilterPreset::Grayscale);
        assert_eq!(fx.value(EffectKind::Saturate), 140.0);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut fx = EffectSettings::new();
        fx.set(EffectKind::Sepia, 60.0);
        let t = Transform {
            scale: 1.5,
            rotation_degrees: 90.0,
            mirror_x: true,
            ..Transform::default()
        };

        let json = serde_json::to_string(&(t, &fx, FilterPreset::Sepia)).unwrap();
        let (t2, fx2, preset): (Transform, EffectSettings, FilterPreset) =
            serde_json::from_str(&json).unwrap();

        assert_eq!(t, t2);
        assert_eq!(fx, fx2);
        assert_eq!(preset, FilterPreset::Sepia);
        assert!(json.contains("\"rotationDegrees\""));
        assert!(json.contains("\"sepia\""));
    }

    #[test]
    fn print_dimensions_pixel_size() {
        let dims = PrintDimensions::new(4.0, 6.0, 300);
        assert_eq!(dims.pixel_width(), 1200);
        assert_eq!(dims.pixel_height(), 1800);
    }
}
