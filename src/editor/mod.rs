//! Editor state machines.
//!
//! Three structurally parallel editors share the infrastructure in this
//! module: a [`PhotoSource`] (decoded pixels plus the original bytes kept as
//! a data URL for later re-editing), the [`PhotoParams`] tunables, and the
//! [`Workbench`] — the working slot together with its undo history and
//! render cache.
//!
//! State transitions are synchronous and purely local; nothing here touches
//! the network. Persistence happens only when a completed customization is
//! handed to [`crate::store::CustomizationStore`].

pub mod calendar;
pub mod polaroid;
pub mod standard;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::history::{EditCommand, EditHistory};
use crate::render::{self, RenderCache};
use crate::transform::{CanvasStyle, EffectKind, EffectSettings, FilterPreset, Transform};

/// Uploads larger than this are re-encoded to JPEG before being stored as a
/// data URL; smaller ones keep their original bytes.
const RECOMPRESS_THRESHOLD_BYTES: usize = 1_500_000;

const JPEG_QUALITY: u8 = 85;

// ============================================================================
// PhotoSource
// ============================================================================

/// A decoded upload: RGBA pixels for rendering plus the data URL the saved
/// item keeps so the photo can be re-opened for editing later.
#[derive(Debug, Clone)]
pub struct PhotoSource {
    /// Session-unique identity token; participates in the render cache
    /// fingerprint so switching images always invalidates.
    pub id: u64,
    pub data_url: String,
    pub image: RgbaImage,
}

impl PhotoSource {
    /// Decodes uploaded bytes. Oversized uploads are re-encoded to JPEG for
    /// the stored data URL; if that fails the original bytes are kept and a
    /// warning is logged — the editing session continues either way.
    pub fn from_bytes(id: u64, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let data_url = encode_data_url(bytes, &image);
        Ok(Self {
            id,
            data_url,
            image,
        })
    }

    /// Re-decodes a saved item's data URL for editing.
    pub fn from_data_url(id: u64, data_url: &str) -> Result<Self> {
        let (_, payload) = data_url
            .split_once("base64,")
            .ok_or(Error::InvalidDataUrl)?;
        let bytes = BASE64.decode(payload).map_err(|_| Error::InvalidDataUrl)?;
        let image = image::load_from_memory(&bytes)?.to_rgba8();
        Ok(Self {
            id,
            data_url: data_url.to_owned(),
            image,
        })
    }
}

fn encode_data_url(original: &[u8], decoded: &RgbaImage) -> String {
    if original.len() > RECOMPRESS_THRESHOLD_BYTES {
        match encode_jpeg(decoded) {
            Ok(jpeg) => {
                log::debug!(
                    "re-encoded {} byte upload to {} byte jpeg",
                    original.len(),
                    jpeg.len()
                );
                return format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg));
            }
            Err(err) => {
                log::warn!("jpeg re-encode failed, keeping original bytes: {err}");
            }
        }
    }

    let mime = image::guess_format(original)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    format!("data:{mime};base64,{}", BASE64.encode(original))
}

fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>> {
    // JPEG has no alpha channel.
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut out = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(&rgb)?;
    Ok(out)
}

// ============================================================================
// PhotoParams
// ============================================================================

/// The full tunable parameter set for one photo: transform, effects, filter
/// preset, framing style, and the copies allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoParams {
    pub transform: Transform,
    pub effects: EffectSettings,
    #[serde(rename = "selectedFilter")]
    pub filter: FilterPreset,
    #[serde(rename = "canvasStyle")]
    pub style: CanvasStyle,
    pub copies: u32,
}

impl Default for PhotoParams {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            effects: EffectSettings::default(),
            filter: FilterPreset::default(),
            style: CanvasStyle::default(),
            copies: 1,
        }
    }
}

impl PhotoParams {
    /// Applies the forward (`after`) side of a command.
    pub(crate) fn apply(&mut self, command: &EditCommand) {
        match command {
            EditCommand::SetTransform { after, .. } => self.transform = *after,
            EditCommand::SetEffect { kind, after, .. } => self.effects.set(*kind, *after),
            EditCommand::SetFilter { after, .. } => self.filter = *after,
            EditCommand::SetStyle { after, .. } => self.style = *after,
            EditCommand::SetCopies { after, .. } => self.copies = *after,
        }
    }

    /// Applies the reverse (`before`) side of a command.
    pub(crate) fn revert(&mut self, command: &EditCommand) {
        match command {
            EditCommand::SetTransform { before, .. } => self.transform = *before,
            EditCommand::SetEffect { kind, before, .. } => self.effects.set(*kind, *before),
            EditCommand::SetFilter { before, .. } => self.filter = *before,
            EditCommand::SetStyle { before, .. } => self.style = *before,
            EditCommand::SetCopies { before, .. } => self.copies = *before,
        }
    }
}

// ============================================================================
// Workbench
// ============================================================================

/// The working photo: source pixels, the live parameter set, and the last
/// committed baseline that undo entries diff against.
#[derive(Debug, Clone)]
pub struct WorkingPhoto {
    pub source: PhotoSource,
    /// Live values, mutated freely during drag/slider interaction.
    pub params: PhotoParams,
    /// Values as of the last commit; `before` sides of history entries come
    /// from here so intermediate live updates never enter the stack.
    committed: PhotoParams,
}

/// One editor session's working slot with its undo history and render cache.
///
/// Every tunable has two update paths: a `*_live` setter that mutates the
/// working value without touching history (slider drags), and a `commit_*`
/// setter that records one undoable step (release/blur).
#[derive(Debug, Default)]
pub struct Workbench {
    working: Option<WorkingPhoto>,
    history: EditHistory,
    cache: RenderCache,
    next_source_id: u64,
}

impl Workbench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fresh upload into the working slot, resetting parameters,
    /// history, and the render cache.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let source = PhotoSource::from_bytes(self.take_source_id(), bytes)?;
        self.install(source, PhotoParams::default());
        Ok(())
    }

    /// Loads a saved item's photo and parameters back into the working slot.
    pub fn load_saved(&mut self, data_url: &str, params: PhotoParams) -> Result<()> {
        let source = PhotoSource::from_data_url(self.take_source_id(), data_url)?;
        self.install(source, params);
        Ok(())
    }

    fn install(&mut self, source: PhotoSource, params: PhotoParams) {
        self.working = Some(WorkingPhoto {
            source,
            committed: params.clone(),
            params,
        });
        self.history.clear();
        self.cache.invalidate();
    }

    fn take_source_id(&mut self) -> u64 {
        self.next_source_id += 1;
        self.next_source_id
    }

    /// Clears the working slot without committing anything.
    pub fn discard(&mut self) {
        self.working = None;
        self.history.clear();
        self.cache.invalidate();
    }

    pub fn working(&self) -> Option<&WorkingPhoto> {
        self.working.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.working.is_some()
    }

    /// Current live parameters, if a photo is loaded.
    pub fn params(&self) -> Option<&PhotoParams> {
        self.working.as_ref().map(|w| &w.params)
    }

    // ------------------------------------------------------------------
    // Live setters — no history entry
    // ------------------------------------------------------------------

    pub fn set_transform_live(&mut self, transform: Transform) -> Result<()> {
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        working.params.transform = transform;
        Ok(())
    }

    /// Pan without touching the rest of the transform; the usual drag path.
    pub fn set_offset_live(&mut self, offset_x: f32, offset_y: f32) -> Result<()> {
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        working.params.transform.offset_x = offset_x;
        working.params.transform.offset_y = offset_y;
        Ok(())
    }

    pub fn set_effect_live(&mut self, kind: EffectKind, value: f32) -> Result<()> {
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        working.params.effects.set(kind, value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commit setters — one history entry each
    // ------------------------------------------------------------------

    /// Commits a transform value. Returns whether anything changed.
    pub fn commit_transform(&mut self, after: Transform) -> Result<bool> {
        let after = after.normalized();
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        let before = working.committed.transform;
        working.params.transform = after;
        working.committed.transform = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetTransform { before, after });
        Ok(true)
    }

    pub fn commit_effect(&mut self, kind: EffectKind, after: f32) -> Result<bool> {
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        let before = working.committed.effects.value(kind);
        working.params.effects.set(kind, after);
        working.committed.effects.set(kind, after);
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetEffect { kind, before, after });
        Ok(true)
    }

    pub fn commit_filter(&mut self, after: FilterPreset) -> Result<bool> {
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        let before = working.committed.filter;
        working.params.filter = after;
        working.committed.filter = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetFilter { before, after });
        Ok(true)
    }

    pub fn commit_style(&mut self, after: CanvasStyle) -> Result<bool> {
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        let before = working.committed.style;
        working.params.style = after;
        working.committed.style = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetStyle { before, after });
        Ok(true)
    }

    pub fn commit_copies(&mut self, after: u32) -> Result<bool> {
        if after == 0 {
            return Err(Error::InvalidCopies);
        }
        let working = self.working.as_mut().ok_or(Error::MissingImage)?;
        let before = working.committed.copies;
        working.params.copies = after;
        working.committed.copies = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetCopies { before, after });
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reverts the most recent committed edit. Returns whether a step was
    /// taken.
    pub fn undo(&mut self) -> bool {
        let Some(command) = self.history.undo().cloned() else {
            return false;
        };
        if let Some(working) = self.working.as_mut() {
            working.params.revert(&command);
            working.committed = working.params.clone();
        }
        true
    }

    /// Re-applies the most recently undone edit.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.history.redo().cloned() else {
            return false;
        };
        if let Some(working) = self.working.as_mut() {
            working.params.apply(&command);
            working.committed = working.params.clone();
        }
        true
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Effect-rendered bitmap for the working photo, via the one-slot cache.
    pub fn render(&mut self) -> Result<&RgbaImage> {
        let working = self.working.as_ref().ok_or(Error::MissingImage)?;
        Ok(self.cache.get_or_render(
            working.source.id,
            &working.source.image,
            &working.params.transform,
            &working.params.effects,
            working.params.filter,
        ))
    }

    /// Full preview: cached render composited onto the styled canvas at the
    /// live pan offset.
    pub fn composite_preview(&mut self, canvas_width: u32, canvas_height: u32) -> Result<RgbaImage> {
        let (style, offset_x, offset_y) = {
            let working = self.working.as_ref().ok_or(Error::MissingImage)?;
            (
                working.params.style,
                working.params.transform.offset_x,
                working.params.transform.offset_y,
            )
        };
        let rendered = self.render()?;
        Ok(render::composite(
            rendered,
            &style,
            canvas_width,
            canvas_height,
            offset_x,
            offset_y,
        ))
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &RenderCache {
        &self.cache
    }
}

// ============================================================================
// Tests
// ============================================================================
