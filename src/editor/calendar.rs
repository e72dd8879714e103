//! Calendar print editor.
//!
//! Twelve month slots edited in place rather than a save/discard working
//! slot: selecting a month makes it the live editing target, and commits
//! mutate that slot directly. Undo history and the render cache are scoped
//! to the selected month and reset on every switch. The copies count is a
//! single value shared by the whole calendar.

use serde::{Deserialize, Serialize};

use crate::editor::{PhotoParams, PhotoSource};
use crate::error::{Error, Result};
use crate::history::{EditCommand, EditHistory};
use crate::quota::QuotaStatus;
use crate::render::{self, RenderCache};
use crate::session::SessionParams;
use crate::store::{Customization, CustomizationData};
use crate::transform::{CanvasStyle, EffectKind, FilterPreset, Transform};
use image::RgbaImage;

pub const MONTHS_PER_YEAR: usize = 12;

/// One persisted month. `copies` duplicates the calendar-wide value in every
/// month for compatibility with stored customizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    /// 1 through 12.
    pub month_number: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_image_src: Option<String>,
    #[serde(flatten)]
    pub params: PhotoParams,
}

/// Serializable snapshot of a calendar editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarData {
    pub months: Vec<CalendarMonth>,
    pub copies: u32,
}

#[derive(Debug)]
struct MonthSlot {
    source: Option<PhotoSource>,
    params: PhotoParams,
    committed: PhotoParams,
}

impl MonthSlot {
    fn empty() -> Self {
        Self {
            source: None,
            params: PhotoParams::default(),
            committed: PhotoParams::default(),
        }
    }
}

/// The calendar editor state machine.
#[derive(Debug)]
pub struct CalendarEditor {
    months: [MonthSlot; MONTHS_PER_YEAR],
    /// Shared by all twelve months.
    copies: u32,
    /// Index of the month currently being edited, if any.
    active: Option<usize>,
    history: EditHistory,
    cache: RenderCache,
    quota: u32,
    next_source_id: u64,
}

fn month_index(month: u8) -> Result<usize> {
    if (1..=MONTHS_PER_YEAR as u8).contains(&month) {
        Ok(usize::from(month) - 1)
    } else {
        Err(Error::InvalidMonth(month))
    }
}

impl CalendarEditor {
    pub fn new(quota: u32) -> Self {
        Self {
            months: std::array::from_fn(|_| MonthSlot::empty()),
            copies: 1,
            active: None,
            history: EditHistory::default(),
            cache: RenderCache::default(),
            quota,
            next_source_id: 0,
        }
    }

    /// Restores an editor from persisted data, re-decoding every stored
    /// photo.
    pub fn from_data(data: CalendarData, quota: u32) -> Result<Self> {
        let mut editor = Self::new(quota);
        editor.copies = data.copies.max(1);
        for month in data.months {
            let index = month_index(month.month_number)?;
            let slot = &mut editor.months[index];
            if let Some(src) = &month.original_image_src {
                slot.source = Some(PhotoSource::from_data_url(
                    editor.next_source_id + 1,
                    src,
                )?);
                editor.next_source_id += 1;
            }
            slot.params = month.params.clone();
            slot.committed = month.params;
        }
        Ok(editor)
    }

    pub fn data(&self) -> CalendarData {
        let months = self
            .months
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let mut params = slot.params.clone();
                params.copies = self.copies;
                CalendarMonth {
                    month_number: index as u8 + 1,
                    original_image_src: slot.source.as_ref().map(|s| s.data_url.clone()),
                    params,
                }
            })
            .collect();
        CalendarData {
            months,
            copies: self.copies,
        }
    }

    // ------------------------------------------------------------------
    // Month slots
    // ------------------------------------------------------------------

    /// Assigns a fresh upload to a month and makes it the editing target.
    /// Parameters reset; a replaced photo's adjustments do not carry over.
    pub fn set_month_image(&mut self, month: u8, bytes: &[u8]) -> Result<()> {
        let index = month_index(month)?;
        self.next_source_id += 1;
        let source = PhotoSource::from_bytes(self.next_source_id, bytes)?;
        let slot = &mut self.months[index];
        slot.source = Some(source);
        slot.params = PhotoParams::default();
        slot.committed = PhotoParams::default();
        self.activate(index);
        Ok(())
    }

    /// Empties a month slot. The calendar drops back to incomplete.
    pub fn clear_month(&mut self, month: u8) -> Result<()> {
        let index = month_index(month)?;
        self.months[index] = MonthSlot::empty();
        if self.active == Some(index) {
            self.active = None;
            self.history.clear();
            self.cache.invalidate();
        }
        Ok(())
    }

    /// Switches the editing target. Undo history never spans months.
    pub fn select_month(&mut self, month: u8) -> Result<()> {
        let index = month_index(month)?;
        self.activate(index);
        Ok(())
    }

    fn activate(&mut self, index: usize) {
        if self.active != Some(index) {
            self.active = Some(index);
            self.history.clear();
            self.cache.invalidate();
        }
    }

    pub fn selected_month(&self) -> Option<u8> {
        self.active.map(|index| index as u8 + 1)
    }

    pub fn month_has_image(&self, month: u8) -> Result<bool> {
        Ok(self.months[month_index(month)?].source.is_some())
    }

    pub fn populated_months(&self) -> Vec<u8> {
        self.months
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.source.is_some())
            .map(|(index, _)| index as u8 + 1)
            .collect()
    }

    /// Complete when every month has a photo.
    pub fn is_complete(&self) -> bool {
        self.months.iter().all(|slot| slot.source.is_some())
    }

    /// Wraps the session's current data in a storable record. `None` for
    /// standalone sessions with no cart linkage.
    pub fn to_customization(&self, session: &SessionParams) -> Option<Customization> {
        let (cart_item_id, instance_index) = session.cart_key()?;
        Some(Customization::new(
            cart_item_id,
            instance_index,
            CustomizationData::Calendar(self.data()),
            self.is_complete(),
        ))
    }

    pub fn month_params(&self, month: u8) -> Result<&PhotoParams> {
        Ok(&self.months[month_index(month)?].params)
    }

    // ------------------------------------------------------------------
    // Copies / quota
    // ------------------------------------------------------------------

    pub fn copies(&self) -> u32 {
        self.copies
    }

    /// Sets the calendar-wide copies count. Not an undoable edit; it applies
    /// to the whole product, not the selected month.
    pub fn set_copies(&mut self, copies: u32) -> Result<()> {
        if copies == 0 {
            return Err(Error::InvalidCopies);
        }
        if copies > self.quota {
            return Err(Error::QuotaExceeded {
                requested: copies,
                remaining: self.quota,
            });
        }
        self.copies = copies;
        Ok(())
    }

    pub fn status(&self) -> QuotaStatus {
        QuotaStatus {
            used: self.copies,
            quota: self.quota,
        }
    }

    // ------------------------------------------------------------------
    // Editing the selected month
    // ------------------------------------------------------------------

    fn active_slot(&mut self) -> Result<&mut MonthSlot> {
        let index = self.active.ok_or(Error::MissingImage)?;
        let slot = &mut self.months[index];
        if slot.source.is_none() {
            return Err(Error::MissingImage);
        }
        Ok(slot)
    }

    pub fn set_offset_live(&mut self, offset_x: f32, offset_y: f32) -> Result<()> {
        let slot = self.active_slot()?;
        slot.params.transform.offset_x = offset_x;
        slot.params.transform.offset_y = offset_y;
        Ok(())
    }

    pub fn set_effect_live(&mut self, kind: EffectKind, value: f32) -> Result<()> {
        let slot = self.active_slot()?;
        slot.params.effects.set(kind, value);
        Ok(())
    }

    pub fn commit_transform(&mut self, after: Transform) -> Result<bool> {
        let after = after.normalized();
        let slot = self.active_slot()?;
        let before = slot.committed.transform;
        slot.params.transform = after;
        slot.committed.transform = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetTransform { before, after });
        Ok(true)
    }

    pub fn commit_effect(&mut self, kind: EffectKind, after: f32) -> Result<bool> {
        let slot = self.active_slot()?;
        let before = slot.committed.effects.value(kind);
        slot.params.effects.set(kind, after);
        slot.committed.effects.set(kind, after);
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetEffect { kind, before, after });
        Ok(true)
    }

    pub fn commit_filter(&mut self, after: FilterPreset) -> Result<bool> {
        let slot = self.active_slot()?;
        let before = slot.committed.filter;
        slot.params.filter = after;
        slot.committed.filter = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetFilter { before, after });
        Ok(true)
    }

    pub fn commit_style(&mut self, after: CanvasStyle) -> Result<bool> {
        let slot = self.active_slot()?;
        let before = slot.committed.style;
        slot.params.style = after;
        slot.committed.style = after;
        if before == after {
            return Ok(false);
        }
        self.history.push(EditCommand::SetStyle { before, after });
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let Some(command) = self.history.undo().cloned() else {
            return false;
        };
        if let Ok(slot) = self.active_slot() {
            slot.params.revert(&command);
            slot.committed = slot.params.clone();
        }
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(command) = self.history.redo().cloned() else {
            return false;
        };
        if let Ok(slot) = self.active_slot() {
            slot.params.apply(&command);
            slot.committed = slot.params.clone();
        }
        true
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Effect-rendered bitmap for the selected month, via the cache.
    pub fn render(&mut self) -> Result<&RgbaImage> {
        let index = self.active.ok_or(Error::MissingImage)?;
        let slot = &self.months[index];
        let source = slot.source.as_ref().ok_or(Error::MissingImage)?;
        Ok(self.cache.get_or_render(
            source.id,
            &source.image,
            &slot.params.transform,
            &slot.params.effects,
            slot.params.filter,
        ))
    }

    /// Selected month composited onto its styled canvas.
    pub fn composite_preview(&mut self, canvas_width: u32, canvas_height: u32) -> Result<RgbaImage> {
        let index = self.active.ok_or(Error::MissingImage)?;
        let (style, offset_x, offset_y) = {
            let slot = &self.months[index];
            if slot.source.is_none() {
                return Err(Error::MissingImage);
            }
            (
                slot.params.style,
                slot.params.transform.offset_x,
                slot.params.transform.offset_y,
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
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::tests::png_bytes;

    #[test]
    fn completion_requires_all_twelve_months() {
        let mut editor = CalendarEditor::new(4);
        let bytes = png_bytes(2, 2, [8, 8, 8, 255]);

        for month in 1..=11 {
            editor.set_month_image(month, &bytes).unwrap();
        }
        assert!(!editor.is_complete());
        assert_eq!(editor.populated_months().len(), 11);

        editor.set_month_image(12, &bytes).unwrap();
        assert!(editor.is_complete());

        editor.clear_month(6).unwrap();
        assert!(!editor.is_complete());
        assert_eq!(editor.populated_months().len(), 11);
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let mut editor = CalendarEditor::new(1);
        assert!(matches!(
            editor.set_month_image(0, &png_bytes(2, 2, [0, 0, 0, 255])),
            Err(Error::InvalidMonth(0))
        ));
        assert!(matches!(editor.select_month(13), Err(Error::InvalidMonth(13))));
    }

    #[test]
    fn history_resets_on_month_switch() {
        let mut editor = CalendarEditor::new(1);
        let bytes = png_bytes(2, 2, [3, 3, 3, 255]);
        editor.set_month_image(1, &bytes).unwrap();
        editor.set_month_image(2, &bytes).unwrap();

        editor.select_month(1).unwrap();
        editor.commit_effect(EffectKind::Brightness, 120.0).unwrap();
        assert!(editor.can_undo());

        editor.select_month(2).unwrap();
        assert!(!editor.can_undo());

        // Month 1 keeps its committed edit.
        assert_eq!(
            editor
                .month_params(1)
                .unwrap()
                .effects
                .value(EffectKind::Brightness),
            120.0
        );
    }

    #[test]
    fn edits_target_only_the_selected_month() {
        let mut editor = CalendarEditor::new(1);
        let bytes = png_bytes(2, 2, [3, 3, 3, 255]);
        editor.set_month_image(3, &bytes).unwrap();
        editor.set_month_image(4, &bytes).unwrap();

        editor.select_month(3).unwrap();
        editor.commit_filter(FilterPreset::Sepia).unwrap();

        assert_eq!(editor.month_params(3).unwrap().filter, FilterPreset::Sepia);
        assert_eq!(editor.month_params(4).unwrap().filter, FilterPreset::None);
    }

    #[test]
    fn shared_copies_validated_against_quota() {
        let mut editor = CalendarEditor::new(3);
        editor.set_copies(3).unwrap();
        assert!(matches!(editor.set_copies(0), Err(Error::InvalidCopies)));
        assert!(matches!(
            editor.set_copies(4),
            Err(Error::QuotaExceeded {
                requested: 4,
                remaining: 3
            })
        ));
        assert_eq!(editor.copies(), 3);
    }

    #[test]
    fn data_roundtrip_duplicates_shared_copies() {
        let mut editor = CalendarEditor::new(5);
        editor
            .set_month_image(1, &png_bytes(2, 2, [9, 9, 9, 255]))
            .unwrap();
        editor.set_copies(4).unwrap();

        let data = editor.data();
        assert_eq!(data.months.len(), 12);
        assert_eq!(data.copies, 4);
        assert!(data.months.iter().all(|month| month.params.copies == 4));
        assert!(data.months[0].original_image_src.is_some());
        assert!(data.months[1].original_image_src.is_none());

        let restored = CalendarEditor::from_data(data, 5).unwrap();
        assert_eq!(restored.populated_months(), vec![1]);
        assert_eq!(restored.copies(), 4);
    }

    #[test]
    fn editing_an_empty_month_is_rejected() {
        let mut editor = CalendarEditor::new(1);
        editor.select_month(5).unwrap();
        assert!(matches!(
            editor.commit_effect(EffectKind::Contrast, 110.0),
            Err(Error::MissingImage)
        ));
    }
}
