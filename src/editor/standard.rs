//! Multi-image print editor.
//!
//! Saves any number of images against a shared copies quota. Each save is
//! reconciled against the quota before it lands; an over-quota save is
//! rejected and the working photo stays loaded for adjustment.

use serde::{Deserialize, Serialize};

use crate::editor::{PhotoParams, Workbench};
use crate::error::{Error, Result};
use crate::quota::{self, QuotaStatus};
use crate::session::SessionParams;
use crate::store::{Customization, CustomizationData};
use crate::transform::PrintDimensions;

/// One committed image with its full parameter set, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedImage {
    pub id: u64,
    /// Data URL of the original upload, kept for re-editing.
    pub original_image_src: String,
    #[serde(flatten)]
    pub params: PhotoParams,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub print_dimensions: Option<PrintDimensions>,
}

/// Serializable snapshot of a standard editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardData {
    pub images: Vec<SavedImage>,
    /// Monotonic id counter. Persisted so ids stay unique across delete and
    /// re-save within one customization.
    pub next_id: u64,
}

/// The standard (multi-image) editor state machine.
#[derive(Debug)]
pub struct StandardEditor {
    pub bench: Workbench,
    saved: Vec<SavedImage>,
    next_id: u64,
    /// Id of the saved image currently re-opened for editing, if any. Its
    /// copies are released from quota accounting until it is re-saved.
    editing: Option<u64>,
    quota: u32,
    print_dimensions: Option<PrintDimensions>,
}

impl StandardEditor {
    pub fn new(quota: u32) -> Self {
        Self {
            bench: Workbench::new(),
            saved: Vec::new(),
            next_id: 1,
            editing: None,
            quota,
            print_dimensions: None,
        }
    }

    pub fn with_print_dimensions(mut self, dims: PrintDimensions) -> Self {
        self.print_dimensions = Some(dims);
        self
    }

    /// Restores an editor from persisted data.
    pub fn from_data(data: StandardData, quota: u32) -> Self {
        Self {
            bench: Workbench::new(),
            next_id: data.next_id,
            saved: data.images,
            editing: None,
            quota,
            print_dimensions: None,
        }
    }

    pub fn data(&self) -> StandardData {
        StandardData {
            images: self.saved.clone(),
            next_id: self.next_id,
        }
    }

    pub fn saved(&self) -> &[SavedImage] {
        &self.saved
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    // ------------------------------------------------------------------
    // Working slot
    // ------------------------------------------------------------------

    /// Loads a fresh upload; any previous working photo is dropped.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<()> {
        self.bench.load_bytes(bytes)?;
        self.editing = None;
        Ok(())
    }

    /// Re-opens a saved image for editing. While open, its copies no longer
    /// count against the quota.
    pub fn edit_existing(&mut self, id: u64) -> Result<()> {
        let saved = self
            .saved
            .iter()
            .find(|image| image.id == id)
            .ok_or(Error::UnknownId(id))?;
        self.bench
            .load_saved(&saved.original_image_src, saved.params.clone())?;
        self.editing = Some(id);
        Ok(())
    }

    /// Abandons the working photo without saving.
    pub fn discard(&mut self) {
        self.bench.discard();
        self.editing = None;
    }

    // ------------------------------------------------------------------
    // Save / remove
    // ------------------------------------------------------------------

    /// Commits the working photo. Fails with [`Error::QuotaExceeded`] when
    /// the projected total would exceed the quota; the working photo stays
    /// loaded so the user can lower copies and retry.
    pub fn save(&mut self) -> Result<u64> {
        let working = self.bench.working().ok_or(Error::MissingImage)?;
        let requested = working.params.copies;

        let used = self.used_copies();
        let replaced = self.replaced_copies();
        if quota::projected(used, replaced, requested) > self.quota {
            let remaining = self.quota.saturating_sub(used - replaced.unwrap_or(0));
            return Err(Error::QuotaExceeded {
                requested,
                remaining,
            });
        }

        let params = working.params.clone();
        let src = working.source.data_url.clone();

        let id = match self.editing {
            Some(id) => {
                // A stale editing id falls back to appending.
                if let Some(existing) = self.saved.iter_mut().find(|image| image.id == id) {
                    existing.original_image_src = src;
                    existing.params = params;
                    id
                } else {
                    self.push_new(src, params)
                }
            }
            None => self.push_new(src, params),
        };

        self.bench.discard();
        self.editing = None;
        Ok(id)
    }

    fn push_new(&mut self, src: String, params: PhotoParams) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.saved.push(SavedImage {
            id,
            original_image_src: src,
            params,
            print_dimensions: self.print_dimensions,
        });
        id
    }

    /// Deletes a saved image, releasing its copies back to the quota.
    pub fn remove(&mut self, id: u64) -> Result<()> {
        let index = self
            .saved
            .iter()
            .position(|image| image.id == id)
            .ok_or(Error::UnknownId(id))?;
        self.saved.remove(index);
        if self.editing == Some(id) {
            self.bench.discard();
            self.editing = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Quota
    // ------------------------------------------------------------------

    fn used_copies(&self) -> u32 {
        quota::used_copies(self.saved.iter().map(|image| image.params.copies))
    }

    fn replaced_copies(&self) -> Option<u32> {
        let id = self.editing?;
        self.saved
            .iter()
            .find(|image| image.id == id)
            .map(|image| image.params.copies)
    }

    /// Quota accounting over saved images only.
    pub fn status(&self) -> QuotaStatus {
        QuotaStatus {
            used: self.used_copies(),
            quota: self.quota,
        }
    }

    /// Quota accounting as if the working photo were saved right now.
    pub fn projected_status(&self) -> QuotaStatus {
        let pending = self
            .bench
            .working()
            .map(|w| w.params.copies)
            .unwrap_or(0);
        QuotaStatus {
            used: quota::projected(self.used_copies(), self.replaced_copies(), pending),
            quota: self.quota,
        }
    }

    /// A standard customization is complete when the quota is fully spent.
    pub fn is_complete(&self) -> bool {
        self.status().is_complete()
    }

    /// Wraps the session's current data in a storable record. `None` for
    /// standalone sessions with no cart linkage.
    pub fn to_customization(&self, session: &SessionParams) -> Option<Customization> {
        let (cart_item_id, instance_index) = session.cart_key()?;
        Some(Customization::new(
            cart_item_id,
            instance_index,
            CustomizationData::Standard(self.data()),
            self.is_complete(),
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

    fn save_with_copies(editor: &mut StandardEditor, copies: u32) -> Result<u64> {
        editor.load_image(&png_bytes(2, 2, [5, 5, 5, 255]))?;
        editor.bench.commit_copies(copies)?;
        editor.save()
    }

    #[test]
    fn quota_walkthrough() {
        let mut editor = StandardEditor::new(3);

        save_with_copies(&mut editor, 2).unwrap();
        assert_eq!(editor.status().remaining(), 1);
        assert!(!editor.is_complete());

        // Second image asking for 2 would project to 4 of 3.
        let err = save_with_copies(&mut editor, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                requested: 2,
                remaining: 1
            }
        ));
        // Rejected save keeps the working photo for adjustment.
        assert!(editor.bench.has_image());

        editor.bench.commit_copies(1).unwrap();
        editor.save().unwrap();
        assert!(editor.is_complete());
        assert_eq!(editor.status().remaining(), 0);
    }

    #[test]
    fn reediting_releases_own_copies() {
        let mut editor = StandardEditor::new(3);
        let id = save_with_copies(&mut editor, 3).unwrap();

        // Re-save at the same count replaces, not adds.
        editor.edit_existing(id).unwrap();
        assert_eq!(editor.projected_status().used, 3);
        editor.save().unwrap();
        assert_eq!(editor.saved().len(), 1);
        assert_eq!(editor.status().used, 3);
    }

    #[test]
    fn remove_releases_quota_and_closes_edit() {
        let mut editor = StandardEditor::new(5);
        let id = save_with_copies(&mut editor, 4).unwrap();

        editor.edit_existing(id).unwrap();
        editor.remove(id).unwrap();
        assert!(!editor.bench.has_image());
        assert_eq!(editor.status().used, 0);

        assert!(matches!(editor.remove(id), Err(Error::UnknownId(_))));
    }

    #[test]
    fn reedit_updates_in_place_with_same_id() {
        let mut editor = StandardEditor::new(10);
        let id = save_with_copies(&mut editor, 1).unwrap();

        editor.edit_existing(id).unwrap();
        editor.bench.commit_copies(4).unwrap();
        let saved_id = editor.save().unwrap();

        assert_eq!(saved_id, id);
        assert_eq!(editor.saved().len(), 1);
        assert_eq!(editor.saved()[0].params.copies, 4);
    }

    #[test]
    fn data_roundtrip_preserves_ids() {
        let mut editor = StandardEditor::new(10);
        save_with_copies(&mut editor, 1).unwrap();
        let id2 = save_with_copies(&mut editor, 2).unwrap();
        editor.remove(id2).unwrap();

        let restored = StandardEditor::from_data(editor.data(), 10);
        assert_eq!(restored.saved().len(), 1);
        // Deleted ids are never reused.
        assert_eq!(restored.data().next_id, 3);
    }

    #[test]
    fn to_customization_requires_cart_linkage() {
        use crate::session::EditorKind;

        let mut editor = StandardEditor::new(1);
        save_with_copies(&mut editor, 1).unwrap();

        let standalone = SessionParams::standalone(EditorKind::Standard, 1);
        assert!(editor.to_customization(&standalone).is_none());

        let linked = standalone.clone().for_cart_item("cart-3", 0);
        let record = editor.to_customization(&linked).unwrap();
        assert_eq!(record.cart_item_id, "cart-3");
        assert_eq!(record.instance_index, 0);
        assert!(record.completed);
    }

    #[test]
    fn shrunk_quota_is_surfaced_not_clamped() {
        let mut editor = StandardEditor::new(5);
        save_with_copies(&mut editor, 4).unwrap();

        let restored = StandardEditor::from_data(editor.data(), 2);
        assert!(restored.status().is_over_limit());
        assert_eq!(restored.saved()[0].params.copies, 4);
    }
}
