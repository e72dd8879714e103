//! Polaroid print editor.
//!
//! Structurally the standard editor with a polaroid frame: same working
//! slot, same quota reconciliation. Persisted polaroids may carry a legacy
//! second image from an old two-photo layout; it is preserved verbatim
//! across re-saves but no longer has a write path.

use serde::{Deserialize, Serialize};

use crate::editor::{PhotoParams, Workbench};
use crate::error::{Error, Result};
use crate::quota::{self, QuotaStatus};
use crate::session::SessionParams;
use crate::store::{Customization, CustomizationData};

/// One committed polaroid, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPolaroid {
    pub id: u64,
    pub original_image_src: String,
    #[serde(flatten)]
    pub params: PhotoParams,
    /// Legacy two-photo layout. Read and carried through re-saves for old
    /// stored customizations; never written for new ones.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub second_image_src: Option<String>,
}

/// Serializable snapshot of a polaroid editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolaroidData {
    pub polaroids: Vec<SavedPolaroid>,
    pub next_id: u64,
}

/// The polaroid editor state machine.
#[derive(Debug)]
pub struct PolaroidEditor {
    pub bench: Workbench,
    saved: Vec<SavedPolaroid>,
    next_id: u64,
    editing: Option<u64>,
    quota: u32,
}

impl PolaroidEditor {
    pub fn new(quota: u32) -> Self {
        Self {
            bench: Workbench::new(),
            saved: Vec::new(),
            next_id: 1,
            editing: None,
            quota,
        }
    }

    pub fn from_data(data: PolaroidData, quota: u32) -> Self {
        Self {
            bench: Workbench::new(),
            next_id: data.next_id,
            saved: data.polaroids,
            editing: None,
            quota,
        }
    }

    pub fn data(&self) -> PolaroidData {
        PolaroidData {
            polaroids: self.saved.clone(),
            next_id: self.next_id,
        }
    }

    pub fn saved(&self) -> &[SavedPolaroid] {
        &self.saved
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn load_image(&mut self, bytes: &[u8]) -> Result<()> {
        self.bench.load_bytes(bytes)?;
        self.editing = None;
        Ok(())
    }

    pub fn edit_existing(&mut self, id: u64) -> Result<()> {
        let saved = self
            .saved
            .iter()
            .find(|polaroid| polaroid.id == id)
            .ok_or(Error::UnknownId(id))?;
        self.bench
            .load_saved(&saved.original_image_src, saved.params.clone())?;
        self.editing = Some(id);
        Ok(())
    }

    pub fn discard(&mut self) {
        self.bench.discard();
        self.editing = None;
    }

    /// Commits the working photo against the shared quota. A replaced
    /// polaroid keeps its id and its legacy second image.
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

        let id = match self
            .editing
            .and_then(|id| self.saved.iter_mut().find(|polaroid| polaroid.id == id))
        {
            Some(existing) => {
                existing.original_image_src = src;
                existing.params = params;
                existing.id
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.saved.push(SavedPolaroid {
                    id,
                    original_image_src: src,
                    params,
                    second_image_src: None,
                });
                id
            }
        };

        self.bench.discard();
        self.editing = None;
        Ok(id)
    }

    pub fn remove(&mut self, id: u64) -> Result<()> {
        let index = self
            .saved
            .iter()
            .position(|polaroid| polaroid.id == id)
            .ok_or(Error::UnknownId(id))?;
        self.saved.remove(index);
        if self.editing == Some(id) {
            self.bench.discard();
            self.editing = None;
        }
        Ok(())
    }

    fn used_copies(&self) -> u32 {
        quota::used_copies(self.saved.iter().map(|polaroid| polaroid.params.copies))
    }

    fn replaced_copies(&self) -> Option<u32> {
        let id = self.editing?;
        self.saved
            .iter()
            .find(|polaroid| polaroid.id == id)
            .map(|polaroid| polaroid.params.copies)
    }

    pub fn status(&self) -> QuotaStatus {
        QuotaStatus {
            used: self.used_copies(),
            quota: self.quota,
        }
    }

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
            CustomizationData::Polaroid(self.data()),
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

    #[test]
    fn save_and_quota_mirror_standard_behavior() {
        let mut editor = PolaroidEditor::new(2);

        editor.load_image(&png_bytes(2, 2, [1, 1, 1, 255])).unwrap();
        editor.bench.commit_copies(2).unwrap();
        editor.save().unwrap();
        assert!(editor.is_complete());

        editor.load_image(&png_bytes(2, 2, [2, 2, 2, 255])).unwrap();
        assert!(matches!(editor.save(), Err(Error::QuotaExceeded { .. })));
    }

    #[test]
    fn legacy_second_image_survives_resave() {
        let mut editor = PolaroidEditor::new(5);
        editor.load_image(&png_bytes(2, 2, [1, 1, 1, 255])).unwrap();
        let id = editor.save().unwrap();

        // Simulate a customization persisted by the old two-photo layout.
        let mut data = editor.data();
        data.polaroids[0].second_image_src = Some("data:image/png;base64,AAAA".to_owned());
        let mut restored = PolaroidEditor::from_data(data, 5);

        restored.edit_existing(id).unwrap();
        restored.bench.commit_copies(3).unwrap();
        restored.save().unwrap();

        assert_eq!(
            restored.saved()[0].second_image_src.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert_eq!(restored.saved()[0].params.copies, 3);
    }

    #[test]
    fn new_saves_have_no_second_image() {
        let mut editor = PolaroidEditor::new(5);
        editor.load_image(&png_bytes(2, 2, [1, 1, 1, 255])).unwrap();
        editor.save().unwrap();

        let json = serde_json::to_value(editor.data()).unwrap();
        assert!(json["polaroids"][0].get("secondImageSrc").is_none());
    }
}
