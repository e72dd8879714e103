//! Keyed customization persistence.
//!
//! Customizations are keyed by `(cart_item_id, instance_index)` so several
//! instances of the same product line item each keep their own edits. Every
//! save lands locally first (and in the backing file, when one is
//! configured); remote sync is debounced, best-effort, and never blocks or
//! fails an edit. The latest sync failure is kept for display and cleared by
//! the next full success.

pub mod debounce;
pub mod remote;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::editor::calendar::CalendarData;
use crate::editor::polaroid::PolaroidData;
use crate::editor::standard::StandardData;
use crate::error::Result;
use crate::session::EditorKind;
use debounce::Debouncer;
use remote::RemoteSync;

const DEFAULT_QUIET: Duration = Duration::from_secs(2);

// ============================================================================
// Customization
// ============================================================================

/// Editor-specific payload, tagged by editor type in the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "editorType", content = "data", rename_all = "camelCase")]
pub enum CustomizationData {
    Standard(StandardData),
    Polaroid(PolaroidData),
    Calendar(CalendarData),
}

impl CustomizationData {
    pub fn editor_kind(&self) -> EditorKind {
        match self {
            Self::Standard(_) => EditorKind::Standard,
            Self::Polaroid(_) => EditorKind::Polaroid,
            Self::Calendar(_) => EditorKind::Calendar,
        }
    }
}

/// One stored customization: the key, the editor payload, and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub cart_item_id: String,
    pub instance_index: u32,
    #[serde(flatten)]
    pub data: CustomizationData,
    pub completed: bool,
    /// Stamped by the store on every save; drives conflict display, not
    /// merge order (local always wins).
    pub last_modified: DateTime<Utc>,
}

impl Customization {
    pub fn new(
        cart_item_id: impl Into<String>,
        instance_index: u32,
        data: CustomizationData,
        completed: bool,
    ) -> Self {
        Self {
            cart_item_id: cart_item_id.into(),
            instance_index,
            data,
            completed,
            last_modified: Utc::now(),
        }
    }

    pub fn key(&self) -> (String, u32) {
        (self.cart_item_id.clone(), self.instance_index)
    }
}

// ============================================================================
// CustomizationStore
// ============================================================================

type Key = (String, u32);

/// Local-first customization store with optional file backing and debounced
/// remote sync.
pub struct CustomizationStore {
    entries: HashMap<Key, Customization>,
    path: Option<PathBuf>,
    debounce: Debouncer<Key>,
    remote: Option<Box<dyn RemoteSync>>,
    last_sync_error: Option<String>,
}

impl CustomizationStore {
    /// Opens a file-backed store, loading any existing contents.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = HashMap::new();
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let stored: Vec<Customization> = serde_json::from_str(&raw)?;
            for customization in stored {
                entries.insert(customization.key(), customization);
            }
        }
        Ok(Self {
            entries,
            path: Some(path),
            debounce: Debouncer::new(DEFAULT_QUIET),
            remote: None,
            last_sync_error: None,
        })
    }

    /// A store with no file backing; useful standalone and under test.
    pub fn in_memory() -> Self {
        Self {
            entries: HashMap::new(),
            path: None,
            debounce: Debouncer::new(DEFAULT_QUIET),
            remote: None,
            last_sync_error: None,
        }
    }

    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debounce = Debouncer::new(quiet);
        self
    }

    pub fn with_remote(mut self, remote: Box<dyn RemoteSync>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, cart_item_id: &str, instance_index: u32) -> Option<&Customization> {
        self.entries
            .get(&(cart_item_id.to_owned(), instance_index))
    }

    /// Every stored customization, ordered by key.
    pub fn all(&self) -> Vec<&Customization> {
        let mut all: Vec<&Customization> = self.entries.values().collect();
        all.sort_by(|a, b| {
            (&a.cart_item_id, a.instance_index).cmp(&(&b.cart_item_id, b.instance_index))
        });
        all
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Stores a customization under its key, stamping `last_modified` and
    /// arming the sync debounce. Saving the same key again overwrites.
    pub fn save(&mut self, mut customization: Customization) -> Result<()> {
        customization.last_modified = Utc::now();
        let key = customization.key();
        self.entries.insert(key.clone(), customization);
        self.persist()?;
        self.debounce.mark(key, Instant::now());
        Ok(())
    }

    /// Removes one customization locally. The remote copy is untouched — a
    /// removal is a cache eviction, not a deletion; `load_from_remote` can
    /// re-adopt the entry later. Any pending sync mark for the key is
    /// dropped.
    pub fn remove(&mut self, cart_item_id: &str, instance_index: u32) -> Result<bool> {
        let key = (cart_item_id.to_owned(), instance_index);
        let removed = self.entries.remove(&key).is_some();
        if removed {
            self.persist()?;
            self.debounce.cancel(&key);
        }
        Ok(removed)
    }

    /// Removes every instance of a cart item locally, e.g. when the line
    /// item leaves the cart. Like [`Self::remove`], this never touches the
    /// remote.
    pub fn remove_all_for_cart_item(&mut self, cart_item_id: &str) -> Result<usize> {
        let keys: Vec<Key> = self
            .entries
            .keys()
            .filter(|(id, _)| id == cart_item_id)
            .cloned()
            .collect();
        for key in &keys {
            self.entries.remove(key);
            self.debounce.cancel(key);
        }
        if !keys.is_empty() {
            self.persist()?;
        }
        Ok(keys.len())
    }

    /// Drops everything locally. Pending sync marks are dropped too; this is
    /// the local-only reset.
    pub fn clear_all(&mut self) -> Result<()> {
        self.entries.clear();
        self.debounce.clear();
        self.persist()
    }

    /// Local reset plus a best-effort remote wipe. A remote failure is
    /// recorded, not returned; the local clear always happens.
    pub fn clear_all_and_sync(&mut self) -> Result<()> {
        self.clear_all()?;
        if let Some(remote) = &self.remote {
            match remote.delete_all() {
                Ok(()) => self.last_sync_error = None,
                Err(err) => {
                    log::warn!("remote clear failed: {err}");
                    self.last_sync_error = Some(err.to_string());
                }
            }
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let all: Vec<&Customization> = self.all();
            fs::write(path, serde_json::to_string_pretty(&all)?)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote sync
    // ------------------------------------------------------------------

    /// Pulls the backend's customizations and adopts the ones not present
    /// locally. Local entries always win; a remote copy of an existing key
    /// is ignored. Returns how many entries were adopted. A fetch failure is
    /// recorded and reported as zero adoptions.
    pub fn load_from_remote(&mut self) -> Result<usize> {
        let Some(remote) = &self.remote else {
            return Ok(0);
        };
        let fetched = match remote.fetch_all() {
            Ok(fetched) => fetched,
            Err(err) => {
                log::warn!("remote fetch failed: {err}");
                self.last_sync_error = Some(err.to_string());
                return Ok(0);
            }
        };
        let mut adopted = 0;
        for customization in fetched {
            let key = customization.key();
            if !self.entries.contains_key(&key) {
                self.entries.insert(key, customization);
                adopted += 1;
            }
        }
        if adopted > 0 {
            self.persist()?;
        }
        self.last_sync_error = None;
        Ok(adopted)
    }

    /// Upserts every key whose debounce deadline has passed. Removals never
    /// propagate here — only [`Self::clear_all_and_sync`] touches remote
    /// deletion — so a key evicted since it was marked is simply skipped.
    /// Failures are logged and recorded, and the key is not retried until
    /// the next local write re-arms it. Returns how many keys were pushed
    /// successfully.
    pub fn sync_due(&mut self, now: Instant) -> usize {
        let due = self.debounce.take_due(now);
        if due.is_empty() {
            return 0;
        }
        let Some(remote) = &self.remote else {
            return 0;
        };

        let mut synced = 0;
        let mut failure = None;
        for key in due {
            let Some(customization) = self.entries.get(&key) else {
                continue;
            };
            match remote.upsert(customization) {
                Ok(()) => synced += 1,
                Err(err) => {
                    log::warn!("sync failed for {}/{}: {err}", key.0, key.1);
                    failure = Some(err.to_string());
                }
            }
        }
        match failure {
            Some(message) => self.last_sync_error = Some(message),
            None => self.last_sync_error = None,
        }
        synced
    }

    /// Most recent sync failure, if the last pass did not fully succeed.
    pub fn last_sync_error(&self) -> Option<&str> {
        self.last_sync_error.as_deref()
    }

    /// Keys waiting out their debounce quiet period.
    pub fn pending_sync(&self) -> usize {
        self.debounce.pending()
    }
}

// ============================================================================
// Tests
// ============================================================================
