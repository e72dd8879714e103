//! printcraft: photo print customization engine
//!
//! This crate provides the client-side state machines behind a photo print
//! customizer: transform and color-effect rendering with a fingerprinted
//! cache, undoable edit history, three editor flows (standard prints,
//! polaroids, calendars) reconciled against a copies quota, and a keyed
//! persistence store with debounced best-effort remote sync.
//!
//! # Example
//!
//! ```
//! use printcraft::StandardEditor;
//!
//! // A product allowing three printed copies in total.
//! let mut editor = StandardEditor::new(3);
//! assert_eq!(editor.status().remaining(), 3);
//! assert!(!editor.is_complete());
//!
//! // Load an upload, tune it, then save against the quota:
//! // editor.load_image(&bytes)?;
//! // editor.bench.commit_effect(EffectKind::Brightness, 115.0)?;
//! // editor.save()?;
//! ```
//!
//! # Persistence
//!
//! Completed (and in-progress) sessions serialize to [`Customization`]
//! records keyed by cart item and instance, held in a
//! [`CustomizationStore`]:
//!
//! ```
//! use printcraft::{
//!     Customization, CustomizationData, CustomizationStore, StandardData,
//! };
//!
//! let mut store = CustomizationStore::in_memory();
//! let data = CustomizationData::Standard(StandardData {
//!     images: Vec::new(),
//!     next_id: 1,
//! });
//! store.save(Customization::new("cart-item-7", 0, data, false)).unwrap();
//! assert!(store.get("cart-item-7", 0).is_some());
//! ```

mod editor;
mod error;
mod history;
mod quota;
mod render;
mod session;
mod store;
mod transform;

pub use editor::calendar::{CalendarData, CalendarEditor, CalendarMonth, MONTHS_PER_YEAR};
pub use editor::polaroid::{PolaroidData, PolaroidEditor, SavedPolaroid};
pub use editor::standard::{SavedImage, StandardData, StandardEditor};
pub use editor::{PhotoParams, PhotoSource, Workbench, WorkingPhoto};
pub use error::{Error, Result};
pub use history::{EditCommand, EditHistory};
pub use quota::QuotaStatus;
pub use render::{composite, render_photo, Fingerprint, RenderCache};
pub use session::{EditorKind, SessionParams};
pub use store::debounce::Debouncer;
#[cfg(feature = "sync")]
pub use store::remote::HttpRemote;
pub use store::remote::RemoteSync;
pub use store::{Customization, CustomizationData, CustomizationStore};
pub use transform::{
    CanvasStyle, Effect, EffectKind, EffectSettings, FilterPreset, PrintDimensions, Transform,
};
