//! Boundary contract with the cart/routing layer.
//!
//! The excluded cart UI hands each editor a [`SessionParams`] bundle parsed
//! from navigation parameters, and reads back a persisted
//! [`crate::store::Customization`]. Nothing in here makes network calls.

use serde::{Deserialize, Serialize};

use crate::transform::PrintDimensions;

/// Which of the three editor variants a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorKind {
    Standard,
    Polaroid,
    Calendar,
}

/// Navigation parameters supplied by the cart layer when an editor opens.
///
/// `cart_item_id`/`instance_index` identify which persisted customization to
/// load and save; when absent the session is standalone (download-only, no
/// cart linkage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub editor: EditorKind,
    /// Required number of printed copies for this cart line instance.
    pub quota: u32,
    /// Physical output size, when the package specifies one.
    pub print_dimensions: Option<PrintDimensions>,
    pub cart_item_id: Option<String>,
    pub instance_index: Option<u32>,
}

impl SessionParams {
    /// Builds a standalone session with no cart linkage.
    pub fn standalone(editor: EditorKind, quota: u32) -> Self {
        Self {
            editor,
            quota,
            print_dimensions: None,
            cart_item_id: None,
            instance_index: None,
        }
    }

    /// Links this session to a persisted customization slot.
    pub fn for_cart_item(mut self, cart_item_id: impl Into<String>, instance_index: u32) -> Self {
        self.cart_item_id = Some(cart_item_id.into());
        self.instance_index = Some(instance_index);
        self
    }

    /// The persistence key, when this session is cart-linked.
    pub fn cart_key(&self) -> Option<(&str, u32)> {
        match (&self.cart_item_id, self.instance_index) {
            (Some(id), Some(index)) => Some((id.as_str(), index)),
            _ => None,
        }
    }

    /// True when no persisted customization backs this session.
    pub fn is_standalone(&self) -> bool {
        self.cart_key().is_none()
    }
}
