//! Remote persistence backend.
//!
//! The store talks to the backend through the [`RemoteSync`] trait so tests
//! can substitute a recording fake. The HTTP implementation is behind the
//! `sync` feature; without it the store is purely local.

use crate::error::Result;
use crate::store::Customization;

/// Backend operations for customization sync. All methods are best-effort
/// from the store's point of view: failures are recorded, never fatal.
pub trait RemoteSync {
    /// Fetches every customization the backend holds for this session.
    fn fetch_all(&self) -> Result<Vec<Customization>>;

    /// Creates or replaces one customization.
    fn upsert(&self, customization: &Customization) -> Result<()>;

    /// Deletes one customization by key.
    fn delete(&self, cart_item_id: &str, instance_index: u32) -> Result<()>;

    /// Deletes everything for this session.
    fn delete_all(&self) -> Result<()>;
}

#[cfg(feature = "sync")]
pub use http::HttpRemote;

#[cfg(feature = "sync")]
mod http {
    use reqwest::blocking::Client;

    use super::RemoteSync;
    use crate::error::{Error, Result};
    use crate::store::Customization;

    /// [`RemoteSync`] over a JSON HTTP API.
    ///
    /// Keys map onto the path: `{base}/customizations/{cartItemId}/{index}`.
    pub struct HttpRemote {
        client: Client,
        base_url: String,
    }

    impl HttpRemote {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                client: Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_owned(),
            }
        }

        fn url(&self, suffix: &str) -> String {
            format!("{}/customizations{}", self.base_url, suffix)
        }
    }

    fn http_err(err: reqwest::Error) -> Error {
        Error::Sync(err.to_string())
    }

    impl RemoteSync for HttpRemote {
        fn fetch_all(&self) -> Result<Vec<Customization>> {
            let response = self
                .client
                .get(self.url(""))
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(http_err)?;
            response.json().map_err(http_err)
        }

        fn upsert(&self, customization: &Customization) -> Result<()> {
            self.client
                .put(self.url(&format!(
                    "/{}/{}",
                    customization.cart_item_id, customization.instance_index
                )))
                .json(customization)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(http_err)?;
            Ok(())
        }

        fn delete(&self, cart_item_id: &str, instance_index: u32) -> Result<()> {
            self.client
                .delete(self.url(&format!("/{cart_item_id}/{instance_index}")))
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(http_err)?;
            Ok(())
        }

        fn delete_all(&self) -> Result<()> {
            self.client
                .delete(self.url(""))
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(http_err)?;
            Ok(())
        }
    }
}
