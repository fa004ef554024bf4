//! Source adapter errors.

use thiserror::Error;

use nbsync_core::RelationsError;
use nbsync_netbox::{InventoryError, RemoteError};

#[derive(Debug, Error)]
pub enum SourceError {
    /// The source API could not be reached.
    #[error("source connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The source API answered with an error status.
    #[error("source returned {status} for {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// The source's data did not have the expected shape.
    #[error("parsing source data: {0}")]
    Parse(String),

    /// Writing the projected objects into the inventory failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// A relation table in the source config failed to compile.
    #[error(transparent)]
    Relations(#[from] RelationsError),

    /// No adapter for this source kind is built into this binary.
    #[error("no adapter for source type {0} is built into this binary")]
    UnsupportedKind(String),

    /// The source entry is not usable (missing token, bad URL, ...).
    #[error("invalid source configuration: {0}")]
    Config(String),
}

impl SourceError {
    pub fn connection(message: impl Into<String>) -> Self {
        SourceError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SourceError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<RemoteError> for SourceError {
    fn from(err: RemoteError) -> Self {
        SourceError::Connection {
            message: "netbox call outside an upsert failed".into(),
            source: Some(Box::new(err)),
        }
    }
}
