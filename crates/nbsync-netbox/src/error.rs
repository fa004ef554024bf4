//! Error types for the NetBox layer, with transient/permanent
//! classification driving the client's retry loop.

use thiserror::Error;

/// Error from the remote NetBox API or the transport beneath it.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, TLS or timeout failure. Retryable.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API answered with an error status. The body carries NetBox's
    /// validation message and is surfaced verbatim.
    #[error("netbox returned {status} for {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("decoding response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Client-side configuration problem (bad CA file, malformed URL).
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// The server is too old for this tool.
    #[error("unsupported netbox version {version}: nbsync requires major version >= {required}")]
    UnsupportedVersion { version: String, required: u32 },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        RemoteError::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RemoteError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether another attempt may succeed: transport failures and server
    /// errors are transient, validation errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport { .. } => true,
            RemoteError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// An upsert failure, naming the family and the natural key it hit.
#[derive(Debug, Error)]
#[error("{family} {key}: {source}")]
pub struct InventoryError {
    pub family: &'static str,
    pub key: String,
    #[source]
    pub source: RemoteError,
}

impl InventoryError {
    pub fn new(family: &'static str, key: impl std::fmt::Debug, source: RemoteError) -> Self {
        Self {
            family,
            key: format!("{key:?}"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(RemoteError::transport("timed out").is_transient());
        assert!(RemoteError::Api {
            status: 503,
            url: "u".into(),
            message: "m".into()
        }
        .is_transient());
        assert!(!RemoteError::Api {
            status: 400,
            url: "u".into(),
            message: "m".into()
        }
        .is_transient());
        assert!(!RemoteError::Configuration("x".into()).is_transient());
    }

    #[test]
    fn inventory_error_names_family_and_key() {
        let err = InventoryError::new(
            "device",
            ("esxi-01", 4),
            RemoteError::Api {
                status: 400,
                url: "u".into(),
                message: "name: required".into(),
            },
        );
        let text = err.to_string();
        assert!(text.starts_with("device (\"esxi-01\", 4):"));
        assert!(text.contains("400"));
    }
}
