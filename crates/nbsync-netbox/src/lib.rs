//! # NetBox layer
//!
//! Everything nbsync knows about the target NetBox instance lives here:
//!
//! - [`objects`] - the unified entity schema: one struct per family, each
//!   carrying the common envelope (id, tags, description, custom fields)
//!   and a hand-written wire projection;
//! - [`client`] - the typed REST client: paginated list-all, create,
//!   patch, delete, version probe, with bounded retries;
//! - [`diff`] - the JSON-shape diff and the priority-aware merge that
//!   together decide what (if anything) gets PATCHed;
//! - [`inventory`] - the concurrency-safe in-memory graph indexed by
//!   natural keys, plus the orphan manager.

pub mod client;
pub mod diff;
pub mod error;
pub mod inventory;
pub mod objects;

pub use client::NetboxClient;
pub use error::{InventoryError, RemoteError};
pub use inventory::NetboxInventory;
