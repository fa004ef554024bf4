//! Shared utilities for nbsync.
//!
//! Everything in here is independent of both the NetBox data model and the
//! individual source adapters: slug generation, IP/subnet helpers, DNS
//! lookups, and the regex relation tables sources use to map their own
//! naming schemes onto inventory entities.

pub mod constants;
pub mod net;
pub mod relations;
pub mod slug;

pub use relations::{RelationMap, RelationsError};
pub use slug::slugify;
