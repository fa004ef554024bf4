//! # Source adapters
//!
//! A source is an external infrastructure system whose inventory nbsync
//! reads. Every adapter implements the two-phase [`Source`] contract:
//! `init` pulls a snapshot of the source's native objects, `sync`
//! projects them into the shared inventory through the `add_*` upserts.
//!
//! The heavy lifting shared between adapters lives here: the factory
//! that provisions per-source tags, the regex relation matchers that map
//! source names onto sites/tenants/roles/VLAN groups, and the bounded
//! fan-out helper for per-entity workers.

pub mod config;
pub mod context;
pub mod error;
pub mod fortigate;
pub mod kind;
pub mod matchers;
pub mod proxmox;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use nbsync_core::slugify;
use nbsync_netbox::objects::{NetboxObject, Tag};
use nbsync_netbox::NetboxInventory;

pub use config::SourceConfig;
pub use context::SourceContext;
pub use error::SourceError;
pub use kind::SourceKind;

/// The contract every source implements.
///
/// `init` talks only to the source system; `sync` talks only to the
/// inventory. Referents must be upserted before referrers — the
/// inventory offers no cross-family atomicity.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the source's snapshot into memory.
    async fn init(&mut self) -> Result<(), SourceError>;

    /// Project the snapshot into the inventory.
    async fn sync(&self, nbi: &Arc<NetboxInventory>) -> Result<(), SourceError>;
}

/// Build the adapter for a validated source entry, provisioning its
/// provenance tags first.
pub async fn new_source(
    config: &SourceConfig,
    nbi: &Arc<NetboxInventory>,
) -> Result<Box<dyn Source>, SourceError> {
    let kind = config.kind()?;

    let source_tag = nbi
        .add_tag(Tag {
            base: NetboxObject {
                description: format!("Objects synced from source {}", config.name),
                ..Default::default()
            },
            name: config.tag.clone(),
            slug: slugify(&format!("source-{}", config.name)),
            color: config.tag_color.clone(),
        })
        .await?;
    let type_tag = nbi
        .add_tag(Tag {
            base: NetboxObject {
                description: format!("Objects synced from a {kind} source"),
                ..Default::default()
            },
            name: kind.to_string(),
            slug: slugify(&format!("type-{kind}")),
            color: kind.tag_color().to_string(),
        })
        .await?;

    let ctx = SourceContext::new(config.clone(), source_tag, type_tag)?;
    info!(source = %config.name, %kind, "constructed source adapter");

    match kind {
        SourceKind::Proxmox => Ok(Box::new(proxmox::ProxmoxSource::new(ctx)?)),
        SourceKind::Fortigate => Ok(Box::new(fortigate::FortigateSource::new(ctx)?)),
        other => Err(SourceError::UnsupportedKind(other.to_string())),
    }
}
