//! Per-source runtime context shared by all adapters.

use std::sync::Arc;

use regex::Regex;
use serde_json::json;
use tokio::sync::Semaphore;

use nbsync_core::constants::{CF_SOURCE_ID, CF_SOURCE_NAME, DEFAULT_SOURCE_CONCURRENCY};
use nbsync_core::net::is_permitted_ip;
use nbsync_core::relations::{string_pairs, RelationMap};
use nbsync_netbox::objects::{NetboxObject, Tag};

use crate::{SourceConfig, SourceError};

/// The compiled regex relation tables from a source entry.
#[derive(Debug, Default, Clone)]
pub struct Relations {
    pub host_site: RelationMap,
    pub cluster_site: RelationMap,
    pub cluster_tenant: RelationMap,
    pub host_tenant: RelationMap,
    pub vm_tenant: RelationMap,
    pub host_role: RelationMap,
    pub vm_role: RelationMap,
    pub vlan_group: RelationMap,
    pub vlan_tenant: RelationMap,
    pub vlan_site: RelationMap,
    pub vlan_group_site: RelationMap,
    pub wlan_tenant: RelationMap,
    pub datacenter_cluster_group: RelationMap,
    /// Plain source-custom-field -> contact-role mappings.
    pub custom_field_mappings: Vec<(String, String)>,
}

/// Everything an adapter needs besides its own protocol client: the
/// validated config, the provenance tags, the compiled relations, the
/// interface filter, and the worker-pool semaphore.
pub struct SourceContext {
    pub config: SourceConfig,
    pub source_tag: Arc<Tag>,
    pub type_tag: Arc<Tag>,
    pub relations: Relations,
    pub interface_filter: Option<Regex>,
    concurrency: Arc<Semaphore>,
}

impl SourceContext {
    pub fn new(
        config: SourceConfig,
        source_tag: Arc<Tag>,
        type_tag: Arc<Tag>,
    ) -> Result<Self, SourceError> {
        let relations = Relations {
            host_site: RelationMap::compile(&config.host_site_relations)?,
            cluster_site: RelationMap::compile(&config.cluster_site_relations)?,
            cluster_tenant: RelationMap::compile(&config.cluster_tenant_relations)?,
            host_tenant: RelationMap::compile(&config.host_tenant_relations)?,
            vm_tenant: RelationMap::compile(&config.vm_tenant_relations)?,
            host_role: RelationMap::compile(&config.host_role_relations)?,
            vm_role: RelationMap::compile(&config.vm_role_relations)?,
            vlan_group: RelationMap::compile(&config.vlan_group_relations)?,
            vlan_tenant: RelationMap::compile(&config.vlan_tenant_relations)?,
            vlan_site: RelationMap::compile(&config.vlan_site_relations)?,
            vlan_group_site: RelationMap::compile(&config.vlan_group_site_relations)?,
            wlan_tenant: RelationMap::compile(&config.wlan_tenant_relations)?,
            datacenter_cluster_group: RelationMap::compile(
                &config.datacenter_cluster_group_relations,
            )?,
            custom_field_mappings: string_pairs(&config.custom_field_mappings)?,
        };
        let interface_filter = if config.interface_filter.is_empty() {
            None
        } else {
            Some(Regex::new(&config.interface_filter).map_err(|e| {
                SourceError::Config(format!(
                    "interfaceFilter {}: {e}",
                    config.interface_filter
                ))
            })?)
        };
        let concurrency = config.max_concurrency.unwrap_or(DEFAULT_SOURCE_CONCURRENCY);
        Ok(Self {
            config,
            source_tag,
            type_tag,
            relations,
            interface_filter,
            concurrency: Arc::new(Semaphore::new(concurrency.max(1))),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Stamp provenance onto a draft: both source tags plus the
    /// `source_name` / `source_id` custom fields.
    pub fn stamp(&self, base: &mut NetboxObject, source_id: &str) {
        base.add_tag(self.source_tag.clone());
        base.add_tag(self.type_tag.clone());
        base.set_custom(CF_SOURCE_NAME, json!(self.config.name));
        if !source_id.is_empty() {
            base.set_custom(CF_SOURCE_ID, json!(source_id));
        }
    }

    /// Whether this interface name survives the source's filter.
    pub fn interface_permitted(&self, name: &str) -> bool {
        self.interface_filter
            .as_ref()
            .map_or(true, |filter| !filter.is_match(name))
    }

    /// Whether this address passes the permitted/ignored subnet lists.
    pub fn ip_permitted(&self, address: &str) -> bool {
        is_permitted_ip(
            address,
            &self.config.permitted_subnets,
            &self.config.ignored_subnets,
        )
    }

    /// HTTP client honoring the source's TLS settings and CA bundle.
    pub fn http_client(&self) -> Result<reqwest::Client, SourceError> {
        let mut builder =
            reqwest::Client::builder().timeout(std::time::Duration::from_secs(30));
        if !self.config.validate_cert {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if !self.config.ca_file.is_empty() {
            let pem = std::fs::read(&self.config.ca_file).map_err(|e| {
                SourceError::Config(format!("reading CA file {}: {e}", self.config.ca_file))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                SourceError::Config(format!("parsing CA file {}: {e}", self.config.ca_file))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        builder
            .build()
            .map_err(|e| SourceError::Config(format!("building HTTP client: {e}")))
    }

    /// Acquire a worker slot; the permit bounds per-entity concurrency.
    pub async fn worker_slot(&self) -> tokio::sync::OwnedSemaphorePermit {
        self.concurrency
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore never closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Arc<Tag> {
        Arc::new(Tag {
            base: NetboxObject { id: 1, ..Default::default() },
            name: name.into(),
            slug: name.into(),
            color: "aa1409".into(),
        })
    }

    fn context(config: SourceConfig) -> SourceContext {
        SourceContext::new(config, tag("src"), tag("type")).unwrap()
    }

    #[test]
    fn interface_filter_drops_matching_names() {
        let ctx = context(SourceConfig {
            interface_filter: "^(docker|veth)".into(),
            ..Default::default()
        });
        assert!(!ctx.interface_permitted("docker0"));
        assert!(!ctx.interface_permitted("veth12ab"));
        assert!(ctx.interface_permitted("eth0"));
    }

    #[test]
    fn stamp_records_provenance() {
        let ctx = context(SourceConfig {
            name: "prodpve".into(),
            ..Default::default()
        });
        let mut base = NetboxObject::default();
        ctx.stamp(&mut base, "qemu/105");
        assert_eq!(base.custom_str(CF_SOURCE_NAME), Some("prodpve"));
        assert_eq!(base.custom_str(CF_SOURCE_ID), Some("qemu/105"));
        assert_eq!(base.tags.len(), 1); // both stamps share the test tag id
    }

    #[test]
    fn subnet_filters_apply() {
        let ctx = context(SourceConfig {
            permitted_subnets: vec!["10.0.0.0/8".into()],
            ignored_subnets: vec!["10.9.0.0/16".into()],
            ..Default::default()
        });
        assert!(ctx.ip_permitted("10.1.2.3"));
        assert!(!ctx.ip_permitted("10.9.1.1"));
        assert!(!ctx.ip_permitted("192.168.0.1"));
    }
}
