//! Relation matchers: turn a source-side name into an inventory entity
//! through the source's regex relation tables, creating the target on
//! demand.
//!
//! An empty table means "no opinion" and returns `None`; a table that
//! matches nothing falls back to the default site for host/site lookups
//! and to `None` everywhere else. VLAN group lookups with no table fall
//! back to the default VLAN group.

use std::sync::Arc;

use nbsync_core::relations::RelationMap;
use nbsync_core::slugify;
use nbsync_netbox::objects::{
    content_types, DeviceRole, NetboxObject, Site, Tenant, VlanGroup,
};
use nbsync_netbox::NetboxInventory;

use crate::SourceError;

/// Map a host name to its site. No table: `None`. No match: the default
/// site.
pub async fn match_host_to_site(
    nbi: &Arc<NetboxInventory>,
    host_name: &str,
    relations: &RelationMap,
) -> Result<Option<Arc<Site>>, SourceError> {
    if relations.is_empty() {
        return Ok(None);
    }
    match relations.match_value(host_name) {
        Some(site_name) => get_or_add_site(nbi, site_name).await.map(Some),
        None => Ok(Some(nbi.default_site())),
    }
}

/// Map a cluster name to its site. No table or no match: `None`.
pub async fn match_cluster_to_site(
    nbi: &Arc<NetboxInventory>,
    cluster_name: &str,
    relations: &RelationMap,
) -> Result<Option<Arc<Site>>, SourceError> {
    match relations.match_value(cluster_name) {
        Some(site_name) => get_or_add_site(nbi, site_name).await.map(Some),
        None => Ok(None),
    }
}

/// Map a VLAN name to its site. No table or no match: `None`.
pub async fn match_vlan_to_site(
    nbi: &Arc<NetboxInventory>,
    vlan_name: &str,
    relations: &RelationMap,
) -> Result<Option<Arc<Site>>, SourceError> {
    match relations.match_value(vlan_name) {
        Some(site_name) => get_or_add_site(nbi, site_name).await.map(Some),
        None => Ok(None),
    }
}

/// Map a cluster/host/vm/vlan name to a tenant. No table or no match:
/// `None`.
pub async fn match_name_to_tenant(
    nbi: &Arc<NetboxInventory>,
    name: &str,
    relations: &RelationMap,
) -> Result<Option<Arc<Tenant>>, SourceError> {
    match relations.match_value(name) {
        Some(tenant_name) => {
            if let Some(tenant) = nbi.get_tenant(tenant_name).await {
                return Ok(Some(tenant));
            }
            let tenant = nbi
                .add_tenant(Tenant {
                    name: tenant_name.to_string(),
                    slug: slugify(tenant_name),
                    ..Default::default()
                })
                .await?;
            Ok(Some(tenant))
        }
        None => Ok(None),
    }
}

/// Map a host or VM name to a device role. No table or no match: `None`.
pub async fn match_name_to_role(
    nbi: &Arc<NetboxInventory>,
    name: &str,
    relations: &RelationMap,
    vm_role: bool,
) -> Result<Option<Arc<DeviceRole>>, SourceError> {
    match relations.match_value(name) {
        Some(role_name) => {
            let role = nbi
                .add_device_role(DeviceRole {
                    name: role_name.to_string(),
                    slug: slugify(role_name),
                    vm_role,
                    ..Default::default()
                })
                .await?;
            Ok(Some(role))
        }
        None => Ok(None),
    }
}

/// Map a VLAN name to its group, optionally scoping the group to a site
/// via the vlan-group-site table. No table: the default VLAN group.
pub async fn match_vlan_to_group(
    nbi: &Arc<NetboxInventory>,
    vlan_name: &str,
    group_relations: &RelationMap,
    group_site_relations: &RelationMap,
) -> Result<Arc<VlanGroup>, SourceError> {
    if group_relations.is_empty() {
        return Ok(nbi.default_vlan_group());
    }
    let Some(group_name) = group_relations.match_value(vlan_name) else {
        return Ok(nbi.default_vlan_group());
    };
    let scope_site = match group_site_relations.match_value(vlan_name) {
        Some(site_name) => Some(get_or_add_site(nbi, site_name).await?),
        None => None,
    };
    let mut group = VlanGroup {
        name: group_name.to_string(),
        slug: slugify(group_name),
        vid_ranges: vec![[
            nbsync_core::constants::DEFAULT_VID,
            nbsync_core::constants::MAX_VID,
        ]],
        ..Default::default()
    };
    if let Some(site) = scope_site {
        group.scope_type = Some(content_types::DCIM_SITE.to_string());
        group.scope_id = Some(site.base.id);
    }
    Ok(nbi.add_vlan_group(group).await?)
}

async fn get_or_add_site(
    nbi: &Arc<NetboxInventory>,
    site_name: &str,
) -> Result<Arc<Site>, SourceError> {
    if let Some(site) = nbi.get_site(site_name).await {
        return Ok(site);
    }
    let site = nbi
        .add_site(Site {
            base: NetboxObject::default(),
            name: site_name.to_string(),
            slug: slugify(site_name),
            ..Default::default()
        })
        .await?;
    Ok(site)
}
