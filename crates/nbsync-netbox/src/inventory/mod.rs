//! The concurrency-safe in-memory inventory.
//!
//! One natural-key index per entity family, each guarded by its own async
//! mutex. The lock covers the whole lookup → merge → diff → remote call →
//! index update sequence, so two workers can never race to create the
//! same natural key. There is no cross-family atomicity: callers add
//! referents before referrers.

mod add;
pub mod orphan;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use nbsync_core::constants::{
    ADMIN_CONTACT_ROLE_NAME, CF_LAST_SEEN, CF_ORPHANED_SINCE, CF_SOURCE_ID, CF_SOURCE_NAME,
    DEFAULT_SITE_NAME, DEFAULT_VID, DEFAULT_VLAN_GROUP_NAME, MAX_VID, ORPHAN_TAG_COLOR,
    ORPHAN_TAG_NAME,
};
use nbsync_core::slugify;

use crate::client::NetboxClient;
use crate::error::InventoryError;
use crate::objects::*;

use orphan::OrphanManager;

/// The slice of configuration the inventory needs.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Source names ordered by priority; index 0 is the strongest.
    pub source_priority: Vec<String>,
    pub ssot_tag_name: String,
    pub ssot_tag_color: String,
    /// Days an orphan keeps its tag before soft delete promotes to hard.
    pub remove_orphans_after_days: u32,
}

/// A natural-key index for one family.
pub(crate) struct FamilyIndex<K, E> {
    family: &'static str,
    map: Mutex<HashMap<K, Arc<E>>>,
}

impl<K: Eq + Hash + Clone, E> FamilyIndex<K, E> {
    fn new(family: &'static str) -> Self {
        Self {
            family,
            map: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, key: &K) -> Option<Arc<E>> {
        self.map.lock().await.get(key).cloned()
    }

    async fn len(&self) -> usize {
        self.map.lock().await.len()
    }
}

pub struct NetboxInventory {
    client: Arc<NetboxClient>,
    /// source name -> priority; lower value wins.
    source_priority: HashMap<String, i64>,
    remove_orphans_after_days: u32,
    ssot_tag_name: String,
    ssot_tag_color: String,

    orphans: Mutex<OrphanManager>,

    ssot_tag: OnceLock<Arc<Tag>>,
    orphan_tag: OnceLock<Arc<Tag>>,
    default_site: OnceLock<Arc<Site>>,
    default_vlan_group: OnceLock<Arc<VlanGroup>>,
    admin_contact_role: OnceLock<Arc<ContactRole>>,

    pub(crate) tags: FamilyIndex<String, Tag>,
    pub(crate) custom_fields: FamilyIndex<String, CustomField>,
    pub(crate) tenant_groups: FamilyIndex<String, TenantGroup>,
    pub(crate) tenants: FamilyIndex<String, Tenant>,
    pub(crate) contact_groups: FamilyIndex<String, ContactGroup>,
    pub(crate) contact_roles: FamilyIndex<String, ContactRole>,
    pub(crate) contacts: FamilyIndex<String, Contact>,
    pub(crate) contact_assignments: FamilyIndex<(String, Id, Id, Id), ContactAssignment>,
    pub(crate) sites: FamilyIndex<String, Site>,
    pub(crate) manufacturers: FamilyIndex<String, Manufacturer>,
    pub(crate) platforms: FamilyIndex<String, Platform>,
    pub(crate) device_roles: FamilyIndex<String, DeviceRole>,
    pub(crate) device_types: FamilyIndex<String, DeviceType>,
    pub(crate) devices: FamilyIndex<(String, Id), Device>,
    pub(crate) virtual_device_contexts: FamilyIndex<(String, Id), VirtualDeviceContext>,
    pub(crate) interfaces: FamilyIndex<(Id, String), Interface>,
    pub(crate) ip_addresses: FamilyIndex<String, IPAddress>,
    pub(crate) vlan_groups: FamilyIndex<String, VlanGroup>,
    pub(crate) vlans: FamilyIndex<(Id, u16), Vlan>,
    pub(crate) prefixes: FamilyIndex<String, Prefix>,
    pub(crate) cluster_groups: FamilyIndex<String, ClusterGroup>,
    pub(crate) cluster_types: FamilyIndex<String, ClusterType>,
    pub(crate) clusters: FamilyIndex<String, Cluster>,
    pub(crate) vms: FamilyIndex<(String, Id), Vm>,
    pub(crate) vm_interfaces: FamilyIndex<(Id, String), VmInterface>,
    pub(crate) wireless_lan_groups: FamilyIndex<String, WirelessLanGroup>,
    pub(crate) wireless_lans: FamilyIndex<String, WirelessLan>,
}

impl NetboxInventory {
    pub fn new(config: InventoryConfig, client: Arc<NetboxClient>) -> Self {
        let source_priority = config
            .source_priority
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as i64))
            .collect();
        Self {
            client,
            source_priority,
            remove_orphans_after_days: config.remove_orphans_after_days,
            ssot_tag_name: config.ssot_tag_name,
            ssot_tag_color: config.ssot_tag_color,
            orphans: Mutex::new(OrphanManager::new()),
            ssot_tag: OnceLock::new(),
            orphan_tag: OnceLock::new(),
            default_site: OnceLock::new(),
            default_vlan_group: OnceLock::new(),
            admin_contact_role: OnceLock::new(),
            tags: FamilyIndex::new("tag"),
            custom_fields: FamilyIndex::new("custom field"),
            tenant_groups: FamilyIndex::new("tenant group"),
            tenants: FamilyIndex::new("tenant"),
            contact_groups: FamilyIndex::new("contact group"),
            contact_roles: FamilyIndex::new("contact role"),
            contacts: FamilyIndex::new("contact"),
            contact_assignments: FamilyIndex::new("contact assignment"),
            sites: FamilyIndex::new("site"),
            manufacturers: FamilyIndex::new("manufacturer"),
            platforms: FamilyIndex::new("platform"),
            device_roles: FamilyIndex::new("device role"),
            device_types: FamilyIndex::new("device type"),
            devices: FamilyIndex::new("device"),
            virtual_device_contexts: FamilyIndex::new("virtual device context"),
            interfaces: FamilyIndex::new("interface"),
            ip_addresses: FamilyIndex::new("ip address"),
            vlan_groups: FamilyIndex::new("vlan group"),
            vlans: FamilyIndex::new("vlan"),
            prefixes: FamilyIndex::new("prefix"),
            cluster_groups: FamilyIndex::new("cluster group"),
            cluster_types: FamilyIndex::new("cluster type"),
            clusters: FamilyIndex::new("cluster"),
            vms: FamilyIndex::new("vm"),
            vm_interfaces: FamilyIndex::new("vm interface"),
            wireless_lan_groups: FamilyIndex::new("wireless lan group"),
            wireless_lans: FamilyIndex::new("wireless lan"),
        }
    }

    pub fn client(&self) -> &Arc<NetboxClient> {
        &self.client
    }

    /// Priority of the source recorded on an object; objects without a
    /// recorded writer rank weakest, so any configured source may take
    /// them over.
    pub(crate) fn priority_of(&self, base: &NetboxObject) -> i64 {
        base.custom_str(CF_SOURCE_NAME)
            .and_then(|name| self.source_priority.get(name))
            .copied()
            .unwrap_or(i64::MAX)
    }

    pub fn ssot_tag(&self) -> Arc<Tag> {
        self.ssot_tag.get().expect("inventory initialized").clone()
    }

    pub fn orphan_tag(&self) -> Arc<Tag> {
        self.orphan_tag.get().expect("inventory initialized").clone()
    }

    pub fn default_site(&self) -> Arc<Site> {
        self.default_site.get().expect("inventory initialized").clone()
    }

    pub fn default_vlan_group(&self) -> Arc<VlanGroup> {
        self.default_vlan_group.get().expect("inventory initialized").clone()
    }

    pub fn admin_contact_role(&self) -> Arc<ContactRole> {
        self.admin_contact_role.get().expect("inventory initialized").clone()
    }

    /// Today's date as stored in the `last_seen` / `orphaned_since`
    /// custom fields.
    pub(crate) fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// One-shot hydration from the remote, in topological order, followed
    /// by the bootstrap objects nbsync relies on.
    pub async fn init(&self) -> Result<(), InventoryError> {
        let version = self
            .client
            .check_version()
            .await
            .map_err(|e| InventoryError::new("status", "version", e))?;
        info!(%version, "connected to NetBox");

        // Tags come first so the managed-by tag is known when the other
        // families register their orphan candidates.
        self.hydrate(&self.tags, |t: &Tag| t.name.clone(), false).await?;
        self.init_ssot_tags().await?;
        self.hydrate(&self.custom_fields, |cf: &CustomField| cf.name.clone(), false)
            .await?;
        self.init_ssot_custom_fields().await?;

        self.hydrate(&self.tenant_groups, |g: &TenantGroup| g.name.clone(), false)
            .await?;
        self.hydrate(&self.tenants, |t: &Tenant| t.name.clone(), true).await?;
        self.hydrate(&self.sites, |s: &Site| s.name.clone(), true).await?;
        self.init_default_site().await?;
        self.hydrate(&self.manufacturers, |m: &Manufacturer| m.name.clone(), true)
            .await?;
        self.hydrate(&self.platforms, |p: &Platform| p.name.clone(), true).await?;
        self.hydrate(&self.device_roles, |r: &DeviceRole| r.name.clone(), true)
            .await?;
        self.hydrate(&self.device_types, |t: &DeviceType| t.model.clone(), true)
            .await?;
        self.hydrate(&self.cluster_groups, |g: &ClusterGroup| g.name.clone(), true)
            .await?;
        self.hydrate(&self.cluster_types, |t: &ClusterType| t.name.clone(), true)
            .await?;
        self.hydrate(&self.clusters, |c: &Cluster| c.name.clone(), true).await?;
        self.hydrate(&self.devices, Device::natural_key, true).await?;
        self.hydrate(
            &self.virtual_device_contexts,
            VirtualDeviceContext::natural_key,
            true,
        )
        .await?;
        self.hydrate(&self.interfaces, Interface::natural_key, true).await?;
        self.hydrate(&self.ip_addresses, |ip: &IPAddress| ip.address.clone(), true)
            .await?;
        self.hydrate(&self.vlan_groups, |g: &VlanGroup| g.name.clone(), true)
            .await?;
        self.init_default_vlan_group().await?;
        self.hydrate(&self.prefixes, |p: &Prefix| p.prefix.clone(), true).await?;
        self.hydrate(&self.vlans, Vlan::natural_key, true).await?;
        self.hydrate(&self.vms, Vm::natural_key, true).await?;
        self.hydrate(&self.vm_interfaces, VmInterface::natural_key, true).await?;
        self.hydrate(
            &self.wireless_lan_groups,
            |g: &WirelessLanGroup| g.name.clone(),
            true,
        )
        .await?;
        self.hydrate(&self.wireless_lans, |w: &WirelessLan| w.ssid.clone(), true)
            .await?;

        self.hydrate(&self.contact_groups, |g: &ContactGroup| g.name.clone(), true)
            .await?;
        self.hydrate(&self.contact_roles, |r: &ContactRole| r.name.clone(), true)
            .await?;
        self.init_admin_contact_role().await?;
        self.hydrate(&self.contacts, |c: &Contact| c.name.clone(), true).await?;
        self.hydrate(
            &self.contact_assignments,
            ContactAssignment::index_key,
            true,
        )
        .await?;

        let devices = self.devices.len().await;
        let vms = self.vms.len().await;
        let ip_addresses = self.ip_addresses.len().await;
        info!(devices, vms, ip_addresses, "inventory hydrated");
        Ok(())
    }

    async fn hydrate<K, E, F>(
        &self,
        index: &FamilyIndex<K, E>,
        key_of: F,
        orphan_candidates: bool,
    ) -> Result<(), InventoryError>
    where
        K: Eq + Hash + Clone,
        E: NetboxEntity,
        F: Fn(&E) -> K,
    {
        let items = self
            .client
            .list_all::<E>()
            .await
            .map_err(|e| InventoryError::new(index.family, "init", e))?;
        let ssot_id = self.ssot_tag.get().map(|t| t.id());
        let mut guard = index.map.lock().await;
        let mut orphans = self.orphans.lock().await;
        for item in items {
            let key = key_of(&item);
            let arc = Arc::new(item);
            if orphan_candidates {
                if let Some(tag_id) = ssot_id {
                    if arc.base().has_tag(tag_id) {
                        orphans.add_candidate(Box::new(arc.clone()));
                    }
                }
            }
            guard.insert(key, arc);
        }
        Ok(())
    }

    async fn init_ssot_tags(&self) -> Result<(), InventoryError> {
        let ssot = self
            .add_tag(Tag {
                base: NetboxObject {
                    description: "Tag applied to every object managed by nbsync".into(),
                    ..Default::default()
                },
                name: self.ssot_tag_name.clone(),
                slug: slugify(&self.ssot_tag_name),
                color: self.ssot_tag_color.clone(),
            })
            .await?;
        self.ssot_tag.set(ssot).ok();

        let orphan = self
            .add_tag(Tag {
                base: NetboxObject {
                    description: "Managed object no longer present in any source".into(),
                    ..Default::default()
                },
                name: ORPHAN_TAG_NAME.into(),
                slug: slugify(ORPHAN_TAG_NAME),
                color: ORPHAN_TAG_COLOR.into(),
            })
            .await?;
        self.orphan_tag.set(orphan).ok();
        Ok(())
    }

    async fn init_ssot_custom_fields(&self) -> Result<(), InventoryError> {
        let content_types: Vec<String> = managed_content_types();
        let fields = [
            CustomField::reserved(
                CF_SOURCE_NAME,
                "Source name",
                CustomFieldType::Text,
                content_types.clone(),
                "Name of the source this object was last seen on",
            ),
            CustomField::reserved(
                CF_SOURCE_ID,
                "Source ID",
                CustomFieldType::Text,
                content_types.clone(),
                "Identifier of this object in its source system",
            ),
            CustomField::reserved(
                CF_LAST_SEEN,
                "Last seen",
                CustomFieldType::Date,
                content_types.clone(),
                "Date this object was last seen by nbsync",
            ),
            CustomField::reserved(
                CF_ORPHANED_SINCE,
                "Orphaned since",
                CustomFieldType::Date,
                content_types,
                "Date this object was first marked as an orphan",
            ),
        ];
        for field in fields {
            self.add_custom_field(field).await?;
        }
        Ok(())
    }

    async fn init_default_site(&self) -> Result<(), InventoryError> {
        let site = self
            .add_site(Site {
                base: NetboxObject {
                    description: "Fallback site for objects without a site relation".into(),
                    ..Default::default()
                },
                name: DEFAULT_SITE_NAME.into(),
                slug: slugify(DEFAULT_SITE_NAME),
                status: Some(SiteStatus::Active),
                ..Default::default()
            })
            .await?;
        self.default_site.set(site).ok();
        Ok(())
    }

    async fn init_default_vlan_group(&self) -> Result<(), InventoryError> {
        let group = self
            .add_vlan_group(VlanGroup {
                base: NetboxObject {
                    description: "Fallback VLAN group for VLANs without a group relation".into(),
                    ..Default::default()
                },
                name: DEFAULT_VLAN_GROUP_NAME.into(),
                slug: slugify(DEFAULT_VLAN_GROUP_NAME),
                vid_ranges: vec![[DEFAULT_VID, MAX_VID]],
                ..Default::default()
            })
            .await?;
        self.default_vlan_group.set(group).ok();
        Ok(())
    }

    async fn init_admin_contact_role(&self) -> Result<(), InventoryError> {
        let role = self
            .add_contact_role(ContactRole {
                base: NetboxObject::default(),
                name: ADMIN_CONTACT_ROLE_NAME.into(),
                slug: slugify(ADMIN_CONTACT_ROLE_NAME),
            })
            .await?;
        self.admin_contact_role.set(role).ok();
        Ok(())
    }
}

/// Content types the reserved custom fields attach to: every managed
/// family that supports custom fields.
fn managed_content_types() -> Vec<String> {
    [
        Tenant::OBJECT_TYPE,
        Contact::OBJECT_TYPE,
        ContactGroup::OBJECT_TYPE,
        ContactRole::OBJECT_TYPE,
        ContactAssignment::OBJECT_TYPE,
        Site::OBJECT_TYPE,
        Manufacturer::OBJECT_TYPE,
        Platform::OBJECT_TYPE,
        DeviceRole::OBJECT_TYPE,
        DeviceType::OBJECT_TYPE,
        Device::OBJECT_TYPE,
        VirtualDeviceContext::OBJECT_TYPE,
        Interface::OBJECT_TYPE,
        IPAddress::OBJECT_TYPE,
        Prefix::OBJECT_TYPE,
        VlanGroup::OBJECT_TYPE,
        Vlan::OBJECT_TYPE,
        ClusterGroup::OBJECT_TYPE,
        ClusterType::OBJECT_TYPE,
        Cluster::OBJECT_TYPE,
        Vm::OBJECT_TYPE,
        VmInterface::OBJECT_TYPE,
        WirelessLanGroup::OBJECT_TYPE,
        WirelessLan::OBJECT_TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl ContactAssignment {
    /// Index key: (content type, object id, contact id, role id).
    pub fn index_key(&self) -> (String, Id, Id, Id) {
        (
            self.object_type.clone(),
            self.object_id,
            self.contact.as_ref().map(|c| c.id()).unwrap_or_default(),
            self.role.as_ref().map(|r| r.id()).unwrap_or_default(),
        )
    }
}
