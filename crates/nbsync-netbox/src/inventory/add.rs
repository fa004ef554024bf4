//! Per-family upsert and lookup operations.
//!
//! Every `add_*` follows the same recipe: normalize the draft (managed
//! tag, slug, freshness custom fields, description limit), take the
//! family lock, and either create the object or merge it into the stored
//! one by source priority, PATCHing only when the diff is non-empty.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use nbsync_core::constants::{
    CF_LAST_SEEN, CF_ORPHANED_SINCE, MAX_DESCRIPTION_LEN, SEE_COMMENTS,
};
use nbsync_core::slugify;

use crate::diff::{diff_wire_maps, lower_for_create, merge_wire_maps, references_unpersisted};
use crate::error::{InventoryError, RemoteError};
use crate::objects::*;

use super::{FamilyIndex, NetboxInventory};

impl NetboxInventory {
    /// The shared upsert recipe. Holds the family lock across the remote
    /// call so the diff → call → index update sequence is atomic per key.
    async fn upsert<K, E>(
        &self,
        index: &FamilyIndex<K, E>,
        key: K,
        draft: E,
    ) -> Result<Arc<E>, InventoryError>
    where
        K: Eq + Hash + Clone + Debug,
        E: NetboxEntity,
    {
        let draft_wire = draft.to_wire();
        if references_unpersisted(&draft_wire) {
            return Err(InventoryError::new(
                index.family,
                &key,
                RemoteError::Configuration(
                    "draft references an object that was never persisted (id 0)".into(),
                ),
            ));
        }

        let orphan_tag_id = self.orphan_tag.get().map(|t| t.id());
        let mut guard = index.map.lock().await;
        let result = match guard.get(&key).cloned() {
            None => {
                let body = lower_for_create(&draft_wire);
                let created: E = self
                    .client
                    .create(&body)
                    .await
                    .map_err(|e| InventoryError::new(index.family, &key, e))?;
                debug!(family = index.family, key = ?key, id = created.id(), "created");
                let arc = Arc::new(created);
                guard.insert(key, arc.clone());
                arc
            }
            Some(existing) => {
                let existing_wire = existing.to_wire();
                let draft_wins =
                    self.priority_of(draft.base()) <= self.priority_of(existing.base());
                let desired =
                    merge_wire_maps(&existing_wire, &draft_wire, draft_wins, orphan_tag_id);
                let patch = diff_wire_maps(&desired, &existing_wire);
                if patch.is_empty() {
                    trace!(family = index.family, key = ?key, "no change");
                    existing
                } else {
                    let updated: E = self
                        .client
                        .patch(existing.id(), &patch)
                        .await
                        .map_err(|e| InventoryError::new(index.family, &key, e))?;
                    debug!(
                        family = index.family,
                        key = ?key,
                        id = updated.id(),
                        fields = patch.len(),
                        "patched"
                    );
                    let arc = Arc::new(updated);
                    guard.insert(key, arc.clone());
                    arc
                }
            }
        };
        self.orphans.lock().await.mark_touched(E::API_PATH, result.id());
        Ok(result)
    }

    /// Normalization shared by every managed family: the managed-by tag,
    /// fresh `last_seen`, a cleared `orphaned_since`, and the description
    /// length limit. Returns overflow text for families with a comments
    /// field.
    fn normalize(&self, base: &mut NetboxObject) -> Option<String> {
        if let Some(tag) = self.ssot_tag.get() {
            base.add_tag(tag.clone());
        }
        if let Some(orphan) = self.orphan_tag.get() {
            base.remove_tag(orphan.id());
        }
        base.set_custom(CF_LAST_SEEN, Value::String(Self::today()));
        base.set_custom(CF_ORPHANED_SINCE, Value::Null);
        if base.description.chars().count() > MAX_DESCRIPTION_LEN {
            let full = std::mem::replace(&mut base.description, SEE_COMMENTS.to_string());
            Some(full)
        } else {
            None
        }
    }

    fn fill_slug(slug: &mut String, name: &str) {
        if slug.is_empty() {
            *slug = slugify(name);
        }
    }

    // ------------------------------------------------------------------
    // extras
    // ------------------------------------------------------------------

    /// Tags are infrastructure: no managed tag or custom fields on them.
    pub async fn add_tag(&self, mut draft: Tag) -> Result<Arc<Tag>, InventoryError> {
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.tags, key, draft).await
    }

    pub async fn get_tag(&self, name: &str) -> Option<Arc<Tag>> {
        self.tags.get(&name.to_string()).await
    }

    /// Custom field definitions are infrastructure too.
    pub async fn add_custom_field(
        &self,
        draft: CustomField,
    ) -> Result<Arc<CustomField>, InventoryError> {
        let key = draft.name.clone();
        self.upsert(&self.custom_fields, key, draft).await
    }

    pub async fn get_custom_field(&self, name: &str) -> Option<Arc<CustomField>> {
        self.custom_fields.get(&name.to_string()).await
    }

    // ------------------------------------------------------------------
    // tenancy
    // ------------------------------------------------------------------

    pub async fn add_tenant_group(
        &self,
        mut draft: TenantGroup,
    ) -> Result<Arc<TenantGroup>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.tenant_groups, key, draft).await
    }

    pub async fn add_tenant(&self, mut draft: Tenant) -> Result<Arc<Tenant>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.tenants, key, draft).await
    }

    pub async fn get_tenant(&self, name: &str) -> Option<Arc<Tenant>> {
        self.tenants.get(&name.to_string()).await
    }

    pub async fn add_contact_group(
        &self,
        mut draft: ContactGroup,
    ) -> Result<Arc<ContactGroup>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.contact_groups, key, draft).await
    }

    pub async fn get_contact_group(&self, name: &str) -> Option<Arc<ContactGroup>> {
        self.contact_groups.get(&name.to_string()).await
    }

    pub async fn add_contact_role(
        &self,
        mut draft: ContactRole,
    ) -> Result<Arc<ContactRole>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.contact_roles, key, draft).await
    }

    pub async fn get_contact_role(&self, name: &str) -> Option<Arc<ContactRole>> {
        self.contact_roles.get(&name.to_string()).await
    }

    pub async fn add_contact(&self, mut draft: Contact) -> Result<Arc<Contact>, InventoryError> {
        if let Some(overflow) = self.normalize(&mut draft.base) {
            if draft.comments.is_empty() {
                draft.comments = overflow;
            }
        }
        let key = draft.name.clone();
        self.upsert(&self.contacts, key, draft).await
    }

    pub async fn get_contact(&self, name: &str) -> Option<Arc<Contact>> {
        self.contacts.get(&name.to_string()).await
    }

    pub async fn add_contact_assignment(
        &self,
        mut draft: ContactAssignment,
    ) -> Result<Arc<ContactAssignment>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.index_key();
        self.upsert(&self.contact_assignments, key, draft).await
    }

    // ------------------------------------------------------------------
    // dcim
    // ------------------------------------------------------------------

    pub async fn add_site(&self, mut draft: Site) -> Result<Arc<Site>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.sites, key, draft).await
    }

    pub async fn get_site(&self, name: &str) -> Option<Arc<Site>> {
        self.sites.get(&name.to_string()).await
    }

    pub async fn add_manufacturer(
        &self,
        mut draft: Manufacturer,
    ) -> Result<Arc<Manufacturer>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.manufacturers, key, draft).await
    }

    pub async fn get_manufacturer(&self, name: &str) -> Option<Arc<Manufacturer>> {
        self.manufacturers.get(&name.to_string()).await
    }

    pub async fn add_platform(&self, mut draft: Platform) -> Result<Arc<Platform>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.platforms, key, draft).await
    }

    pub async fn get_platform(&self, name: &str) -> Option<Arc<Platform>> {
        self.platforms.get(&name.to_string()).await
    }

    pub async fn add_device_role(
        &self,
        mut draft: DeviceRole,
    ) -> Result<Arc<DeviceRole>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.device_roles, key, draft).await
    }

    pub async fn get_device_role(&self, name: &str) -> Option<Arc<DeviceRole>> {
        self.device_roles.get(&name.to_string()).await
    }

    pub async fn add_device_type(
        &self,
        mut draft: DeviceType,
    ) -> Result<Arc<DeviceType>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.model);
        let key = draft.model.clone();
        self.upsert(&self.device_types, key, draft).await
    }

    pub async fn get_device_type(&self, model: &str) -> Option<Arc<DeviceType>> {
        self.device_types.get(&model.to_string()).await
    }

    pub async fn add_device(&self, mut draft: Device) -> Result<Arc<Device>, InventoryError> {
        if let Some(overflow) = self.normalize(&mut draft.base) {
            if draft.comments.is_empty() {
                draft.comments = overflow;
            }
        }
        let key = draft.natural_key();
        self.upsert(&self.devices, key, draft).await
    }

    pub async fn get_device(&self, name: &str, site_id: Id) -> Option<Arc<Device>> {
        self.devices.get(&(name.to_string(), site_id)).await
    }

    pub async fn add_virtual_device_context(
        &self,
        mut draft: VirtualDeviceContext,
    ) -> Result<Arc<VirtualDeviceContext>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.natural_key();
        self.upsert(&self.virtual_device_contexts, key, draft).await
    }

    pub async fn get_virtual_device_context(
        &self,
        name: &str,
        device_id: Id,
    ) -> Option<Arc<VirtualDeviceContext>> {
        self.virtual_device_contexts
            .get(&(name.to_string(), device_id))
            .await
    }

    pub async fn add_interface(
        &self,
        mut draft: Interface,
    ) -> Result<Arc<Interface>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.natural_key();
        self.upsert(&self.interfaces, key, draft).await
    }

    pub async fn get_interface(&self, device_id: Id, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.get(&(device_id, name.to_string())).await
    }

    // ------------------------------------------------------------------
    // ipam
    // ------------------------------------------------------------------

    pub async fn add_ip_address(
        &self,
        mut draft: IPAddress,
    ) -> Result<Arc<IPAddress>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.address.clone();
        self.upsert(&self.ip_addresses, key, draft).await
    }

    pub async fn get_ip_address(&self, address: &str) -> Option<Arc<IPAddress>> {
        self.ip_addresses.get(&address.to_string()).await
    }

    pub async fn add_vlan_group(
        &self,
        mut draft: VlanGroup,
    ) -> Result<Arc<VlanGroup>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.vlan_groups, key, draft).await
    }

    pub async fn get_vlan_group(&self, name: &str) -> Option<Arc<VlanGroup>> {
        self.vlan_groups.get(&name.to_string()).await
    }

    pub async fn add_vlan(&self, mut draft: Vlan) -> Result<Arc<Vlan>, InventoryError> {
        if let Some(overflow) = self.normalize(&mut draft.base) {
            if draft.comments.is_empty() {
                draft.comments = overflow;
            }
        }
        let key = draft.natural_key();
        self.upsert(&self.vlans, key, draft).await
    }

    pub async fn get_vlan(&self, group_id: Id, vid: u16) -> Option<Arc<Vlan>> {
        self.vlans.get(&(group_id, vid)).await
    }

    pub async fn add_prefix(&self, mut draft: Prefix) -> Result<Arc<Prefix>, InventoryError> {
        if let Some(overflow) = self.normalize(&mut draft.base) {
            if draft.comments.is_empty() {
                draft.comments = overflow;
            }
        }
        let key = draft.prefix.clone();
        self.upsert(&self.prefixes, key, draft).await
    }

    pub async fn get_prefix(&self, prefix: &str) -> Option<Arc<Prefix>> {
        self.prefixes.get(&prefix.to_string()).await
    }

    // ------------------------------------------------------------------
    // virtualization
    // ------------------------------------------------------------------

    pub async fn add_cluster_group(
        &self,
        mut draft: ClusterGroup,
    ) -> Result<Arc<ClusterGroup>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.cluster_groups, key, draft).await
    }

    pub async fn get_cluster_group(&self, name: &str) -> Option<Arc<ClusterGroup>> {
        self.cluster_groups.get(&name.to_string()).await
    }

    pub async fn add_cluster_type(
        &self,
        mut draft: ClusterType,
    ) -> Result<Arc<ClusterType>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.cluster_types, key, draft).await
    }

    pub async fn get_cluster_type(&self, name: &str) -> Option<Arc<ClusterType>> {
        self.cluster_types.get(&name.to_string()).await
    }

    pub async fn add_cluster(&self, mut draft: Cluster) -> Result<Arc<Cluster>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.name.clone();
        self.upsert(&self.clusters, key, draft).await
    }

    pub async fn get_cluster(&self, name: &str) -> Option<Arc<Cluster>> {
        self.clusters.get(&name.to_string()).await
    }

    pub async fn add_vm(&self, mut draft: Vm) -> Result<Arc<Vm>, InventoryError> {
        if let Some(overflow) = self.normalize(&mut draft.base) {
            if draft.comments.is_empty() {
                draft.comments = overflow;
            }
        }
        let key = draft.natural_key();
        self.upsert(&self.vms, key, draft).await
    }

    pub async fn get_vm(&self, name: &str, cluster_id: Id) -> Option<Arc<Vm>> {
        self.vms.get(&(name.to_string(), cluster_id)).await
    }

    pub async fn add_vm_interface(
        &self,
        mut draft: VmInterface,
    ) -> Result<Arc<VmInterface>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.natural_key();
        self.upsert(&self.vm_interfaces, key, draft).await
    }

    pub async fn get_vm_interface(&self, vm_id: Id, name: &str) -> Option<Arc<VmInterface>> {
        self.vm_interfaces.get(&(vm_id, name.to_string())).await
    }

    // ------------------------------------------------------------------
    // wireless
    // ------------------------------------------------------------------

    pub async fn add_wireless_lan_group(
        &self,
        mut draft: WirelessLanGroup,
    ) -> Result<Arc<WirelessLanGroup>, InventoryError> {
        self.normalize(&mut draft.base);
        Self::fill_slug(&mut draft.slug, &draft.name);
        let key = draft.name.clone();
        self.upsert(&self.wireless_lan_groups, key, draft).await
    }

    pub async fn get_wireless_lan_group(&self, name: &str) -> Option<Arc<WirelessLanGroup>> {
        self.wireless_lan_groups.get(&name.to_string()).await
    }

    pub async fn add_wireless_lan(
        &self,
        mut draft: WirelessLan,
    ) -> Result<Arc<WirelessLan>, InventoryError> {
        self.normalize(&mut draft.base);
        let key = draft.ssid.clone();
        self.upsert(&self.wireless_lans, key, draft).await
    }

    pub async fn get_wireless_lan(&self, ssid: &str) -> Option<Arc<WirelessLan>> {
        self.wireless_lans.get(&ssid.to_string()).await
    }
}
