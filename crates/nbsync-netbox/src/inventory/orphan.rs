//! Orphan tracking and deletion.
//!
//! Every managed object seen at hydration starts as an orphan candidate;
//! each upsert that touches it removes it again. Whatever is left at the
//! end of the run is deleted — hard (DELETE) or soft (orphan tag plus an
//! `orphaned_since` stamp, promoted to hard once the stamp is old enough).

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use nbsync_core::constants::CF_ORPHANED_SINCE;

use crate::objects::*;

use super::NetboxInventory;

/// A type-erased handle to an orphan candidate. The blanket impl over
/// `Arc<E>` gives every family the same patch/delete surface without a
/// per-family dispatch.
pub trait OrphanEntry: Send + Sync {
    fn id(&self) -> Id;
    fn api_path(&self) -> &'static str;
    fn base(&self) -> &NetboxObject;

    /// Patch body applying the orphan tag and stamping `orphaned_since`.
    fn orphan_patch(&self, orphan_tag: &Tag, today: &str) -> JsonMap {
        let base = self.base();
        let mut map = JsonMap::new();
        let mut ids: Vec<Id> = base.tags.iter().map(|t| t.base.id).collect();
        ids.push(orphan_tag.base.id);
        ids.sort_unstable();
        ids.dedup();
        map.insert(
            "tags".into(),
            Value::Array(ids.into_iter().map(|id| json!({ "id": id })).collect()),
        );
        let mut custom_fields = base.custom_fields.clone();
        custom_fields.insert(CF_ORPHANED_SINCE.into(), json!(today));
        map.insert("custom_fields".into(), Value::Object(custom_fields));
        map
    }
}

impl<E: NetboxEntity> OrphanEntry for std::sync::Arc<E> {
    fn id(&self) -> Id {
        NetboxEntity::id(&**self)
    }
    fn api_path(&self) -> &'static str {
        E::API_PATH
    }
    fn base(&self) -> &NetboxObject {
        NetboxEntity::base(&**self)
    }
}

/// Deletion order: children strictly before anything they reference.
pub const DELETE_ORDER: [&str; 25] = [
    ContactAssignment::API_PATH,
    IPAddress::API_PATH,
    VmInterface::API_PATH,
    Vm::API_PATH,
    Interface::API_PATH,
    VirtualDeviceContext::API_PATH,
    Device::API_PATH,
    WirelessLan::API_PATH,
    WirelessLanGroup::API_PATH,
    Vlan::API_PATH,
    Prefix::API_PATH,
    VlanGroup::API_PATH,
    Cluster::API_PATH,
    ClusterType::API_PATH,
    ClusterGroup::API_PATH,
    DeviceType::API_PATH,
    DeviceRole::API_PATH,
    Platform::API_PATH,
    Manufacturer::API_PATH,
    Contact::API_PATH,
    ContactRole::API_PATH,
    ContactGroup::API_PATH,
    Site::API_PATH,
    Tenant::API_PATH,
    TenantGroup::API_PATH,
];

/// Candidate set, keyed by API path then object id.
#[derive(Default)]
pub struct OrphanManager {
    items: HashMap<&'static str, HashMap<Id, Box<dyn OrphanEntry>>>,
}

impl OrphanManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candidate(&mut self, entry: Box<dyn OrphanEntry>) {
        self.items
            .entry(entry.api_path())
            .or_default()
            .insert(entry.id(), entry);
    }

    /// Called by every upsert: a touched object is not an orphan.
    pub fn mark_touched(&mut self, api_path: &'static str, id: Id) {
        if let Some(family) = self.items.get_mut(api_path) {
            family.remove(&id);
        }
    }

    pub fn contains(&self, api_path: &str, id: Id) -> bool {
        self.items
            .get(api_path)
            .is_some_and(|family| family.contains_key(&id))
    }

    pub fn len(&self) -> usize {
        self.items.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_family(&mut self, api_path: &str) -> Option<HashMap<Id, Box<dyn OrphanEntry>>> {
        self.items.remove(api_path)
    }
}

impl NetboxInventory {
    /// Number of orphan candidates currently tracked.
    pub async fn orphan_count(&self) -> usize {
        self.orphans.lock().await.len()
    }

    pub async fn is_orphan_candidate(&self, api_path: &str, id: Id) -> bool {
        self.orphans.lock().await.contains(api_path, id)
    }

    /// Delete (or mark) every remaining orphan, children before parents.
    /// Individual failures are logged and skipped; the next run retries.
    pub async fn delete_orphans(&self, hard: bool) {
        let today = Self::today();
        let orphan_tag = self.orphan_tag.get().cloned();
        let mut orphans = self.orphans.lock().await;
        for api_path in DELETE_ORDER {
            let Some(family) = orphans.take_family(api_path) else {
                continue;
            };
            if family.is_empty() {
                continue;
            }
            info!(
                family = api_path,
                count = family.len(),
                mode = if hard { "hard" } else { "soft" },
                "deleting orphaned objects"
            );
            for (id, entry) in family {
                if hard {
                    self.hard_delete(api_path, id).await;
                } else {
                    self.soft_delete(api_path, id, entry.as_ref(), orphan_tag.as_deref(), &today)
                        .await;
                }
            }
        }
    }

    async fn hard_delete(&self, api_path: &'static str, id: Id) {
        if let Err(e) = self.client.delete(api_path, id).await {
            error!(family = api_path, id, error = %e, "orphan deletion failed");
        }
    }

    async fn soft_delete(
        &self,
        api_path: &'static str,
        id: Id,
        entry: &dyn OrphanEntry,
        orphan_tag: Option<&Tag>,
        today: &str,
    ) {
        let Some(orphan_tag) = orphan_tag else {
            return;
        };
        let base = entry.base();
        if !base.has_tag(orphan_tag.base.id) {
            let patch = entry.orphan_patch(orphan_tag, today);
            if let Err(e) = self.client.patch_raw(api_path, id, &patch).await {
                error!(family = api_path, id, error = %e, "orphan tagging failed");
            }
            return;
        }
        // Already marked: promote to hard delete once the stamp is older
        // than the configured window.
        let since = base
            .custom_str(CF_ORPHANED_SINCE)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        let today_date = NaiveDate::parse_from_str(today, "%Y-%m-%d").ok();
        match (since, today_date) {
            (Some(since), Some(now))
                if (now - since).num_days() > i64::from(self.remove_orphans_after_days) =>
            {
                debug!(family = api_path, id, %since, "promoting orphan to hard delete");
                self.hard_delete(api_path, id).await;
            }
            _ => debug!(family = api_path, id, "already marked as orphan"),
        }
    }
}
