//! Virtualization: clusters and virtual machines.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::dcim::{DeviceRole, Platform, Site};
use super::ipam::{IPAddress, Vlan};
use super::tenancy::Tenant;
use super::{choice_opt, fk_list_wire, fk_wire, null_default, Id, JsonMap, NetboxEntity, NetboxObject};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterGroup {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl NetboxEntity for ClusterGroup {
    const API_PATH: &'static str = "/api/virtualization/cluster-groups/";
    const OBJECT_TYPE: &'static str = "virtualization.clustergroup";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("name".into(), json!(self.name));
        map.insert("slug".into(), json!(self.slug));
        map
    }
}

/// Technology backing a cluster (oVirt, VMware vSphere, Proxmox, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterType {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl NetboxEntity for ClusterType {
    const API_PATH: &'static str = "/api/virtualization/cluster-types/";
    const OBJECT_TYPE: &'static str = "virtualization.clustertype";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("name".into(), json!(self.name));
        map.insert("slug".into(), json!(self.slug));
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Planned,
    Staging,
    Active,
    Decommissioning,
    Offline,
}

impl ClusterStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            ClusterStatus::Planned => "planned",
            ClusterStatus::Staging => "staging",
            ClusterStatus::Active => "active",
            ClusterStatus::Decommissioning => "decommissioning",
            ClusterStatus::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cluster {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub cluster_type: Option<Arc<ClusterType>>,
    #[serde(default)]
    pub group: Option<Arc<ClusterGroup>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<ClusterStatus>,
    #[serde(default)]
    pub site: Option<Arc<Site>>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
}

impl NetboxEntity for Cluster {
    const API_PATH: &'static str = "/api/virtualization/clusters/";
    const OBJECT_TYPE: &'static str = "virtualization.cluster";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("name".into(), json!(self.name));
        map.insert("type".into(), fk_wire(&self.cluster_type));
        map.insert("group".into(), fk_wire(&self.group));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        map.insert("site".into(), fk_wire(&self.site));
        map.insert("tenant".into(), fk_wire(&self.tenant));
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    Offline,
    Active,
    Planned,
    Staged,
    Failed,
    Decommissioning,
}

impl VmStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            VmStatus::Offline => "offline",
            VmStatus::Active => "active",
            VmStatus::Planned => "planned",
            VmStatus::Staged => "staged",
            VmStatus::Failed => "failed",
            VmStatus::Decommissioning => "decommissioning",
        }
    }
}

/// A virtual machine. Memory is in MB, disk in GB.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vm {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster: Option<Arc<Cluster>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<VmStatus>,
    #[serde(default)]
    pub site: Option<Arc<Site>>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default)]
    pub platform: Option<Arc<Platform>>,
    #[serde(default, rename = "role")]
    pub role: Option<Arc<DeviceRole>>,
    #[serde(default, deserialize_with = "super::float_opt")]
    pub vcpus: Option<f64>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
    #[serde(default)]
    pub primary_ip4: Option<Arc<IPAddress>>,
    #[serde(default)]
    pub primary_ip6: Option<Arc<IPAddress>>,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: String,
}

impl NetboxEntity for Vm {
    const API_PATH: &'static str = "/api/virtualization/virtual-machines/";
    const OBJECT_TYPE: &'static str = "virtualization.virtualmachine";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("name".into(), json!(self.name));
        map.insert("cluster".into(), fk_wire(&self.cluster));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        map.insert("site".into(), fk_wire(&self.site));
        map.insert("tenant".into(), fk_wire(&self.tenant));
        map.insert("platform".into(), fk_wire(&self.platform));
        map.insert("role".into(), fk_wire(&self.role));
        if let Some(vcpus) = self.vcpus {
            map.insert("vcpus".into(), json!(vcpus));
        }
        if let Some(memory) = self.memory {
            map.insert("memory".into(), json!(memory));
        }
        if let Some(disk) = self.disk {
            map.insert("disk".into(), json!(disk));
        }
        map.insert("primary_ip4".into(), fk_wire(&self.primary_ip4));
        map.insert("primary_ip6".into(), fk_wire(&self.primary_ip6));
        if !self.comments.is_empty() {
            map.insert("comments".into(), json!(self.comments));
        }
        map
    }
}

impl Vm {
    /// Natural key: (name, cluster id).
    pub fn natural_key(&self) -> (String, Id) {
        (
            self.name.clone(),
            self.cluster.as_ref().map(|c| c.id()).unwrap_or_default(),
        )
    }
}

/// A network interface on a virtual machine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmInterface {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default, rename = "virtual_machine")]
    pub vm: Option<Arc<Vm>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default, deserialize_with = "null_default")]
    pub mac_address: String,
    #[serde(default, deserialize_with = "choice_opt")]
    pub mode: Option<super::dcim::InterfaceMode>,
    #[serde(default, deserialize_with = "null_default")]
    pub tagged_vlans: Vec<Arc<Vlan>>,
    #[serde(default)]
    pub untagged_vlan: Option<Arc<Vlan>>,
}

impl NetboxEntity for VmInterface {
    const API_PATH: &'static str = "/api/virtualization/interfaces/";
    const OBJECT_TYPE: &'static str = "virtualization.vminterface";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("virtual_machine".into(), fk_wire(&self.vm));
        map.insert("name".into(), json!(self.name));
        if let Some(enabled) = self.enabled {
            map.insert("enabled".into(), json!(enabled));
        }
        if let Some(mtu) = self.mtu {
            map.insert("mtu".into(), json!(mtu));
        }
        if !self.mac_address.is_empty() {
            map.insert("mac_address".into(), json!(self.mac_address));
        }
        if let Some(mode) = self.mode {
            map.insert("mode".into(), json!(mode.as_value()));
        }
        map.insert("tagged_vlans".into(), fk_list_wire(&self.tagged_vlans));
        map.insert("untagged_vlan".into(), fk_wire(&self.untagged_vlan));
        map
    }
}

impl VmInterface {
    /// Natural key: (vm id, name).
    pub fn natural_key(&self) -> (Id, String) {
        (
            self.vm.as_ref().map(|v| v.id()).unwrap_or_default(),
            self.name.clone(),
        )
    }
}
