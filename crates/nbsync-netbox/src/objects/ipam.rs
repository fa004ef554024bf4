//! IPAM: addresses, prefixes, VLANs and VLAN groups.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::dcim::Site;
use super::tenancy::Tenant;
use super::{choice_opt, fk_wire, null_default, Id, JsonMap, NetboxEntity, NetboxObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IPAddressStatus {
    Active,
    Reserved,
    Dhcp,
    Slaac,
    Deprecated,
}

impl IPAddressStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            IPAddressStatus::Active => "active",
            IPAddressStatus::Reserved => "reserved",
            IPAddressStatus::Dhcp => "dhcp",
            IPAddressStatus::Slaac => "slaac",
            IPAddressStatus::Deprecated => "deprecated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IPAddressRole {
    Loopback,
    Secondary,
    Anycast,
    Vip,
    Vrrp,
    Hsrp,
    Glbp,
    Carp,
}

impl IPAddressRole {
    pub fn as_value(&self) -> &'static str {
        match self {
            IPAddressRole::Loopback => "loopback",
            IPAddressRole::Secondary => "secondary",
            IPAddressRole::Anycast => "anycast",
            IPAddressRole::Vip => "vip",
            IPAddressRole::Vrrp => "vrrp",
            IPAddressRole::Hsrp => "hsrp",
            IPAddressRole::Glbp => "glbp",
            IPAddressRole::Carp => "carp",
        }
    }
}

/// An IPv4 or IPv6 address with mask. Assignment to an interface is
/// polymorphic: a content type (`dcim.interface` or
/// `virtualization.vminterface`) plus the object's id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IPAddress {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<IPAddressStatus>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub role: Option<IPAddressRole>,
    #[serde(default, deserialize_with = "null_default")]
    pub dns_name: String,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default)]
    pub assigned_object_type: Option<String>,
    #[serde(default)]
    pub assigned_object_id: Option<Id>,
}

impl NetboxEntity for IPAddress {
    const API_PATH: &'static str = "/api/ipam/ip-addresses/";
    const OBJECT_TYPE: &'static str = "ipam.ipaddress";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("address".into(), json!(self.address));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        if let Some(role) = self.role {
            map.insert("role".into(), json!(role.as_value()));
        }
        if !self.dns_name.is_empty() {
            map.insert("dns_name".into(), json!(self.dns_name));
        }
        map.insert("tenant".into(), fk_wire(&self.tenant));
        map.insert(
            "assigned_object_type".into(),
            self.assigned_object_type.as_deref().map_or(serde_json::Value::Null, |t| json!(t)),
        );
        map.insert(
            "assigned_object_id".into(),
            self.assigned_object_id.map_or(serde_json::Value::Null, |id| json!(id)),
        );
        map
    }
}

/// Inclusive VID range, serialized as a two-element array.
pub type VidRange = [u16; 2];

/// Groups VLANs into a numbering domain, optionally scoped to a site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VlanGroup {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, deserialize_with = "null_default")]
    pub vid_ranges: Vec<VidRange>,
    #[serde(default)]
    pub scope_type: Option<String>,
    #[serde(default)]
    pub scope_id: Option<Id>,
}

impl NetboxEntity for VlanGroup {
    const API_PATH: &'static str = "/api/ipam/vlan-groups/";
    const OBJECT_TYPE: &'static str = "ipam.vlangroup";

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
        if !self.vid_ranges.is_empty() {
            map.insert("vid_ranges".into(), json!(self.vid_ranges));
        }
        if let Some(ref scope_type) = self.scope_type {
            map.insert("scope_type".into(), json!(scope_type));
            map.insert(
                "scope_id".into(),
                self.scope_id.map_or(serde_json::Value::Null, |id| json!(id)),
            );
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanStatus {
    Active,
    Reserved,
    Deprecated,
}

impl VlanStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            VlanStatus::Active => "active",
            VlanStatus::Reserved => "reserved",
            VlanStatus::Deprecated => "deprecated",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vlan {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vid: u16,
    #[serde(default)]
    pub group: Option<Arc<VlanGroup>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<VlanStatus>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default)]
    pub site: Option<Arc<Site>>,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: String,
}

impl NetboxEntity for Vlan {
    const API_PATH: &'static str = "/api/ipam/vlans/";
    const OBJECT_TYPE: &'static str = "ipam.vlan";

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
        map.insert("vid".into(), json!(self.vid));
        map.insert("group".into(), fk_wire(&self.group));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        map.insert("tenant".into(), fk_wire(&self.tenant));
        map.insert("site".into(), fk_wire(&self.site));
        if !self.comments.is_empty() {
            map.insert("comments".into(), json!(self.comments));
        }
        map
    }
}

impl Vlan {
    /// Natural key: (group id, vid).
    pub fn natural_key(&self) -> (Id, u16) {
        (
            self.group.as_ref().map(|g| g.id()).unwrap_or_default(),
            self.vid,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixStatus {
    Container,
    Active,
    Reserved,
    Deprecated,
}

impl PrefixStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            PrefixStatus::Container => "container",
            PrefixStatus::Active => "active",
            PrefixStatus::Reserved => "reserved",
            PrefixStatus::Deprecated => "deprecated",
        }
    }
}

/// A network prefix, optionally scoped (site) and bound to a VLAN.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Prefix {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub prefix: String,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<PrefixStatus>,
    #[serde(default)]
    pub scope_type: Option<String>,
    #[serde(default)]
    pub scope_id: Option<Id>,
    #[serde(default)]
    pub vlan: Option<Arc<Vlan>>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: String,
}

impl NetboxEntity for Prefix {
    const API_PATH: &'static str = "/api/ipam/prefixes/";
    const OBJECT_TYPE: &'static str = "ipam.prefix";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("prefix".into(), json!(self.prefix));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        if let Some(ref scope_type) = self.scope_type {
            map.insert("scope_type".into(), json!(scope_type));
            map.insert(
                "scope_id".into(),
                self.scope_id.map_or(serde_json::Value::Null, |id| json!(id)),
            );
        }
        map.insert("vlan".into(), fk_wire(&self.vlan));
        map.insert("tenant".into(), fk_wire(&self.tenant));
        if !self.comments.is_empty() {
            map.insert("comments".into(), json!(self.comments));
        }
        map
    }
}
