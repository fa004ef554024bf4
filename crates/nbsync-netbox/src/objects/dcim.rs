//! DCIM: sites, device hardware, and physical interfaces.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::ipam::{IPAddress, Vlan};
use super::tenancy::Tenant;
use super::virtualization::Cluster;
use super::{choice_opt, fk_list_wire, fk_wire, null_default, Id, JsonMap, NetboxEntity, NetboxObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Active,
    Offline,
    Planned,
    Staged,
    Failed,
    Inventory,
    Decommissioning,
}

impl SiteStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            SiteStatus::Active => "active",
            SiteStatus::Offline => "offline",
            SiteStatus::Planned => "planned",
            SiteStatus::Staged => "staged",
            SiteStatus::Failed => "failed",
            SiteStatus::Inventory => "inventory",
            SiteStatus::Decommissioning => "decommissioning",
        }
    }
}

/// A site groups devices, usually one building or datacenter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Site {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<SiteStatus>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default, deserialize_with = "null_default")]
    pub physical_address: String,
    #[serde(default, deserialize_with = "super::float_opt")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "super::float_opt")]
    pub longitude: Option<f64>,
}

impl NetboxEntity for Site {
    const API_PATH: &'static str = "/api/dcim/sites/";
    const OBJECT_TYPE: &'static str = "dcim.site";

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
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        map.insert("tenant".into(), fk_wire(&self.tenant));
        if !self.physical_address.is_empty() {
            map.insert("physical_address".into(), json!(self.physical_address));
        }
        if let Some(latitude) = self.latitude {
            map.insert("latitude".into(), json!(latitude));
        }
        if let Some(longitude) = self.longitude {
            map.insert("longitude".into(), json!(longitude));
        }
        map
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manufacturer {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl NetboxEntity for Manufacturer {
    const API_PATH: &'static str = "/api/dcim/manufacturers/";
    const OBJECT_TYPE: &'static str = "dcim.manufacturer";

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

/// Operating system or firmware platform running on a device or VM.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Platform {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub manufacturer: Option<Arc<Manufacturer>>,
}

impl NetboxEntity for Platform {
    const API_PATH: &'static str = "/api/dcim/platforms/";
    const OBJECT_TYPE: &'static str = "dcim.platform";

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
        map.insert("manufacturer".into(), fk_wire(&self.manufacturer));
        map
    }
}

/// Functional role of a device or VM (router, firewall, hypervisor, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceRole {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, deserialize_with = "null_default")]
    pub color: String,
    #[serde(default)]
    pub vm_role: bool,
}

impl NetboxEntity for DeviceRole {
    const API_PATH: &'static str = "/api/dcim/device-roles/";
    const OBJECT_TYPE: &'static str = "dcim.devicerole";

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
        if !self.color.is_empty() {
            map.insert("color".into(), json!(self.color));
        }
        if self.vm_role {
            map.insert("vm_role".into(), json!(self.vm_role));
        }
        map
    }
}

/// Hardware model; the natural key is the model string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceType {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub manufacturer: Option<Arc<Manufacturer>>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub slug: String,
}

impl NetboxEntity for DeviceType {
    const API_PATH: &'static str = "/api/dcim/device-types/";
    const OBJECT_TYPE: &'static str = "dcim.devicetype";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("manufacturer".into(), fk_wire(&self.manufacturer));
        map.insert("model".into(), json!(self.model));
        map.insert("slug".into(), json!(self.slug));
        map
    }
}

pub type DeviceStatus = SiteStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceAirflow {
    #[serde(rename = "front-to-rear")]
    FrontToRear,
    #[serde(rename = "rear-to-front")]
    RearToFront,
    #[serde(rename = "left-to-right")]
    LeftToRight,
    #[serde(rename = "right-to-left")]
    RightToLeft,
    #[serde(rename = "side-to-rear")]
    SideToRear,
    #[serde(rename = "passive")]
    Passive,
    #[serde(rename = "mixed")]
    Mixed,
}

impl DeviceAirflow {
    pub fn as_value(&self) -> &'static str {
        match self {
            DeviceAirflow::FrontToRear => "front-to-rear",
            DeviceAirflow::RearToFront => "rear-to-front",
            DeviceAirflow::LeftToRight => "left-to-right",
            DeviceAirflow::RightToLeft => "right-to-left",
            DeviceAirflow::SideToRear => "side-to-rear",
            DeviceAirflow::Passive => "passive",
            DeviceAirflow::Mixed => "mixed",
        }
    }
}

/// Any piece of physical hardware: hypervisor host, switch, firewall.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Device {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "role")]
    pub device_role: Option<Arc<DeviceRole>>,
    #[serde(default)]
    pub device_type: Option<Arc<DeviceType>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub airflow: Option<DeviceAirflow>,
    #[serde(default, deserialize_with = "null_default", rename = "serial")]
    pub serial_number: String,
    #[serde(default, deserialize_with = "null_default")]
    pub asset_tag: String,
    #[serde(default)]
    pub site: Option<Arc<Site>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<DeviceStatus>,
    #[serde(default)]
    pub platform: Option<Arc<Platform>>,
    #[serde(default)]
    pub primary_ip4: Option<Arc<IPAddress>>,
    #[serde(default)]
    pub primary_ip6: Option<Arc<IPAddress>>,
    #[serde(default)]
    pub cluster: Option<Arc<Cluster>>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: String,
}

impl NetboxEntity for Device {
    const API_PATH: &'static str = "/api/dcim/devices/";
    const OBJECT_TYPE: &'static str = "dcim.device";

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
        map.insert("role".into(), fk_wire(&self.device_role));
        map.insert("device_type".into(), fk_wire(&self.device_type));
        if let Some(airflow) = self.airflow {
            map.insert("airflow".into(), json!(airflow.as_value()));
        }
        if !self.serial_number.is_empty() {
            map.insert("serial".into(), json!(self.serial_number));
        }
        if !self.asset_tag.is_empty() {
            map.insert("asset_tag".into(), json!(self.asset_tag));
        }
        map.insert("site".into(), fk_wire(&self.site));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        map.insert("platform".into(), fk_wire(&self.platform));
        map.insert("primary_ip4".into(), fk_wire(&self.primary_ip4));
        map.insert("primary_ip6".into(), fk_wire(&self.primary_ip6));
        map.insert("cluster".into(), fk_wire(&self.cluster));
        map.insert("tenant".into(), fk_wire(&self.tenant));
        if !self.comments.is_empty() {
            map.insert("comments".into(), json!(self.comments));
        }
        map
    }
}

impl Device {
    /// Natural key: (name, site id).
    pub fn natural_key(&self) -> (String, Id) {
        (
            self.name.clone(),
            self.site.as_ref().map(|s| s.id()).unwrap_or_default(),
        )
    }
}

/// A physical interface type: the wire value plus its display label.
///
/// The catalog is large and data-like, so it is carried as constants over a
/// `Cow` pair rather than an enum; values NetBox knows but this catalog
/// does not survive deserialization unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceType {
    pub value: Cow<'static, str>,
    pub label: Cow<'static, str>,
}

const fn itype(value: &'static str, label: &'static str) -> InterfaceType {
    InterfaceType {
        value: Cow::Borrowed(value),
        label: Cow::Borrowed(label),
    }
}

impl InterfaceType {
    // Virtual interfaces.
    pub const VIRTUAL: InterfaceType = itype("virtual", "Virtual");
    pub const BRIDGE: InterfaceType = itype("bridge", "Bridge");
    pub const LAG: InterfaceType = itype("lag", "Link Aggregation Group (LAG)");

    // Fixed ethernet.
    pub const BASE_TX_100ME: InterfaceType = itype("100base-tx", "100BASE-TX (10/100ME)");
    pub const GE1_FIXED: InterfaceType = itype("1000base-t", "1000BASE-T (1GE)");
    pub const GE1_SFP: InterfaceType = itype("1000base-x-sfp", "SFP (1GE)");
    pub const GE2_5_FIXED: InterfaceType = itype("2.5gbase-t", "2.5GBASE-T (2.5GE)");
    pub const GE5_FIXED: InterfaceType = itype("5gbase-t", "5GBASE-T (5GE)");
    pub const GE10_FIXED: InterfaceType = itype("10gbase-t", "10GBASE-T (10GE)");
    pub const GE10_SFPP: InterfaceType = itype("10gbase-x-sfpp", "SFP+ (10GE)");
    pub const GE25_SFP28: InterfaceType = itype("25gbase-x-sfp28", "SFP28 (25GE)");
    pub const GE40_QSFPP: InterfaceType = itype("40gbase-x-qsfpp", "QSFP+ (40GE)");
    pub const GE50_QSFP28: InterfaceType = itype("50gbase-x-sfp28", "QSFP28 (50GE)");
    pub const GE100_QSFP28: InterfaceType = itype("100gbase-x-qsfp28", "QSFP28 (100GE)");
    pub const GE200_QSFP56: InterfaceType = itype("200gbase-x-qsfp56", "QSFP56 (200GE)");
    pub const GE400_QSFPDD: InterfaceType = itype("400gbase-x-qsfpdd", "QSFP-DD (400GE)");
    pub const GE800_QSFPDD: InterfaceType = itype("800gbase-x-qsfpdd", "QSFP-DD (800GE)");

    // Wireless.
    pub const IEEE80211A: InterfaceType = itype("ieee802.11a", "IEEE 802.11a");
    pub const IEEE80211G: InterfaceType = itype("ieee802.11g", "IEEE 802.11b/g");
    pub const IEEE80211N: InterfaceType = itype("ieee802.11n", "IEEE 802.11n");
    pub const IEEE80211AC: InterfaceType = itype("ieee802.11ac", "IEEE 802.11ac");
    pub const IEEE80211AX: InterfaceType = itype("ieee802.11ax", "IEEE 802.11ax");

    // Fibre channel.
    pub const GFC2_SFP: InterfaceType = itype("2gfc-sfp", "SFP (2GFC)");
    pub const GFC4_SFP: InterfaceType = itype("4gfc-sfp", "SFP (4GFC)");
    pub const GFC8_SFPP: InterfaceType = itype("8gfc-sfpp", "SFP+ (8GFC)");
    pub const GFC16_SFPP: InterfaceType = itype("16gfc-sfpp", "SFP+ (16GFC)");
    pub const GFC32_SFP28: InterfaceType = itype("32gfc-sfp28", "SFP28 (32GFC)");
    pub const GFC64_QSFPP: InterfaceType = itype("64gfc-qsfpp", "QSFP (64GFC)");
    pub const GFC128_QSFP28: InterfaceType = itype("128gfc-qsfp28", "QSFP28 (128GFC)");

    /// Fallback for anything the source reports that has no catalog entry.
    pub const OTHER: InterfaceType = itype("other", "Other");
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for InterfaceType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let (value, label) = match raw {
            Value::String(v) => (v, String::new()),
            Value::Object(map) => {
                let value = map
                    .get("value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let label = map
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (value, label)
            }
            _ => return Err(serde::de::Error::custom("invalid interface type")),
        };
        Ok(InterfaceType {
            value: Cow::Owned(value),
            label: Cow::Owned(label),
        })
    }
}

/// Interface speeds in Kbps, mirroring the fixed speed catalog.
pub mod speeds {
    pub const MBPS10: u64 = 10_000;
    pub const MBPS100: u64 = 100_000;
    pub const GBPS1: u64 = 1_000_000;
    pub const GBPS2: u64 = 2_000_000;
    pub const GBPS2_5: u64 = 2_500_000;
    pub const GBPS4: u64 = 4_000_000;
    pub const GBPS5: u64 = 5_000_000;
    pub const GBPS8: u64 = 8_000_000;
    pub const GBPS10: u64 = 10_000_000;
    pub const GBPS16: u64 = 16_000_000;
    pub const GBPS25: u64 = 25_000_000;
    pub const GBPS32: u64 = 32_000_000;
    pub const GBPS40: u64 = 40_000_000;
    pub const GBPS50: u64 = 50_000_000;
    pub const GBPS64: u64 = 64_000_000;
    pub const GBPS100: u64 = 100_000_000;
    pub const GBPS128: u64 = 128_000_000;
    pub const GBPS200: u64 = 200_000_000;
    pub const GBPS400: u64 = 400_000_000;
    pub const GBPS800: u64 = 800_000_000;
}

impl InterfaceType {
    /// Physical interface type assumed for a given speed (Kbps) when the
    /// source does not report one.
    pub fn for_speed(kbps: u64) -> Option<InterfaceType> {
        use speeds::*;
        let t = match kbps {
            MBPS10 | MBPS100 => Self::BASE_TX_100ME,
            GBPS1 => Self::GE1_FIXED,
            GBPS2 => Self::GFC2_SFP,
            GBPS2_5 => Self::GE2_5_FIXED,
            GBPS4 => Self::GFC4_SFP,
            GBPS5 => Self::GE5_FIXED,
            GBPS8 => Self::GFC8_SFPP,
            GBPS10 => Self::GE10_SFPP,
            GBPS16 => Self::GFC16_SFPP,
            GBPS25 => Self::GE25_SFP28,
            GBPS32 => Self::GFC32_SFP28,
            GBPS40 => Self::GE40_QSFPP,
            GBPS50 => Self::GE50_QSFP28,
            GBPS64 => Self::GFC64_QSFPP,
            GBPS100 => Self::GE100_QSFP28,
            GBPS128 => Self::GFC128_QSFP28,
            GBPS200 => Self::GE200_QSFP56,
            GBPS400 => Self::GE400_QSFPDD,
            GBPS800 => Self::GE800_QSFPDD,
            _ => return None,
        };
        Some(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceMode {
    #[serde(rename = "access")]
    Access,
    #[serde(rename = "tagged")]
    Tagged,
    #[serde(rename = "tagged-all")]
    TaggedAll,
}

impl InterfaceMode {
    pub fn as_value(&self) -> &'static str {
        match self {
            InterfaceMode::Access => "access",
            InterfaceMode::Tagged => "tagged",
            InterfaceMode::TaggedAll => "tagged-all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceDuplex {
    Half,
    Full,
    Auto,
}

impl InterfaceDuplex {
    pub fn as_value(&self) -> &'static str {
        match self {
            InterfaceDuplex::Half => "half",
            InterfaceDuplex::Full => "full",
            InterfaceDuplex::Auto => "auto",
        }
    }
}

/// A data interface on a device. Speed is in Kbps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Interface {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub device: Option<Arc<Device>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub r#type: Option<InterfaceType>,
    #[serde(default)]
    pub speed: Option<u64>,
    #[serde(default)]
    pub parent: Option<Arc<Interface>>,
    #[serde(default)]
    pub bridge: Option<Arc<Interface>>,
    #[serde(default)]
    pub lag: Option<Arc<Interface>>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default, deserialize_with = "null_default")]
    pub mac_address: String,
    #[serde(default, deserialize_with = "choice_opt")]
    pub duplex: Option<InterfaceDuplex>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub mode: Option<InterfaceMode>,
    #[serde(default, deserialize_with = "null_default")]
    pub tagged_vlans: Vec<Arc<Vlan>>,
    #[serde(default)]
    pub untagged_vlan: Option<Arc<Vlan>>,
    #[serde(default, deserialize_with = "null_default")]
    pub vdcs: Vec<Arc<VirtualDeviceContext>>,
}

impl NetboxEntity for Interface {
    const API_PATH: &'static str = "/api/dcim/interfaces/";
    const OBJECT_TYPE: &'static str = "dcim.interface";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("device".into(), fk_wire(&self.device));
        map.insert("name".into(), json!(self.name));
        if let Some(enabled) = self.enabled {
            map.insert("enabled".into(), json!(enabled));
        }
        if let Some(ref t) = self.r#type {
            map.insert("type".into(), json!(t.value));
        }
        if let Some(speed) = self.speed {
            map.insert("speed".into(), json!(speed));
        }
        map.insert("parent".into(), fk_wire(&self.parent));
        map.insert("bridge".into(), fk_wire(&self.bridge));
        map.insert("lag".into(), fk_wire(&self.lag));
        if let Some(mtu) = self.mtu {
            map.insert("mtu".into(), json!(mtu));
        }
        if !self.mac_address.is_empty() {
            map.insert("mac_address".into(), json!(self.mac_address));
        }
        if let Some(duplex) = self.duplex {
            map.insert("duplex".into(), json!(duplex.as_value()));
        }
        if let Some(mode) = self.mode {
            map.insert("mode".into(), json!(mode.as_value()));
        }
        map.insert("tagged_vlans".into(), fk_list_wire(&self.tagged_vlans));
        map.insert("untagged_vlan".into(), fk_wire(&self.untagged_vlan));
        if !self.vdcs.is_empty() {
            map.insert("vdcs".into(), fk_list_wire(&self.vdcs));
        }
        map
    }
}

impl Interface {
    /// Natural key: (device id, name).
    pub fn natural_key(&self) -> (Id, String) {
        (
            self.device.as_ref().map(|d| d.id()).unwrap_or_default(),
            self.name.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VdcStatus {
    Active,
    Planned,
    Offline,
}

impl VdcStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            VdcStatus::Active => "active",
            VdcStatus::Planned => "planned",
            VdcStatus::Offline => "offline",
        }
    }
}

/// An additional virtual context carved out of a physical device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VirtualDeviceContext {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device: Option<Arc<Device>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<VdcStatus>,
    #[serde(default)]
    pub identifier: Option<u32>,
    #[serde(default)]
    pub tenant: Option<Arc<Tenant>>,
    #[serde(default)]
    pub primary_ip4: Option<Arc<IPAddress>>,
    #[serde(default)]
    pub primary_ip6: Option<Arc<IPAddress>>,
}

impl NetboxEntity for VirtualDeviceContext {
    const API_PATH: &'static str = "/api/dcim/virtual-device-contexts/";
    const OBJECT_TYPE: &'static str = "dcim.virtualdevicecontext";

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
        map.insert("device".into(), fk_wire(&self.device));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        if let Some(identifier) = self.identifier {
            map.insert("identifier".into(), json!(identifier));
        }
        map.insert("tenant".into(), fk_wire(&self.tenant));
        map.insert("primary_ip4".into(), fk_wire(&self.primary_ip4));
        map.insert("primary_ip6".into(), fk_wire(&self.primary_ip6));
        map
    }
}

impl VirtualDeviceContext {
    /// Natural key: (name, device id).
    pub fn natural_key(&self) -> (String, Id) {
        (
            self.name.clone(),
            self.device.as_ref().map(|d| d.id()).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_to_type_mapping() {
        assert_eq!(
            InterfaceType::for_speed(speeds::GBPS1),
            Some(InterfaceType::GE1_FIXED)
        );
        assert_eq!(
            InterfaceType::for_speed(speeds::GBPS100),
            Some(InterfaceType::GE100_QSFP28)
        );
        assert_eq!(InterfaceType::for_speed(1234), None);
    }

    #[test]
    fn interface_type_deserializes_both_forms() {
        let from_str: InterfaceType = serde_json::from_value(json!("1000base-t")).unwrap();
        assert_eq!(from_str.value, "1000base-t");
        let from_obj: InterfaceType =
            serde_json::from_value(json!({"value": "lag", "label": "Link Aggregation Group (LAG)"}))
                .unwrap();
        assert_eq!(from_obj, InterfaceType::LAG);
    }

    #[test]
    fn device_wire_reduces_fks_to_ids() {
        let site = Arc::new(Site {
            base: NetboxObject { id: 2, ..Default::default() },
            name: "New York".into(),
            slug: "new-york".into(),
            status: Some(SiteStatus::Active),
            ..Default::default()
        });
        let device = Device {
            name: "esxi-01".into(),
            site: Some(site),
            status: Some(DeviceStatus::Active),
            ..Default::default()
        };
        let wire = device.to_wire();
        assert_eq!(wire["site"], json!({"id": 2}));
        assert_eq!(wire["platform"], Value::Null);
        assert_eq!(wire["status"], json!("active"));
    }
}
